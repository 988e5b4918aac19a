//! Channel/command nibble ↔ label mappings, with learning.
//!
//! The protocol's internal nibbles do not match the labels printed on the
//! remote (internal 4 is the button labeled CH3), and most associations
//! are only suspected so far. Every entry therefore carries a
//! [`Confidence`] tag, learns upgrade confidence monotonically, and a
//! confirmed entry is never overwritten (or deleted) without an
//! explicit `force`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::LearnError;

/// Degree of certainty that a nibble↔label association is correct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Unknown,
    Suspected,
    Confirmed,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::Unknown => write!(f, "unknown"),
            Confidence::Suspected => write!(f, "suspected"),
            Confidence::Confirmed => write!(f, "confirmed"),
        }
    }
}

/// Which mapping table a learn operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingKind {
    Channel,
    Command,
}

impl std::fmt::Display for MappingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MappingKind::Channel => write!(f, "channel"),
            MappingKind::Command => write!(f, "command"),
        }
    }
}

/// One learned nibble↔label association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnedMapping {
    pub raw: u8,
    pub label: String,
    pub confidence: Confidence,
}

/// Outcome of resolving a raw nibble against the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelResolution {
    /// Mapped nibble, with how certain the mapping is
    Known { label: String, confidence: Confidence },
    /// Unmapped nibble, surfaced raw
    Unknown { raw: u8 },
}

impl LabelResolution {
    /// The label, if the nibble is mapped.
    pub fn label(&self) -> Option<&str> {
        match self {
            LabelResolution::Known { label, .. } => Some(label),
            LabelResolution::Unknown { .. } => None,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(
            self,
            LabelResolution::Known {
                confidence: Confidence::Confirmed,
                ..
            }
        )
    }
}

impl std::fmt::Display for LabelResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LabelResolution::Known { label, .. } => write!(f, "{}", label),
            LabelResolution::Unknown { raw } => write!(f, "0x{:X} (unknown)", raw),
        }
    }
}

/// Mapping tables between internal nibbles and human-facing labels, plus
/// learned remote names. Plain struct: embedders serialize access with
/// their own lock (single-writer discipline); the monotonic-confidence
/// rule makes last-confirmed-write-wins safe.
#[derive(Debug, Clone, Default)]
pub struct ChannelCommandRegistry {
    channels: BTreeMap<u8, LearnedMapping>,
    commands: BTreeMap<u8, LearnedMapping>,
    remotes: BTreeMap<u32, String>,
}

impl ChannelCommandRegistry {
    /// Empty registry, no seeded mappings.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry seeded with the associations on record: CH3=4 and DOWN=0x3
    /// confirmed against hardware; the rest extrapolated (channel label =
    /// internal nibble - 1) and tagged suspected. The CH-ALL nibble
    /// (0 or 1?) is unresolved and deliberately unseeded.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        let seed = |registry: &mut Self, kind, entries: &[(u8, &str, Confidence)]| {
            for &(raw, label, confidence) in entries {
                registry
                    .learn(kind, raw, label, confidence, false)
                    .expect("seeding an empty registry cannot conflict");
            }
        };
        seed(
            &mut registry,
            MappingKind::Channel,
            &[
                (0x2, "CH1", Confidence::Suspected),
                (0x3, "CH2", Confidence::Suspected),
                (0x4, "CH3", Confidence::Confirmed),
                (0x5, "CH4", Confidence::Suspected),
            ],
        );
        seed(
            &mut registry,
            MappingKind::Command,
            &[
                (0x1, "STOP", Confidence::Suspected),
                (0x2, "UP", Confidence::Suspected),
                (0x3, "DOWN", Confidence::Confirmed),
                (0x8, "PROG", Confidence::Suspected),
            ],
        );
        registry
    }

    fn table(&self, kind: MappingKind) -> &BTreeMap<u8, LearnedMapping> {
        match kind {
            MappingKind::Channel => &self.channels,
            MappingKind::Command => &self.commands,
        }
    }

    fn table_mut(&mut self, kind: MappingKind) -> &mut BTreeMap<u8, LearnedMapping> {
        match kind {
            MappingKind::Channel => &mut self.channels,
            MappingKind::Command => &mut self.commands,
        }
    }

    /// Mapping for a channel nibble.
    pub fn channel_label(&self, raw: u8) -> Option<&LearnedMapping> {
        self.channels.get(&(raw & 0x0F))
    }

    /// Mapping for a command nibble.
    pub fn command_label(&self, raw: u8) -> Option<&LearnedMapping> {
        self.commands.get(&(raw & 0x0F))
    }

    /// Inverse lookup: channel label → mapping. Case-insensitive.
    pub fn channel_raw(&self, label: &str) -> Option<&LearnedMapping> {
        Self::find_label(&self.channels, label)
    }

    /// Inverse lookup: command label → mapping. Case-insensitive.
    pub fn command_raw(&self, label: &str) -> Option<&LearnedMapping> {
        Self::find_label(&self.commands, label)
    }

    fn find_label<'a>(
        table: &'a BTreeMap<u8, LearnedMapping>,
        label: &str,
    ) -> Option<&'a LearnedMapping> {
        table.values().find(|m| m.label.eq_ignore_ascii_case(label))
    }

    /// Resolve a channel nibble into a tagged label.
    pub fn resolve_channel(&self, raw: u8) -> LabelResolution {
        Self::resolve(self.channel_label(raw), raw)
    }

    /// Resolve a command nibble into a tagged label.
    pub fn resolve_command(&self, raw: u8) -> LabelResolution {
        Self::resolve(self.command_label(raw), raw)
    }

    fn resolve(mapping: Option<&LearnedMapping>, raw: u8) -> LabelResolution {
        match mapping {
            Some(m) => LabelResolution::Known {
                label: m.label.clone(),
                confidence: m.confidence,
            },
            None => LabelResolution::Unknown { raw: raw & 0x0F },
        }
    }

    /// Learn (or re-learn) a nibble↔label association.
    ///
    /// Confidence only ever goes up: re-learning an existing association
    /// with a lower confidence is a no-op, and re-learning it identically
    /// changes nothing. Two situations refuse without `force`:
    ///
    /// * the nibble is already *confirmed* under a different label;
    /// * the label is already *confirmed* at a different nibble.
    ///
    /// With `force`, the superseded entry is replaced (and, for a label
    /// move, removed) as part of the explicitly forced operation.
    pub fn learn(
        &mut self,
        kind: MappingKind,
        raw: u8,
        label: &str,
        confidence: Confidence,
        force: bool,
    ) -> Result<(), LearnError> {
        let raw = raw & 0x0F;
        let table = self.table_mut(kind);

        // Refuse before touching anything, so a failed learn leaves the
        // table exactly as it was
        if let Some(existing) = table.get(&raw) {
            if !existing.label.eq_ignore_ascii_case(label)
                && existing.confidence == Confidence::Confirmed
                && !force
            {
                return Err(LearnError::ConflictingLearn {
                    kind,
                    detail: format!(
                        "nibble 0x{:X} is already confirmed as {:?}",
                        raw, existing.label
                    ),
                });
            }
        }
        if let Some(other) = table
            .values()
            .find(|m| m.raw != raw && m.label.eq_ignore_ascii_case(label))
        {
            if other.confidence == Confidence::Confirmed && !force {
                return Err(LearnError::ConflictingLearn {
                    kind,
                    detail: format!(
                        "label {:?} is already confirmed at nibble 0x{:X}",
                        other.label, other.raw
                    ),
                });
            }
            let old_raw = other.raw;
            let old_confidence = other.confidence;
            table.remove(&old_raw);
            if old_confidence == Confidence::Confirmed {
                tracing::warn!(%kind, label, old_raw, new_raw = raw, "forced label move over a confirmed mapping");
            } else {
                tracing::info!(%kind, label, old_raw, new_raw = raw, "label moved to a new nibble");
            }
        }

        match table.get_mut(&raw) {
            Some(existing) if existing.label.eq_ignore_ascii_case(label) => {
                // Monotonic upgrade; idempotent when equal
                if confidence > existing.confidence {
                    tracing::info!(%kind, raw, label, from = %existing.confidence, to = %confidence, "mapping confidence upgraded");
                    existing.confidence = confidence;
                }
            }
            Some(existing) => {
                // Pre-checked above: a confirmed entry only gets here under force
                if existing.confidence == Confidence::Confirmed {
                    tracing::warn!(%kind, raw, old = %existing.label, new = label, "forced relabel of a confirmed mapping");
                } else {
                    tracing::info!(%kind, raw, old = %existing.label, new = label, "mapping relabeled");
                }
                *existing = LearnedMapping {
                    raw,
                    label: label.to_string(),
                    confidence,
                };
            }
            None => {
                tracing::info!(%kind, raw, label, %confidence, "learned mapping");
                table.insert(
                    raw,
                    LearnedMapping {
                        raw,
                        label: label.to_string(),
                        confidence,
                    },
                );
            }
        }

        Ok(())
    }

    /// Name a remote by its 24-bit id.
    pub fn learn_remote(&mut self, remote_id: u32, name: &str) {
        tracing::info!(remote = %format!("0x{:06X}", remote_id), name, "learned remote name");
        self.remotes.insert(remote_id & 0xFF_FFFF, name.to_string());
    }

    /// Learned name for a remote, if any.
    pub fn remote_name(&self, remote_id: u32) -> Option<&str> {
        self.remotes.get(&remote_id).map(String::as_str)
    }

    /// All channel mappings, ascending by nibble.
    pub fn channels(&self) -> impl Iterator<Item = &LearnedMapping> {
        self.channels.values()
    }

    /// All command mappings, ascending by nibble.
    pub fn commands(&self) -> impl Iterator<Item = &LearnedMapping> {
        self.commands.values()
    }

    /// All learned remote names, ascending by id.
    pub fn remotes(&self) -> impl Iterator<Item = (u32, &str)> {
        self.remotes.iter().map(|(&id, name)| (id, name.as_str()))
    }

    /// Insert a mapping verbatim, bypassing conflict checks. Used when
    /// restoring a persisted snapshot.
    pub(crate) fn insert(&mut self, kind: MappingKind, mapping: LearnedMapping) {
        self.table_mut(kind).insert(mapping.raw & 0x0F, mapping);
    }
}
