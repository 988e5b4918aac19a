//! Persistence for learned mappings and timing calibration.
//!
//! Everything lives under `~/.config/shutterlink/`:
//!
//! ```text
//! ~/.config/shutterlink/
//!   config.ini      — Timing calibration (classifier windows + encode nominals)
//!   mappings.json   — Learned channel/command/remote mappings
//! ```
//!
//! The registry is persisted as an immutable snapshot: loaded once at
//! startup, written back after each successful learn. Remote ids are
//! stored as hex strings (`"0x98461A"`) so the file stays hand-editable.

use anyhow::{Context, Result};
use configparser::ini::Ini;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::pulse::{PulseWindow, TimingProfile};
use crate::registry::{ChannelCommandRegistry, LearnedMapping, MappingKind};

/// Serialized form of the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub channels: Vec<LearnedMapping>,
    pub commands: Vec<LearnedMapping>,
    /// Remote names keyed by hex id (`"0x98461A"`)
    #[serde(default)]
    pub remotes: BTreeMap<String, String>,
}

impl RegistrySnapshot {
    /// Snapshot the current registry state.
    pub fn capture(registry: &ChannelCommandRegistry) -> Self {
        Self {
            channels: registry.channels().cloned().collect(),
            commands: registry.commands().cloned().collect(),
            remotes: registry
                .remotes()
                .map(|(id, name)| (format!("0x{:06X}", id), name.to_string()))
                .collect(),
        }
    }

    /// Rebuild a registry from this snapshot, verbatim (confidence levels
    /// are restored as recorded, not re-learned).
    pub fn restore(&self) -> ChannelCommandRegistry {
        let mut registry = ChannelCommandRegistry::empty();
        for mapping in &self.channels {
            registry.insert(MappingKind::Channel, mapping.clone());
        }
        for mapping in &self.commands {
            registry.insert(MappingKind::Command, mapping.clone());
        }
        for (key, name) in &self.remotes {
            match u32::from_str_radix(key.trim_start_matches("0x"), 16) {
                Ok(id) => registry.learn_remote(id, name),
                Err(_) => {
                    tracing::warn!(%key, "skipping remote with unparseable id in mappings file");
                }
            }
        }
        registry
    }
}

/// Resolve the config directory to `~/.config/shutterlink/` regardless of OS.
pub fn resolve_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("shutterlink"))
}

/// Storage manager for the mappings file and timing calibration.
pub struct Storage {
    config_dir: PathBuf,
}

impl Storage {
    /// Storage rooted at `~/.config/shutterlink/`, creating it if missing.
    pub fn new() -> Result<Self> {
        let config_dir = resolve_config_dir()
            .context("Could not determine home directory (is $HOME set?)")?;
        Self::with_dir(config_dir)
    }

    /// Storage rooted at an explicit directory (embedders, tests).
    pub fn with_dir(config_dir: PathBuf) -> Result<Self> {
        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config dir: {:?}", config_dir))?;
            tracing::info!("Created config directory: {:?}", config_dir);
        }
        Ok(Self { config_dir })
    }

    /// Get the config directory path.
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Path of the learned-mappings file.
    pub fn mappings_path(&self) -> PathBuf {
        self.config_dir.join("mappings.json")
    }

    /// Path of the timing calibration file.
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join("config.ini")
    }

    // ─── Learned mappings ────────────────────────────────────────────────

    /// Load the registry snapshot, falling back to the seeded defaults
    /// when no mappings file exists yet.
    pub fn load_registry(&self) -> Result<ChannelCommandRegistry> {
        let path = self.mappings_path();
        if !path.exists() {
            tracing::info!("No mappings file at {:?} — using seeded defaults", path);
            return Ok(ChannelCommandRegistry::with_defaults());
        }

        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read mappings from {:?}", path))?;
        let snapshot: RegistrySnapshot = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse mappings file {:?}", path))?;
        tracing::info!("Loaded learned mappings from {:?}", path);
        Ok(snapshot.restore())
    }

    /// Write the registry snapshot. Call after each successful learn.
    pub fn save_registry(&self, registry: &ChannelCommandRegistry) -> Result<()> {
        let path = self.mappings_path();
        let snapshot = RegistrySnapshot::capture(registry);
        let json = serde_json::to_string_pretty(&snapshot)
            .context("Failed to serialize registry snapshot")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write mappings to {:?}", path))?;
        tracing::info!("Saved learned mappings to {:?}", path);
        Ok(())
    }

    // ─── Timing calibration ──────────────────────────────────────────────

    /// Load the timing profile from `config.ini`, falling back to defaults
    /// for missing keys. Writes a default file on first run.
    pub fn load_timing(&self) -> Result<TimingProfile> {
        let path = self.config_path();
        if !path.exists() {
            tracing::info!("No config.ini found — creating default at {:?}", path);
            let timing = TimingProfile::default();
            if let Err(e) = self.save_timing(&timing) {
                tracing::warn!("Could not write default config.ini: {}", e);
            }
            return Ok(timing);
        }

        let mut ini = Ini::new();
        ini.load(&path)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

        let defaults = TimingProfile::default();
        let get = |section: &str, key: &str, fallback: u32| -> u32 {
            ini.getuint(section, key)
                .ok()
                .flatten()
                .map(|v| v as u32)
                .unwrap_or(fallback)
        };

        Ok(TimingProfile {
            short: PulseWindow::new(
                get("windows", "short_min", defaults.short.min),
                get("windows", "short_max", defaults.short.max),
            ),
            long: PulseWindow::new(
                get("windows", "long_min", defaults.long.min),
                get("windows", "long_max", defaults.long.max),
            ),
            sync: PulseWindow::new(
                get("windows", "sync_min", defaults.sync.min),
                get("windows", "sync_max", defaults.sync.max),
            ),
            gap: PulseWindow::new(
                get("windows", "gap_min", defaults.gap.min),
                get("windows", "gap_max", defaults.gap.max),
            ),
            preamble_us: get("transmit", "preamble_us", defaults.preamble_us),
            sync_us: get("transmit", "sync_us", defaults.sync_us),
            short_us: get("transmit", "short_us", defaults.short_us),
            long_us: get("transmit", "long_us", defaults.long_us),
            gap_us: get("transmit", "gap_us", defaults.gap_us),
        })
    }

    /// Save the timing profile as a commented INI file.
    pub fn save_timing(&self, timing: &TimingProfile) -> Result<()> {
        let path = self.config_path();
        let content = format!(
            r#"; shutterlink — timing calibration
; Location: {path}
;
; Classifier windows are inclusive [min, max] ranges in microseconds,
; measured from RFDEBUG captures. Widen them for noisier receivers.
; Lines starting with ; or # are comments.

[windows]
; Short data pulse (nominal 458µs)
short_min = {short_min}
short_max = {short_max}

; Long data pulse (nominal 1059µs)
long_min = {long_min}
long_max = {long_max}

; Sync marker
sync_min = {sync_min}
sync_max = {sync_max}

; End-gap terminating a frame
gap_min = {gap_min}
gap_max = {gap_max}

[transmit]
; Nominal durations used when encoding. Each must sit inside the
; matching window above or transmitted frames will not decode back.
preamble_us = {preamble}
sync_us = {sync}
short_us = {short}
long_us = {long}
gap_us = {gap}
"#,
            path = path.display(),
            short_min = timing.short.min,
            short_max = timing.short.max,
            long_min = timing.long.min,
            long_max = timing.long.max,
            sync_min = timing.sync.min,
            sync_max = timing.sync.max,
            gap_min = timing.gap.min,
            gap_max = timing.gap.max,
            preamble = timing.preamble_us,
            sync = timing.sync_us,
            short = timing.short_us,
            long = timing.long_us,
            gap = timing.gap_us,
        );

        fs::write(&path, content)
            .with_context(|| format!("Failed to write config to {:?}", path))?;
        tracing::info!("Saved timing calibration to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Confidence;

    fn storage() -> (tempfile::TempDir, Storage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::with_dir(dir.path().join("shutterlink")).unwrap();
        (dir, storage)
    }

    #[test]
    fn registry_defaults_when_no_file() {
        let (_dir, storage) = storage();
        let registry = storage.load_registry().unwrap();
        assert_eq!(registry.channel_label(0x4).unwrap().label, "CH3");
    }

    #[test]
    fn registry_round_trips() {
        let (_dir, storage) = storage();
        let mut registry = ChannelCommandRegistry::with_defaults();
        registry
            .learn(MappingKind::Channel, 0x0, "CH-ALL", Confidence::Suspected, false)
            .unwrap();
        registry
            .learn(MappingKind::Command, 0x2, "UP", Confidence::Confirmed, false)
            .unwrap();
        registry.learn_remote(0x98461A, "Living room");

        storage.save_registry(&registry).unwrap();
        let restored = storage.load_registry().unwrap();

        let ch_all = restored.channel_label(0x0).unwrap();
        assert_eq!(ch_all.label, "CH-ALL");
        assert_eq!(ch_all.confidence, Confidence::Suspected);
        assert_eq!(restored.command_label(0x2).unwrap().confidence, Confidence::Confirmed);
        assert_eq!(restored.remote_name(0x98461A), Some("Living room"));

        // Hex-keyed remote ids in the file itself
        let raw = fs::read_to_string(storage.mappings_path()).unwrap();
        assert!(raw.contains("\"0x98461A\""));
    }

    #[test]
    fn timing_default_written_on_first_load() {
        let (_dir, storage) = storage();
        let timing = storage.load_timing().unwrap();
        assert_eq!(timing, TimingProfile::default());
        assert!(storage.config_path().exists());
    }

    #[test]
    fn timing_round_trips() {
        let (_dir, storage) = storage();
        let mut timing = TimingProfile::default();
        timing.short = PulseWindow::new(400, 520);
        timing.gap_us = 7200;

        storage.save_timing(&timing).unwrap();
        assert_eq!(storage.load_timing().unwrap(), timing);
    }

    #[test]
    fn partial_ini_falls_back_per_key() {
        let (_dir, storage) = storage();
        fs::write(storage.config_path(), "[windows]\nshort_min = 400\n").unwrap();

        let timing = storage.load_timing().unwrap();
        assert_eq!(timing.short.min, 400);
        assert_eq!(timing.short.max, TimingProfile::default().short.max);
        assert_eq!(timing.sync_us, TimingProfile::default().sync_us);
    }
}
