//! Pulse classification and protocol timing.
//!
//! The windows below were calibrated from RFDEBUG captures of the remote:
//! shorts accepted at 420–510µs (nominal 458), longs at 1050–1110µs
//! (nominal 1059), the sync marker at 2370–2400µs and the end-gap near
//! 7000µs. All windows are inclusive and public so the profile can be
//! recalibrated for noisier receivers; [`crate::storage`] persists a
//! profile as INI.

use serde::{Deserialize, Serialize};

/// Symbolic category of a single measured pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PulseCategory {
    /// Short data pulse (~450µs)
    Short,
    /// Long data pulse (~1050µs)
    Long,
    /// Sync marker separating preamble from data (~2400µs)
    Sync,
    /// End-gap terminating a frame (~7000µs)
    Gap,
    /// Anything outside the known windows (preamble pulses end up here)
    Unknown,
}

impl std::fmt::Display for PulseCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PulseCategory::Short => write!(f, "SHORT"),
            PulseCategory::Long => write!(f, "LONG"),
            PulseCategory::Sync => write!(f, "SYNC"),
            PulseCategory::Gap => write!(f, "GAP"),
            PulseCategory::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Inclusive `[min, max]` acceptance window in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulseWindow {
    pub min: u32,
    pub max: u32,
}

impl PulseWindow {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, duration_us: u32) -> bool {
        self.min <= duration_us && duration_us <= self.max
    }
}

/// Protocol timing: classifier windows plus the nominal durations used on
/// encode. The encode nominals sit inside their windows, so a transmitted
/// frame always classifies back cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingProfile {
    /// Short data pulse window
    pub short: PulseWindow,
    /// Long data pulse window
    pub long: PulseWindow,
    /// Sync marker window
    pub sync: PulseWindow,
    /// End-gap window (7000µs ± 500)
    pub gap: PulseWindow,

    /// Preamble duration on encode
    pub preamble_us: u32,
    /// Sync duration on encode
    pub sync_us: u32,
    /// Short data pulse on encode
    pub short_us: u32,
    /// Long data pulse on encode
    pub long_us: u32,
    /// End-gap on encode
    pub gap_us: u32,
}

impl Default for TimingProfile {
    fn default() -> Self {
        Self {
            short: PulseWindow::new(420, 510),
            long: PulseWindow::new(1050, 1110),
            sync: PulseWindow::new(2370, 2400),
            gap: PulseWindow::new(6500, 7500),
            preamble_us: 700,
            sync_us: 2400,
            short_us: 450,
            long_us: 1050,
            gap_us: 7000,
        }
    }
}

impl TimingProfile {
    /// Classify a measured duration. Total: anything outside every window
    /// is [`PulseCategory::Unknown`], and downstream stages decide fatality.
    pub fn classify(&self, duration_us: u32) -> PulseCategory {
        if self.short.contains(duration_us) {
            PulseCategory::Short
        } else if self.long.contains(duration_us) {
            PulseCategory::Long
        } else if self.sync.contains(duration_us) {
            PulseCategory::Sync
        } else if self.gap.contains(duration_us) {
            PulseCategory::Gap
        } else {
            PulseCategory::Unknown
        }
    }

    /// Classify a whole burst.
    pub fn classify_all(&self, pulses: &[u32]) -> Vec<PulseCategory> {
        pulses.iter().map(|&us| self.classify(us)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_boundaries() {
        let t = TimingProfile::default();
        assert_eq!(t.classify(420), PulseCategory::Short);
        assert_eq!(t.classify(510), PulseCategory::Short);
        assert_eq!(t.classify(1050), PulseCategory::Long);
        assert_eq!(t.classify(1110), PulseCategory::Long);
        assert_eq!(t.classify(2370), PulseCategory::Sync);
        assert_eq!(t.classify(2400), PulseCategory::Sync);
    }

    #[test]
    fn off_by_one_is_unknown() {
        let t = TimingProfile::default();
        assert_eq!(t.classify(511), PulseCategory::Unknown);
        assert_eq!(t.classify(1049), PulseCategory::Unknown);
        assert_eq!(t.classify(419), PulseCategory::Unknown);
        assert_eq!(t.classify(2401), PulseCategory::Unknown);
    }

    #[test]
    fn gap_window() {
        let t = TimingProfile::default();
        assert_eq!(t.classify(6500), PulseCategory::Gap);
        assert_eq!(t.classify(6990), PulseCategory::Gap);
        assert_eq!(t.classify(7500), PulseCategory::Gap);
        assert_eq!(t.classify(7501), PulseCategory::Unknown);
    }

    #[test]
    fn preamble_is_unknown() {
        // The ~700µs preamble has no category of its own
        let t = TimingProfile::default();
        assert_eq!(t.classify(700), PulseCategory::Unknown);
        assert_eq!(t.classify(750), PulseCategory::Unknown);
    }

    #[test]
    fn encode_nominals_classify_back() {
        let t = TimingProfile::default();
        assert_eq!(t.classify(t.short_us), PulseCategory::Short);
        assert_eq!(t.classify(t.long_us), PulseCategory::Long);
        assert_eq!(t.classify(t.sync_us), PulseCategory::Sync);
        assert_eq!(t.classify(t.gap_us), PulseCategory::Gap);
    }
}
