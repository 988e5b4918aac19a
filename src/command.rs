//! Decoded-result record surfaced to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::frame::Frame;
use crate::registry::LabelResolution;

/// One fully decoded shutter command: the frame plus everything the
/// registry could resolve about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShutterCommand {
    pub frame: Frame,
    /// Checksum verdict under the codec's active strategy
    pub checksum_valid: bool,
    /// Channel as labeled on the remote, or the raw nibble if unmapped
    pub channel: LabelResolution,
    /// Command label, or the raw nibble if unmapped
    pub command: LabelResolution,
    /// Learned name of the sending remote, if any
    pub remote_name: Option<String>,
    /// Wire bits as received, bit 0 first
    pub raw_bits: String,
    /// When the burst was decoded
    pub timestamp: DateTime<Utc>,
}

impl ShutterCommand {
    /// Remote id as a hex string (`0x98461A`).
    pub fn remote_hex(&self) -> String {
        self.frame.remote_hex()
    }

    /// Checksum verdict as a short status string.
    pub fn checksum_status(&self) -> &'static str {
        if self.checksum_valid {
            "OK"
        } else {
            "FAIL"
        }
    }

    /// Timestamp formatted for display.
    pub fn timestamp_short(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }
}

impl std::fmt::Display for ShutterCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} (checksum {})",
            self.remote_name.as_deref().unwrap_or(&self.remote_hex()),
            self.channel,
            self.command,
            self.checksum_status()
        )
    }
}
