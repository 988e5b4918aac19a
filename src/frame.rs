//! Frame model and the 40-bit frame codec.
//!
//! Wire layout, bit 0 = first received, MSB-first within each field:
//!
//! ```text
//! ┌──────────────────────┬───────────┬───────────┬────────────┐
//! │ Remote ID (24 bits)  │ CH (4)    │ CMD (4)   │ CHK (8)    │
//! │ bits 0–23            │ bits 24–27│ bits 28–31│ bits 32–39 │
//! └──────────────────────┴───────────┴───────────┴────────────┘
//! ```

use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

use crate::checksum::{ChecksumAlgorithm, ObservedChecksum};
use crate::error::DecodeError;
use crate::pulse::TimingProfile;

/// Bits per frame: 24 remote id + 4 channel + 4 command + 8 checksum.
pub const FRAME_BITS: usize = 40;

/// One shutter frame, decoded or about to be sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// 24-bit identity of the physical remote
    pub remote_id: u32,
    /// Internal channel nibble (not the label printed on the remote)
    pub channel_raw: u8,
    /// Internal command nibble
    pub command_raw: u8,
    /// Checksum as carried on the wire
    pub checksum: u8,
}

impl Frame {
    /// Remote id as a hex string (`0x98461A`).
    pub fn remote_hex(&self) -> String {
        format!("0x{:06X}", self.remote_id)
    }

    /// Checksum as a hex string (`0x32`).
    pub fn checksum_hex(&self) -> String {
        format!("0x{:02X}", self.checksum)
    }

    /// Serialize into the 40-bit wire order.
    pub fn to_bits(&self) -> BitVec<u8, Msb0> {
        let mut bits = bitvec![u8, Msb0; 0; FRAME_BITS];
        bits[0..24].store_be(self.remote_id & 0xFF_FFFF);
        bits[24..28].store_be(self.channel_raw & 0x0F);
        bits[28..32].store_be(self.command_raw & 0x0F);
        bits[32..40].store_be(self.checksum);
        bits
    }

    /// Wire bits as a `0`/`1` string, bit 0 first.
    pub fn bit_string(&self) -> String {
        self.to_bits()
            .iter()
            .map(|b| if *b { '1' } else { '0' })
            .collect()
    }
}

/// Decodes 40-bit sequences into frames and serializes frames back into
/// transmit-ready pulse trains. The checksum strategy is swappable so the
/// formula can be corrected without touching the framing logic.
pub struct FrameCodec {
    checksum: Box<dyn ChecksumAlgorithm>,
}

impl FrameCodec {
    /// Codec with the default constant-observed checksum strategy.
    pub fn new() -> Self {
        Self::with_checksum(Box::new(ObservedChecksum::default()))
    }

    /// Codec with an explicit checksum strategy.
    pub fn with_checksum(checksum: Box<dyn ChecksumAlgorithm>) -> Self {
        Self { checksum }
    }

    /// Name of the active checksum strategy.
    pub fn checksum_name(&self) -> &'static str {
        self.checksum.name()
    }

    /// Slice a 40-bit sequence into fields.
    ///
    /// A checksum mismatch is not an error here: the frame is structurally
    /// present either way, and the verdict comes from [`FrameCodec::verify`]
    /// so callers can tell "unknown checksum formula" from corruption.
    pub fn decode(&self, bits: &BitSlice<u8, Msb0>) -> Result<Frame, DecodeError> {
        if bits.len() != FRAME_BITS {
            return Err(DecodeError::LengthMismatch {
                expected: FRAME_BITS,
                actual: bits.len(),
            });
        }

        Ok(Frame {
            remote_id: bits[0..24].load_be::<u32>(),
            channel_raw: bits[24..28].load_be::<u8>(),
            command_raw: bits[28..32].load_be::<u8>(),
            checksum: bits[32..40].load_be::<u8>(),
        })
    }

    /// Expected checksum for a frame's payload under the active strategy.
    pub fn expected_checksum(&self, frame: &Frame) -> u8 {
        self.checksum
            .compute(frame.remote_id, frame.channel_raw, frame.command_raw)
    }

    /// Checksum verdict for a decoded frame.
    pub fn verify(&self, frame: &Frame) -> bool {
        frame.checksum == self.expected_checksum(frame)
    }

    /// Build a frame whose checksum comes from the active strategy.
    pub fn seal(&self, remote_id: u32, channel_raw: u8, command_raw: u8) -> Frame {
        let mut frame = Frame {
            remote_id: remote_id & 0xFF_FFFF,
            channel_raw: channel_raw & 0x0F,
            command_raw: command_raw & 0x0F,
            checksum: 0,
        };
        frame.checksum = self.expected_checksum(&frame);
        frame
    }

    /// Serialize a frame into a transmit-ready pulse train: preamble,
    /// sync, 80 data pulses (bit 0 → short,long; bit 1 → long,short),
    /// end-gap. The checksum is always recomputed from the payload, so a
    /// stale checksum on `frame` never reaches the air. Deterministic:
    /// same frame and profile, same pulses.
    pub fn encode(&self, frame: &Frame, timing: &TimingProfile) -> Vec<u32> {
        let sealed = self.seal(frame.remote_id, frame.channel_raw, frame.command_raw);

        let mut pulses = Vec::with_capacity(2 + FRAME_BITS * 2 + 1);
        pulses.push(timing.preamble_us);
        pulses.push(timing.sync_us);
        for bit in sealed.to_bits().iter().by_vals() {
            if bit {
                pulses.push(timing.long_us);
                pulses.push(timing.short_us);
            } else {
                pulses.push(timing.short_us);
                pulses.push(timing.long_us);
            }
        }
        pulses.push(timing.gap_us);
        pulses
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}
