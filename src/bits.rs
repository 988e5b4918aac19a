//! PWM bit recovery from classified pulse sequences.
//!
//! One bit per pulse pair: (SHORT, LONG) → 0, (LONG, SHORT) → 1. Any
//! other pairing is an error; a pair never silently becomes a bit. The
//! leading preamble (unclassified, ~700µs) and the sync marker are
//! structural and skipped; a single terminal end-gap is stripped.

use bitvec::prelude::*;

use crate::error::DecodeError;
use crate::frame::FRAME_BITS;
use crate::pulse::PulseCategory;

/// How many leading pulses may precede the sync marker.
pub const SYNC_SCAN_WINDOW: usize = 5;

/// Data pulses per frame: two per bit.
pub const DATA_PULSES: usize = FRAME_BITS * 2;

/// Recover the 40 data bits from a classified pulse burst.
///
/// Scans the first [`SYNC_SCAN_WINDOW`] pulses for the sync marker,
/// strips one trailing end-gap, then consumes exactly [`DATA_PULSES`]
/// pulses pairwise. Data pulses past the 80th (receiver splatter before
/// the gap) are tolerated and logged at debug level.
pub fn decode(categories: &[PulseCategory]) -> Result<BitVec<u8, Msb0>, DecodeError> {
    let scanned = categories.len().min(SYNC_SCAN_WINDOW);
    let sync = categories[..scanned]
        .iter()
        .position(|&c| c == PulseCategory::Sync)
        .ok_or(DecodeError::MissingSync { scanned })?;

    let mut data = &categories[sync + 1..];
    if let Some((&PulseCategory::Gap, rest)) = data.split_last() {
        data = rest;
    }

    if data.len() < DATA_PULSES {
        return Err(DecodeError::UnexpectedLength {
            expected: DATA_PULSES,
            actual: data.len(),
        });
    }
    if data.len() > DATA_PULSES {
        tracing::debug!(
            extra = data.len() - DATA_PULSES,
            "ignoring trailing pulses after frame data"
        );
    }

    let mut bits: BitVec<u8, Msb0> = BitVec::with_capacity(FRAME_BITS);
    for (bit, pair) in data[..DATA_PULSES].chunks_exact(2).enumerate() {
        match (pair[0], pair[1]) {
            (PulseCategory::Short, PulseCategory::Long) => bits.push(false),
            (PulseCategory::Long, PulseCategory::Short) => bits.push(true),
            (first, second) => {
                return Err(DecodeError::MalformedPulsePair { bit, first, second });
            }
        }
    }

    Ok(bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pulse::TimingProfile;

    /// Well-formed burst for a given bit string: preamble, sync, pairs, gap.
    fn burst(bits: &str) -> Vec<u32> {
        let mut pulses = vec![700, 2400];
        for b in bits.chars() {
            if b == '1' {
                pulses.extend_from_slice(&[1050, 450]);
            } else {
                pulses.extend_from_slice(&[450, 1050]);
            }
        }
        pulses.push(7000);
        pulses
    }

    fn decode_burst(pulses: &[u32]) -> Result<BitVec<u8, Msb0>, DecodeError> {
        decode(&TimingProfile::default().classify_all(pulses))
    }

    #[test]
    fn known_vector_bits() {
        let expected = "1001100001000110000110100100001100110010";
        let bits = decode_burst(&burst(expected)).unwrap();
        let rendered: String = bits.iter().map(|b| if *b { '1' } else { '0' }).collect();
        assert_eq!(rendered, expected);
    }

    #[test]
    fn short_short_pair_is_malformed() {
        let mut pulses = burst("1001100001000110000110100100001100110010");
        // Corrupt bit 3: turn its long-short into short-short
        pulses[2 + 3 * 2] = 450;
        let err = decode_burst(&pulses).unwrap_err();
        assert_eq!(
            err,
            DecodeError::MalformedPulsePair {
                bit: 3,
                first: PulseCategory::Short,
                second: PulseCategory::Short,
            }
        );
    }

    #[test]
    fn truncated_burst_is_rejected() {
        let mut pulses = burst("1001100001000110000110100100001100110010");
        // Drop the final bit's short, as the receiver does in the
        // archived RFDEBUG captures (79 data pulses, lone trailing long)
        pulses.remove(pulses.len() - 3);
        let err = decode_burst(&pulses).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnexpectedLength {
                expected: 80,
                actual: 79,
            }
        );
    }

    #[test]
    fn missing_sync_is_rejected() {
        let pulses = vec![450, 1050, 450, 1050, 450, 1050];
        let err = decode_burst(&pulses).unwrap_err();
        assert_eq!(err, DecodeError::MissingSync { scanned: 5 });
    }

    #[test]
    fn sync_beyond_scan_window_is_rejected() {
        let mut pulses = burst("1001100001000110000110100100001100110010");
        // Push the sync out of the scan window with noise pulses
        for _ in 0..5 {
            pulses.insert(0, 100);
        }
        let err = decode_burst(&pulses).unwrap_err();
        assert_eq!(err, DecodeError::MissingSync { scanned: 5 });
    }

    #[test]
    fn missing_gap_still_decodes() {
        let mut pulses = burst("1001100001000110000110100100001100110010");
        pulses.pop();
        assert!(decode_burst(&pulses).is_ok());
    }

    #[test]
    fn trailing_splatter_is_tolerated() {
        let mut pulses = burst("1001100001000110000110100100001100110010");
        let gap = pulses.pop().unwrap();
        pulses.extend_from_slice(&[450, 450]);
        pulses.push(gap);
        assert!(decode_burst(&pulses).is_ok());
    }
}
