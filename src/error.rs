//! Error types for the shutter-remote codec.
//!
//! All malformed-input paths are reported as values; nothing here is used
//! for normal control flow. A checksum mismatch is deliberately NOT an
//! error: the checksum formula is not fully verified, so the verdict is
//! surfaced as a flag on the decoded record instead (see [`crate::frame`]).

use thiserror::Error;

use crate::pulse::PulseCategory;
use crate::registry::MappingKind;

/// Errors produced while turning a pulse burst into a frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// No sync pulse within the leading scan window.
    #[error("no sync pulse within the first {scanned} pulses")]
    MissingSync { scanned: usize },

    /// A data pulse pair that is neither short-long nor long-short.
    #[error("pulse pair ({first}, {second}) at bit {bit} is not a valid PWM bit")]
    MalformedPulsePair {
        bit: usize,
        first: PulseCategory,
        second: PulseCategory,
    },

    /// Too few data pulses between sync and end-gap.
    #[error("expected {expected} data pulses, got {actual}")]
    UnexpectedLength { expected: usize, actual: usize },

    /// Bit sequence is not exactly one frame.
    #[error("expected {expected} bits, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Errors produced while building a transmit sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// Channel label has no nibble mapping in the registry.
    #[error("channel label {0:?} is not mapped to a nibble")]
    UnknownChannel(String),

    /// Command label has no nibble mapping in the registry.
    #[error("command label {0:?} is not mapped to a nibble")]
    UnknownCommand(String),

    /// Remote id does not fit the 24-bit field.
    #[error("remote id 0x{0:X} does not fit in 24 bits")]
    RemoteIdOutOfRange(u32),
}

/// Errors produced by registry mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LearnError {
    /// Refusing to overwrite a confirmed mapping without `force`.
    #[error("conflicting {kind} learn: {detail}")]
    ConflictingLearn { kind: MappingKind, detail: String },
}
