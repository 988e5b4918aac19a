//! shutterlink — codec for a proprietary 433MHz roller-shutter remote.
//!
//! The remote speaks a 40-bit PWM protocol: a ~700µs preamble, a ~2400µs
//! sync marker, 80 data pulses (one bit per pulse pair: short,long = 0;
//! long,short = 1) and a ~7000µs end-gap.
//!
//! Frame layout, bit 0 = first received:
//!
//! ```text
//! ┌──────────────────────┬───────────┬───────────┬────────────┐
//! │ Remote ID (24 bits)  │ CH (4)    │ CMD (4)   │ CHK (8)    │
//! │ bits 0–23            │ bits 24–27│ bits 28–31│ bits 32–39 │
//! └──────────────────────┴───────────┴───────────┴────────────┘
//! ```
//!
//! The crate consumes pulse-duration sequences already tokenized by the
//! receiver (one burst per decode) and produces transmit-ready duration
//! sequences for replay. Channel and command nibbles resolve through a
//! learnable registry; most associations are only suspected so far and
//! carry an explicit confidence tag. The checksum formula is not fully
//! reverse-engineered; it sits behind [`checksum::ChecksumAlgorithm`] so
//! a corrected formula can drop in without touching the framing.
//!
//! ```
//! use shutterlink::ShutterProtocol;
//!
//! let mut protocol = ShutterProtocol::new();
//! let pulses = protocol.encode_command(0x98461A, "CH3", "DOWN").unwrap();
//! let command = protocol.decode_pulses(&pulses).unwrap();
//! assert_eq!(command.frame.remote_id, 0x98461A);
//! assert!(command.checksum_valid);
//! ```

pub mod bits;
pub mod checksum;
pub mod command;
pub mod error;
pub mod frame;
pub mod protocol;
pub mod pulse;
pub mod registry;
pub mod storage;

pub use command::ShutterCommand;
pub use error::{DecodeError, EncodeError, LearnError};
pub use frame::{Frame, FrameCodec, FRAME_BITS};
pub use protocol::ShutterProtocol;
pub use pulse::{PulseCategory, PulseWindow, TimingProfile};
pub use registry::{
    ChannelCommandRegistry, Confidence, LabelResolution, LearnedMapping, MappingKind,
};
pub use storage::{RegistrySnapshot, Storage};
