//! End-to-end pipeline for shutter remote bursts.
//!
//! Decode: raw durations → classifier → bit recovery → frame → checksum
//! verdict → label resolution → [`ShutterCommand`]. Encode: labels →
//! registry nibbles → sealed frame → pulse train. Each burst is decoded
//! independently; the only state the pipeline accumulates is the bounded
//! history and a decode counter.

use std::collections::VecDeque;

use chrono::Utc;

use crate::bits;
use crate::command::ShutterCommand;
use crate::error::{DecodeError, EncodeError};
use crate::frame::{Frame, FrameCodec};
use crate::pulse::TimingProfile;
use crate::registry::ChannelCommandRegistry;

/// How many decoded commands the history keeps.
const HISTORY_LIMIT: usize = 100;

/// The wired-up protocol: timing profile, frame codec and registry.
pub struct ShutterProtocol {
    timing: TimingProfile,
    codec: FrameCodec,
    registry: ChannelCommandRegistry,
    history: VecDeque<ShutterCommand>,
    decode_count: u64,
}

impl ShutterProtocol {
    /// Default timing, observed-constant checksum, seeded registry.
    pub fn new() -> Self {
        Self::with_parts(
            TimingProfile::default(),
            FrameCodec::new(),
            ChannelCommandRegistry::with_defaults(),
        )
    }

    /// Assemble from explicit parts (recalibrated timing, a different
    /// checksum strategy, or a registry restored from storage).
    pub fn with_parts(
        timing: TimingProfile,
        codec: FrameCodec,
        registry: ChannelCommandRegistry,
    ) -> Self {
        Self {
            timing,
            codec,
            registry,
            history: VecDeque::with_capacity(HISTORY_LIMIT),
            decode_count: 0,
        }
    }

    pub fn timing(&self) -> &TimingProfile {
        &self.timing
    }

    pub fn timing_mut(&mut self) -> &mut TimingProfile {
        &mut self.timing
    }

    pub fn codec(&self) -> &FrameCodec {
        &self.codec
    }

    pub fn registry(&self) -> &ChannelCommandRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ChannelCommandRegistry {
        &mut self.registry
    }

    /// Decode one pulse burst (one receiver event) into a command record.
    pub fn decode_pulses(&mut self, pulses: &[u32]) -> Result<ShutterCommand, DecodeError> {
        let categories = self.timing.classify_all(pulses);
        let bits = bits::decode(&categories)?;
        let frame = self.codec.decode(&bits)?;

        let command = ShutterCommand {
            checksum_valid: self.codec.verify(&frame),
            channel: self.registry.resolve_channel(frame.channel_raw),
            command: self.registry.resolve_command(frame.command_raw),
            remote_name: self.registry.remote_name(frame.remote_id).map(str::to_string),
            raw_bits: frame.bit_string(),
            timestamp: Utc::now(),
            frame,
        };

        self.decode_count += 1;
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(command.clone());

        tracing::debug!(
            remote = %command.remote_hex(),
            channel = %command.channel,
            command = %command.command,
            checksum = command.checksum_status(),
            "decoded shutter burst"
        );

        Ok(command)
    }

    /// Build the transmit pulse train for a labeled command.
    pub fn encode_command(
        &self,
        remote_id: u32,
        channel: &str,
        command: &str,
    ) -> Result<Vec<u32>, EncodeError> {
        if remote_id > 0xFF_FFFF {
            return Err(EncodeError::RemoteIdOutOfRange(remote_id));
        }
        let channel_raw = self
            .registry
            .channel_raw(channel)
            .ok_or_else(|| EncodeError::UnknownChannel(channel.to_string()))?
            .raw;
        let command_raw = self
            .registry
            .command_raw(command)
            .ok_or_else(|| EncodeError::UnknownCommand(command.to_string()))?
            .raw;

        let frame = self.codec.seal(remote_id, channel_raw, command_raw);
        Ok(self.codec.encode(&frame, &self.timing))
    }

    /// Re-encode an already decoded frame (replay). The checksum is
    /// re-sealed from the payload either way.
    pub fn encode_frame(&self, frame: &Frame) -> Vec<u32> {
        self.codec.encode(frame, &self.timing)
    }

    /// The transmit train repeated back to back; each frame's end-gap
    /// separates it from the next.
    pub fn encode_repeated(
        &self,
        remote_id: u32,
        channel: &str,
        command: &str,
        repeats: usize,
    ) -> Result<Vec<u32>, EncodeError> {
        let single = self.encode_command(remote_id, channel, command)?;
        let repeats = repeats.max(1);
        let mut pulses = Vec::with_capacity(single.len() * repeats);
        for _ in 0..repeats {
            pulses.extend_from_slice(&single);
        }
        Ok(pulses)
    }

    /// Most recently decoded command.
    pub fn last_command(&self) -> Option<&ShutterCommand> {
        self.history.back()
    }

    /// Decoded commands, oldest first (bounded at 100).
    pub fn history(&self) -> impl Iterator<Item = &ShutterCommand> {
        self.history.iter()
    }

    /// Total bursts decoded successfully since construction.
    pub fn decode_count(&self) -> u64 {
        self.decode_count
    }
}

impl Default for ShutterProtocol {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Confidence, LabelResolution, MappingKind};

    const KNOWN_BITS: &str = "1001100001000110000110100100001100110010";

    fn known_burst() -> Vec<u32> {
        let mut pulses = vec![700, 2400];
        for b in KNOWN_BITS.chars() {
            if b == '1' {
                pulses.extend_from_slice(&[1050, 450]);
            } else {
                pulses.extend_from_slice(&[450, 1050]);
            }
        }
        pulses.push(7000);
        pulses
    }

    #[test]
    fn known_vector_end_to_end() {
        let mut protocol = ShutterProtocol::new();
        let cmd = protocol.decode_pulses(&known_burst()).unwrap();

        assert_eq!(cmd.frame.remote_id, 0x98461A);
        assert_eq!(cmd.frame.channel_raw, 0x4);
        assert_eq!(cmd.frame.command_raw, 0x3);
        assert_eq!(cmd.frame.checksum, 0x32);
        assert!(cmd.checksum_valid);
        assert_eq!(
            cmd.channel,
            LabelResolution::Known {
                label: "CH3".to_string(),
                confidence: Confidence::Confirmed,
            }
        );
        assert_eq!(
            cmd.command,
            LabelResolution::Known {
                label: "DOWN".to_string(),
                confidence: Confidence::Confirmed,
            }
        );
        assert_eq!(cmd.raw_bits, KNOWN_BITS);
        assert_eq!(cmd.to_string(), "0x98461A CH3 DOWN (checksum OK)");
    }

    #[test]
    fn jittered_burst_decodes_identically() {
        // Same frame with the pulse scatter seen in real captures
        let mut protocol = ShutterProtocol::new();
        let reference = protocol.decode_pulses(&known_burst()).unwrap();

        let jittered: Vec<u32> = known_burst()
            .iter()
            .map(|&us| match us {
                450 => 480,
                1050 => 1080,
                2400 => 2370,
                7000 => 6990,
                other => other,
            })
            .collect();
        let cmd = protocol.decode_pulses(&jittered).unwrap();
        assert_eq!(cmd.frame, reference.frame);
    }

    #[test]
    fn real_truncated_capture_is_rejected() {
        // Archived RFDEBUG line: 82 pulses, only 79 data pulses (the
        // receiver drops the final short before the gap)
        let line: &[u32] = &[
            750, 2370, 1050, 450, 450, 1050, 450, 1050, 1050, 480, 1050, 480, 450, 1080, 450,
            1080, 450, 1110, 450, 1080, 1050, 480, 450, 1050, 450, 1050, 450, 1050, 1050, 480,
            1050, 480, 450, 1080, 450, 1050, 450, 1050, 450, 1080, 1050, 480, 1050, 480, 450,
            1080, 1050, 450, 450, 1110, 450, 1050, 1050, 450, 450, 1050, 450, 1050, 450, 1050,
            450, 1050, 1050, 480, 1050, 510, 450, 1080, 450, 1080, 1050, 450, 1050, 480, 450,
            1050, 450, 1050, 1050, 450, 1050, 6990,
        ];
        let mut protocol = ShutterProtocol::new();
        let err = protocol.decode_pulses(line).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnexpectedLength {
                expected: 80,
                actual: 79,
            }
        );
    }

    #[test]
    fn encode_decode_round_trip() {
        let mut protocol = ShutterProtocol::new();
        let pulses = protocol.encode_command(0x98461A, "CH3", "DOWN").unwrap();
        assert_eq!(pulses.len(), 83);

        let cmd = protocol.decode_pulses(&pulses).unwrap();
        assert_eq!(cmd.frame.remote_id, 0x98461A);
        assert_eq!(cmd.channel.label(), Some("CH3"));
        assert_eq!(cmd.command.label(), Some("DOWN"));
        assert!(cmd.checksum_valid);
    }

    #[test]
    fn unknown_labels_fail_encode() {
        let protocol = ShutterProtocol::new();
        assert_eq!(
            protocol.encode_command(0x98461A, "CH9", "DOWN").unwrap_err(),
            EncodeError::UnknownChannel("CH9".to_string())
        );
        assert_eq!(
            protocol.encode_command(0x98461A, "CH3", "WAVE").unwrap_err(),
            EncodeError::UnknownCommand("WAVE".to_string())
        );
    }

    #[test]
    fn oversized_remote_id_fails_encode() {
        let protocol = ShutterProtocol::new();
        assert_eq!(
            protocol.encode_command(0x1_000_000, "CH3", "DOWN").unwrap_err(),
            EncodeError::RemoteIdOutOfRange(0x1_000_000)
        );
    }

    #[test]
    fn repeated_encode_concatenates_frames() {
        let protocol = ShutterProtocol::new();
        let single = protocol.encode_command(0x98461A, "CH3", "DOWN").unwrap();
        let train = protocol
            .encode_repeated(0x98461A, "CH3", "DOWN", 5)
            .unwrap();
        assert_eq!(train.len(), single.len() * 5);
        assert_eq!(&train[..single.len()], single.as_slice());
        assert_eq!(&train[single.len()..single.len() * 2], single.as_slice());
    }

    #[test]
    fn unmapped_nibbles_surface_raw() {
        let mut protocol = ShutterProtocol::with_parts(
            TimingProfile::default(),
            FrameCodec::new(),
            ChannelCommandRegistry::empty(),
        );
        let cmd = protocol.decode_pulses(&known_burst()).unwrap();
        assert_eq!(cmd.channel, LabelResolution::Unknown { raw: 0x4 });
        assert_eq!(cmd.command, LabelResolution::Unknown { raw: 0x3 });
    }

    #[test]
    fn learning_changes_later_decodes() {
        let mut protocol = ShutterProtocol::with_parts(
            TimingProfile::default(),
            FrameCodec::new(),
            ChannelCommandRegistry::empty(),
        );
        protocol
            .registry_mut()
            .learn(MappingKind::Channel, 0x4, "CH3", Confidence::Confirmed, false)
            .unwrap();
        protocol.registry_mut().learn_remote(0x98461A, "Kitchen");

        let cmd = protocol.decode_pulses(&known_burst()).unwrap();
        assert_eq!(cmd.channel.label(), Some("CH3"));
        assert_eq!(cmd.remote_name.as_deref(), Some("Kitchen"));
    }

    #[test]
    fn history_is_bounded() {
        let mut protocol = ShutterProtocol::new();
        let burst = known_burst();
        for _ in 0..120 {
            protocol.decode_pulses(&burst).unwrap();
        }
        assert_eq!(protocol.decode_count(), 120);
        assert_eq!(protocol.history().count(), 100);
        assert!(protocol.last_command().is_some());
    }
}
