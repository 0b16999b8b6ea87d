//! PCM format descriptor.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::SoundError;

/// Sample widths that can be described (and stored in a WAVE file).
const SUPPORTED_BIT_DEPTHS: &[u16] = &[8, 16, 24, 32];

/// Describes the layout of interleaved PCM samples.
///
/// A format is either in host byte order (`native_endian`) or little-endian,
/// which is the order used on disk by WAVE files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcmFormat {
    /// Samples are stored in host byte order rather than little-endian.
    pub native_endian: bool,
    /// Samples are two's complement signed integers.
    pub signed: bool,
    /// Frames per second.
    pub sample_rate: u32,
    /// Samples per frame.
    pub channels: u16,
    /// Significant bits per sample.
    pub bits_per_sample: u16,
    /// Storage bytes per sample, `ceil(bits_per_sample / 8)`.
    pub bytes_per_sample: u16,
}

impl PcmFormat {
    /// Creates a validated format.
    ///
    /// # Errors
    ///
    /// Returns an error if the rate or channel count is zero, or the sample
    /// width is not one of 8, 16, 24 or 32 bits.
    pub fn new(
        native_endian: bool,
        signed: bool,
        sample_rate: u32,
        channels: u16,
        bits_per_sample: u16,
    ) -> Result<Self, SoundError> {
        if sample_rate == 0 {
            return Err(SoundError::InvalidSampleRate(sample_rate));
        }
        if channels == 0 {
            return Err(SoundError::InvalidChannels(channels));
        }
        if !SUPPORTED_BIT_DEPTHS.contains(&bits_per_sample) {
            return Err(SoundError::UnsupportedBitDepth(bits_per_sample));
        }

        Ok(Self {
            native_endian,
            signed,
            sample_rate,
            channels,
            bits_per_sample,
            bytes_per_sample: bits_per_sample.div_ceil(8),
        })
    }

    /// Mono, signed 16-bit, host byte order.
    #[must_use]
    pub const fn mono_s16(sample_rate: u32) -> Self {
        Self {
            native_endian: true,
            signed: true,
            sample_rate,
            channels: 1,
            bits_per_sample: 16,
            bytes_per_sample: 2,
        }
    }

    /// Mono, unsigned 8-bit.
    #[must_use]
    pub const fn mono_u8(sample_rate: u32) -> Self {
        Self {
            native_endian: true,
            signed: false,
            sample_rate,
            channels: 1,
            bits_per_sample: 8,
            bytes_per_sample: 1,
        }
    }

    /// Size of one frame (one sample per channel) in bytes.
    #[must_use]
    pub fn frame_size(&self) -> usize {
        usize::from(self.channels) * usize::from(self.bytes_per_sample)
    }

    /// Bytes consumed per second of playback.
    #[must_use]
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate
            .saturating_mul(u32::from(self.channels))
            .saturating_mul(u32::from(self.bytes_per_sample))
    }

    /// Returns true if the samples are laid out little-endian in memory.
    #[must_use]
    pub fn is_little_endian(&self) -> bool {
        !self.native_endian || cfg!(target_endian = "little")
    }

    /// The same format, marked as little-endian rather than host order.
    ///
    /// This is how the format reads back after being stored in a WAVE file.
    #[must_use]
    pub fn as_little_endian(&self) -> Self {
        Self {
            native_endian: false,
            ..*self
        }
    }
}

impl fmt::Display for PcmFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let order = if self.bytes_per_sample == 1 {
            ""
        } else if self.native_endian {
            " native-endian"
        } else {
            " little-endian"
        };
        write!(
            f,
            "{}{}{}, {} Hz, {} channel{}",
            if self.signed { 'S' } else { 'U' },
            self.bits_per_sample,
            order,
            self.sample_rate,
            self.channels,
            if self.channels == 1 { "" } else { "s" }
        )
    }
}
