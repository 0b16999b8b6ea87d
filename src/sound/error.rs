//! Sound system error types.
//!
//! This module defines the errors raised while synthesizing beeps and while
//! parsing or loading WAVE containers. Every variant carries enough context
//! to be logged as-is; none of them is fatal to the bell daemon once it runs.

use thiserror::Error;

/// Errors that can occur while producing PCM data.
#[derive(Debug, Error)]
pub enum SoundError {
    /// Memory for PCM data could not be reserved.
    #[error("allocating {0} bytes for PCM data failed")]
    Allocation(usize),

    /// The sound file could not be opened.
    #[error("failed to open '{0}' for reading: {1}")]
    Open(String, String),

    /// Reading from the sound file failed with an I/O error.
    #[error("reading from '{0}' failed: {1}")]
    Read(String, String),

    /// The file ended (or failed) while a header field was being read.
    #[error("failed to read {0} of the WAVE header: {1}")]
    TruncatedHeader(&'static str, String),

    /// The container does not start with the RIFF magic.
    #[error("not a RIFF file (magic {0:?})")]
    BadMagic([u8; 4]),

    /// The RIFF container is not of type WAVE.
    #[error("not a WAVE file (type {0:?})")]
    BadType([u8; 4]),

    /// The block following the header is not the format block.
    #[error("expected the 'fmt ' chunk, found {0:?}")]
    UnexpectedChunk([u8; 4]),

    /// The format block does not have the plain PCM length of 16 bytes.
    #[error("unsupported WAVE format block length {0} (expected 16)")]
    FormatChunkLength(u32),

    /// The audio coding is not linear PCM.
    #[error("unsupported WAVE coding {0:#06x} (only linear PCM is supported)")]
    UnsupportedCodec(u16),

    /// The channel count is zero.
    #[error("cannot play a file with {0} channels")]
    InvalidChannels(u16),

    /// The sample width is not one of 8, 16, 24 or 32 bits.
    #[error("unsupported sample width of {0} bits")]
    UnsupportedBitDepth(u16),

    /// The sample rate is zero.
    #[error("invalid sample rate {0}")]
    InvalidSampleRate(u32),

    /// The file holds no PCM data at all.
    #[error("'{0}' does not contain any sound data")]
    EmptyPayload(String),

    /// The PCM data length is not a whole number of frames.
    #[error("PCM data of {0} bytes is not a multiple of the {1}-byte frame size")]
    MisalignedBuffer(usize, usize),

    /// Writing a WAVE container failed.
    #[error("writing the WAVE data failed: {0}")]
    Write(String),
}

impl SoundError {
    /// Returns true if the container itself is malformed or unsupported.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::BadMagic(_)
                | Self::BadType(_)
                | Self::UnexpectedChunk(_)
                | Self::FormatChunkLength(_)
                | Self::UnsupportedCodec(_)
                | Self::InvalidChannels(_)
                | Self::UnsupportedBitDepth(_)
                | Self::InvalidSampleRate(_)
        )
    }

    /// Returns true if this error came from the operating system.
    #[must_use]
    pub fn is_io_error(&self) -> bool {
        matches!(
            self,
            Self::Open(..) | Self::Read(..) | Self::TruncatedHeader(..) | Self::Write(_)
        )
    }

    /// Returns a hint for the operator on how to resolve this error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::Allocation(_) => "use a shorter beep or cache less audio in memory",
            Self::Open(..) | Self::Read(..) => "check that the file exists and is readable",
            Self::FormatChunkLength(_) | Self::UnsupportedCodec(_) | Self::UnsupportedBitDepth(_) => {
                "re-encode the file with: ffmpeg -i <file> -vn -acodec pcm_s16le out.wav"
            }
            Self::TruncatedHeader(..)
            | Self::BadMagic(_)
            | Self::BadType(_)
            | Self::UnexpectedChunk(_)
            | Self::InvalidChannels(_)
            | Self::InvalidSampleRate(_)
            | Self::EmptyPayload(_) => "the file is not a usable RIFF WAVE file",
            Self::MisalignedBuffer(..) => "this is a bug in the PCM producer",
            Self::Write(_) => "check free space and permissions of the output path",
        }
    }
}
