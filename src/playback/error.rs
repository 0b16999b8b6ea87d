//! Playback error types.

use thiserror::Error;

/// Errors that abandon a single playback attempt.
///
/// None of these stop the bell daemon; they are logged and the next bell is
/// played as usual.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// No output device could be opened.
    #[error("failed to open the playback device: {0}")]
    DeviceNotAvailable(String),

    /// The device cannot play the exact requested configuration.
    #[error("failed to configure the playback device: {0}")]
    Negotiation(String),

    /// The sample layout has no counterpart in the backend.
    #[error("unable to determine the PCM format for {0}")]
    UnsupportedFormat(String),

    /// Writing to the device failed.
    #[error("writing to the playback device failed: {0}")]
    Write(String),

    /// Recovering from an underrun or overrun failed.
    #[error("recovering the playback device failed: {0}")]
    Recovery(String),

    /// Seeking back to the PCM data failed.
    #[error("failed to seek to the PCM data of '{0}': {1}")]
    Seek(String, String),

    /// Reading PCM data from a file failed.
    #[error("an error occurred while reading from '{0}': {1}")]
    Read(String, String),
}

impl PlaybackError {
    /// Returns true if this error is related to the output device.
    #[must_use]
    pub fn is_device_error(&self) -> bool {
        matches!(
            self,
            Self::DeviceNotAvailable(_)
                | Self::Negotiation(_)
                | Self::UnsupportedFormat(_)
                | Self::Write(_)
                | Self::Recovery(_)
        )
    }

    /// Returns true if this error is related to the sound file.
    #[must_use]
    pub fn is_file_error(&self) -> bool {
        matches!(self, Self::Seek(..) | Self::Read(..))
    }
}

/// Outcome of a failed write to an open device.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WriteError {
    /// Buffer underrun or overrun; one recovery attempt is allowed.
    #[error("buffer underrun/overrun: {0}")]
    Xrun(String),

    /// The device cannot accept further data.
    #[error("{0}")]
    Fatal(String),
}

impl WriteError {
    /// Returns true if a recovery attempt may make the device usable again.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Xrun(_))
    }
}
