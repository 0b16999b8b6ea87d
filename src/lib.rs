//! belld library
//!
//! This library provides the core functionality of the bell daemon.
//! It includes:
//! - Beep synthesis and WAVE file loading (`sound`)
//! - PCM playback through a device backend (`playback`)
//! - The beep descriptor tying a sound or command to one `perform` call (`beep`)
//! - The throttled bell loop and its control socket (`daemon`)
//! - CLI command parsing and display utilities (`cli`)
//! - Type definitions for configuration and IPC (`types`)

pub mod beep;
pub mod cli;
pub mod daemon;
pub mod playback;
pub mod sound;
pub mod types;

// Re-export commonly used types for convenience
pub use types::{
    BeepKind, BellConfig, BellMode, IpcRequest, IpcResponse, ResponseData, ToneConfig,
};

// Re-export sound types
pub use sound::{PcmBuffer, PcmFile, PcmFormat, SoundError};

// Re-export playback types
pub use playback::{
    play_buffer, play_file, CpalBackend, DefaultBackend, MockBackend, MockWrite, PcmBackend,
    PcmDevice, PlaybackError, WriteError,
};

// Re-export beep types
pub use beep::{Beep, BeepError};

// Re-export daemon types
pub use daemon::{Bell, BellDaemon, BellSource, BellStats, Throttle};
