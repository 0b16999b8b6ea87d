//! Core data types for the bell daemon.
//!
//! This module defines the data structures used for:
//! - Beep configuration with validation
//! - IPC request/response serialization

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

// ============================================================================
// BeepKind
// ============================================================================

/// Waveform used for generated beeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BeepKind {
    /// Pure sine tone
    #[default]
    Sine,
    /// Unsigned 8-bit square wave
    Square,
    /// Sine with a few odd harmonics mixed in
    Complex,
}

impl BeepKind {
    /// Returns the string representation of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            BeepKind::Sine => "sine",
            BeepKind::Square => "square",
            BeepKind::Complex => "complex",
        }
    }
}

// ============================================================================
// ToneConfig
// ============================================================================

/// Parameters of a generated beep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToneConfig {
    /// Waveform
    pub kind: BeepKind,
    /// Volume in percent (0-100)
    pub volume: u8,
    /// Frequency in Hz (> 0)
    pub frequency: u32,
    /// Duration in milliseconds
    pub duration_ms: u32,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            kind: BeepKind::Sine,
            volume: 50,
            frequency: 400,
            duration_ms: 100,
        }
    }
}

impl ToneConfig {
    /// Returns the configuration with the given waveform.
    pub fn with_kind(mut self, kind: BeepKind) -> Self {
        self.kind = kind;
        self
    }

    /// Returns the configuration with the given volume.
    pub fn with_volume(mut self, volume: u8) -> Self {
        self.volume = volume;
        self
    }

    /// Returns the configuration with the given frequency.
    pub fn with_frequency(mut self, frequency: u32) -> Self {
        self.frequency = frequency;
        self
    }

    /// Returns the configuration with the given duration.
    pub fn with_duration_ms(mut self, duration_ms: u32) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Validates the configuration.
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.volume > 100 {
            return Err("volume must be between 0 and 100".to_string());
        }
        if self.frequency == 0 {
            return Err("frequency must be greater than 0 Hz".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// BellMode / BellConfig
// ============================================================================

/// What happens when the bell rings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BellMode {
    /// Play a synthesized tone
    Generated {
        /// Tone parameters
        tone: ToneConfig,
    },
    /// Play a WAVE file
    WaveFile {
        /// Path of the file
        path: PathBuf,
        /// Load the whole file into memory up front
        cache: bool,
    },
    /// Run a shell command
    Command {
        /// Command line passed to `/bin/sh -c`
        command: String,
    },
}

impl Default for BellMode {
    fn default() -> Self {
        BellMode::Generated {
            tone: ToneConfig::default(),
        }
    }
}

impl BellMode {
    /// Returns a short label describing the mode.
    pub fn label(&self) -> String {
        match self {
            BellMode::Generated { tone } => format!(
                "{} beep, {} Hz, {} ms, {}%",
                tone.kind.as_str(),
                tone.frequency,
                tone.duration_ms,
                tone.volume
            ),
            BellMode::WaveFile { path, cache } => format!(
                "wave file {}{}",
                path.display(),
                if *cache { " (cached)" } else { "" }
            ),
            BellMode::Command { command } => format!("command `{}`", command),
        }
    }

    /// Validates the mode.
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            BellMode::Generated { tone } => tone.validate(),
            BellMode::WaveFile { path, .. } => {
                if path.as_os_str().is_empty() {
                    return Err("no wave file specified".to_string());
                }
                Ok(())
            }
            BellMode::Command { command } => {
                if command.trim().is_empty() {
                    return Err("no external bell command specified".to_string());
                }
                Ok(())
            }
        }
    }
}

/// Complete configuration of the bell daemon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BellConfig {
    /// What a beep does
    pub mode: BellMode,
    /// Minimum interval between beeps in milliseconds (0 disables throttling)
    pub throttle_ms: u64,
    /// Perform one beep at start-up
    pub test_bell: bool,
}

impl BellConfig {
    /// Creates a configuration for the given mode.
    pub fn new(mode: BellMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Returns the configuration with the given throttle interval.
    pub fn with_throttle_ms(mut self, throttle_ms: u64) -> Self {
        self.throttle_ms = throttle_ms;
        self
    }

    /// Validates the configuration.
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        self.mode.validate()
    }
}

// ============================================================================
// IPC Types
// ============================================================================

/// IPC request from client to daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum IpcRequest {
    /// Ring the bell once
    Ring,
    /// Query the daemon counters
    Status,
}

/// Response data for IPC responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseData {
    /// Description of the configured beep
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Throttle interval in milliseconds
    #[serde(rename = "throttleMs", skip_serializing_if = "Option::is_none")]
    pub throttle_ms: Option<u64>,
    /// Bell notifications received
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rings: Option<u64>,
    /// Beeps performed successfully
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beeps: Option<u64>,
    /// Beeps that failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failures: Option<u64>,
    /// The ring was merged into one that was already pending
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coalesced: Option<bool>,
}

/// IPC response from daemon to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpcResponse {
    /// Response status ("success" or "error")
    pub status: String,
    /// Human-readable message
    pub message: String,
    /// Optional response data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

impl IpcResponse {
    /// Creates a success response.
    pub fn success(message: impl Into<String>, data: Option<ResponseData>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data,
        }
    }

    /// Creates an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            data: None,
        }
    }

    /// Returns true if this is a success response.
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

// ============================================================================
// Tests
// ============================================================================
