//! Command definitions for the belld CLI.
//!
//! Uses clap derive macro for argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::types::{BeepKind, BellConfig, BellMode, ToneConfig};

// ============================================================================
// CLI Structure
// ============================================================================

/// belld - plays a beep whenever the bell rings
#[derive(Parser, Debug)]
#[command(
    name = "belld",
    version,
    about = "Bell daemon: plays a tone, a WAVE file or a command when the bell rings",
    long_about = "Plays a synthesized tone, a WAVE file or runs a command whenever the bell rings.\n\
                  Bells are delivered with `belld ring` or by sending SIGUSR1 to the daemon.",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output for debugging
    #[arg(long, global = true)]
    pub verbose: bool,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the bell daemon in the foreground
    Daemon(DaemonArgs),

    /// Ring the bell of a running daemon
    Ring {
        /// Control socket of the daemon
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Show the status of a running daemon
    Status {
        /// Control socket of the daemon
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Play the beep once and exit
    Play(BeepArgs),

    /// Write a synthesized beep to a WAVE file
    Render(RenderArgs),

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ============================================================================
// Beep Arguments
// ============================================================================

/// Waveform and tone parameters
#[derive(Args, Debug, Clone)]
pub struct ToneArgs {
    /// Use a sine beep (default)
    #[arg(short = 'i', long, group = "waveform")]
    pub sine: bool,

    /// Use a square beep
    #[arg(short = 'q', long, group = "waveform")]
    pub square: bool,

    /// Use a sine beep with odd harmonics
    #[arg(long, group = "waveform")]
    pub complex: bool,

    /// Beep duration in milliseconds
    #[arg(
        short,
        long,
        value_name = "MS",
        default_value = "100",
        value_parser = clap::value_parser!(u32).range(0..)
    )]
    pub duration: u32,

    /// Beep frequency in Hz (above 0)
    #[arg(
        short = 'F',
        long,
        value_name = "HZ",
        default_value = "400",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub frequency: u32,

    /// Beep volume in percent (0-100)
    #[arg(
        short = 'v',
        long,
        default_value = "50",
        value_parser = clap::value_parser!(u8).range(0..=100)
    )]
    pub volume: u8,
}

impl Default for ToneArgs {
    fn default() -> Self {
        Self {
            sine: false,
            square: false,
            complex: false,
            duration: 100,
            frequency: 400,
            volume: 50,
        }
    }
}

impl ToneArgs {
    /// The selected waveform.
    pub fn kind(&self) -> BeepKind {
        if self.square {
            BeepKind::Square
        } else if self.complex {
            BeepKind::Complex
        } else {
            BeepKind::Sine
        }
    }

    /// Converts the arguments into tone parameters.
    pub fn to_tone(&self) -> ToneConfig {
        ToneConfig::default()
            .with_kind(self.kind())
            .with_volume(self.volume)
            .with_frequency(self.frequency)
            .with_duration_ms(self.duration)
    }
}

/// What to play when the bell rings
#[derive(Args, Debug, Clone, Default)]
pub struct BeepArgs {
    #[command(flatten)]
    pub tone: ToneArgs,

    /// Play a WAVE file instead of a synthesized tone
    #[arg(
        short = 'f',
        long,
        value_name = "FILE",
        conflicts_with_all = ["waveform", "command"]
    )]
    pub wave_file: Option<PathBuf>,

    /// Load the WAVE file into memory once instead of streaming it
    #[arg(short, long, requires = "wave_file")]
    pub cache: bool,

    /// Run a shell command instead of playing a sound
    #[arg(short = 'e', long, value_name = "COMMAND", conflicts_with = "waveform")]
    pub command: Option<String>,
}

impl BeepArgs {
    /// Converts the arguments into a bell mode.
    pub fn to_mode(&self) -> BellMode {
        if let Some(command) = &self.command {
            return BellMode::Command {
                command: command.clone(),
            };
        }
        if let Some(path) = &self.wave_file {
            return BellMode::WaveFile {
                path: path.clone(),
                cache: self.cache,
            };
        }
        BellMode::Generated {
            tone: self.tone.to_tone(),
        }
    }
}

// ============================================================================
// Daemon / Render Arguments
// ============================================================================

/// Arguments for the daemon command
#[derive(Args, Debug, Clone, Default)]
pub struct DaemonArgs {
    #[command(flatten)]
    pub beep: BeepArgs,

    /// Minimum milliseconds between beeps (0 disables throttling)
    #[arg(short, long, value_name = "MS", default_value = "0")]
    pub throttle: u64,

    /// Beep once at start-up
    #[arg(short = 'T', long)]
    pub test_bell: bool,

    /// Control socket path
    #[arg(long, value_name = "PATH")]
    pub socket: Option<PathBuf>,
}

impl DaemonArgs {
    /// Converts the arguments into a daemon configuration.
    pub fn to_config(&self) -> BellConfig {
        BellConfig {
            mode: self.beep.to_mode(),
            throttle_ms: self.throttle,
            test_bell: self.test_bell,
        }
    }
}

/// Arguments for the render command
#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub tone: ToneArgs,

    /// Output WAVE file
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,
}

// ============================================================================
// Tests
// ============================================================================
