//! PCM data for the bell daemon.
//!
//! This module produces everything a beep can play:
//!
//! - Synthesized sine, square and complex tones
//! - WAVE files loaded into memory up front
//! - WAVE files kept open and streamed on every beep
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │   synth          │──▶ PcmBuffer (44.1 kHz mono)
//! └──────────────────┘
//! ┌──────────────────┐     ┌──────────────────┐
//! │   wave           │────▶│ PcmBuffer        │  load_into_buffer
//! │  (RIFF parser)   │     ├──────────────────┤
//! │                  │────▶│ PcmFile          │  prepare_file
//! └──────────────────┘     └──────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use belld::sound::{synth, wave};
//! use belld::types::ToneConfig;
//!
//! let beep = synth::generate(&ToneConfig::default()).expect("synthesis");
//! let mut out = std::fs::File::create("beep.wav").expect("create");
//! wave::write_wave(&mut out, &beep).expect("write");
//!
//! let cached = wave::load_into_buffer("beep.wav".as_ref()).expect("load");
//! assert_eq!(cached.data(), beep.data());
//! ```

mod error;
mod format;
mod pcm;
pub mod synth;
pub mod wave;

pub use error::SoundError;
pub use format::PcmFormat;
pub use pcm::{PcmBuffer, PcmFile};
