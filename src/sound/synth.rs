//! Beep waveform synthesis.
//!
//! All generated beeps are mono at 44.1 kHz. Sine and complex beeps are
//! signed 16-bit in host byte order, square beeps are unsigned 8-bit.

use std::f64::consts::PI;

use tracing::debug;

use crate::types::{BeepKind, ToneConfig};

use super::error::SoundError;
use super::format::PcmFormat;
use super::pcm::{alloc_bytes, PcmBuffer};

/// Sample rate of every generated beep.
pub const SAMPLE_RATE: u32 = 44_100;

/// Weights of the odd harmonics 3, 5, 7 and 9 in the complex beep.
///
/// These are `1 / (n * sqrt(n))`, picked by ear for a mellow tone that is
/// neither as piercing as a sine nor as harsh as a square wave.
const COMPLEX_HARMONICS: [(f64, f64); 4] = [
    (3.0, 0.192450089729875254836382926833),
    (5.0, 0.089442719099991587856366946749),
    (7.0, 0.053994924715603889602073790890),
    (9.0, 0.037037037037037037037037037037),
];

/// Generates a beep of the configured kind.
///
/// # Errors
///
/// Returns `SoundError::Allocation` if the sample buffer cannot be reserved.
pub fn generate(tone: &ToneConfig) -> Result<PcmBuffer, SoundError> {
    let buffer = match tone.kind {
        BeepKind::Sine => sine(tone.volume, tone.frequency, tone.duration_ms),
        BeepKind::Square => square(tone.volume, tone.frequency, tone.duration_ms),
        BeepKind::Complex => complex(tone.volume, tone.frequency, tone.duration_ms),
    }?;

    debug!(
        "Generated {} beep: {} frames, {}",
        tone.kind.as_str(),
        buffer.frames(),
        buffer.format()
    );
    Ok(buffer)
}

/// Generates a sine beep.
///
/// # Errors
///
/// Returns `SoundError::Allocation` if the sample buffer cannot be reserved.
pub fn sine(volume: u8, frequency: u32, duration_ms: u32) -> Result<PcmBuffer, SoundError> {
    periodic_s16(volume, frequency, duration_ms, f64::sin)
}

/// Generates a complex (sine plus odd harmonics) beep.
///
/// # Errors
///
/// Returns `SoundError::Allocation` if the sample buffer cannot be reserved.
pub fn complex(volume: u8, frequency: u32, duration_ms: u32) -> Result<PcmBuffer, SoundError> {
    periodic_s16(volume, frequency, duration_ms, complex_wave)
}

/// Generates an unsigned 8-bit square beep.
///
/// The level starts high and toggles every `half_period` samples.
///
/// # Errors
///
/// Returns `SoundError::Allocation` if the sample buffer cannot be reserved.
pub fn square(volume: u8, frequency: u32, duration_ms: u32) -> Result<PcmBuffer, SoundError> {
    let count = sample_count(duration_ms);
    let half_period = (period_length(frequency) / 2).max(1);
    let scale = volume_scale(volume);
    let high = (f64::from(u8::MAX) * scale).round() as u8;

    let mut data = alloc_bytes(count)?;
    for (i, sample) in data.iter_mut().enumerate() {
        *sample = if (i / half_period) % 2 == 0 { high } else { 0 };
    }

    PcmBuffer::new(data, PcmFormat::mono_u8(SAMPLE_RATE))
}

/// The complex beep waveform for phase `theta`.
#[must_use]
pub fn complex_wave(theta: f64) -> f64 {
    COMPLEX_HARMONICS
        .iter()
        .fold(theta.sin(), |acc, (n, weight)| acc + (n * theta).sin() * weight)
}

/// Number of samples in a beep of `duration_ms`.
#[must_use]
pub fn sample_count(duration_ms: u32) -> usize {
    (u64::from(SAMPLE_RATE) * u64::from(duration_ms) / 1000) as usize
}

/// Samples per waveform period, never less than one.
#[must_use]
pub fn period_length(frequency: u32) -> usize {
    (SAMPLE_RATE / frequency.max(1)).max(1) as usize
}

fn volume_scale(volume: u8) -> f64 {
    f64::from(volume.min(100)) / 100.0
}

fn periodic_s16(
    volume: u8,
    frequency: u32,
    duration_ms: u32,
    wave: fn(f64) -> f64,
) -> Result<PcmBuffer, SoundError> {
    let count = sample_count(duration_ms);
    let period = period_length(frequency);
    let scale = volume_scale(volume);

    let mut data = alloc_bytes(count * 2)?;
    for (i, sample) in data.chunks_exact_mut(2).enumerate() {
        let theta = 2.0 * PI * (i % period) as f64 / period as f64;
        let value = (f64::from(i16::MAX) * wave(theta) * scale).round() as i16;
        sample.copy_from_slice(&value.to_ne_bytes());
    }

    PcmBuffer::new(data, PcmFormat::mono_s16(SAMPLE_RATE))
}
