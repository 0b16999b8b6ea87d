//! Component integration tests.
//!
//! These tests combine the sound, playback and beep components through the
//! public API, with WAVE files on disk and the mock playback backend.

use std::fs::{self, File};
use std::path::PathBuf;

use belld::beep::{self, Beep, BeepError};
use belld::playback::{play_buffer, play_file, MockBackend, MockWrite, PlaybackError};
use belld::sound::{synth, wave, PcmBuffer, PcmFormat, SoundError};
use belld::types::{BeepKind, BellMode, ToneConfig};

// ============================================================================
// Test Helpers
// ============================================================================

/// Builds a WAVE image by hand.
///
/// `extra` chunks are placed between the format block and the data chunk.
fn wave_bytes(
    channels: u16,
    rate: u32,
    bits: u16,
    extra: &[(&[u8; 4], &[u8])],
    declared_len: u32,
    payload: &[u8],
) -> Vec<u8> {
    let block_align = channels * bits.div_ceil(8);
    let mut out = Vec::new();
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&36u32.to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&rate.to_le_bytes());
    out.extend_from_slice(&(rate * u32::from(block_align)).to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&bits.to_le_bytes());
    for (id, body) in extra {
        out.extend_from_slice(*id);
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend_from_slice(body);
    }
    out.extend_from_slice(b"data");
    out.extend_from_slice(&declared_len.to_le_bytes());
    out.extend_from_slice(payload);
    out
}

fn write_temp(bytes: &[u8]) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bell.wav");
    fs::write(&path, bytes).unwrap();
    (dir, path)
}

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 256) as u8).collect()
}

fn play_mode(mode: &BellMode, backend: &MockBackend) -> Result<(), BeepError> {
    let mut beep = Beep::prepare(mode)?;
    let result = beep.perform(backend);
    beep.free();
    result
}

// ============================================================================
// WAVE file → playback
// ============================================================================

#[test]
fn test_streamed_and_cached_files_play_identically() {
    let data = payload(10_000);
    let image = wave_bytes(2, 48_000, 16, &[(b"LIST", &b"INFOISFT"[..])], 10_000, &data);
    let (_dir, path) = write_temp(&image);

    let streamed = MockBackend::new();
    play_mode(
        &BellMode::WaveFile {
            path: path.clone(),
            cache: false,
        },
        &streamed,
    )
    .unwrap();

    let cached = MockBackend::new();
    play_mode(&BellMode::WaveFile { path, cache: true }, &cached).unwrap();

    assert_eq!(streamed.written(), data);
    assert_eq!(cached.written(), data);

    let format = PcmFormat::new(false, true, 48_000, 2, 16).unwrap();
    assert_eq!(streamed.negotiated(), vec![format]);
    assert_eq!(cached.negotiated(), vec![format]);
}

#[test]
fn test_truncated_file_plays_bytes_present() {
    // Declares 1000 bytes, holds 600.
    let data = payload(600);
    let (_dir, path) = write_temp(&wave_bytes(1, 44_100, 16, &[], 1000, &data));

    let buffer = wave::load_into_buffer(&path).unwrap();
    assert_eq!(buffer.len(), 600);

    let backend = MockBackend::new();
    play_buffer(&backend, &buffer).unwrap();
    assert_eq!(backend.written(), data);
}

#[test]
fn test_file_without_payload_is_rejected() {
    let (_dir, path) = write_temp(&wave_bytes(1, 44_100, 16, &[], 1000, &[]));

    let result = wave::load_into_buffer(&path);
    assert!(matches!(result, Err(SoundError::EmptyPayload(_))));
}

#[test]
fn test_24_bit_file_streams_whole_frames() {
    // 3-byte samples, stereo: 6-byte frames; a stray byte at the end.
    let mut data = payload(6 * 2000);
    data.push(0xAA);
    let image = wave_bytes(2, 44_100, 24, &[], data.len() as u32, &data);
    let (_dir, path) = write_temp(&image);

    let mut file = wave::prepare_file(&path).unwrap();
    assert_eq!(file.format().bytes_per_sample, 3);

    let backend = MockBackend::new();
    play_file(&backend, &mut file).unwrap();

    assert_eq!(backend.written(), &data[..6 * 2000]);
    assert!(backend.write_sizes().iter().all(|len| len % 6 == 0));
}

#[test]
fn test_streamed_file_survives_underrun() {
    let data = payload(20_000);
    let (_dir, path) = write_temp(&wave_bytes(1, 22_050, 8, &[], 20_000, &data));

    let backend = MockBackend::new();
    backend.push_script(MockWrite::Accept);
    backend.push_script(MockWrite::Xrun);

    play_mode(&BellMode::WaveFile { path, cache: false }, &backend).unwrap();

    assert_eq!(backend.recover_count(), 1);
    assert_eq!(backend.written(), data);
}

#[test]
fn test_rejected_format_is_reported() {
    let (_dir, path) = write_temp(&wave_bytes(1, 8000, 8, &[], 4, &[1, 2, 3, 4]));

    let backend = MockBackend::new();
    backend.set_fail_negotiate(true);

    let err = play_mode(&BellMode::WaveFile { path, cache: true }, &backend).unwrap_err();
    assert!(matches!(
        err,
        BeepError::Playback(PlaybackError::Negotiation(_))
    ));
    assert!(err.suggestion().is_some());
    assert!(backend.written().is_empty());
    assert_eq!(backend.close_count(), 1);
}

#[test]
fn test_non_pcm_file_fails_preparation() {
    let mut image = wave_bytes(1, 8000, 16, &[], 4, &[0; 4]);
    // IEEE float coding tag
    image[20..22].copy_from_slice(&3u16.to_le_bytes());
    let (_dir, path) = write_temp(&image);

    let err = Beep::prepare(&BellMode::WaveFile { path, cache: false }).unwrap_err();
    assert!(matches!(err, BeepError::Sound(SoundError::UnsupportedCodec(3))));
}

// ============================================================================
// Synthesis → WAVE → playback
// ============================================================================

#[test]
fn test_rendered_beep_plays_back_unchanged() {
    let tone = ToneConfig::default()
        .with_kind(BeepKind::Complex)
        .with_frequency(880)
        .with_duration_ms(50);
    let beep = synth::generate(&tone).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("beep.wav");
    let mut out = File::create(&path).unwrap();
    wave::write_wave(&mut out, &beep).unwrap();
    drop(out);

    let backend = MockBackend::new();
    play_mode(&BellMode::WaveFile { path, cache: false }, &backend).unwrap();

    if cfg!(target_endian = "little") {
        assert_eq!(backend.written(), beep.data());
    }
    assert_eq!(backend.written().len(), beep.len());
}

#[test]
fn test_generated_square_beep_plays_u8() {
    let backend = MockBackend::new();
    let mode = BellMode::Generated {
        tone: ToneConfig::default()
            .with_kind(BeepKind::Square)
            .with_volume(100)
            .with_duration_ms(20),
    };

    play_mode(&mode, &backend).unwrap();

    let negotiated = backend.negotiated();
    assert_eq!(negotiated[0].bits_per_sample, 8);
    assert!(!negotiated[0].signed);
    assert_eq!(backend.written().len(), synth::sample_count(20));
    assert!(backend.written().iter().all(|&s| s == 0 || s == 0xFF));
}

// ============================================================================
// Beep lifecycle
// ============================================================================

#[test]
fn test_command_beep_runs_each_time() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("rings.log");
    let mode = BellMode::Command {
        command: format!("echo ring >> '{}'", log.display()),
    };

    let mut beep = Beep::prepare(&mode).unwrap();
    let backend = MockBackend::new();
    beep.perform(&backend).unwrap();
    beep.perform(&backend).unwrap();
    beep::free(Some(beep));

    assert_eq!(fs::read_to_string(&log).unwrap(), "ring\nring\n");
    assert_eq!(backend.open_count(), 0);
}

#[test]
fn test_free_absent_beep_is_noop() {
    beep::free::<File>(None);
}

#[test]
fn test_buffer_constructor_rejects_partial_frames() {
    let result = PcmBuffer::new(vec![0; 5], PcmFormat::mono_s16(8000));
    assert!(matches!(result, Err(SoundError::MisalignedBuffer(..))));
}
