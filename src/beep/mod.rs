//! The beep: one playable unit built once from the configuration.
//!
//! A `Beep` is either a PCM buffer, an open WAVE file or a shell command.
//! It is prepared once at start-up, performed any number of times and
//! freed once at shutdown.

mod command;

use std::fs::File;
use std::io::{Read, Seek};

use thiserror::Error;
use tracing::debug;

use crate::playback::{self, PcmBackend, PlaybackError};
use crate::sound::{synth, wave, PcmBuffer, PcmFile, SoundError};
use crate::types::BellMode;

pub use command::run_shell;

/// Errors from preparing or performing a beep.
#[derive(Debug, Error)]
pub enum BeepError {
    /// Synthesis or WAVE loading failed.
    #[error(transparent)]
    Sound(#[from] SoundError),

    /// The device rejected or interrupted playback.
    #[error(transparent)]
    Playback(#[from] PlaybackError),

    /// The external command could not be launched.
    #[error("failed to run '{0}': {1}")]
    Command(String, String),

    /// The configuration cannot produce a beep.
    #[error("invalid bell configuration: {0}")]
    InvalidConfig(String),
}

impl BeepError {
    /// Returns a hint for fixing the error, if any.
    #[must_use]
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Sound(e) => Some(e.suggestion()),
            Self::Playback(PlaybackError::Negotiation(_) | PlaybackError::UnsupportedFormat(_)) => {
                Some("convert the file to a format the device supports, e.g. 16-bit PCM")
            }
            Self::Command(..) => Some("check that /bin/sh exists and is executable"),
            _ => None,
        }
    }
}

/// Something the bell can play.
#[derive(Debug)]
pub enum Beep<S = File> {
    /// PCM data held in memory.
    Buffer(PcmBuffer),
    /// A WAVE file streamed from its PCM start on every beep.
    File(PcmFile<S>),
    /// A command line run through `/bin/sh -c`.
    Command(String),
}

impl Beep<File> {
    /// Builds the beep described by `mode`.
    ///
    /// Nothing is kept if any step fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the mode is invalid, synthesis fails, or the
    /// WAVE file cannot be opened, parsed or loaded.
    pub fn prepare(mode: &BellMode) -> Result<Self, BeepError> {
        mode.validate().map_err(BeepError::InvalidConfig)?;

        let beep = match mode {
            BellMode::Generated { tone } => Beep::Buffer(synth::generate(tone)?),
            BellMode::WaveFile { path, cache: true } => Beep::Buffer(wave::load_into_buffer(path)?),
            BellMode::WaveFile { path, cache: false } => Beep::File(wave::prepare_file(path)?),
            BellMode::Command { command } => Beep::Command(command.clone()),
        };

        debug!("Prepared {} beep for {}", beep.kind(), mode.label());
        Ok(beep)
    }
}

impl<S: Read + Seek> Beep<S> {
    /// Plays the beep once, blocking until it is done.
    ///
    /// For a command, success only means the shell was launched.
    ///
    /// # Errors
    ///
    /// Returns an error if playback fails or the command cannot be launched.
    pub fn perform<B>(&mut self, backend: &B) -> Result<(), BeepError>
    where
        B: PcmBackend + ?Sized,
    {
        match self {
            Beep::Buffer(buffer) => playback::play_buffer(backend, buffer)?,
            Beep::File(file) => playback::play_file(backend, file)?,
            Beep::Command(command) => run_shell(command)?,
        }
        Ok(())
    }
}

impl<S> Beep<S> {
    /// Name of the active variant.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Beep::Buffer(_) => "buffer",
            Beep::File(_) => "file",
            Beep::Command(_) => "command",
        }
    }

    /// Releases the beep's buffer, file or command line.
    pub fn free(self) {
        match self {
            Beep::Buffer(buffer) => {
                debug!("Releasing {} byte beep buffer", buffer.len());
                drop(buffer);
            }
            Beep::File(file) => {
                debug!("Closing '{}'", file.name());
                drop(file);
            }
            Beep::Command(command) => {
                debug!("Releasing bell command `{}`", command);
                drop(command);
            }
        }
    }
}

/// Releases a beep if there is one.
pub fn free<S>(beep: Option<Beep<S>>) {
    if let Some(beep) = beep {
        beep.free();
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::playback::MockBackend;
    use crate::sound::PcmFormat;
    use crate::types::{BeepKind, ToneConfig};

    fn temp_wave(payload: &[u8]) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bell.wav");
        let buffer = PcmBuffer::new(payload.to_vec(), PcmFormat::mono_s16(22_050)).unwrap();
        let mut file = File::create(&path).unwrap();
        wave::write_wave(&mut file, &buffer).unwrap();
        (dir, path)
    }

    mod prepare_tests {
        use super::*;

        #[test]
        fn test_generated_mode_builds_buffer() {
            let mode = BellMode::Generated {
                tone: ToneConfig::default().with_kind(BeepKind::Square),
            };
            let beep = Beep::prepare(&mode).unwrap();
            assert_eq!(beep.kind(), "buffer");
        }

        #[test]
        fn test_cached_wave_builds_buffer() {
            let (_dir, path) = temp_wave(&[3, 3, 4, 4]);
            let beep = Beep::prepare(&BellMode::WaveFile { path, cache: true }).unwrap();
            match beep {
                Beep::Buffer(buffer) => assert_eq!(buffer.data(), &[3, 3, 4, 4]),
                other => panic!("unexpected beep: {:?}", other),
            }
        }

        #[test]
        fn test_streamed_wave_builds_file() {
            let (_dir, path) = temp_wave(&[1, 2, 3, 4]);
            let beep = Beep::prepare(&BellMode::WaveFile { path, cache: false }).unwrap();
            assert_eq!(beep.kind(), "file");
        }

        #[test]
        fn test_command_mode() {
            let beep = Beep::prepare(&BellMode::Command {
                command: "true".to_string(),
            })
            .unwrap();
            assert!(matches!(beep, Beep::Command(ref c) if c == "true"));
        }

        #[test]
        fn test_missing_file_fails() {
            let mode = BellMode::WaveFile {
                path: PathBuf::from("/nonexistent/bell.wav"),
                cache: false,
            };
            assert!(matches!(
                Beep::prepare(&mode),
                Err(BeepError::Sound(SoundError::Open(..)))
            ));
        }

        #[test]
        fn test_invalid_config_fails() {
            let mode = BellMode::Command {
                command: "  ".to_string(),
            };
            assert!(matches!(
                Beep::prepare(&mode),
                Err(BeepError::InvalidConfig(_))
            ));
        }
    }

    mod perform_tests {
        use super::*;

        #[test]
        fn test_buffer_is_played() {
            let buffer = PcmBuffer::new(vec![7; 64], PcmFormat::mono_u8(8000)).unwrap();
            let mut beep: Beep = Beep::Buffer(buffer);
            let backend = MockBackend::new();

            beep.perform(&backend).unwrap();
            beep.perform(&backend).unwrap();

            assert_eq!(backend.written(), vec![7; 128]);
            assert_eq!(backend.close_count(), 2);
        }

        #[test]
        fn test_file_is_replayed_from_start() {
            let source = PcmBuffer::new(vec![5; 16], PcmFormat::mono_s16(8000)).unwrap();
            let mut image = Vec::new();
            wave::write_wave(&mut image, &source).unwrap();
            let file = wave::prepare_stream(Cursor::new(image), "mem.wav").unwrap();
            let mut beep = Beep::File(file);
            let backend = MockBackend::new();

            beep.perform(&backend).unwrap();
            beep.perform(&backend).unwrap();

            assert_eq!(backend.written(), vec![5; 32]);
        }

        #[test]
        fn test_playback_failure_is_reported() {
            let buffer = PcmBuffer::new(vec![0; 8], PcmFormat::mono_u8(8000)).unwrap();
            let mut beep: Beep = Beep::Buffer(buffer);
            let backend = MockBackend::new();
            backend.set_fail_open(true);

            let err = beep.perform(&backend).unwrap_err();
            assert!(matches!(err, BeepError::Playback(_)));
        }

        #[test]
        fn test_command_exit_status_is_ignored() {
            let mut beep: Beep = Beep::Command("exit 3".to_string());
            let backend = MockBackend::new();

            assert!(beep.perform(&backend).is_ok());
            assert_eq!(backend.open_count(), 0);
        }
    }

    mod free_tests {
        use super::*;

        #[test]
        fn test_free_none_is_noop() {
            free::<File>(None);
        }

        #[test]
        fn test_free_some() {
            let beep: Beep = Beep::Command("true".to_string());
            free(Some(beep));
        }

        /// A stream that counts how often it is dropped.
        struct TrackedStream {
            inner: Cursor<Vec<u8>>,
            drops: Arc<AtomicUsize>,
        }

        impl Read for TrackedStream {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                self.inner.read(buf)
            }
        }

        impl Seek for TrackedStream {
            fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
                self.inner.seek(pos)
            }
        }

        impl Drop for TrackedStream {
            fn drop(&mut self) {
                self.drops.fetch_add(1, Ordering::SeqCst);
            }
        }

        #[test]
        fn test_free_file_closes_stream_once() {
            let source = PcmBuffer::new(vec![1; 8], PcmFormat::mono_s16(8000)).unwrap();
            let mut image = Vec::new();
            wave::write_wave(&mut image, &source).unwrap();

            let drops = Arc::new(AtomicUsize::new(0));
            let stream = TrackedStream {
                inner: Cursor::new(image),
                drops: Arc::clone(&drops),
            };
            let mut beep = Beep::File(wave::prepare_stream(stream, "tracked.wav").unwrap());
            beep.perform(&MockBackend::new()).unwrap();
            assert_eq!(drops.load(Ordering::SeqCst), 0);

            free(Some(beep));
            assert_eq!(drops.load(Ordering::SeqCst), 1);
        }

        #[test]
        fn test_free_releases_file_and_buffer_beeps() {
            let (dir, path) = temp_wave(&[9, 9, 8, 8]);

            let streamed = Beep::prepare(&BellMode::WaveFile {
                path: path.clone(),
                cache: false,
            })
            .unwrap();
            let cached = Beep::prepare(&BellMode::WaveFile {
                path: path.clone(),
                cache: true,
            })
            .unwrap();
            assert_eq!(streamed.kind(), "file");
            assert_eq!(cached.kind(), "buffer");

            streamed.free();
            free(Some(cached));

            // Nothing holds on to the old file.
            std::fs::remove_file(&path).unwrap();
            let (_other, replacement) = temp_wave(&[1, 1, 2, 2]);
            std::fs::rename(&replacement, &path).unwrap();

            let beep = Beep::prepare(&BellMode::WaveFile { path, cache: true }).unwrap();
            match beep {
                Beep::Buffer(ref buffer) => assert_eq!(buffer.data(), &[1, 1, 2, 2]),
                ref other => panic!("unexpected beep: {:?}", other),
            }
            beep.free();
            drop(dir);
        }
    }

    #[test]
    fn test_suggestion() {
        let err = BeepError::Sound(SoundError::UnsupportedCodec(3));
        assert!(err.suggestion().is_some());

        let err = BeepError::InvalidConfig("x".to_string());
        assert!(err.suggestion().is_none());
    }
}
