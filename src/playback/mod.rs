//! PCM playback for the bell daemon.
//!
//! Playback is split in two layers:
//!
//! - A device contract (`PcmBackend` / `PcmDevice`) mirroring what a sound
//!   API offers: open the default output, configure it, write frames,
//!   recover from an underrun, drain, close.
//! - `play_buffer` / `play_file`, which drive any device through that
//!   contract: exact format negotiation, fixed-size windows, one recovery
//!   attempt per failed window, and a guaranteed close on every path.
//!
//! Exactly one real backend is compiled in (`DefaultBackend`). Tests use
//! `MockBackend`.

mod cpal_backend;
mod error;
pub mod mock;

use std::io::{Read, Seek};

use tracing::{debug, warn};

use crate::sound::{PcmBuffer, PcmFile, PcmFormat};

pub use cpal_backend::{CpalBackend, CpalDevice};
pub use error::{PlaybackError, WriteError};
pub use mock::{MockBackend, MockWrite};

/// The backend used by the daemon.
pub type DefaultBackend = CpalBackend;

/// Preferred size of one write to the device, in bytes.
pub const WINDOW_BYTES: usize = 8192;

/// A sound API able to open its default output device.
pub trait PcmBackend {
    /// An open output device.
    type Device: PcmDevice;

    /// Short backend name for diagnostics.
    fn name(&self) -> &'static str;

    /// Opens the default output device.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::DeviceNotAvailable` if no device can be opened.
    fn open_default_output(&self) -> Result<Self::Device, PlaybackError>;
}

/// An open output device.
pub trait PcmDevice {
    /// Configures the device for exactly this format.
    ///
    /// No resampling, bit-depth conversion or channel remixing is allowed.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot honor the format exactly.
    fn negotiate(&mut self, format: &PcmFormat) -> Result<(), PlaybackError>;

    /// Writes whole frames from `bytes` and returns how many were accepted.
    ///
    /// # Errors
    ///
    /// Returns `WriteError::Xrun` for an underrun/overrun and
    /// `WriteError::Fatal` if the device cannot continue.
    fn write(&mut self, bytes: &[u8]) -> Result<usize, WriteError>;

    /// Makes the device usable again after an underrun/overrun.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::Recovery` if the device stays unusable.
    fn recover(&mut self) -> Result<(), PlaybackError>;

    /// Blocks until everything written has been played.
    fn drain(&mut self);

    /// Releases the device.
    fn close(self);
}

/// Plays an in-memory buffer on the backend's default device.
///
/// # Errors
///
/// Returns an error if the device cannot be opened or configured, or a
/// write fails and cannot be recovered.
pub fn play_buffer<B>(backend: &B, buffer: &PcmBuffer) -> Result<(), PlaybackError>
where
    B: PcmBackend + ?Sized,
{
    let format = buffer.format();
    debug!(
        "Playing {} bytes ({}) on {}",
        buffer.len(),
        format,
        backend.name()
    );

    let mut device = backend.open_default_output()?;
    let result = device
        .negotiate(format)
        .and_then(|()| stream_buffer(&mut device, buffer));
    finish(device, result)
}

/// Plays a prepared file on the backend's default device.
///
/// The file is re-read from its PCM start on every call, until end of stream.
///
/// # Errors
///
/// Returns an error if seeking or reading the file fails, the device cannot
/// be opened or configured, or a write fails and cannot be recovered.
pub fn play_file<B, S>(backend: &B, file: &mut PcmFile<S>) -> Result<(), PlaybackError>
where
    B: PcmBackend + ?Sized,
    S: Read + Seek,
{
    debug!("Playing '{}' ({}) on {}", file.name(), file.format(), backend.name());

    file.rewind()
        .map_err(|e| PlaybackError::Seek(file.name().to_string(), e.to_string()))?;

    let mut device = backend.open_default_output()?;
    let format = *file.format();
    let result = device
        .negotiate(&format)
        .and_then(|()| stream_file(&mut device, file));
    finish(device, result)
}

/// Drains on success, then closes the device whatever the outcome.
fn finish<D: PcmDevice>(mut device: D, result: Result<(), PlaybackError>) -> Result<(), PlaybackError> {
    if result.is_ok() {
        device.drain();
    }
    device.close();
    result
}

/// Largest frame-aligned window not above `WINDOW_BYTES` (at least one frame).
fn window_size(frame_size: usize) -> usize {
    (WINDOW_BYTES / frame_size).max(1) * frame_size
}

fn stream_buffer<D: PcmDevice>(device: &mut D, buffer: &PcmBuffer) -> Result<(), PlaybackError> {
    let frame_size = buffer.format().frame_size();
    let window = window_size(frame_size);
    let data = buffer.data();

    let mut offset = 0;
    while offset < data.len() {
        let end = data.len().min(offset + window);
        offset += write_window(device, &data[offset..end], frame_size)?;
    }
    Ok(())
}

fn stream_file<D, S>(device: &mut D, file: &mut PcmFile<S>) -> Result<(), PlaybackError>
where
    D: PcmDevice,
    S: Read + Seek,
{
    let frame_size = file.format().frame_size();
    let mut window = vec![0u8; window_size(frame_size)];
    // Bytes at the front of `window` not yet accepted by the device.
    let mut pending = 0;

    loop {
        let read = file
            .read_window(&mut window[pending..])
            .map_err(|e| PlaybackError::Read(file.name().to_string(), e.to_string()))?;
        let at_end = read == 0;
        pending += read;

        let whole = pending - pending % frame_size;
        if whole > 0 {
            let consumed = write_window(device, &window[..whole], frame_size)?;
            window.copy_within(consumed..pending, 0);
            pending -= consumed;
        }

        if at_end && pending < frame_size {
            if pending > 0 {
                debug!("Dropping {} trailing bytes of '{}'", pending, file.name());
            }
            return Ok(());
        }
    }
}

/// Writes one window and returns the number of bytes the device consumed.
///
/// An underrun/overrun gets exactly one recovery attempt and one retry.
fn write_window<D: PcmDevice>(
    device: &mut D,
    window: &[u8],
    frame_size: usize,
) -> Result<usize, PlaybackError> {
    let requested = window.len() / frame_size;

    let written = match device.write(window) {
        Ok(frames) => frames,
        Err(err) if err.is_recoverable() => {
            debug!("Recovering from {}", err);
            device.recover()?;
            device
                .write(window)
                .map_err(|e| PlaybackError::Write(e.to_string()))?
        }
        Err(err) => return Err(PlaybackError::Write(err.to_string())),
    };

    if written == 0 {
        return Err(PlaybackError::Write(
            "the device accepted no frames".to_string(),
        ));
    }
    if written < requested {
        warn!(
            "Wrote only {} frames instead of the expected {} to the playback device",
            written, requested
        );
    }

    Ok(written.min(requested) * frame_size)
}

// ============================================================================
// Tests
// ============================================================================
