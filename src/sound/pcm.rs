//! Playable PCM data: in-memory buffers and re-seekable files.

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::time::Duration;

use super::error::SoundError;
use super::format::PcmFormat;

/// An empty vector with room for exactly `len` bytes.
///
/// Nothing is written, so untouched capacity is never committed.
pub(crate) fn reserve_bytes(len: usize) -> Result<Vec<u8>, SoundError> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| SoundError::Allocation(len))?;
    Ok(data)
}

/// Reserves exactly `len` zeroed bytes, reporting allocation failure.
pub(crate) fn alloc_bytes(len: usize) -> Result<Vec<u8>, SoundError> {
    let mut data = reserve_bytes(len)?;
    data.resize(len, 0);
    Ok(data)
}

/// PCM samples held entirely in memory.
///
/// The data length is always a whole number of frames.
#[derive(Clone, PartialEq, Eq)]
pub struct PcmBuffer {
    data: Vec<u8>,
    format: PcmFormat,
}

impl PcmBuffer {
    /// Wraps raw interleaved sample bytes.
    ///
    /// # Errors
    ///
    /// Returns `SoundError::MisalignedBuffer` if `data` does not hold a whole
    /// number of frames.
    pub fn new(data: Vec<u8>, format: PcmFormat) -> Result<Self, SoundError> {
        let frame_size = format.frame_size();
        if data.len() % frame_size != 0 {
            return Err(SoundError::MisalignedBuffer(data.len(), frame_size));
        }
        Ok(Self { data, format })
    }

    /// The raw sample bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The sample layout.
    #[must_use]
    pub fn format(&self) -> &PcmFormat {
        &self.format
    }

    /// Length of the sample data in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of frames in the buffer.
    #[must_use]
    pub fn frames(&self) -> usize {
        self.data.len() / self.format.frame_size()
    }

    /// Playback time of the buffer.
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / f64::from(self.format.sample_rate))
    }
}

impl fmt::Debug for PcmBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcmBuffer")
            .field("data_len", &self.data.len())
            .field("format", &self.format)
            .finish()
    }
}

/// An open WAVE stream positioned by offset rather than loaded in memory.
///
/// Playback always starts by seeking back to the stored PCM start, so the
/// same handle can be replayed any number of times without parsing again.
pub struct PcmFile<S = File> {
    stream: S,
    data_start: u64,
    name: String,
    format: PcmFormat,
}

impl<S> PcmFile<S> {
    pub(crate) fn new(stream: S, data_start: u64, name: String, format: PcmFormat) -> Self {
        Self {
            stream,
            data_start,
            name,
            format,
        }
    }

    /// Display name, usually the path the file was opened from.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The sample layout.
    #[must_use]
    pub fn format(&self) -> &PcmFormat {
        &self.format
    }

    /// Stream offset of the first PCM byte.
    #[must_use]
    pub fn data_start(&self) -> u64 {
        self.data_start
    }
}

impl<S: Read + Seek> PcmFile<S> {
    /// Seeks back to the first PCM byte.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if seeking fails.
    pub fn rewind(&mut self) -> io::Result<()> {
        self.stream.seek(SeekFrom::Start(self.data_start))?;
        Ok(())
    }

    /// Reads the next window of PCM data.
    ///
    /// Returns `Ok(0)` only at end of stream. Interrupted reads are retried.
    ///
    /// # Errors
    ///
    /// Returns any other I/O error from the stream.
    pub fn read_window(&mut self, window: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.stream.read(window) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                result => return result,
            }
        }
    }
}

impl<S> fmt::Debug for PcmFile<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcmFile")
            .field("name", &self.name)
            .field("data_start", &self.data_start)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}
