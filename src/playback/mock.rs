//! Scriptable in-memory playback backend for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use crate::sound::PcmFormat;

use super::{PcmBackend, PcmDevice, PlaybackError, WriteError};

/// Scripted outcome of one `write` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockWrite {
    /// Accept every whole frame.
    Accept,
    /// Accept at most this many frames.
    Partial(usize),
    /// Report an underrun/overrun.
    Xrun,
    /// Report a fatal device error.
    Fatal,
}

#[derive(Debug, Default)]
struct MockState {
    fail_open: bool,
    fail_negotiate: bool,
    fail_recover: bool,
    script: VecDeque<MockWrite>,
    open_count: usize,
    close_count: usize,
    drain_count: usize,
    recover_count: usize,
    negotiated: Vec<PcmFormat>,
    write_sizes: Vec<usize>,
    written: Vec<u8>,
    open_times: Vec<Instant>,
    close_times: Vec<Instant>,
}

/// Backend that records everything written to it.
///
/// Clones share state, so a test can keep one handle while the daemon owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Creates a backend that accepts every write.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Makes `open_default_output` fail.
    pub fn set_fail_open(&self, fail: bool) {
        self.lock().fail_open = fail;
    }

    /// Makes `negotiate` fail.
    pub fn set_fail_negotiate(&self, fail: bool) {
        self.lock().fail_negotiate = fail;
    }

    /// Makes `recover` fail.
    pub fn set_fail_recover(&self, fail: bool) {
        self.lock().fail_recover = fail;
    }

    /// Queues the outcome of a future `write` call.
    pub fn push_script(&self, outcome: MockWrite) {
        self.lock().script.push_back(outcome);
    }

    /// Number of opened devices.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.lock().open_count
    }

    /// Number of closed devices.
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.lock().close_count
    }

    /// Number of drains.
    #[must_use]
    pub fn drain_count(&self) -> usize {
        self.lock().drain_count
    }

    /// Number of recovery attempts.
    #[must_use]
    pub fn recover_count(&self) -> usize {
        self.lock().recover_count
    }

    /// Formats passed to `negotiate`, in order.
    #[must_use]
    pub fn negotiated(&self) -> Vec<PcmFormat> {
        self.lock().negotiated.clone()
    }

    /// Byte length of every `write` call, in order.
    #[must_use]
    pub fn write_sizes(&self) -> Vec<usize> {
        self.lock().write_sizes.clone()
    }

    /// Concatenation of all accepted bytes.
    #[must_use]
    pub fn written(&self) -> Vec<u8> {
        self.lock().written.clone()
    }

    /// When each device was opened.
    #[must_use]
    pub fn open_times(&self) -> Vec<Instant> {
        self.lock().open_times.clone()
    }

    /// When each device was closed.
    #[must_use]
    pub fn close_times(&self) -> Vec<Instant> {
        self.lock().close_times.clone()
    }
}

impl PcmBackend for MockBackend {
    type Device = MockDevice;

    fn name(&self) -> &'static str {
        "mock"
    }

    fn open_default_output(&self) -> Result<MockDevice, PlaybackError> {
        let mut state = self.lock();
        if state.fail_open {
            return Err(PlaybackError::DeviceNotAvailable(
                "mock device unavailable".to_string(),
            ));
        }
        state.open_count += 1;
        state.open_times.push(Instant::now());
        drop(state);

        Ok(MockDevice {
            backend: self.clone(),
            frame_size: None,
        })
    }
}

/// Device handed out by `MockBackend`.
#[derive(Debug)]
pub struct MockDevice {
    backend: MockBackend,
    frame_size: Option<usize>,
}

impl PcmDevice for MockDevice {
    fn negotiate(&mut self, format: &PcmFormat) -> Result<(), PlaybackError> {
        let mut state = self.backend.lock();
        state.negotiated.push(*format);
        if state.fail_negotiate {
            return Err(PlaybackError::Negotiation(format!(
                "mock device rejects {}",
                format
            )));
        }
        self.frame_size = Some(format.frame_size());
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<usize, WriteError> {
        let frame_size = self
            .frame_size
            .ok_or_else(|| WriteError::Fatal("device not configured".to_string()))?;
        let mut state = self.backend.lock();
        state.write_sizes.push(bytes.len());

        let frames = bytes.len() / frame_size;
        let accepted = match state.script.pop_front().unwrap_or(MockWrite::Accept) {
            MockWrite::Accept => frames,
            MockWrite::Partial(limit) => frames.min(limit),
            MockWrite::Xrun => return Err(WriteError::Xrun("mock underrun".to_string())),
            MockWrite::Fatal => return Err(WriteError::Fatal("mock failure".to_string())),
        };
        state
            .written
            .extend_from_slice(&bytes[..accepted * frame_size]);
        Ok(accepted)
    }

    fn recover(&mut self) -> Result<(), PlaybackError> {
        let mut state = self.backend.lock();
        state.recover_count += 1;
        if state.fail_recover {
            return Err(PlaybackError::Recovery("mock recovery failed".to_string()));
        }
        Ok(())
    }

    fn drain(&mut self) {
        self.backend.lock().drain_count += 1;
    }

    fn close(self) {
        let mut state = self.backend.lock();
        state.close_count += 1;
        state.close_times.push(Instant::now());
    }
}
