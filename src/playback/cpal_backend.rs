//! Playback through the platform's default output device (cpal).
//!
//! cpal pulls samples from a callback, so writes go through a byte ring
//! buffer: `write` blocks until every frame is queued and the callback
//! converts the queued bytes into device samples. Integer sample formats
//! are passed through bit-exact. Anything the device does not advertise
//! is rejected instead of converted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleFormat, SampleRate, SizedSample, StreamConfig};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tracing::{debug, error};

use crate::sound::PcmFormat;

use super::{PcmBackend, PcmDevice, PlaybackError, WriteError, WINDOW_BYTES};

/// Poll interval while waiting for ring buffer space.
const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// A write that makes no progress for this long is abandoned.
const STALL_TIMEOUT: Duration = Duration::from_secs(2);

/// Time left for the device's own buffer after the ring is empty.
const DRAIN_TAIL: Duration = Duration::from_millis(50);

/// The default host's default output device.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpalBackend;

impl CpalBackend {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl PcmBackend for CpalBackend {
    type Device = CpalDevice;

    fn name(&self) -> &'static str {
        "cpal"
    }

    fn open_default_output(&self) -> Result<CpalDevice, PlaybackError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or_else(|| {
            PlaybackError::DeviceNotAvailable(format!(
                "no default output device on {}",
                host.id().name()
            ))
        })?;
        let name = device.name().unwrap_or_else(|_| "default".to_string());
        debug!("Opened output device {}", name);

        Ok(CpalDevice {
            device,
            name,
            active: None,
        })
    }
}

/// An open cpal output device.
pub struct CpalDevice {
    device: cpal::Device,
    name: String,
    active: Option<ActiveStream>,
}

impl std::fmt::Debug for CpalDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpalDevice")
            .field("name", &self.name)
            .field("streaming", &self.active.is_some())
            .finish()
    }
}

struct ActiveStream {
    stream: cpal::Stream,
    producer: HeapProd<u8>,
    state: Arc<StreamState>,
    frame_size: usize,
    capacity: usize,
    byte_rate: u32,
}

/// Flags shared with the audio callback.
#[derive(Default)]
struct StreamState {
    primed: AtomicBool,
    underrun: AtomicBool,
    draining: AtomicBool,
    failure: Mutex<Option<String>>,
}

impl StreamState {
    fn record_failure(&self, message: String) {
        let mut failure = self
            .failure
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        failure.get_or_insert(message);
    }

    fn failure(&self) -> Option<String> {
        self.failure
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl PcmDevice for CpalDevice {
    fn negotiate(&mut self, format: &PcmFormat) -> Result<(), PlaybackError> {
        let sample_format = sample_format_of(format)?;
        let rate = SampleRate(format.sample_rate);

        let supported = self
            .device
            .supported_output_configs()
            .map_err(|e| PlaybackError::Negotiation(e.to_string()))?
            .any(|range| {
                range.channels() == format.channels
                    && range.sample_format() == sample_format
                    && range.min_sample_rate() <= rate
                    && rate <= range.max_sample_rate()
            });
        if !supported {
            return Err(PlaybackError::Negotiation(format!(
                "{} does not support {}",
                self.name, format
            )));
        }

        let config = StreamConfig {
            channels: format.channels,
            sample_rate: rate,
            buffer_size: BufferSize::Default,
        };
        let frame_size = format.frame_size();
        let capacity = ring_capacity(format);
        let (producer, consumer) = HeapRb::<u8>::new(capacity).split();
        let state = Arc::new(StreamState::default());
        let little_endian = format.is_little_endian();

        let stream = match sample_format {
            SampleFormat::I8 => build_stream::<i8>(&self.device, &config, consumer, little_endian, &state),
            SampleFormat::U8 => build_stream::<u8>(&self.device, &config, consumer, little_endian, &state),
            SampleFormat::I16 => build_stream::<i16>(&self.device, &config, consumer, little_endian, &state),
            SampleFormat::U16 => build_stream::<u16>(&self.device, &config, consumer, little_endian, &state),
            SampleFormat::I32 => build_stream::<i32>(&self.device, &config, consumer, little_endian, &state),
            SampleFormat::U32 => build_stream::<u32>(&self.device, &config, consumer, little_endian, &state),
            other => {
                return Err(PlaybackError::UnsupportedFormat(format!("{:?}", other)));
            }
        }?;

        stream
            .play()
            .map_err(|e| PlaybackError::Negotiation(format!("failed to start the stream: {}", e)))?;

        debug!("Configured {} for {} ({} byte ring)", self.name, format, capacity);
        self.active = Some(ActiveStream {
            stream,
            producer,
            state,
            frame_size,
            capacity,
            byte_rate: format.byte_rate(),
        });
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<usize, WriteError> {
        let active = self
            .active
            .as_mut()
            .ok_or_else(|| WriteError::Fatal("device not configured".to_string()))?;

        if let Some(failure) = active.state.failure() {
            return Err(WriteError::Fatal(failure));
        }
        if active.state.underrun.load(Ordering::Acquire) {
            return Err(WriteError::Xrun("the output stream ran dry".to_string()));
        }

        let frame_size = active.frame_size;
        let whole = bytes.len() - bytes.len() % frame_size;
        let mut offset = 0;
        let mut last_progress = Instant::now();

        while offset < whole {
            let room = active.producer.vacant_len();
            let chunk = (room - room % frame_size).min(whole - offset);
            if chunk > 0 {
                offset += active.producer.push_slice(&bytes[offset..offset + chunk]);
                active.state.primed.store(true, Ordering::Release);
                last_progress = Instant::now();
                continue;
            }

            if let Some(failure) = active.state.failure() {
                return Err(WriteError::Fatal(failure));
            }
            if last_progress.elapsed() >= STALL_TIMEOUT {
                if offset > 0 {
                    break;
                }
                return Err(WriteError::Fatal(
                    "the output stream stopped consuming data".to_string(),
                ));
            }
            thread::sleep(POLL_INTERVAL);
        }

        Ok(offset / frame_size)
    }

    fn recover(&mut self) -> Result<(), PlaybackError> {
        let active = self
            .active
            .as_ref()
            .ok_or_else(|| PlaybackError::Recovery("device not configured".to_string()))?;

        if let Some(failure) = active.state.failure() {
            return Err(PlaybackError::Recovery(failure));
        }
        active.state.underrun.store(false, Ordering::Release);
        active
            .stream
            .play()
            .map_err(|e| PlaybackError::Recovery(e.to_string()))
    }

    fn drain(&mut self) {
        let Some(active) = self.active.as_ref() else {
            return;
        };
        active.state.draining.store(true, Ordering::Release);

        // Queued audio plus a second of slack.
        let queued_ms = active.capacity as u64 * 1000 / u64::from(active.byte_rate.max(1));
        let deadline = Instant::now() + Duration::from_millis(queued_ms + 1000);

        while !active.producer.is_empty() {
            if active.state.failure().is_some() || Instant::now() >= deadline {
                debug!("Giving up draining {}", self.name);
                return;
            }
            thread::sleep(POLL_INTERVAL);
        }
        thread::sleep(DRAIN_TAIL);
    }

    fn close(self) {
        if let Some(active) = self.active {
            if let Err(e) = active.stream.pause() {
                debug!("Failed to pause the output stream: {}", e);
            }
        }
        debug!("Closed output device {}", self.name);
    }
}

/// Maps a PCM layout to the cpal sample format with the same bits.
fn sample_format_of(format: &PcmFormat) -> Result<SampleFormat, PlaybackError> {
    match (format.signed, format.bits_per_sample) {
        (true, 8) => Ok(SampleFormat::I8),
        (false, 8) => Ok(SampleFormat::U8),
        (true, 16) => Ok(SampleFormat::I16),
        (false, 16) => Ok(SampleFormat::U16),
        (true, 32) => Ok(SampleFormat::I32),
        (false, 32) => Ok(SampleFormat::U32),
        _ => Err(PlaybackError::UnsupportedFormat(format.to_string())),
    }
}

/// About 200 ms of audio, never less than one write window.
fn ring_capacity(format: &PcmFormat) -> usize {
    let frame_size = format.frame_size();
    let bytes = (format.byte_rate() as usize / 5).max(WINDOW_BYTES);
    bytes.div_ceil(frame_size) * frame_size
}

/// A device sample decoded from its byte representation.
trait WireSample: SizedSample + Send + 'static {
    const WIDTH: usize;
    const SILENCE: Self;

    fn from_wire(bytes: &[u8], little_endian: bool) -> Self;
}

macro_rules! wire_sample {
    ($($ty:ty => $silence:expr),* $(,)?) => {
        $(
            impl WireSample for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();
                const SILENCE: Self = $silence;

                fn from_wire(bytes: &[u8], little_endian: bool) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    if little_endian {
                        <$ty>::from_le_bytes(raw)
                    } else {
                        <$ty>::from_be_bytes(raw)
                    }
                }
            }
        )*
    };
}

wire_sample! {
    i8 => 0,
    u8 => 0x80,
    i16 => 0,
    u16 => 0x8000,
    i32 => 0,
    u32 => 0x8000_0000,
}

fn build_stream<T: WireSample>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut consumer: HeapCons<u8>,
    little_endian: bool,
    state: &Arc<StreamState>,
) -> Result<cpal::Stream, PlaybackError> {
    let mut scratch: Vec<u8> = vec![0; WINDOW_BYTES];
    let data_state = Arc::clone(state);
    let error_state = Arc::clone(state);

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let wanted = data.len() * T::WIDTH;
                if scratch.len() < wanted {
                    scratch.resize(wanted, 0);
                }

                let available = consumer.occupied_len().min(wanted);
                let popped = consumer.pop_slice(&mut scratch[..available - available % T::WIDTH]);
                let samples = popped / T::WIDTH;

                for (out, raw) in data.iter_mut().zip(scratch[..popped].chunks_exact(T::WIDTH)) {
                    *out = T::from_wire(raw, little_endian);
                }
                data[samples..].fill(T::SILENCE);

                if samples < data.len()
                    && data_state.primed.load(Ordering::Acquire)
                    && !data_state.draining.load(Ordering::Acquire)
                {
                    data_state.underrun.store(true, Ordering::Release);
                }
            },
            move |err| {
                error!("Audio stream error: {}", err);
                error_state.record_failure(err.to_string());
            },
            None,
        )
        .map_err(|e| PlaybackError::Negotiation(format!("failed to build the output stream: {}", e)))
}
