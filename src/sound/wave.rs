//! RIFF WAVE container parsing, loading and writing.
//!
//! Only plain linear PCM files are accepted: a `RIFF`/`WAVE` header followed
//! directly by a 16-byte `fmt ` block. Chunks between the format block and the
//! first `data` chunk are skipped.
//!
//! ```text
//! "RIFF" <len:u32le> "WAVE"
//! "fmt " <16:u32le> <codec=1:u16le> <channels:u16le> <rate:u32le>
//!        <byte_rate:u32le> <block_align:u16le> <bits:u16le>
//! [<id:4> <len:u32le> <payload>]...   skipped
//! "data" <len:u32le> <PCM samples>
//! ```

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, warn};

use super::error::SoundError;
use super::format::PcmFormat;
use super::pcm::{reserve_bytes, PcmBuffer, PcmFile};

const RIFF_MAGIC: [u8; 4] = *b"RIFF";
const WAVE_TYPE: [u8; 4] = *b"WAVE";
const FMT_ID: [u8; 4] = *b"fmt ";
const DATA_ID: [u8; 4] = *b"data";

/// Declared length of a plain PCM format block.
const FMT_BLOCK_LEN: u32 = 16;

/// WAVE coding tag for linear PCM.
const WAVE_FORMAT_PCM: u16 = 0x0001;

// ============================================================================
// Parsing
// ============================================================================

/// Reads and validates the WAVE header and format block.
///
/// On success the reader is positioned just past the format block.
///
/// # Errors
///
/// Returns a distinct error for a bad magic, type tag, format block ID,
/// format block length, codec, channel count or sample width, and
/// `SoundError::TruncatedHeader` if the header cannot be read in full.
pub fn parse_header<R: Read>(reader: &mut R) -> Result<PcmFormat, SoundError> {
    let mut header = [0u8; 12];
    read_header_bytes(reader, &mut header, "the file header")?;

    let magic = fourcc(&header[0..4]);
    if magic != RIFF_MAGIC {
        return Err(SoundError::BadMagic(magic));
    }
    let kind = fourcc(&header[8..12]);
    if kind != WAVE_TYPE {
        return Err(SoundError::BadType(kind));
    }

    let mut block = [0u8; 24];
    read_header_bytes(reader, &mut block, "the format block")?;

    let id = fourcc(&block[0..4]);
    if id != FMT_ID {
        return Err(SoundError::UnexpectedChunk(id));
    }
    let block_len = le_u32(&block[4..8]);
    if block_len != FMT_BLOCK_LEN {
        return Err(SoundError::FormatChunkLength(block_len));
    }
    let codec = le_u16(&block[8..10]);
    if codec != WAVE_FORMAT_PCM {
        return Err(SoundError::UnsupportedCodec(codec));
    }

    let channels = le_u16(&block[10..12]);
    let sample_rate = le_u32(&block[12..16]);
    let bits_per_sample = le_u16(&block[22..24]);

    // 8-bit WAVE samples are unsigned, wider ones signed.
    PcmFormat::new(
        false,
        bits_per_sample > 8,
        sample_rate,
        channels,
        bits_per_sample,
    )
}

/// Skips chunks until the `data` chunk and returns its declared length.
///
/// On success the reader is positioned at the first PCM byte.
fn find_data_chunk<R: Read + Seek>(reader: &mut R) -> Result<u32, SoundError> {
    let mut header = [0u8; 8];
    loop {
        read_header_bytes(reader, &mut header, "a chunk header")?;
        let id = fourcc(&header[0..4]);
        let len = le_u32(&header[4..8]);

        if id == DATA_ID {
            return Ok(len);
        }

        debug!("Skipping {:?} chunk of {} bytes", String::from_utf8_lossy(&id), len);
        reader
            .seek(SeekFrom::Current(i64::from(len)))
            .map_err(|e| SoundError::TruncatedHeader("a chunk header", e.to_string()))?;
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Loads the whole PCM payload of a WAVE file into memory.
///
/// # Errors
///
/// Returns an error if the file cannot be opened, is malformed, holds no
/// sound data, or reading fails.
pub fn load_into_buffer(path: &Path) -> Result<PcmBuffer, SoundError> {
    let name = path.display().to_string();
    let file = File::open(path).map_err(|e| SoundError::Open(name.clone(), e.to_string()))?;
    read_into_buffer(BufReader::new(file), &name)
}

/// Loads the whole PCM payload of a WAVE stream into memory.
///
/// A payload shorter than declared is a soft error: a warning is logged and
/// the buffer is shrunk to the whole frames actually read. Nothing read at
/// all is a hard error.
///
/// # Errors
///
/// Returns an error if the stream is malformed, holds no sound data, or a
/// read fails with an I/O error other than end of stream.
pub fn read_into_buffer<R: Read + Seek>(mut reader: R, name: &str) -> Result<PcmBuffer, SoundError> {
    let format = parse_header(&mut reader)?;
    let declared = find_data_chunk(&mut reader)? as usize;
    if declared == 0 {
        return Err(SoundError::EmptyPayload(name.to_string()));
    }

    let mut data = reserve_bytes(declared)?;
    let read = reader
        .by_ref()
        .take(declared as u64)
        .read_to_end(&mut data)
        .map_err(|e| SoundError::Read(name.to_string(), e.to_string()))?;

    if read < declared {
        warn!(
            "The PCM data in '{}' is truncated: {} of {} bytes present",
            name, read, declared
        );
    }
    let whole = read - read % format.frame_size();
    if whole == 0 {
        return Err(SoundError::EmptyPayload(name.to_string()));
    }
    if whole < declared {
        data.truncate(whole);
        data.shrink_to_fit();
    }

    debug!("Loaded '{}' into memory: {} bytes, {}", name, data.len(), format);
    PcmBuffer::new(data, format)
}

/// Opens a WAVE file for repeated streaming playback.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or is malformed.
pub fn prepare_file(path: &Path) -> Result<PcmFile<File>, SoundError> {
    let name = path.display().to_string();
    let file = File::open(path).map_err(|e| SoundError::Open(name.clone(), e.to_string()))?;
    prepare_stream(file, name)
}

/// Parses a WAVE stream and keeps it open, positioned by offset.
///
/// The payload length is not needed; playback runs to end of stream.
///
/// # Errors
///
/// Returns an error if the stream is malformed or its position cannot be
/// determined.
pub fn prepare_stream<S: Read + Seek>(
    mut stream: S,
    name: impl Into<String>,
) -> Result<PcmFile<S>, SoundError> {
    let name = name.into();
    let format = parse_header(&mut stream)?;
    find_data_chunk(&mut stream)?;
    let data_start = stream
        .stream_position()
        .map_err(|e| SoundError::Read(name.clone(), e.to_string()))?;

    debug!("Prepared '{}' for streaming at offset {}, {}", name, data_start, format);
    Ok(PcmFile::new(stream, data_start, name, format))
}

// ============================================================================
// Writing
// ============================================================================

/// Writes a buffer as a minimal WAVE file (header, format block, data chunk).
///
/// Multi-byte samples in host order are stored little-endian.
///
/// # Errors
///
/// Returns `SoundError::Write` if the payload is too large for a WAVE file
/// or the writer fails.
pub fn write_wave<W: Write>(writer: &mut W, buffer: &PcmBuffer) -> Result<(), SoundError> {
    let format = buffer.format();
    let data_len = u32::try_from(buffer.len())
        .ok()
        .filter(|len| *len <= u32::MAX - 36)
        .ok_or_else(|| SoundError::Write("PCM data too large for a WAVE file".to_string()))?;
    let block_align = u16::try_from(format.frame_size())
        .map_err(|_| SoundError::Write("frame size too large for a WAVE file".to_string()))?;

    let mut out = Vec::with_capacity(44 + buffer.len());
    out.extend_from_slice(&RIFF_MAGIC);
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(&WAVE_TYPE);
    out.extend_from_slice(&FMT_ID);
    out.extend_from_slice(&FMT_BLOCK_LEN.to_le_bytes());
    out.extend_from_slice(&WAVE_FORMAT_PCM.to_le_bytes());
    out.extend_from_slice(&format.channels.to_le_bytes());
    out.extend_from_slice(&format.sample_rate.to_le_bytes());
    out.extend_from_slice(&format.byte_rate().to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&format.bits_per_sample.to_le_bytes());
    out.extend_from_slice(&DATA_ID);
    out.extend_from_slice(&data_len.to_le_bytes());

    let payload_start = out.len();
    out.extend_from_slice(buffer.data());
    if !format.is_little_endian() {
        let width = usize::from(format.bytes_per_sample);
        for sample in out[payload_start..].chunks_exact_mut(width) {
            sample.reverse();
        }
    }

    writer
        .write_all(&out)
        .and_then(|()| writer.flush())
        .map_err(|e| SoundError::Write(e.to_string()))
}

// ============================================================================
// Helpers
// ============================================================================

fn read_header_bytes<R: Read>(
    reader: &mut R,
    buf: &mut [u8],
    what: &'static str,
) -> Result<(), SoundError> {
    reader.read_exact(buf).map_err(|e| {
        let reason = if e.kind() == io::ErrorKind::UnexpectedEof {
            "unexpected end of file".to_string()
        } else {
            e.to_string()
        };
        SoundError::TruncatedHeader(what, reason)
    })
}

fn fourcc(bytes: &[u8]) -> [u8; 4] {
    [bytes[0], bytes[1], bytes[2], bytes[3]]
}

fn le_u16(bytes: &[u8]) -> u16 {
    u16::from_le_bytes([bytes[0], bytes[1]])
}

fn le_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

// ============================================================================
// Tests
// ============================================================================
