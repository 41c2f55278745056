//! In-place chunk replacement
//!
//! Two strategies, selected per run:
//!
//! - Append mode (default) writes the replacement payload at the end of the
//!   file and repoints the chunk's data-offset field. Nothing else moves, so
//!   the cost is O(payload), at the price of dead bytes where the old data
//!   was.
//! - In-place mode resizes the chunk's data where it sits. Growing shifts
//!   every downstream byte and bumps every later chunk's stored data offset
//!   by the growth; shrinking zero-fills the tail. No file growth beyond the
//!   size difference.

use crate::codec::Codec;
use crate::container::{ResourceChunk, ResourceContainer};
use crate::io::{align16, get_u64_le, put_u64_le};
use crate::{Error, Result};

/// Chunk replacement strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatchMode {
    /// Write replacement data at end-of-file and repoint the chunk
    #[default]
    Append,
    /// Resize the chunk where it sits, shifting downstream bytes
    InPlace,
}

/// Scratch size for the high-to-low shift in in-place growth.
const SHIFT_CHUNK: usize = 4096;

/// Magic prefix of a pre-compressed texture wrapper.
pub const PRECOMPRESSED_TEXTURE_MAGIC: [u8; 8] = *b"DIVINITY";

/// Length of the pre-compressed texture wrapper header.
const PRECOMPRESSED_TEXTURE_HEADER: usize = 16;

/// A payload after texture pre-processing.
#[derive(Debug)]
pub struct PreparedPayload {
    /// Bytes to store in the container
    pub data: Vec<u8>,
    /// True uncompressed size to record
    pub uncompressed_size: u64,
    /// Compression mode to record, `None` to keep the chunk's current mode
    pub compression_mode: Option<u8>,
}

/// Pre-process a replacement or new payload before it is written.
///
/// A payload carrying the pre-compressed texture magic has its 16-byte
/// wrapper stripped; the embedded u64 is the true uncompressed size and the
/// compression mode is forced to 2. Otherwise, `.tga` payloads are
/// optionally compressed through the codec when `compress_textures` is set;
/// codec failure downgrades to storing the raw payload with a warning.
pub fn prepare_payload(
    name: &str,
    payload: Vec<u8>,
    codec: &dyn Codec,
    compress_textures: bool,
) -> PreparedPayload {
    if payload.len() >= PRECOMPRESSED_TEXTURE_HEADER
        && payload[..8] == PRECOMPRESSED_TEXTURE_MAGIC
    {
        let mut size_bytes = [0u8; 8];
        size_bytes.copy_from_slice(&payload[8..16]);
        let uncompressed_size = u64::from_le_bytes(size_bytes);
        return PreparedPayload {
            data: payload[PRECOMPRESSED_TEXTURE_HEADER..].to_vec(),
            uncompressed_size,
            compression_mode: Some(2),
        };
    }

    if compress_textures && name.ends_with(".tga") {
        match codec.compress(&payload, 6) {
            Ok(compressed) => {
                return PreparedPayload {
                    uncompressed_size: payload.len() as u64,
                    data: compressed,
                    compression_mode: Some(2),
                };
            }
            Err(e) => {
                log::warn!("could not compress texture {name}, storing raw: {e}");
            }
        }
    }

    PreparedPayload {
        uncompressed_size: payload.len() as u64,
        data: payload,
        compression_mode: None,
    }
}

/// Replace the data of an existing chunk.
///
/// Rewrites the buffer according to `mode`, then records the new sizes at
/// the chunk's size fields and mirrors them into the in-memory chunk. A
/// supplied compression mode overwrites the record's mode byte; `None`
/// keeps whatever the record currently says.
#[allow(clippy::too_many_arguments)]
pub fn set_chunk_data(
    buf: &mut Vec<u8>,
    container: &mut ResourceContainer,
    chunk_index: usize,
    payload: &[u8],
    compressed_size: u64,
    uncompressed_size: u64,
    compression_mode: Option<u8>,
    mode: PatchMode,
) -> Result<()> {
    if chunk_index >= container.chunks.len() {
        return Err(Error::not_found(format!("chunk index {chunk_index}")));
    }

    match mode {
        PatchMode::Append => append_chunk_data(buf, container, chunk_index, payload)?,
        PatchMode::InPlace => replace_chunk_data(buf, container, chunk_index, payload)?,
    }

    let chunk = &mut container.chunks[chunk_index];
    put_u64_le(buf, chunk.size_offset as usize, compressed_size)?;
    put_u64_le(buf, chunk.size_offset as usize + 8, uncompressed_size)?;
    chunk.compressed_size = compressed_size;
    chunk.uncompressed_size = uncompressed_size;

    if let Some(mode_byte) = compression_mode {
        let pos = chunk.size_offset as usize + 0x30;
        if pos >= buf.len() {
            return Err(Error::format("compression-mode byte out of range"));
        }
        buf[pos] = mode_byte;
    }

    Ok(())
}

/// Append-mode replacement: payload goes at end-of-file, 16-aligned within
/// the data section plus the fixed 0x30 gap, and only the chunk's 8-byte
/// data-offset field changes.
fn append_chunk_data(
    buf: &mut Vec<u8>,
    container: &ResourceContainer,
    chunk_index: usize,
    payload: &[u8],
) -> Result<()> {
    let chunk = &container.chunks[chunk_index];
    let data_section_len = (buf.len() as u64).saturating_sub(container.data_offset);
    let placement = align16(data_section_len) - data_section_len + 0x30;

    let new_offset = buf.len() as u64 + placement;
    buf.resize(buf.len() + placement as usize, 0);
    buf.extend_from_slice(payload);

    put_u64_le(buf, chunk.file_offset as usize, new_offset)
}

/// In-place replacement ("slow mode"): resize the chunk's current data
/// region, shifting downstream bytes on growth.
fn replace_chunk_data(
    buf: &mut Vec<u8>,
    container: &ResourceContainer,
    chunk_index: usize,
    payload: &[u8],
) -> Result<()> {
    let chunk = &container.chunks[chunk_index];
    // The stored offset is authoritative; an earlier patch in append mode
    // may already have moved this chunk.
    let data_offset = get_u64_le(buf, chunk.file_offset as usize)?;
    let old_size = chunk.compressed_size;

    let data_end = data_offset
        .checked_add(old_size)
        .filter(|&end| end <= buf.len() as u64)
        .ok_or_else(|| Error::format("chunk data overruns buffer"))? as usize;
    let data_offset = data_offset as usize;

    let size_diff = payload.len() as i64 - old_size as i64;
    if size_diff > 0 {
        let diff = size_diff as usize;
        let old_len = buf.len();
        buf.resize(old_len + diff, 0);
        shift_up(buf, data_end, old_len, diff);
        buf[data_offset..data_offset + payload.len()].copy_from_slice(payload);

        // Every later chunk's data moved by exactly `diff`.
        for later in &container.chunks[chunk_index + 1..] {
            let pos = later.file_offset as usize;
            let offset = get_u64_le(buf, pos)?;
            put_u64_le(buf, pos, offset + diff as u64)?;
        }
    } else {
        buf[data_offset..data_offset + payload.len()].copy_from_slice(payload);
        buf[data_offset + payload.len()..data_end].fill(0);
    }

    Ok(())
}

/// Shift `buf[start..end)` up by `diff` bytes, processing high-to-low in
/// bounded blocks so the source is never read after being overwritten.
fn shift_up(buf: &mut [u8], start: usize, end: usize, diff: usize) {
    let mut remaining = end - start;
    while remaining > 0 {
        let n = remaining.min(SHIFT_CHUNK);
        let src = start + remaining - n;
        buf.copy_within(src..src + n, src + diff);
        remaining -= n;
    }
}

/// Read a chunk's current data bytes out of the buffer.
pub fn chunk_data<'a>(buf: &'a [u8], chunk: &ResourceChunk) -> Result<&'a [u8]> {
    let offset = get_u64_le(buf, chunk.file_offset as usize)? as usize;
    let end = offset
        .checked_add(chunk.compressed_size as usize)
        .filter(|&e| e <= buf.len())
        .ok_or_else(|| Error::format("chunk data overruns buffer"))?;
    Ok(&buf[offset..end])
}
