//! Resource container parsing
//!
//! A container is a single archive file holding many named, individually
//! (de)compressible asset chunks. The layout, front to back: fixed header,
//! file-info table (0x90-byte records), name-offset table, name bytes, an
//! opaque range, type-id table, name-id table, an `IDCL` marker range, and
//! the data blob. Every offset stored in the file is absolute, which is what
//! makes in-place mutation workable: grow a section and every downstream
//! offset field must move by exactly the growth.

use crate::io::{get_u32_le, get_u64_le};
use crate::names::NameTable;
use crate::{Error, Result};

/// Container magic, at offset 0.
pub const CONTAINER_MAGIC: [u8; 4] = *b"IDCL";

/// Byte positions of the header fields. All little-endian.
pub mod header {
    /// u32 number of file entries
    pub const FILE_COUNT: usize = 0x20;
    /// u32 unknown count (preserved, never interpreted)
    pub const UNKNOWN_COUNT: usize = 0x24;
    /// u32 number of type-id entries
    pub const TYPE_COUNT: usize = 0x28;
    /// u32 path-string count, always 2x the file count
    pub const FILE_COUNT_2: usize = 0x2C;
    /// u64 total size of the name-bytes region
    pub const STRINGS_SIZE: usize = 0x38;
    /// u64 absolute offset of the name-offset table
    pub const NAMES_OFFSET: usize = 0x40;
    /// u64 end of the name bytes; duplicated at `UNKNOWN_OFFSET_2`
    pub const NAMES_OFFSET_END: usize = 0x48;
    /// u64 absolute offset of the file-info table
    pub const INFO_OFFSET: usize = 0x50;
    /// u64 duplicate of `NAMES_OFFSET_END`; the two always move together
    pub const UNKNOWN_OFFSET_2: usize = 0x58;
    /// u64 absolute offset of the type-id table ("dummy7")
    pub const TYPE_IDS_OFFSET: usize = 0x60;
    /// u64 absolute offset of the data blob
    pub const DATA_OFFSET: usize = 0x68;
    /// u64 absolute offset of the IDCL marker range
    pub const IDCL_OFFSET: usize = 0x74;
    /// First byte past the fixed header fields
    pub const SIZE: usize = 0x7C;
}

/// Per-record field positions, relative to the *end* of the 0x90-byte
/// file-info record.
pub mod record {
    /// Record size in bytes
    pub const SIZE: usize = 0x90;
    /// u64 name-id (index of the record's pair in the name-id table)
    pub const NAME_ID: usize = 0x70;
    /// u64 absolute offset of the chunk data
    pub const DATA_OFFSET: usize = 0x58;
    /// u64 compressed size
    pub const COMPRESSED_SIZE: usize = 0x50;
    /// u64 uncompressed size
    pub const UNCOMPRESSED_SIZE: usize = 0x48;
    /// u64 stream database hash, first copy
    pub const STREAM_DB_HASH_1: usize = 0x40;
    /// u64 stream database hash, second copy
    pub const STREAM_DB_HASH_2: usize = 0x30;
    /// u32 asset version
    pub const VERSION: usize = 0x28;
    /// u8 special byte 1
    pub const SPECIAL_BYTE_1: usize = 0x24;
    /// u8 compression mode
    pub const COMPRESSION_MODE: usize = 0x20;
    /// u8 special byte 2
    pub const SPECIAL_BYTE_2: usize = 0x1E;
    /// u8 special byte 3
    pub const SPECIAL_BYTE_3: usize = 0x1D;
    /// u64 meta-entries-in-use, zeroed for appended records
    pub const META_IN_USE: usize = 0x10;
}

/// One asset's record within a container.
///
/// `file_offset` and `size_offset` are positions of *fields inside the
/// file-info record*, not of the chunk data itself; the data position is
/// whatever the 8 bytes at `file_offset` currently say. Invariant:
/// `size_offset == file_offset + 8`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceChunk {
    /// Index into the container's name table
    pub name_index: usize,
    /// Absolute position of the record's 8-byte data-offset field
    pub file_offset: u64,
    /// Absolute position of the record's compressed-size field
    pub size_offset: u64,
    /// Compressed size as currently recorded
    pub compressed_size: u64,
    /// Uncompressed size as currently recorded
    pub uncompressed_size: u64,
}

/// In-memory index of one container file, rebuilt from disk on every run.
#[derive(Debug, Clone)]
pub struct ResourceContainer {
    /// Header-declared file count
    pub file_count: u32,
    /// Header-declared unknown count
    pub unknown_count: u32,
    /// Header-declared type-id count
    pub type_count: u32,
    /// Header-declared path-string count (2x file count)
    pub file_count_2: u32,
    /// Size of the name-bytes region
    pub strings_size: u64,
    /// Absolute offset of the name-offset table
    pub names_offset: u64,
    /// Absolute end of the name bytes
    pub names_offset_end: u64,
    /// Absolute offset of the file-info table
    pub info_offset: u64,
    /// Absolute offset of the type-id table
    pub type_ids_offset: u64,
    /// Absolute offset of the data blob
    pub data_offset: u64,
    /// Absolute offset of the IDCL marker range
    pub idcl_offset: u64,
    /// Interned names, in on-disk order
    pub names: NameTable,
    /// Raw name-id table: `file_count_2` entries, (type-id, name-id) pairs
    pub name_ids: Vec<u64>,
    /// File entries, in on-disk order
    pub chunks: Vec<ResourceChunk>,
}

impl ResourceContainer {
    /// Parse a container from its raw bytes.
    ///
    /// Fails with [`Error::Format`] if any declared count or offset would
    /// read past the end of the buffer; a failed container is skipped by
    /// callers, never partially indexed.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < header::SIZE {
            return Err(Error::format(format!(
                "container of {} bytes is smaller than the fixed header",
                buf.len()
            )));
        }
        if buf[0..4] != CONTAINER_MAGIC {
            return Err(Error::format("bad container magic"));
        }

        let file_count = get_u32_le(buf, header::FILE_COUNT)?;
        let unknown_count = get_u32_le(buf, header::UNKNOWN_COUNT)?;
        let type_count = get_u32_le(buf, header::TYPE_COUNT)?;
        let file_count_2 = get_u32_le(buf, header::FILE_COUNT_2)?;
        let strings_size = get_u64_le(buf, header::STRINGS_SIZE)?;
        let names_offset = get_u64_le(buf, header::NAMES_OFFSET)?;
        let names_offset_end = get_u64_le(buf, header::NAMES_OFFSET_END)?;
        let info_offset = get_u64_le(buf, header::INFO_OFFSET)?;
        let type_ids_offset = get_u64_le(buf, header::TYPE_IDS_OFFSET)?;
        let data_offset = get_u64_le(buf, header::DATA_OFFSET)?;
        let idcl_offset = get_u64_le(buf, header::IDCL_OFFSET)?;

        let mut container = ResourceContainer {
            file_count,
            unknown_count,
            type_count,
            file_count_2,
            strings_size,
            names_offset,
            names_offset_end,
            info_offset,
            type_ids_offset,
            data_offset,
            idcl_offset,
            names: NameTable::new(),
            name_ids: Vec::new(),
            chunks: Vec::new(),
        };

        container.parse_names(buf)?;
        container.parse_name_ids(buf)?;
        container.parse_info(buf)?;

        log::debug!(
            "parsed container: {} chunks, {} names, data at 0x{:X}",
            container.chunks.len(),
            container.names.len(),
            container.data_offset
        );

        Ok(container)
    }

    /// Read the name count and the NUL-separated name bytes.
    fn parse_names(&mut self, buf: &[u8]) -> Result<()> {
        let names_offset = self.names_offset as usize;
        let names_end = self.names_offset_end as usize;
        if names_end > buf.len() || names_offset > names_end {
            return Err(Error::format("name table overruns buffer"));
        }

        let name_count = get_u64_le(buf, names_offset)? as usize;
        // Skip the per-name offsets; names are recovered by scanning.
        let bytes_start = names_offset
            .checked_add(8 + name_count * 8)
            .filter(|&start| start <= names_end)
            .ok_or_else(|| Error::format("name-offset table overruns name region"))?;

        let mut pos = bytes_start;
        while self.names.len() < name_count {
            let nul = buf[pos..names_end]
                .iter()
                .position(|&b| b == 0)
                .ok_or_else(|| Error::format("unterminated name in name table"))?;
            let full = String::from_utf8_lossy(&buf[pos..pos + nul]);
            self.names.push(&full);
            pos += nul + 1;
        }

        Ok(())
    }

    /// Read the name-id table: `file_count_2` u64 entries laid out as
    /// (type-id, name-id) pairs; the odd entries index into the name list.
    fn parse_name_ids(&mut self, buf: &[u8]) -> Result<()> {
        let start = (self.type_ids_offset as usize)
            .checked_add(self.type_count as usize * 4 + 8)
            .ok_or_else(|| Error::format("type-id table offset overflow"))?;

        self.name_ids.reserve(self.file_count_2 as usize);
        for i in 0..self.file_count_2 as usize {
            self.name_ids.push(get_u64_le(buf, start + i * 8)?);
        }

        Ok(())
    }

    /// Read the file-info table into chunk entries.
    fn parse_info(&mut self, buf: &[u8]) -> Result<()> {
        let info_offset = self.info_offset as usize;
        let table_len = self.file_count as usize * record::SIZE;
        if info_offset.checked_add(table_len).is_none_or(|e| e > buf.len()) {
            return Err(Error::format("file-info table overruns buffer"));
        }

        for i in 0..self.file_count as usize {
            let end = info_offset + (i + 1) * record::SIZE;
            let name_id = get_u64_le(buf, end - record::NAME_ID)?;
            let size_offset = (end - record::COMPRESSED_SIZE) as u64;
            let file_offset = size_offset - 8;
            let compressed_size = get_u64_le(buf, size_offset as usize)?;
            let uncompressed_size = get_u64_le(buf, end - record::UNCOMPRESSED_SIZE)?;

            let name_index = self.resolve_name_id(name_id)?;
            self.chunks.push(ResourceChunk {
                name_index,
                file_offset,
                size_offset,
                compressed_size,
                uncompressed_size,
            });
        }

        Ok(())
    }

    /// Resolve a record's name-id through the pair table to a name index.
    pub(crate) fn resolve_name_id(&self, name_id: u64) -> Result<usize> {
        let pair_pos = (name_id as usize)
            .checked_mul(2)
            .and_then(|p| p.checked_add(1))
            .filter(|&p| p < self.name_ids.len())
            .ok_or_else(|| Error::format(format!("name-id {name_id} out of range")))?;
        let name_index = self.name_ids[pair_pos] as usize;
        if name_index >= self.names.len() {
            return Err(Error::format(format!(
                "name index {name_index} out of range for {} names",
                self.names.len()
            )));
        }
        Ok(name_index)
    }

    /// Find a chunk by full or normalized name.
    pub fn find_chunk(&self, name: &str) -> Option<usize> {
        let name_index = self.names.index_of(name)?;
        self.chunks.iter().position(|c| c.name_index == name_index)
    }

    /// Full name of a chunk.
    pub fn chunk_name(&self, chunk: &ResourceChunk) -> &str {
        self.names
            .get(chunk.name_index)
            .map(|n| n.full.as_str())
            .unwrap_or("")
    }
}
