//! Appending brand-new assets to a container
//!
//! Additions are append-only: the container is sliced into its logical
//! ranges, each range grows independently in memory, and the file is
//! reassembled in one pass. The delicate part is keeping every absolute
//! offset consistent afterwards: each header offset field moves by the
//! total growth of the ranges before it, and every file-info record's
//! stored data offset (old and new alike) moves by the growth of
//! everything that precedes the data blob.

use crate::codec::Codec;
use crate::container::{header, record, ResourceChunk, ResourceContainer};
use crate::hash::resource_hash;
use crate::io::{align16, get_u64_le, put_u32_le, put_u64_le};
use crate::metadata::ResourceDataMap;
use crate::patch::prepare_payload;
use crate::{Error, Result};

/// Resource type recorded for assets with no declared or known metadata.
pub const DEFAULT_RESOURCE_TYPE: &str = "rs_streamfile";

/// A brand-new asset to splice into a container.
#[derive(Debug, Clone)]
pub struct NewAsset {
    /// Asset path inside the container
    pub name: String,
    /// Payload bytes
    pub payload: Vec<u8>,
    /// Declared resource type; wins over the metadata table
    pub resource_type: Option<String>,
    /// Declared version
    pub version: Option<u32>,
    /// Declared stream database hash
    pub stream_db_hash: Option<u64>,
    /// Declared special bytes
    pub special_bytes: Option<[u8; 3]>,
}

impl NewAsset {
    /// A new asset with no declared metadata.
    pub fn new(name: &str, payload: Vec<u8>) -> Self {
        NewAsset {
            name: name.to_string(),
            payload,
            resource_type: None,
            version: None,
            stream_db_hash: None,
            special_bytes: None,
        }
    }
}

/// Resolved metadata for one new asset.
struct ResolvedMeta {
    resource_type: String,
    version: u32,
    stream_db_hash: u64,
    special_bytes: [u8; 3],
}

/// The container split into its logical byte ranges, each independently
/// growable. Range boundaries come from the parsed header offsets.
struct Sections {
    head: Vec<u8>,
    info: Vec<u8>,
    name_offsets: Vec<u8>,
    name_bytes: Vec<u8>,
    unknown: Vec<u8>,
    type_ids: Vec<u8>,
    name_ids: Vec<u8>,
    idcl: Vec<u8>,
    data: Vec<u8>,
}

impl Sections {
    fn split(buf: &[u8], container: &ResourceContainer) -> Result<Self> {
        let names_offset = container.names_offset as usize;
        let names_end = container.names_offset_end as usize;
        let info_offset = container.info_offset as usize;
        let type_ids_offset = container.type_ids_offset as usize;
        let name_ids_offset = type_ids_offset + container.type_count as usize * 4 + 8;
        let idcl_offset = container.idcl_offset as usize;
        let data_offset = container.data_offset as usize;

        let name_count = get_u64_le(buf, names_offset)? as usize;
        let name_bytes_offset = names_offset + 8 + name_count * 8;

        let bounds = [
            info_offset,
            names_offset,
            name_bytes_offset,
            names_end,
            type_ids_offset,
            name_ids_offset,
            idcl_offset,
            data_offset,
        ];
        if !bounds.windows(2).all(|w| w[0] <= w[1]) || data_offset > buf.len() {
            return Err(Error::format("container ranges out of order"));
        }

        Ok(Sections {
            head: buf[..info_offset].to_vec(),
            info: buf[info_offset..names_offset].to_vec(),
            name_offsets: buf[names_offset..name_bytes_offset].to_vec(),
            name_bytes: buf[name_bytes_offset..names_end].to_vec(),
            unknown: buf[names_end..type_ids_offset].to_vec(),
            type_ids: buf[type_ids_offset..name_ids_offset].to_vec(),
            name_ids: buf[name_ids_offset..idcl_offset].to_vec(),
            idcl: buf[idcl_offset..data_offset].to_vec(),
            data: buf[data_offset..].to_vec(),
        })
    }

    fn reassemble(self, out: &mut Vec<u8>) {
        out.clear();
        out.extend_from_slice(&self.head);
        out.extend_from_slice(&self.info);
        out.extend_from_slice(&self.name_offsets);
        out.extend_from_slice(&self.name_bytes);
        out.extend_from_slice(&self.unknown);
        out.extend_from_slice(&self.type_ids);
        out.extend_from_slice(&self.name_ids);
        out.extend_from_slice(&self.idcl);
        out.extend_from_slice(&self.data);
    }
}

/// Splice brand-new named assets into the container.
///
/// No-op for an empty asset list. On success both the byte buffer and the
/// in-memory index reflect the new entries; re-parsing is not required.
pub fn append_assets(
    buf: &mut Vec<u8>,
    container: &mut ResourceContainer,
    assets: &[NewAsset],
    metadata: &ResourceDataMap,
    codec: &dyn Codec,
    compress_textures: bool,
) -> Result<()> {
    if assets.is_empty() {
        return Ok(());
    }
    if container.file_count == 0 {
        // The last existing record doubles as the template for new ones.
        return Err(Error::format("cannot append to a container with no entries"));
    }

    let mut sections = Sections::split(buf, container)?;
    let original_len = buf.len() as u64;
    let original_data_len = sections.data.len() as u64;
    let original_name_bytes_len = sections.name_bytes.len() as u64;
    let original_name_offsets_len = sections.name_offsets.len() as u64;

    for asset in assets {
        let meta = resolve_metadata(asset, metadata);

        // Intern the resource-type string first so the file's own name-id
        // pair can reference it.
        let type_name_id = match container.names.index_of(&meta.resource_type) {
            Some(index) => index as u64,
            None => splice_name(&mut sections, &meta.resource_type, container)?,
        };
        let file_name_id = splice_name(&mut sections, &asset.name, container)?;

        let prepared = prepare_payload(&asset.name, asset.payload.clone(), codec, compress_textures);
        let compressed_size = prepared.data.len() as u64;
        let compression_mode = prepared.compression_mode.unwrap_or(0);

        // Data placement in pre-append coordinates; the final fix-up pass
        // shifts it by the total table growth along with every old record.
        let growth_so_far = sections.data.len() as u64 - original_data_len;
        let position = original_len + growth_so_far;
        let padding = align16(position) - position + 0x30;
        let data_position = position + padding;
        sections.data.resize(sections.data.len() + padding as usize, 0);
        sections.data.extend_from_slice(&prepared.data);

        let pair_index = (sections.name_ids.len() / 16) as u64;
        sections.name_ids.extend_from_slice(&type_name_id.to_le_bytes());
        sections.name_ids.extend_from_slice(&file_name_id.to_le_bytes());
        container.name_ids.push(type_name_id);
        container.name_ids.push(file_name_id);

        append_info_record(
            &mut sections.info,
            pair_index,
            data_position,
            compressed_size,
            prepared.uncompressed_size,
            compression_mode,
            &meta,
        )?;

        log::debug!(
            "appended {} ({}, {} bytes) at 0x{:X}",
            asset.name,
            meta.resource_type,
            compressed_size,
            data_position
        );
    }

    // Cumulative growth at each logical boundary.
    let added = assets.len() as u64;
    let info_add = added * record::SIZE as u64;
    let names_add = (sections.name_offsets.len() as u64 - original_name_offsets_len)
        + (sections.name_bytes.len() as u64 - original_name_bytes_len);
    let strings_add = sections.name_bytes.len() as u64 - original_name_bytes_len;
    let name_ids_add = added * 16;
    let data_add = info_add + names_add + name_ids_add;

    rewrite_header(&mut sections.head, container, added, strings_add, info_add, names_add, data_add)?;

    // Every record's stored data offset moves by the growth of the tables
    // in front of the data blob. This is what keeps old chunks readable.
    let record_count = container.file_count as usize + assets.len();
    for i in 0..record_count {
        let pos = (i + 1) * record::SIZE - record::DATA_OFFSET;
        let offset = get_u64_le(&sections.info, pos)?;
        put_u64_le(&mut sections.info, pos, offset + data_add)?;
    }

    sections.reassemble(buf);

    // Bring the in-memory index up to date. Existing records did not move
    // (the info table starts where it always did), so only the new chunks
    // and the header mirror need touching.
    for (i, asset) in assets.iter().enumerate() {
        let end = container.info_offset + (container.file_count as u64 + i as u64 + 1) * record::SIZE as u64;
        let size_offset = end - record::COMPRESSED_SIZE as u64;
        let name_index = container
            .names
            .index_of(&asset.name)
            .ok_or_else(|| Error::format("appended name missing from table"))?;
        container.chunks.push(ResourceChunk {
            name_index,
            file_offset: size_offset - 8,
            size_offset,
            compressed_size: get_u64_le(buf, size_offset as usize)?,
            uncompressed_size: get_u64_le(buf, size_offset as usize + 8)?,
        });
    }
    container.file_count += added as u32;
    container.file_count_2 += added as u32 * 2;
    container.strings_size += strings_add;
    container.names_offset += info_add;
    container.names_offset_end += info_add + names_add;
    container.type_ids_offset += info_add + names_add;
    container.idcl_offset += data_add;
    container.data_offset += data_add;

    log::info!("appended {added} new assets");
    Ok(())
}

/// Declared values win, then the hash-keyed metadata table, then streaming
/// defaults. Defaults are expected for declaration files and warned about
/// for anything else.
fn resolve_metadata(asset: &NewAsset, metadata: &ResourceDataMap) -> ResolvedMeta {
    if let Some(resource_type) = &asset.resource_type {
        return ResolvedMeta {
            resource_type: resource_type.clone(),
            version: asset.version.unwrap_or(0),
            stream_db_hash: asset.stream_db_hash.unwrap_or(0),
            special_bytes: asset.special_bytes.unwrap_or([0; 3]),
        };
    }

    if let Some(entry) = metadata.lookup(resource_hash(&asset.name)) {
        return ResolvedMeta {
            resource_type: entry.resource_type.clone(),
            version: asset.version.unwrap_or(entry.version),
            stream_db_hash: asset.stream_db_hash.unwrap_or(entry.stream_db_hash),
            special_bytes: asset.special_bytes.unwrap_or(entry.special_bytes),
        };
    }

    if !asset.name.ends_with(".decl") {
        log::warn!(
            "no metadata for {}, defaulting to {DEFAULT_RESOURCE_TYPE}",
            asset.name
        );
    }
    ResolvedMeta {
        resource_type: DEFAULT_RESOURCE_TYPE.to_string(),
        version: asset.version.unwrap_or(0),
        stream_db_hash: asset.stream_db_hash.unwrap_or(0),
        special_bytes: asset.special_bytes.unwrap_or([0; 3]),
    }
}

/// Splice one name into the name-offset and name-bytes sections and the
/// in-memory table, returning its name index.
///
/// Insertion point is the byte after the NUL terminating the last recorded
/// name; the region is required to keep a NUL-terminated tail there, or
/// subsequent name parsing would corrupt.
fn splice_name(sections: &mut Sections, name: &str, container: &mut ResourceContainer) -> Result<u64> {
    let count = get_u64_le(&sections.name_offsets, 0)?;
    if count == 0 {
        return Err(Error::format("cannot splice into an empty name table"));
    }

    let last_offset = get_u64_le(&sections.name_offsets, (count as usize) * 8)? as usize;
    let terminator = sections.name_bytes[last_offset.min(sections.name_bytes.len())..]
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| Error::format("name region lost its trailing terminator"))?;
    let insert_at = last_offset + terminator + 1;

    let mut entry = name.as_bytes().to_vec();
    entry.push(0);
    sections.name_bytes.splice(insert_at..insert_at, entry);

    sections
        .name_offsets
        .extend_from_slice(&(insert_at as u64).to_le_bytes());
    put_u64_le(&mut sections.name_offsets, 0, count + 1)?;

    Ok(container.names.push(name) as u64)
}

/// Clone the last existing 0x90-byte record as a template and overwrite
/// the fields that identify the new asset.
fn append_info_record(
    info: &mut Vec<u8>,
    pair_index: u64,
    data_position: u64,
    compressed_size: u64,
    uncompressed_size: u64,
    compression_mode: u8,
    meta: &ResolvedMeta,
) -> Result<()> {
    let template_start = info
        .len()
        .checked_sub(record::SIZE)
        .ok_or_else(|| Error::format("info table shorter than one record"))?;
    let mut rec: Vec<u8> = info[template_start..].to_vec();
    let end = record::SIZE;

    put_u64_le(&mut rec, end - record::NAME_ID, pair_index)?;
    put_u64_le(&mut rec, end - record::DATA_OFFSET, data_position)?;
    put_u64_le(&mut rec, end - record::COMPRESSED_SIZE, compressed_size)?;
    put_u64_le(&mut rec, end - record::UNCOMPRESSED_SIZE, uncompressed_size)?;
    put_u64_le(&mut rec, end - record::STREAM_DB_HASH_1, meta.stream_db_hash)?;
    put_u64_le(&mut rec, end - record::STREAM_DB_HASH_2, meta.stream_db_hash)?;
    put_u32_le(&mut rec, end - record::VERSION, meta.version)?;
    rec[end - record::SPECIAL_BYTE_1] = meta.special_bytes[0];
    rec[end - record::SPECIAL_BYTE_2] = meta.special_bytes[1];
    rec[end - record::SPECIAL_BYTE_3] = meta.special_bytes[2];
    rec[end - record::COMPRESSION_MODE] = compression_mode;
    put_u64_le(&mut rec, end - record::META_IN_USE, 0)?;

    info.extend_from_slice(&rec);
    Ok(())
}

/// Rewrite the header counts and offsets by the per-boundary growth.
fn rewrite_header(
    head: &mut [u8],
    container: &ResourceContainer,
    added: u64,
    strings_add: u64,
    info_add: u64,
    names_add: u64,
    data_add: u64,
) -> Result<()> {
    put_u32_le(head, header::FILE_COUNT, container.file_count + added as u32)?;
    put_u32_le(
        head,
        header::FILE_COUNT_2,
        container.file_count_2 + added as u32 * 2,
    )?;
    put_u64_le(head, header::STRINGS_SIZE, container.strings_size + strings_add)?;
    put_u64_le(head, header::NAMES_OFFSET, container.names_offset + info_add)?;
    put_u64_le(
        head,
        header::NAMES_OFFSET_END,
        container.names_offset_end + info_add + names_add,
    )?;
    put_u64_le(
        head,
        header::UNKNOWN_OFFSET_2,
        container.names_offset_end + info_add + names_add,
    )?;
    put_u64_le(
        head,
        header::TYPE_IDS_OFFSET,
        container.type_ids_offset + info_add + names_add,
    )?;
    put_u64_le(head, header::DATA_OFFSET, container.data_offset + data_add)?;
    put_u64_le(head, header::IDCL_OFFSET, container.idcl_offset + data_add)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_info_table_is_error_not_panic() {
        let meta = ResolvedMeta {
            resource_type: DEFAULT_RESOURCE_TYPE.to_string(),
            version: 0,
            stream_db_hash: 0,
            special_bytes: [0; 3],
        };
        // Shorter than one record: no template to clone.
        let mut info = vec![0u8; record::SIZE - 1];
        assert!(append_info_record(&mut info, 0, 0, 0, 0, 0, &meta).is_err());

        let mut empty = Vec::new();
        assert!(append_info_record(&mut empty, 0, 0, 0, 0, 0, &meta).is_err());
    }
}
