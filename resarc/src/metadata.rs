//! Resource metadata lookup
//!
//! New assets need a resource type, version, stream database hash and three
//! special bytes before they can be spliced into a container. That data
//! ships in a separate zlib-compressed binary table keyed by the name hash
//! from [`crate::hash`]. The table is parsed once at startup and shared
//! read-only between container tasks.

use crate::codec::{Codec, ZlibCodec};
use crate::io::ReadContainerExt;
use crate::{Error, Result};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::Path;

/// Metadata for one known asset name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDataEntry {
    /// Hash recorded in the streamed-data database
    pub stream_db_hash: u64,
    /// Resource type name, e.g. `rs_streamfile`
    pub resource_type: String,
    /// Asset version
    pub version: u32,
    /// Three format-opaque bytes copied into the file-info record
    pub special_bytes: [u8; 3],
    /// Map-resources asset name, when the asset belongs to a map
    pub map_resource_name: Option<String>,
    /// Map-resources asset type
    pub map_resource_type: String,
}

/// Hash-keyed table of per-asset metadata.
#[derive(Debug, Default)]
pub struct ResourceDataMap {
    entries: HashMap<u64, ResourceDataEntry>,
}

impl ResourceDataMap {
    /// Create an empty map (every lookup misses).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load and parse the compressed metadata file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::parse(&data)
    }

    /// Parse the zlib-compressed metadata blob.
    ///
    /// Decompressed layout: u32 entry count, then per entry a u64 name
    /// hash, u64 stream-db hash, u32 version, three special bytes, and
    /// three length-prefixed (u16) strings: resource type, map-resource
    /// name (may be empty) and map-resource type.
    pub fn parse(compressed: &[u8]) -> Result<Self> {
        let raw = ZlibCodec.decompress(compressed, 0)?;
        let mut cursor = Cursor::new(raw.as_slice());

        let count = cursor.read_u32_le()?;
        let mut entries = HashMap::with_capacity(count as usize);
        for _ in 0..count {
            let hash = cursor.read_u64_le()?;
            let stream_db_hash = cursor.read_u64_le()?;
            let version = cursor.read_u32_le()?;
            let mut special_bytes = [0u8; 3];
            cursor.read_exact(&mut special_bytes)?;

            let resource_type = read_string(&mut cursor)?;
            let map_resource_name = read_string(&mut cursor)?;
            let map_resource_type = read_string(&mut cursor)?;

            entries.insert(
                hash,
                ResourceDataEntry {
                    stream_db_hash,
                    resource_type,
                    version,
                    special_bytes,
                    map_resource_name: if map_resource_name.is_empty() {
                        None
                    } else {
                        Some(map_resource_name)
                    },
                    map_resource_type,
                },
            );
        }

        log::debug!("loaded {} resource metadata entries", entries.len());
        Ok(Self { entries })
    }

    /// Look up metadata by name hash.
    pub fn lookup(&self, name_hash: u64) -> Option<&ResourceDataEntry> {
        self.entries.get(&name_hash)
    }

    /// Number of known assets.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn read_string(cursor: &mut Cursor<&[u8]>) -> Result<String> {
    let len = {
        let mut bytes = [0u8; 2];
        cursor.read_exact(&mut bytes)?;
        u16::from_le_bytes(bytes) as usize
    };
    let mut buf = vec![0u8; len];
    cursor.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|_| Error::format("metadata string is not UTF-8"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::resource_hash;
    use crate::io::WriteContainerExt;

    fn encode_string(out: &mut Vec<u8>, s: &str) {
        out.extend_from_slice(&(s.len() as u16).to_le_bytes());
        out.extend_from_slice(s.as_bytes());
    }

    fn build_table(entries: &[(&str, u64, u32, &str)]) -> Vec<u8> {
        let mut raw = Vec::new();
        raw.write_u32_le(entries.len() as u32).unwrap();
        for (name, stream_db_hash, version, resource_type) in entries {
            raw.write_u64_le(resource_hash(name)).unwrap();
            raw.write_u64_le(*stream_db_hash).unwrap();
            raw.write_u32_le(*version).unwrap();
            raw.extend_from_slice(&[1, 2, 3]);
            encode_string(&mut raw, resource_type);
            encode_string(&mut raw, "");
            encode_string(&mut raw, "");
        }
        ZlibCodec.compress(&raw, 6).unwrap()
    }

    #[test]
    fn test_parse_and_lookup() {
        let table = build_table(&[
            ("art/tile.tga", 0xAABB, 21, "image"),
            ("gameplay/rules.decl", 0, 1, "rs_streamfile"),
        ]);
        let map = ResourceDataMap::parse(&table).unwrap();
        assert_eq!(map.len(), 2);

        let entry = map.lookup(resource_hash("art/tile.tga")).unwrap();
        assert_eq!(entry.resource_type, "image");
        assert_eq!(entry.version, 21);
        assert_eq!(entry.stream_db_hash, 0xAABB);
        assert_eq!(entry.special_bytes, [1, 2, 3]);
        assert_eq!(entry.map_resource_name, None);

        assert!(map.lookup(resource_hash("unknown/name")).is_none());
    }

    #[test]
    fn test_truncated_table_is_error() {
        let table = build_table(&[("a", 0, 0, "t")]);
        // Corrupt the compressed stream.
        assert!(ResourceDataMap::parse(&table[..table.len() / 2]).is_err());
    }
}
