//! Synthetic container fixtures shared by the integration tests.
//!
//! Builds a minimal but fully consistent container byte buffer: header,
//! file-info table, name tables, type-id and name-id tables, IDCL marker
//! range and a 16-aligned data blob.

use resarc::container::{header, record, CONTAINER_MAGIC};
use resarc::io::{align16, put_u32_le, put_u64_le};

/// One fixture entry: `(chunk name, resource type name, payload)`.
pub type Entry<'a> = (&'a str, &'a str, &'a [u8]);

fn intern(names: &mut Vec<String>, name: &str) -> u64 {
    match names.iter().position(|n| n == name) {
        Some(index) => index as u64,
        None => {
            names.push(name.to_string());
            (names.len() - 1) as u64
        }
    }
}

/// Build a container holding the given entries.
pub fn build_container(entries: &[Entry<'_>]) -> Vec<u8> {
    let _ = env_logger::builder().is_test(true).try_init();
    let n = entries.len();

    // Name list: each entry's type name then its own name, deduplicated.
    let mut names: Vec<String> = Vec::new();
    let mut pairs: Vec<(u64, u64)> = Vec::new();
    for (name, type_name, _) in entries {
        let type_id = intern(&mut names, type_name);
        let name_id = intern(&mut names, name);
        pairs.push((type_id, name_id));
    }
    let type_count = pairs
        .iter()
        .map(|(t, _)| t)
        .collect::<std::collections::HashSet<_>>()
        .len();

    let mut name_offsets: Vec<u64> = Vec::new();
    let mut name_bytes: Vec<u8> = Vec::new();
    for name in &names {
        name_offsets.push(name_bytes.len() as u64);
        name_bytes.extend_from_slice(name.as_bytes());
        name_bytes.push(0);
    }

    let info_offset = header::SIZE as u64;
    let names_offset = info_offset + (n * record::SIZE) as u64;
    let name_bytes_offset = names_offset + 8 + names.len() as u64 * 8;
    let names_end = name_bytes_offset + name_bytes.len() as u64;
    let type_ids_offset = names_end; // no unknown range in fixtures
    let name_ids_offset = type_ids_offset + type_count as u64 * 4 + 8;
    let idcl_offset = name_ids_offset + (n * 16) as u64;
    let data_offset = align16(idcl_offset + 4);

    let mut buf = vec![0u8; data_offset as usize];
    buf[..4].copy_from_slice(&CONTAINER_MAGIC);

    put_u32_le(&mut buf, header::FILE_COUNT, n as u32).unwrap();
    put_u32_le(&mut buf, header::UNKNOWN_COUNT, 0).unwrap();
    put_u32_le(&mut buf, header::TYPE_COUNT, type_count as u32).unwrap();
    put_u32_le(&mut buf, header::FILE_COUNT_2, n as u32 * 2).unwrap();
    put_u64_le(&mut buf, header::STRINGS_SIZE, name_bytes.len() as u64).unwrap();
    put_u64_le(&mut buf, header::NAMES_OFFSET, names_offset).unwrap();
    put_u64_le(&mut buf, header::NAMES_OFFSET_END, names_end).unwrap();
    put_u64_le(&mut buf, header::INFO_OFFSET, info_offset).unwrap();
    put_u64_le(&mut buf, header::UNKNOWN_OFFSET_2, names_end).unwrap();
    put_u64_le(&mut buf, header::TYPE_IDS_OFFSET, type_ids_offset).unwrap();
    put_u64_le(&mut buf, header::DATA_OFFSET, data_offset).unwrap();
    put_u64_le(&mut buf, header::IDCL_OFFSET, idcl_offset).unwrap();

    // Name tables
    put_u64_le(&mut buf, names_offset as usize, names.len() as u64).unwrap();
    for (i, offset) in name_offsets.iter().enumerate() {
        put_u64_le(&mut buf, names_offset as usize + 8 + i * 8, *offset).unwrap();
    }
    buf[name_bytes_offset as usize..names_end as usize].copy_from_slice(&name_bytes);

    // Type ids are opaque to the engine; zeros will do. Name-id pairs are
    // what the reader resolves through.
    for (i, (type_id, name_id)) in pairs.iter().enumerate() {
        let pos = name_ids_offset as usize + i * 16;
        put_u64_le(&mut buf, pos, *type_id).unwrap();
        put_u64_le(&mut buf, pos + 8, *name_id).unwrap();
    }
    buf[idcl_offset as usize..idcl_offset as usize + 4].copy_from_slice(b"IDCL");

    // Data blob, each payload 16-aligned, and its info records.
    for (i, (_, _, data)) in entries.iter().enumerate() {
        let position = align16(buf.len() as u64);
        buf.resize(position as usize, 0);
        buf.extend_from_slice(data);

        let rec_end = info_offset as usize + (i + 1) * record::SIZE;
        put_u64_le(&mut buf, rec_end - record::NAME_ID, i as u64).unwrap();
        put_u64_le(&mut buf, rec_end - record::DATA_OFFSET, position).unwrap();
        put_u64_le(&mut buf, rec_end - record::COMPRESSED_SIZE, data.len() as u64).unwrap();
        put_u64_le(
            &mut buf,
            rec_end - record::UNCOMPRESSED_SIZE,
            data.len() as u64,
        )
        .unwrap();
    }

    buf
}

/// Three-chunk container used by most tests.
pub fn three_chunks() -> Vec<u8> {
    build_container(&[
        ("gameplay/rules.decl", "rs_streamfile", b"rules-payload-aa"),
        ("art/icon.tga", "image", b"icon-payload-bbbbbbbb"),
        ("sound/bank.meta", "rs_streamfile", b"bank-payload-cc"),
    ])
}
