//! End-to-end runner tests over real files

mod common;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use resarc::io::WriteContainerExt;
use resarc::patch::chunk_data;
use resarc::{
    resource_hash, Codec, ContainerJob, ModFile, PackageMapSpec, PatchMode, PatchOptions,
    PatchRunner, ResourceContainer, ResourceDataMap, ZlibCodec,
};
use std::sync::Arc;

fn runner(options: PatchOptions) -> PatchRunner {
    PatchRunner::new(
        Arc::new(ZlibCodec),
        Arc::new(ResourceDataMap::empty()),
        Arc::new(Mutex::new(PackageMapSpec::default())),
        options,
    )
}

fn write_fixture(dir: &tempfile::TempDir, name: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, common::three_chunks()).unwrap();
    path
}

#[test]
fn replaces_and_appends_through_the_runner() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(&dir, "gameresources.resources");

    let mods = vec![
        ModFile::plain(
            "gameplay/rules.decl",
            "gameresources.resources",
            b"replacement-rules".to_vec(),
        ),
        ModFile::plain(
            "gameplay/extra.decl",
            "gameresources.resources",
            b"brand-new".to_vec(),
        ),
    ];
    let report = runner(PatchOptions::default()).run(vec![ContainerJob {
        path: path.clone(),
        mods,
    }]);

    assert_eq!(report.containers_patched, 1);
    assert_eq!(report.chunks_replaced, 1);
    assert_eq!(report.chunks_added, 1);
    assert!(report.errors.is_empty());

    let buf = std::fs::read(&path).unwrap();
    let container = ResourceContainer::parse(&buf).unwrap();
    assert_eq!(container.file_count, 4);
    let replaced = container.find_chunk("gameplay/rules.decl").unwrap();
    assert_eq!(
        chunk_data(&buf, &container.chunks[replaced]).unwrap(),
        b"replacement-rules"
    );
    let added = container.find_chunk("gameplay/extra.decl").unwrap();
    assert_eq!(chunk_data(&buf, &container.chunks[added]).unwrap(), b"brand-new");
}

#[test]
fn parallel_and_sequential_runs_agree() {
    let dir = tempfile::tempdir().unwrap();
    let paths = [
        write_fixture(&dir, "a.resources"),
        write_fixture(&dir, "b.resources"),
        write_fixture(&dir, "c.resources"),
    ];

    let jobs = || {
        paths
            .iter()
            .map(|path| ContainerJob {
                path: path.clone(),
                mods: vec![ModFile::plain(
                    "art/icon.tga",
                    "ignored-here",
                    vec![0xEEu8; 300],
                )],
            })
            .collect::<Vec<_>>()
    };

    let parallel = runner(PatchOptions {
        sequential: false,
        ..PatchOptions::default()
    })
    .run(jobs());
    let contents_parallel: Vec<Vec<u8>> =
        paths.iter().map(|p| std::fs::read(p).unwrap()).collect();

    for path in &paths {
        std::fs::write(path, common::three_chunks()).unwrap();
    }
    let sequential = runner(PatchOptions {
        sequential: true,
        ..PatchOptions::default()
    })
    .run(jobs());
    let contents_sequential: Vec<Vec<u8>> =
        paths.iter().map(|p| std::fs::read(p).unwrap()).collect();

    assert_eq!(parallel.containers_patched, 3);
    assert_eq!(sequential.containers_patched, 3);
    assert_eq!(contents_parallel, contents_sequential);
}

#[test]
fn missing_container_is_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let good = write_fixture(&dir, "good.resources");

    let report = runner(PatchOptions::default()).run(vec![
        ContainerJob {
            path: dir.path().join("missing.resources"),
            mods: vec![ModFile::plain("x", "missing.resources", vec![1])],
        },
        ContainerJob {
            path: good,
            mods: vec![ModFile::plain(
                "gameplay/rules.decl",
                "good.resources",
                b"still-works".to_vec(),
            )],
        },
    ]);

    assert_eq!(report.containers_patched, 1);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.chunks_replaced, 1);
}

#[test]
fn map_relevant_append_registers_in_the_shared_spec() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(&dir, "maps.resources");

    // Metadata table with one entry carrying a map-resource name.
    let mut raw = Vec::new();
    raw.write_u32_le(1).unwrap();
    raw.write_u64_le(resource_hash("art/intro_banner.tga")).unwrap();
    raw.write_u64_le(0xBEEF).unwrap();
    raw.write_u32_le(21).unwrap();
    raw.extend_from_slice(&[0, 0, 0]);
    for s in ["image", "game/sp/intro/intro", "image"] {
        raw.extend_from_slice(&(s.len() as u16).to_le_bytes());
        raw.extend_from_slice(s.as_bytes());
    }
    let compressed = ZlibCodec.compress(&raw, 6).unwrap();
    let metadata = ResourceDataMap::parse(&compressed).unwrap();

    let map_spec = Arc::new(Mutex::new(PackageMapSpec::default()));
    let report = PatchRunner::new(
        Arc::new(ZlibCodec),
        Arc::new(metadata),
        Arc::clone(&map_spec),
        PatchOptions::default(),
    )
    .run(vec![ContainerJob {
        path,
        mods: vec![ModFile::plain(
            "art/intro_banner.tga",
            "maps.resources",
            vec![9u8; 48],
        )],
    }]);
    assert_eq!(report.chunks_added, 1);
    assert!(report.errors.is_empty());

    let spec = map_spec.lock();
    assert_eq!(spec.maps.len(), 1);
    assert_eq!(spec.maps[0].name, "game/sp/intro/intro");
    assert_eq!(spec.files.len(), 1);
    assert_eq!(spec.files[0].name, "art/intro_banner.tga");
    assert_eq!(spec.map_file_refs.len(), 1);
}

#[test]
fn higher_priority_mod_is_processed_first() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(&dir, "prio.resources");

    let mut low = ModFile::plain(
        "gameplay/rules.decl",
        "prio.resources",
        b"low-priority----".to_vec(),
    );
    low.load_priority = 0;
    let mut high = ModFile::plain(
        "gameplay/rules.decl",
        "prio.resources",
        b"high-priority---".to_vec(),
    );
    high.load_priority = 10;

    // Discovery order deliberately lists the low-priority mod first; the
    // sort must still run the high-priority one before it, making the
    // low-priority payload the last writer for this shared target.
    let report = runner(PatchOptions {
        mode: PatchMode::InPlace,
        ..PatchOptions::default()
    })
    .run(vec![ContainerJob {
        path: path.clone(),
        mods: vec![low, high],
    }]);
    assert_eq!(report.chunks_replaced, 2);

    let buf = std::fs::read(&path).unwrap();
    let container = ResourceContainer::parse(&buf).unwrap();
    let index = container.find_chunk("gameplay/rules.decl").unwrap();
    assert_eq!(
        chunk_data(&buf, &container.chunks[index]).unwrap(),
        b"low-priority----"
    );
}
