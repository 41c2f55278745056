//! Mod file model
//!
//! A mod is an externally supplied bundle of replacement/addition payloads
//! with a load priority and a safety flag. Each payload targets one asset
//! in one container. The kind of a payload is a closed set; every
//! processing stage matches it exhaustively so a new kind cannot be half
//! wired in.

use serde::Deserialize;

/// What a mod payload is, decided from its path inside the mod bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModKind {
    /// Asset-declaration JSON describing brand-new assets
    AssetsInfo,
    /// Localization string table payload
    Blang,
    /// Plain chunk payload (replacement or addition)
    Plain,
    /// Sound bank payload
    Sound,
    /// Streamed-data database payload
    StreamDb,
}

impl ModKind {
    /// Classify a payload by its path inside the mod bundle.
    pub fn classify(path: &str) -> Self {
        let lower = path.to_ascii_lowercase();
        if lower.ends_with("assetsinfo.json") {
            ModKind::AssetsInfo
        } else if lower.ends_with(".blang") || lower.contains("/strings/") {
            ModKind::Blang
        } else if lower.starts_with("sound/") || lower.contains("/sound/") {
            ModKind::Sound
        } else if lower.starts_with("streamdb/") {
            ModKind::StreamDb
        } else {
            ModKind::Plain
        }
    }
}

/// One payload from a mod, fully read into memory.
#[derive(Debug, Clone)]
pub struct ModFile {
    /// Asset path inside the target container
    pub name: String,
    /// Target container file name, e.g. `gameresources.resources`
    pub target_container: String,
    /// Payload bytes
    pub payload: Vec<u8>,
    /// Whether to report this change in the run summary
    pub announce: bool,
    /// Priority inherited from the owning mod; higher runs earlier
    pub load_priority: i32,
    /// Payload kind
    pub kind: ModKind,
    /// Declared resource type, for newly-added assets only
    pub resource_type: Option<String>,
    /// Declared version, for newly-added assets only
    pub version: Option<u32>,
    /// Declared stream database hash, for newly-added assets only
    pub stream_db_hash: Option<u64>,
    /// Declared special bytes, for newly-added assets only
    pub special_bytes: Option<[u8; 3]>,
}

impl ModFile {
    /// Create a plain payload with default priority.
    pub fn plain(name: &str, target_container: &str, payload: Vec<u8>) -> Self {
        ModFile {
            name: name.to_string(),
            target_container: target_container.to_string(),
            payload,
            announce: true,
            load_priority: 0,
            kind: ModKind::classify(name),
            resource_type: None,
            version: None,
            stream_db_hash: None,
            special_bytes: None,
        }
    }
}

/// Per-mod manifest, read from an optional `mod.json` in the bundle root.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModManifest {
    /// Display name of the mod
    pub name: String,
    /// Load priority; higher priority mods are processed first
    pub load_priority: i32,
    /// Required mod-loader version, ignored here
    pub required_version: Option<u32>,
}

/// Order mod files for processing: descending load priority, discovery
/// order within equal priorities (stable sort). Higher-priority mods run
/// first; same-target collisions are last-write-wins by iteration order.
pub fn sort_for_processing(files: &mut [ModFile]) {
    files.sort_by(|a, b| b.load_priority.cmp(&a.load_priority));
}
