//! # resarc - Resource Container Patching Engine
//!
//! A safe Rust implementation of in-place patching for proprietary game
//! resource containers: archive files holding many named, individually
//! (de)compressible asset chunks, cross-referenced through a header, a name
//! table, a name-id table and a file-info table of absolute offsets.
//!
//! The engine parses a container into an index, replaces existing chunk
//! payloads (appending at end-of-file or resizing in place), and splices
//! brand-new assets into every offset table while keeping the whole file
//! internally consistent. It understands exactly one container layout; it
//! is not a general archive library, and it never deletes or reorders
//! entries.
//!
//! ## Example
//!
//! ```no_run
//! use resarc::{PatchMode, ResourceContainer, set_chunk_data};
//!
//! # fn main() -> resarc::Result<()> {
//! let mut buf = std::fs::read("gameresources.resources")?;
//! let mut container = ResourceContainer::parse(&buf)?;
//!
//! if let Some(index) = container.find_chunk("gameplay/static/rules.decl") {
//!     let payload = std::fs::read("rules.decl")?;
//!     let len = payload.len() as u64;
//!     set_chunk_data(
//!         &mut buf, &mut container, index, &payload,
//!         len, len, None, PatchMode::Append,
//!     )?;
//!     std::fs::write("gameresources.resources", &buf)?;
//! }
//! # Ok(())
//! # }
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod append;
pub mod codec;
pub mod container;
pub mod error;
pub mod hash;
pub mod io;
pub mod mapspec;
pub mod metadata;
pub mod mods;
pub mod names;
pub mod patch;
pub mod runner;

// Re-export commonly used types
pub use append::{append_assets, NewAsset};
pub use codec::{Codec, ZlibCodec};
pub use container::{ResourceChunk, ResourceContainer, CONTAINER_MAGIC};
pub use error::{Error, Result};
pub use hash::resource_hash;
pub use mapspec::PackageMapSpec;
pub use metadata::{ResourceDataEntry, ResourceDataMap};
pub use mods::{ModFile, ModKind, ModManifest};
pub use names::{normalize, NameTable};
pub use patch::{prepare_payload, set_chunk_data, PatchMode};
pub use runner::{ContainerJob, PatchOptions, PatchReport, PatchRunner};
