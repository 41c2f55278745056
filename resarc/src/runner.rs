//! Per-container patch orchestration
//!
//! One task per container; tasks run concurrently across containers while
//! all mutation within a container stays strictly sequential: parse, then
//! every replacement, then every addition, then write-back. A failing
//! container is reported and skipped; sibling tasks are unaffected and the
//! run always completes.

use crate::append::{append_assets, NewAsset};
use crate::codec::Codec;
use crate::container::ResourceContainer;
use crate::mapspec::PackageMapSpec;
use crate::metadata::ResourceDataMap;
use crate::mods::{sort_for_processing, ModFile, ModKind};
use crate::patch::{prepare_payload, set_chunk_data, PatchMode};
use crate::Result;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

/// Run-wide options, injected rather than read from globals.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatchOptions {
    /// Replacement strategy for existing chunks
    pub mode: PatchMode,
    /// Compress `.tga` payloads through the codec before storing
    pub compress_textures: bool,
    /// Process containers one at a time instead of one task each
    pub sequential: bool,
}

/// One unit of work: a container file plus every mod payload aimed at it.
#[derive(Debug)]
pub struct ContainerJob {
    /// Path of the container on disk
    pub path: PathBuf,
    /// Payloads targeting this container, in discovery order
    pub mods: Vec<ModFile>,
}

/// Outcome of a run. The process exit code stays zero even for a partial
/// run; problems surface only through these buffered lines.
#[derive(Debug, Default)]
pub struct PatchReport {
    /// Containers successfully written back
    pub containers_patched: usize,
    /// Existing chunks replaced
    pub chunks_replaced: usize,
    /// Brand-new chunks appended
    pub chunks_added: usize,
    /// Buffered warning lines
    pub warnings: Vec<String>,
    /// Buffered error lines
    pub errors: Vec<String>,
}

impl PatchReport {
    fn merge(&mut self, other: PatchReport) {
        self.containers_patched += other.containers_patched;
        self.chunks_replaced += other.chunks_replaced;
        self.chunks_added += other.chunks_added;
        self.warnings.extend(other.warnings);
        self.errors.extend(other.errors);
    }

    fn warn(&mut self, line: String) {
        log::warn!("{line}");
        self.warnings.push(line);
    }

    fn error(&mut self, line: String) {
        log::error!("{line}");
        self.errors.push(line);
    }
}

/// Drives patching across containers with injected services.
pub struct PatchRunner {
    codec: Arc<dyn Codec>,
    metadata: Arc<ResourceDataMap>,
    map_spec: Arc<Mutex<PackageMapSpec>>,
    options: PatchOptions,
}

impl std::fmt::Debug for PatchRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatchRunner")
            .field("options", &self.options)
            .field("metadata_entries", &self.metadata.len())
            .finish_non_exhaustive()
    }
}

impl PatchRunner {
    /// Create a runner over the given services.
    pub fn new(
        codec: Arc<dyn Codec>,
        metadata: Arc<ResourceDataMap>,
        map_spec: Arc<Mutex<PackageMapSpec>>,
        options: PatchOptions,
    ) -> Self {
        PatchRunner {
            codec,
            metadata,
            map_spec,
            options,
        }
    }

    /// Shared package map spec, for callers that persist it after a run.
    pub fn map_spec(&self) -> Arc<Mutex<PackageMapSpec>> {
        Arc::clone(&self.map_spec)
    }

    /// Process every job and aggregate a report. Never fails as a whole:
    /// per-container errors land in the report.
    pub fn run(&self, jobs: Vec<ContainerJob>) -> PatchReport {
        let mut report = PatchReport::default();

        if self.options.sequential {
            for job in jobs {
                report.merge(self.process_container(job));
            }
        } else {
            std::thread::scope(|scope| {
                let handles: Vec<_> = jobs
                    .into_iter()
                    .map(|job| scope.spawn(move || self.process_container(job)))
                    .collect();
                for handle in handles {
                    // A panicking task is converted to an error line, not
                    // propagated to siblings.
                    match handle.join() {
                        Ok(sub) => report.merge(sub),
                        Err(_) => report.error("container task panicked".to_string()),
                    }
                }
            });
        }

        report
    }

    /// All work for one container: read, parse, replace, append, write.
    fn process_container(&self, job: ContainerJob) -> PatchReport {
        let mut report = PatchReport::default();
        let display = job.path.display().to_string();

        let mut buf = match std::fs::read(&job.path) {
            Ok(buf) => buf,
            Err(e) => {
                report.error(format!("skipping {display}: {e}"));
                return report;
            }
        };
        let mut container = match ResourceContainer::parse(&buf) {
            Ok(container) => container,
            Err(e) => {
                report.error(format!("skipping {display}: {e}"));
                return report;
            }
        };

        let mut mods = job.mods;
        sort_for_processing(&mut mods);

        if let Err(e) = self.apply_mods(&mut buf, &mut container, mods, &mut report) {
            report.error(format!("{display}: {e}"));
            return report;
        }

        if let Err(e) = std::fs::write(&job.path, &buf) {
            report.error(format!("could not write {display}: {e}"));
            return report;
        }

        report.containers_patched += 1;
        log::info!("patched {display}");
        report
    }

    /// Replace-then-append ordering: all replacements for every mod file
    /// land before any addition, each phase in descending priority order.
    fn apply_mods(
        &self,
        buf: &mut Vec<u8>,
        container: &mut ResourceContainer,
        mods: Vec<ModFile>,
        report: &mut PatchReport,
    ) -> Result<()> {
        let mut additions: Vec<NewAsset> = Vec::new();

        for mod_file in mods {
            match mod_file.kind {
                ModKind::Plain => {}
                // Non-plain payloads belong to external collaborators
                // (blang codec, sound banks, streamdb); they are not
                // patched here.
                ModKind::AssetsInfo | ModKind::Blang | ModKind::Sound | ModKind::StreamDb => {
                    log::debug!("leaving {} to its collaborator", mod_file.name);
                    continue;
                }
            }

            match container.find_chunk(&mod_file.name) {
                Some(chunk_index) => {
                    let prepared = prepare_payload(
                        &mod_file.name,
                        mod_file.payload,
                        self.codec.as_ref(),
                        self.options.compress_textures,
                    );
                    set_chunk_data(
                        buf,
                        container,
                        chunk_index,
                        &prepared.data,
                        prepared.data.len() as u64,
                        prepared.uncompressed_size,
                        prepared.compression_mode,
                        self.options.mode,
                    )?;
                    report.chunks_replaced += 1;
                    if mod_file.announce {
                        log::info!("replaced {}", mod_file.name);
                    }
                }
                None => additions.push(NewAsset {
                    name: mod_file.name,
                    payload: mod_file.payload,
                    resource_type: mod_file.resource_type,
                    version: mod_file.version,
                    stream_db_hash: mod_file.stream_db_hash,
                    special_bytes: mod_file.special_bytes,
                }),
            }
        }

        if !additions.is_empty() {
            let added = additions.len();
            append_assets(
                buf,
                container,
                &additions,
                &self.metadata,
                self.codec.as_ref(),
                self.options.compress_textures,
            )?;
            report.chunks_added += added;

            // Map-relevant additions must be visible to the game's map
            // loader; the spec is shared across container tasks.
            let mut spec = self.map_spec.lock();
            for asset in &additions {
                if let Some(entry) = self.metadata.lookup(crate::hash::resource_hash(&asset.name)) {
                    if let Some(map_name) = &entry.map_resource_name {
                        spec.add_custom_asset(map_name, &asset.name);
                    }
                }
            }
        }

        if report.chunks_replaced == 0 && report.chunks_added == 0 {
            report.warn("no applicable mod payloads for container".to_string());
        }

        Ok(())
    }
}
