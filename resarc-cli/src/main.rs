//! resarc-cli - command-line mod injector for game resource containers
//!
//! Discovers loose mod bundles on disk, matches their payloads to the
//! game's resource containers and drives the `resarc` patching engine,
//! one parallel task per container.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use parking_lot::Mutex;
use resarc::{
    ContainerJob, ModFile, ModManifest, PackageMapSpec, PatchMode, PatchOptions, PatchRunner,
    ResourceContainer, ResourceDataMap, ZlibCodec,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(
    name = "resarc-cli",
    about = "Mod injector for game resource containers",
    long_about = None,
    after_help = "EXAMPLES:
    # List the chunks of a container
    resarc-cli list base/gameresources.resources

    # Inject every mod bundle under Mods/ into the game directory
    resarc-cli patch /games/example Mods/

    # Same, but resize chunks in place instead of growing the files
    resarc-cli patch /games/example Mods/ --slow"
)]
#[command(version)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(global = true, short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List chunks in a container
    List {
        /// Path to the container file
        container: PathBuf,
    },
    /// Patch a game directory with mod bundles
    Patch {
        /// Base game directory holding the containers
        game_dir: PathBuf,
        /// Directory of mod bundles (one subdirectory per mod)
        mods_dir: PathBuf,
        /// Replace chunks in place instead of appending ("slow mode")
        #[arg(long)]
        slow: bool,
        /// Compress .tga payloads before storing them
        #[arg(long)]
        compress_textures: bool,
        /// Process containers one at a time
        #[arg(long)]
        sequential: bool,
        /// Resource metadata table for newly-added assets
        #[arg(long)]
        metadata: Option<PathBuf>,
        /// Package map spec JSON to update alongside the containers
        #[arg(long)]
        map_spec: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::from_default_env()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    // Only setup failures abort with a non-zero code; a run that patched
    // what it could exits zero and reports problems on the console.
    if let Err(e) = run(cli.command) {
        eprintln!("{} {e:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::List { container } => list(&container),
        Commands::Patch {
            game_dir,
            mods_dir,
            slow,
            compress_textures,
            sequential,
            metadata,
            map_spec,
        } => {
            let options = PatchOptions {
                mode: if slow {
                    PatchMode::InPlace
                } else {
                    PatchMode::Append
                },
                compress_textures,
                sequential,
            };
            patch(&game_dir, &mods_dir, options, metadata, map_spec)
        }
    }
}

fn list(path: &Path) -> Result<()> {
    let buf = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let container = ResourceContainer::parse(&buf)?;

    println!(
        "{}: {} chunks, {} names",
        path.display(),
        container.file_count,
        container.names.len()
    );
    for chunk in &container.chunks {
        println!(
            "{:>12}  {:>12}  {}",
            chunk.compressed_size,
            chunk.uncompressed_size,
            container.chunk_name(chunk)
        );
    }
    Ok(())
}

fn patch(
    game_dir: &Path,
    mods_dir: &Path,
    options: PatchOptions,
    metadata: Option<PathBuf>,
    map_spec_path: Option<PathBuf>,
) -> Result<()> {
    if !game_dir.is_dir() {
        bail!("game directory {} does not exist", game_dir.display());
    }

    let containers = discover_containers(game_dir);
    if containers.is_empty() {
        bail!("no .resources containers under {}", game_dir.display());
    }

    let metadata = match metadata {
        Some(path) => ResourceDataMap::load(&path)
            .with_context(|| format!("loading metadata table {}", path.display()))?,
        None => ResourceDataMap::empty(),
    };

    let map_spec = match &map_spec_path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading map spec {}", path.display()))?;
            serde_json::from_str::<PackageMapSpec>(&text)
                .with_context(|| format!("parsing map spec {}", path.display()))?
        }
        None => PackageMapSpec::default(),
    };
    let map_spec = Arc::new(Mutex::new(map_spec));

    let mods = discover_mods(mods_dir)?;
    let jobs = build_jobs(&containers, mods);
    if jobs.is_empty() {
        bail!("no mod payloads match any container");
    }

    let runner = PatchRunner::new(
        Arc::new(ZlibCodec),
        Arc::new(metadata),
        Arc::clone(&map_spec),
        options,
    );
    let report = runner.run(jobs);

    if let Some(path) = map_spec_path {
        let text = serde_json::to_string_pretty(&*map_spec.lock())?;
        std::fs::write(&path, text)
            .with_context(|| format!("writing map spec {}", path.display()))?;
    }

    let summary = format!(
        "{} containers patched, {} chunks replaced, {} chunks added",
        report.containers_patched, report.chunks_replaced, report.chunks_added
    );
    if report.errors.is_empty() && report.warnings.is_empty() {
        println!("{}", summary.green());
    } else {
        println!(
            "{} ({} warnings, {} errors)",
            summary.yellow(),
            report.warnings.len(),
            report.errors.len()
        );
    }
    Ok(())
}

/// Containers live directly in the game directory and its `base`
/// subdirectory.
fn discover_containers(game_dir: &Path) -> HashMap<String, PathBuf> {
    let mut containers = HashMap::new();
    for dir in [game_dir.to_path_buf(), game_dir.join("base")] {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "resources") {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    containers.entry(name.to_string()).or_insert(path);
                }
            }
        }
    }
    containers
}

/// Walk the mod bundles: `mods_dir/<mod>/<container-stem>/<asset path>`,
/// with an optional `mod.json` manifest per bundle carrying the priority.
fn discover_mods(mods_dir: &Path) -> Result<Vec<ModFile>> {
    let mut mods = Vec::new();
    let Ok(bundles) = std::fs::read_dir(mods_dir) else {
        bail!("mods directory {} does not exist", mods_dir.display());
    };

    for bundle in bundles.flatten() {
        let bundle_path = bundle.path();
        if !bundle_path.is_dir() {
            continue;
        }

        let manifest = read_manifest(&bundle_path);
        for entry in WalkDir::new(&bundle_path).into_iter().flatten() {
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&bundle_path)
                .expect("walkdir stays under its root");
            let mut parts = relative.iter().filter_map(|p| p.to_str());
            let Some(container_stem) = parts.next() else {
                continue;
            };
            if container_stem == "mod.json" {
                continue;
            }
            let asset_name = parts.collect::<Vec<_>>().join("/");
            if asset_name.is_empty() {
                log::warn!("skipping {}: no asset path", entry.path().display());
                continue;
            }

            let payload = match std::fs::read(entry.path()) {
                Ok(payload) => payload,
                Err(e) => {
                    log::warn!("skipping {}: {e}", entry.path().display());
                    continue;
                }
            };
            let mut mod_file = ModFile::plain(
                &asset_name,
                &format!("{container_stem}.resources"),
                payload,
            );
            mod_file.load_priority = manifest.load_priority;
            mods.push(mod_file);
        }
    }

    Ok(mods)
}

fn read_manifest(bundle_path: &Path) -> ModManifest {
    let path = bundle_path.join("mod.json");
    match std::fs::read_to_string(&path) {
        Ok(text) => match serde_json::from_str(&text) {
            Ok(manifest) => manifest,
            Err(e) => {
                // A bad manifest only costs the bundle its priority.
                log::warn!("malformed {}: {e}", path.display());
                ModManifest::default()
            }
        },
        Err(_) => ModManifest::default(),
    }
}

fn build_jobs(containers: &HashMap<String, PathBuf>, mods: Vec<ModFile>) -> Vec<ContainerJob> {
    let mut by_container: HashMap<String, Vec<ModFile>> = HashMap::new();
    for mod_file in mods {
        match containers.get(&mod_file.target_container) {
            Some(_) => by_container
                .entry(mod_file.target_container.clone())
                .or_default()
                .push(mod_file),
            None => log::warn!(
                "no container named {} for {}",
                mod_file.target_container,
                mod_file.name
            ),
        }
    }

    by_container
        .into_iter()
        .map(|(name, mods)| ContainerJob {
            path: containers[&name].clone(),
            mods,
        })
        .collect()
}
