//! CLI command definitions and handlers.
//!
//! Each subcommand is implemented as a function that takes the parsed
//! arguments and returns an `anyhow::Result<()>`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::runtime::Runtime;

use crate::config::{AdvancePolicy, PlaybackConfig, SubfolderConfig};
use crate::controller::PlaybackController;
use crate::model::{MediaItem, MediaType};
use crate::provider::subfolder::SubfolderProvider;
use crate::provider::{MediaProvider, simple::SimpleFolderProvider};
use crate::source::fs::FsBrowser;

/// Slideflow CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Count the media files under a directory tree
    ///
    /// The exact count makes a good `total_estimate` setting.
    Estimate {
        /// Root of the tree to count
        path: PathBuf,
    },
    /// Run one sampling pass and print the queue it produces
    Sample {
        /// Root of the tree to sample
        path: PathBuf,
        /// Target queue size
        #[arg(short, long, default_value = "50")]
        target: usize,
        /// Maximum folder depth below the root (0 = unlimited)
        #[arg(short, long, default_value = "0")]
        depth: usize,
        /// Total-count estimate; defaults to adaptive estimation
        #[arg(long)]
        estimate: Option<u64>,
        /// Seed for reproducible sampling
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Play a folder as a slideshow in the terminal
    Play {
        /// Folder to play
        path: PathBuf,
        /// Seconds between advances
        #[arg(short, long, default_value = "3")]
        interval: u64,
        /// Stop after this many items (0 = until exhausted)
        #[arg(short, long, default_value = "0")]
        count: usize,
    },
}

/// Run the specified CLI command.
///
/// Returns `Ok(true)` if a command was run, `Ok(false)` if no command
/// was specified (meaning the configured slideshow should run).
pub fn run_command(cli: &Cli) -> anyhow::Result<bool> {
    let rt = Runtime::new()?;

    match &cli.command {
        Some(Commands::Estimate { path }) => {
            cmd_estimate(path)?;
            Ok(true)
        }
        Some(Commands::Sample {
            path,
            target,
            depth,
            estimate,
            seed,
        }) => {
            cmd_sample(&rt, path, *target, *depth, *estimate, *seed)?;
            Ok(true)
        }
        Some(Commands::Play {
            path,
            interval,
            count,
        }) => {
            cmd_play(&rt, path, *interval, *count)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

// ============================================================================
// Individual command implementations
// ============================================================================

fn cmd_estimate(path: &Path) -> anyhow::Result<()> {
    println!("Counting media under {}...", path.display());

    let mut images: u64 = 0;
    let mut videos: u64 = 0;
    let mut folders: u64 = 0;
    let mut per_folder: BTreeMap<String, u64> = BTreeMap::new();

    for entry in walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.file_type().is_dir() {
            folders += 1;
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        match MediaType::from_filename(&name) {
            Some(MediaType::Image) => images += 1,
            Some(MediaType::Video) => videos += 1,
            None => continue,
        }
        if let Some(parent) = entry.path().parent() {
            *per_folder
                .entry(parent.to_string_lossy().to_string())
                .or_insert(0) += 1;
        }
    }

    let total = images + videos;
    println!();
    println!("  Folders: {folders}");
    println!("  Images:  {images}");
    println!("  Videos:  {videos}");
    println!("  Total:   {total}");

    if let Some((largest, count)) = per_folder.iter().max_by_key(|(_, count)| **count) {
        println!();
        println!("  Largest folder: {largest} ({count} files)");
    }
    println!();
    println!("Use `total_estimate = {total}` for exact sampling probabilities.");
    Ok(())
}

fn cmd_sample(
    rt: &Runtime,
    path: &Path,
    target: usize,
    depth: usize,
    estimate: Option<u64>,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    rt.block_on(async {
        let config = SubfolderConfig {
            target_queue_size: target,
            max_depth: depth,
            total_estimate: estimate,
            seed,
            ..Default::default()
        };
        let mut provider = SubfolderProvider::new(
            path.to_string_lossy().to_string(),
            config,
            Arc::new(FsBrowser::new()),
            crate::cache::shared(1),
        );

        provider.initialize().await?;
        let counters = provider.counters();
        println!(
            "Scanned {} folders, queued {} of a target {}.",
            counters.discovered_folders,
            counters.queue_len + 1,
            target
        );
        println!();

        let mut shown = 0;
        let mut item = provider.current_item().cloned();
        while let Some(current) = item {
            println!("{:>4}  {}", shown + 1, current.path);
            shown += 1;
            if shown >= target {
                break;
            }
            item = provider.next_item().await;
        }
        anyhow::Ok(())
    })?;
    Ok(())
}

fn cmd_play(rt: &Runtime, path: &Path, interval: u64, count: usize) -> anyhow::Result<()> {
    rt.block_on(async {
        let provider = SimpleFolderProvider::new(
            path.to_string_lossy().to_string(),
            Arc::new(FsBrowser::new()),
        );
        let playback = PlaybackConfig {
            interval_secs: interval.max(1),
            advance_policy: AdvancePolicy::Reset,
            history_capacity: 100,
        };
        let mut controller = PlaybackController::new(Box::new(provider), &playback);
        controller.start().await?;

        if let Some(first) = controller.current() {
            print_item(1, &first);
        }

        let mut shown = 1;
        while count == 0 || shown < count {
            match controller.run_once().await {
                Some(item) => {
                    shown += 1;
                    print_item(shown, &item);
                }
                None => break,
            }
        }
        println!("\nShowed {shown} item(s).");
        anyhow::Ok(())
    })?;
    Ok(())
}

fn print_item(number: usize, item: &MediaItem) {
    let place = item
        .metadata
        .as_ref()
        .and_then(|m| m.place.clone())
        .map(|p| format!("  [{p}]"))
        .unwrap_or_default();
    println!("{number:>4}  {}{place}", item.path);
}
