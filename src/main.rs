//! Slideflow - the media selection engine behind a slideshow widget.
//!
//! Picks which photo or video to show next from large, unevenly
//! structured collections: a local folder tree sampled probabilistically
//! or an externally indexed catalog paged over HTTP. Run without a
//! command it plays the configured slideshow; CLI commands expose the
//! sampler directly.

pub mod cache;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod geocode;
pub mod history;
pub mod model;
pub mod provider;
pub mod source;
#[cfg(test)]
pub mod test_utils;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::from_default_env().add_directive("slideflow=info".parse().unwrap()))
        .init();

    // Try to run a CLI command
    if cli::run_command(&args)? {
        return Ok(());
    }

    // No command specified, play the configured slideshow
    let config = config::load();
    config.validate()?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_slideshow(config))
}

async fn run_slideshow(config: config::Config) -> anyhow::Result<()> {
    let catalog: Option<Arc<dyn source::CatalogIndex>> = if config.catalog.base_url.is_empty() {
        None
    } else {
        Some(Arc::new(catalog::CatalogClient::new(
            &config.catalog.base_url,
        )?))
    };
    let geocoder: Option<Arc<dyn source::Geocoder>> = if config.catalog.geocode_url.is_empty() {
        None
    } else {
        Some(Arc::new(geocode::GeocodeClient::new(
            &config.catalog.geocode_url,
        )?))
    };

    let deps = provider::ProviderDeps {
        browser: Arc::new(source::fs::FsBrowser::new()),
        catalog,
        geocoder,
        scan_cache: cache::shared(config.cache.capacity),
    };
    let provider = provider::provider_for(&config, &deps)?;

    let mut controller = controller::PlaybackController::new(provider, &config.playback);
    controller.start().await?;

    if let Some(item) = controller.current() {
        println!("{}", item.path);
    }
    while let Some(item) = controller.run_once().await {
        println!("{}", item.path);
    }
    Ok(())
}
