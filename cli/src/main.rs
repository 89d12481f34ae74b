use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use slideshow_cli::{Args, SlideshowConfig};
use slideshow_directory_index::{DirectoryIndex, SnapshotSource};
use slideshow_rotator::RotatorRegistry;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "slideshow=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match &args.config {
        Some(path) => SlideshowConfig::load(path)?,
        None => SlideshowConfig::default(),
    }
    .with_args(&args);

    let index = DirectoryIndex::open(config.index.clone()).with_context(|| {
        format!("failed to open image directory {}", config.index.root.display())
    })?;
    let registry = Arc::new(RotatorRegistry::new(
        Arc::clone(&index) as Arc<dyn SnapshotSource>,
        config.rotation.clone(),
    ));

    let mut leases = Vec::with_capacity(args.groups.len());
    for group in &args.groups {
        let lease = registry
            .lease(group)
            .with_context(|| format!("failed to start group {group}"))?;
        let name = group.clone();
        lease.subscribe(move |item| match item {
            Some(uri) => info!(group = %name, uri, "Now showing"),
            None => info!(group = %name, "Nothing to show"),
        });
        info!(group = %group, current = ?lease.current_item(), "Following group");
        leases.push(lease);
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;

    info!("Shutting down");
    drop(leases);
    registry.dispose();
    index.shutdown();
    Ok(())
}
