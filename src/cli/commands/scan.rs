//! Library scanning command.

use anyhow::Context as _;
use tokio::runtime::Runtime;
use tracing::info;

use super::Context;
use crate::cover::CoverStore;
use crate::library::ScanCoordinator;

/// Scan every configured library directory
pub fn cmd_scan(rt: &Runtime, ctx: &Context) -> anyhow::Result<()> {
    let library = &ctx.config.library;
    let coordinator = ScanCoordinator::new(
        ctx.pool.clone(),
        CoverStore::new(&library.artwork_dir),
        library.directories.clone(),
    );

    if !ctx.json {
        for dir in &library.directories {
            println!("Scanning directory: {}", dir.display());
        }
    }

    let summary = rt.block_on(async {
        let handle = coordinator.start()?;
        info!(target: "library::scan", "Scan accepted");
        handle.wait().await
    })
    .context("Library scan failed")?;

    ctx.emit(&summary, || {
        println!(
            "Scan complete: {} ingested, {} failed ({:.1}s).",
            summary.ingested,
            summary.failed,
            summary.elapsed.as_secs_f64()
        );
    })
}
