//! Single-flight library scans.
//!
//! At most one scan runs at a time. [`ScanCoordinator::start`] flips the
//! state from [`ScanState::Idle`] to [`ScanState::Scanning`] under one lock
//! and hands back a [`ScanHandle`] right away; a second request while a scan
//! is running fails fast with [`Error::ScanInProgress`].
//!
//! The state is released by a [`ScanGuard`] owned by the scan itself, so it
//! returns to idle however the scan ends: completion, abort, or panic.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use parking_lot::Mutex;
use serde::Serialize;
use sqlx::SqlitePool;
use tokio::task::JoinHandle;
use tracing::info;

use super::{ScanEvent, scan_library};
use crate::cover::CoverStore;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanState {
    Idle,
    Scanning,
}

/// Counts reported by a finished scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub ingested: usize,
    pub failed: usize,
    #[serde(skip)]
    pub elapsed: Duration,
}

struct Inner {
    pool: SqlitePool,
    covers: CoverStore,
    roots: Vec<PathBuf>,
    state: Mutex<ScanState>,
}

/// Runs library scans, one at a time.
#[derive(Clone)]
pub struct ScanCoordinator {
    inner: Arc<Inner>,
}

/// Marks a scan as running; dropping it marks the coordinator idle again.
pub struct ScanGuard {
    inner: Arc<Inner>,
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        *self.inner.state.lock() = ScanState::Idle;
    }
}

/// A scan running in the background.
pub struct ScanHandle {
    handle: JoinHandle<ScanSummary>,
}

impl ScanHandle {
    /// Wait for the scan to finish.
    pub async fn wait(self) -> Result<ScanSummary> {
        self.handle.await.map_err(|e| Error::Task(e.to_string()))
    }

    /// Cancel the scan. Files already committed stay in the library.
    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl ScanCoordinator {
    pub fn new(pool: SqlitePool, covers: CoverStore, roots: Vec<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Inner {
                pool,
                covers,
                roots,
                state: Mutex::new(ScanState::Idle),
            }),
        }
    }

    pub fn state(&self) -> ScanState {
        *self.inner.state.lock()
    }

    pub fn is_scanning(&self) -> bool {
        self.state() == ScanState::Scanning
    }

    /// Claim the scanning state, or fail if a scan is already running.
    fn try_begin(&self) -> Result<ScanGuard> {
        let mut state = self.inner.state.lock();
        if *state == ScanState::Scanning {
            return Err(Error::ScanInProgress);
        }
        *state = ScanState::Scanning;
        Ok(ScanGuard {
            inner: Arc::clone(&self.inner),
        })
    }

    /// Start a scan in the background and return immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<ScanHandle> {
        let guard = self.try_begin()?;
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let _guard = guard;
            run(&inner).await
        });
        Ok(ScanHandle { handle })
    }

    /// Run a scan to completion on the current task.
    pub async fn scan_all(&self) -> Result<ScanSummary> {
        let _guard = self.try_begin()?;
        Ok(run(&self.inner).await)
    }
}

async fn run(inner: &Inner) -> ScanSummary {
    let started = Instant::now();
    info!(target: "library::scan", roots = inner.roots.len(), "Library scan started");

    let events = scan_library(inner.pool.clone(), inner.covers.clone(), inner.roots.clone());
    let mut summary = events
        .fold(ScanSummary::default(), |mut summary, event| async move {
            match event {
                ScanEvent::Processed(_) => summary.ingested += 1,
                ScanEvent::Error(..) => summary.failed += 1,
            }
            summary
        })
        .await;
    summary.elapsed = started.elapsed();

    info!(
        target: "library::scan",
        ingested = summary.ingested,
        failed = summary.failed,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "Library scan complete"
    );
    summary
}
