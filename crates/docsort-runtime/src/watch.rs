//! Watch loop: detect new files in the input directory and run each one
//! through the pipeline on its own worker.
//!
//! The `notify` watcher runs on its own OS thread and forwards candidate
//! paths over a channel to a dispatcher task. The dispatcher never waits on
//! a worker. Workers settle the file, then take a semaphore permit before
//! processing, so at most `max_workers` documents are in the pipeline at once.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use docsort_core::{DocSortConfig, Error, Result, SettleConfig};
use docsort_ingest::is_candidate;

use crate::orchestrator::Pipeline;
use crate::types::{SettleOutcome, Stage, WatchStatus};

/// Wait until `path` stops changing.
///
/// Probes size and mtime every `poll_interval`; the file is stable once
/// `stable_polls` consecutive probes match the previous one and it is not
/// empty.
pub async fn wait_until_stable(path: &Path, settle: &SettleConfig) -> SettleOutcome {
    let deadline = Instant::now() + settle.timeout;
    let mut last: Option<(u64, Option<SystemTime>)> = None;
    let mut stable = 0u32;

    loop {
        let observed = match tokio::fs::metadata(path).await {
            Ok(meta) => (meta.len(), meta.modified().ok()),
            Err(_) => return SettleOutcome::Vanished,
        };

        if observed.0 > 0 && last.as_ref() == Some(&observed) {
            stable += 1;
            if stable >= settle.stable_polls {
                return SettleOutcome::Stable;
            }
        } else {
            stable = 0;
        }
        last = Some(observed);

        if Instant::now() >= deadline {
            return SettleOutcome::TimedOut;
        }
        tokio::time::sleep(settle.poll_interval).await;
    }
}

/// Paths a watcher event adds to the input directory.
fn arrived_paths(event: &Event) -> Vec<PathBuf> {
    let paths: Vec<PathBuf> = match &event.kind {
        EventKind::Create(_) => event.paths.clone(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event.paths.clone(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.last().cloned().into_iter().collect()
        }
        // Platforms that cannot tell rename source from target.
        EventKind::Modify(ModifyKind::Name(RenameMode::Any)) => {
            event.paths.iter().filter(|p| p.exists()).cloned().collect()
        }
        _ => Vec::new(),
    };
    paths.into_iter().filter(|p| is_candidate(p)).collect()
}

struct RunningWatch {
    // Dropping the watcher closes the channel and ends the dispatcher.
    _watcher: RecommendedWatcher,
    started_at: String,
}

/// Start/stop control over the input directory watcher.
pub struct WatchLoop {
    pipeline: Arc<Pipeline>,
    input_dir: PathBuf,
    settle: SettleConfig,
    max_workers: usize,
    scan_existing: bool,
    semaphore: Arc<Semaphore>,
    in_flight: Arc<Mutex<HashSet<PathBuf>>>,
    running: Mutex<Option<RunningWatch>>,
}

impl WatchLoop {
    pub fn new(pipeline: Arc<Pipeline>, config: &DocSortConfig) -> Self {
        let max_workers = config.max_workers.max(1);
        Self {
            pipeline,
            input_dir: config.input_dir.clone(),
            settle: config.settle.clone(),
            max_workers,
            scan_existing: config.scan_existing,
            semaphore: Arc::new(Semaphore::new(max_workers)),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            running: Mutex::new(None),
        }
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    pub fn status(&self) -> WatchStatus {
        let running = self.running.lock();
        WatchStatus {
            running: running.is_some(),
            input_dir: self.input_dir.clone(),
            in_flight: self.in_flight.lock().len(),
            max_workers: self.max_workers,
            started_at: running.as_ref().map(|r| r.started_at.clone()),
        }
    }

    /// Start watching. Must be called from within a tokio runtime.
    /// Starting a running loop is a no-op.
    pub fn start(&self) -> Result<()> {
        let mut running = self.running.lock();
        if running.is_some() {
            return Ok(());
        }

        std::fs::create_dir_all(&self.input_dir)?;

        let (tx, rx) = mpsc::unbounded_channel::<PathBuf>();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for path in arrived_paths(&event) {
                    if tx.send(path).is_err() {
                        break;
                    }
                }
            }
            Err(e) => error!("Watch error: {}", e),
        })
        .map_err(|e| Error::Internal(format!("Failed to create watcher: {}", e)))?;

        watcher
            .watch(&self.input_dir, RecursiveMode::NonRecursive)
            .map_err(|e| {
                Error::Internal(format!("Failed to watch {}: {}", self.input_dir.display(), e))
            })?;

        let dispatcher = Dispatcher {
            pipeline: Arc::clone(&self.pipeline),
            settle: self.settle.clone(),
            semaphore: Arc::clone(&self.semaphore),
            in_flight: Arc::clone(&self.in_flight),
        };
        let scan_dir = self.scan_existing.then(|| self.input_dir.clone());
        tokio::spawn(dispatcher.run(rx, scan_dir));

        *running = Some(RunningWatch {
            _watcher: watcher,
            started_at: chrono::Utc::now().to_rfc3339(),
        });
        info!("Watching {}", self.input_dir.display());
        Ok(())
    }

    /// Stop watching. Workers already running finish their document.
    /// Returns false if the loop was not running.
    pub fn stop(&self) -> bool {
        let stopped = self.running.lock().take().is_some();
        if stopped {
            info!("Stopped watching {}", self.input_dir.display());
        }
        stopped
    }
}

#[derive(Clone)]
struct Dispatcher {
    pipeline: Arc<Pipeline>,
    settle: SettleConfig,
    semaphore: Arc<Semaphore>,
    in_flight: Arc<Mutex<HashSet<PathBuf>>>,
}

impl Dispatcher {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<PathBuf>, scan_dir: Option<PathBuf>) {
        if let Some(dir) = scan_dir {
            match existing_files(&dir) {
                Ok(paths) => {
                    if !paths.is_empty() {
                        info!("Scheduling {} file(s) already in {}", paths.len(), dir.display());
                    }
                    for path in paths {
                        self.schedule(path);
                    }
                }
                Err(e) => warn!("Startup scan of {} failed: {}", dir.display(), e),
            }
        }

        while let Some(path) = rx.recv().await {
            self.schedule(path);
        }
        debug!("Watch dispatcher stopped");
    }

    /// Spawn a worker for `path` unless one is already handling it.
    fn schedule(&self, path: PathBuf) {
        if !self.in_flight.lock().insert(path.clone()) {
            debug!("Already in flight: {}", path.display());
            return;
        }
        debug!(stage = %Stage::Detected, "{}", path.display());

        let worker = self.clone();
        tokio::spawn(async move {
            worker.process(&path).await;
            worker.in_flight.lock().remove(&path);
        });
    }

    async fn process(&self, path: &Path) {
        debug!(stage = %Stage::Settling, "{}", path.display());
        match wait_until_stable(path, &self.settle).await {
            SettleOutcome::Stable => {}
            SettleOutcome::TimedOut => warn!(
                "{} still changing after {:?}; processing anyway",
                path.display(),
                self.settle.timeout
            ),
            SettleOutcome::Vanished => {
                debug!("{} disappeared before processing", path.display());
                return;
            }
        }

        let Ok(_permit) = self.semaphore.acquire().await else {
            return;
        };
        // Moved or deleted while waiting for a worker slot.
        if !path.is_file() {
            return;
        }
        self.pipeline.process_file(path).await;
    }
}

/// Regular, non-hidden files currently in `dir`, sorted by name.
fn existing_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() && is_candidate(&entry.path()) {
            paths.push(entry.path());
        }
    }
    paths.sort();
    Ok(paths)
}
