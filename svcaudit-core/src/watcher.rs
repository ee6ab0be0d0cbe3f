//! Polling watcher that keeps a rules file cached in memory.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AuditError, Result};

/// File name searched for when none is configured.
pub const DEFAULT_RULES_FILE: &str = "RULES.md";
/// Poll interval used when none is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Lower bound applied to every poll interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

const SEARCH_DEPTH: usize = 8;

/// Locate `name` in `start` or one of its ancestors.
///
/// Falls back to `start/name` when no ancestor within eight levels has it.
pub fn find_rules_file(start: &Path, name: &str) -> PathBuf {
    start
        .ancestors()
        .take(SEARCH_DEPTH)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.exists())
        .unwrap_or_else(|| start.join(name))
}

/// Rules file contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RulesSnapshot {
    /// File location.
    pub path: String,
    /// File contents.
    pub content: String,
    /// Whether the contents came from the watcher cache.
    pub from_cache: bool,
}

/// Watcher state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct WatcherStatus {
    /// Whether the polling thread is alive.
    pub running: bool,
    /// Effective poll interval in milliseconds.
    pub poll_interval_ms: u64,
}

/// Read the rules file directly, bypassing any cache.
pub fn load_rules(path: &Path) -> Result<RulesSnapshot> {
    if !path.exists() {
        return Err(AuditError::RulesNotFound(path.to_path_buf()));
    }
    Ok(RulesSnapshot {
        path: path.display().to_string(),
        content: std::fs::read_to_string(path)?,
        from_cache: false,
    })
}

#[derive(Debug, Default)]
struct RulesCache {
    content: Option<String>,
    modified: Option<SystemTime>,
}

struct Worker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

/// Keeps the contents of one rules file cached, refreshing on mtime changes.
pub struct RulesWatcher {
    path: PathBuf,
    poll_interval: Duration,
    cache: Arc<Mutex<RulesCache>>,
    worker: Option<Worker>,
}

impl RulesWatcher {
    /// Watch `path`, polling every `poll_interval` (at least [`MIN_POLL_INTERVAL`]).
    pub fn new(path: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        Self {
            path: path.into(),
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
            cache: Arc::new(Mutex::new(RulesCache::default())),
            worker: None,
        }
    }

    /// Watched file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start polling; a running watcher is left untouched.
    pub fn start(&mut self) -> WatcherStatus {
        if self.is_running() {
            return self.status();
        }

        let (stop, stopped) = mpsc::channel();
        let path = self.path.clone();
        let cache = Arc::clone(&self.cache);
        let interval = self.poll_interval;
        let handle = thread::spawn(move || {
            loop {
                refresh_cache(&path, &cache);
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });
        self.worker = Some(Worker { stop, handle });
        log::debug!("watching {} every {:?}", self.path.display(), interval);

        refresh_cache(&self.path, &self.cache);
        self.status()
    }

    /// Stop polling and wait for the thread to exit.
    pub fn stop(&mut self) -> WatcherStatus {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop.send(());
            if worker.handle.join().is_err() {
                log::warn!("rules watcher thread for {} panicked", self.path.display());
            }
        }
        self.status()
    }

    /// Whether the polling thread is alive.
    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.handle.is_finished())
    }

    /// Current state.
    pub fn status(&self) -> WatcherStatus {
        WatcherStatus {
            running: self.is_running(),
            poll_interval_ms: u64::try_from(self.poll_interval.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Re-read the file if its mtime changed; returns whether the cache changed.
    pub fn refresh(&self) -> bool {
        refresh_cache(&self.path, &self.cache)
    }

    /// Cached contents, starting the watcher when needed.
    ///
    /// Falls back to a direct read while the cache is still empty.
    pub fn cached(&mut self) -> Result<RulesSnapshot> {
        if !self.is_running() {
            self.start();
        }
        self.refresh();
        match lock(&self.cache).content.clone() {
            Some(content) => Ok(RulesSnapshot {
                path: self.path.display().to_string(),
                content,
                from_cache: true,
            }),
            None => load_rules(&self.path),
        }
    }
}

impl Drop for RulesWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock(cache: &Mutex<RulesCache>) -> MutexGuard<'_, RulesCache> {
    cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn refresh_cache(path: &Path, cache: &Mutex<RulesCache>) -> bool {
    let modified = match std::fs::metadata(path).and_then(|meta| meta.modified()) {
        Ok(modified) => modified,
        Err(_) => return false,
    };
    let mut cache = lock(cache);
    if cache.modified == Some(modified) {
        return false;
    }
    match std::fs::read_to_string(path) {
        Ok(content) => {
            cache.content = Some(content);
            cache.modified = Some(modified);
            log::debug!("refreshed rules cache from {}", path.display());
            true
        }
        Err(err) => {
            log::debug!("unable to read {}: {err}", path.display());
            false
        }
    }
}
