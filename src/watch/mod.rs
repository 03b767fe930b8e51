//! Directory listener.
//!
//! Watches one directory and turns filesystem changes into `upsert(path)` and
//! `remove(path)` calls on a [`ContentHandler`]. Paths are relative to the
//! watched directory. The listener knows nothing about what the files mean.
//!
//! ```text
//! notify thread ──classify──▶ bounded queue ──▶ listener thread
//!                              (drop oldest)     debounce → reconcile → handler
//! ```
//!
//! # Delivery
//!
//! The queue holds `watch.channel_capacity` classified changes. Raw events
//! that classify to nothing never enter it, and a newer change for a path
//! supersedes a queued one. A burst touching more distinct files than that
//! drops the oldest changes, so the stores are eventually consistent with the
//! disk rather than updated exactly once per write. With
//! [`OverflowPolicy::Rescan`] the listener re-lists the directory after an
//! overflow and reconciles it with the files it has seen.
//!
//! A handler error is logged and the loop keeps going; the store behind it
//! keeps its last good value.

mod classify;
mod debouncer;
mod error;
mod queue;
mod types;

#[cfg(test)]
mod tests;

pub use classify::{EventProfile, is_ignored};
pub use error::WatchError;
pub use types::Action;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use anyhow::Result;
use crossbeam::channel::RecvTimeoutError;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;

use crate::config::{OverflowPolicy, WatchConfig};
use crate::{debug, log};
use classify::ChangeFilter;
use debouncer::{Debouncer, reconcile};
use queue::{Change, ChangeReceiver};

/// Receiver of semantic changes for one directory.
pub trait ContentHandler: Send + 'static {
    /// A file was created or changed. `path` is relative to the watched directory.
    fn upsert(&self, path: &Path) -> Result<()>;

    /// A file was deleted.
    fn remove(&self, path: &Path) -> Result<()>;
}

/// Listener configuration for one directory.
pub struct Listener {
    dir: PathBuf,
    config: WatchConfig,
    profile: EventProfile,
}

impl Listener {
    pub fn new(dir: &Path, config: &WatchConfig) -> Self {
        Self {
            dir: dir.to_path_buf(),
            config: config.clone(),
            profile: EventProfile::native(),
        }
    }

    /// Attach to the directory and start the listener thread.
    ///
    /// Fails if the directory is missing or cannot be watched.
    pub fn spawn<H: ContentHandler>(self, handler: H) -> Result<ListenerHandle, WatchError> {
        if !self.dir.exists() {
            return Err(WatchError::MissingDirectory(self.dir));
        }
        if !self.dir.is_dir() {
            return Err(WatchError::NotADirectory(self.dir));
        }
        // Event sources may report canonical paths (e.g. /private/var on macOS)
        let root = fs::canonicalize(&self.dir).map_err(|err| WatchError::Attach {
            path: self.dir.clone(),
            source: notify::Error::io(err),
        })?;

        let (tx, rx) = queue::bounded(self.config.channel_capacity);
        let filter = ChangeFilter::new(root.clone(), self.profile);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    debug!("watch"; "raw notify: {:?} {:?}", event.kind, event.paths);
                    if event.need_rescan() {
                        tx.mark_overflow();
                    }
                    for change in filter.changes(&event) {
                        tx.push(change);
                    }
                }
                Err(e) => {
                    log!("watch"; "notify error: {}", e);
                    tx.mark_overflow();
                }
            }
        })
        .map_err(|source| WatchError::Attach {
            path: self.dir.clone(),
            source,
        })?;

        watcher
            .watch(&root, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::Attach {
                path: self.dir.clone(),
                source,
            })?;

        let stop = Arc::new(AtomicBool::new(false));
        let worker = Worker {
            known: list_files(&root),
            root,
            overflow: self.config.overflow,
            debouncer: Debouncer::new(self.config.debounce()),
            handler,
            stop: Arc::clone(&stop),
        };

        let name = self
            .dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let thread = thread::Builder::new()
            .name(format!("watch-{name}"))
            .spawn(move || worker.run(rx))
            .map_err(|source| WatchError::Spawn {
                path: self.dir.clone(),
                source,
            })?;

        debug!("watch"; "watching {}", self.dir.display());
        Ok(ListenerHandle {
            watcher: Some(watcher),
            stop,
            thread: Some(thread),
        })
    }
}

/// Keeps a listener alive. Dropping it detaches the watcher and joins the thread.
pub struct ListenerHandle {
    watcher: Option<RecommendedWatcher>,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        drop(self.watcher.take());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

struct Worker<H> {
    root: PathBuf,
    overflow: OverflowPolicy,
    debouncer: Debouncer,
    handler: H,
    /// Relative paths that exist as far as the handler knows.
    known: FxHashSet<PathBuf>,
    stop: Arc<AtomicBool>,
}

impl<H: ContentHandler> Worker<H> {
    fn run(mut self, rx: ChangeReceiver) {
        while !self.stop.load(Ordering::SeqCst) {
            match rx.rx.recv_timeout(self.debouncer.sleep_duration()) {
                Ok(change) => {
                    self.absorb(change);
                    // Drain whatever else is queued before dispatching.
                    while let Ok(change) = rx.rx.try_recv() {
                        self.absorb(change);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            if rx.take_overflow() {
                self.on_overflow();
            }

            for (path, action) in self.debouncer.take_ready() {
                self.dispatch(&path, action);
            }
        }
    }

    fn absorb(&mut self, (path, action): Change) {
        self.debouncer.add(path, action);
    }

    fn dispatch(&mut self, relative: &Path, action: Action) {
        let full = self.root.join(relative);
        if full.is_dir() {
            return;
        }

        let action = reconcile(&full, action);
        let result = match action {
            Action::Upsert => {
                self.known.insert(relative.to_path_buf());
                self.handler.upsert(relative)
            }
            Action::Remove => {
                // Never seen: nothing downstream to remove
                if !self.known.remove(relative) {
                    debug!("watch"; "skip remove (unknown): {}", relative.display());
                    return;
                }
                self.handler.remove(relative)
            }
        };

        if let Err(e) = result {
            log!("error"; "{} {}: {:#}", action.label(), relative.display(), e);
        }
    }

    fn on_overflow(&mut self) {
        match self.overflow {
            OverflowPolicy::Drop => {
                log!("warning"; "event queue for {} overflowed, some changes may be missed", self.root.display());
            }
            OverflowPolicy::Rescan => {
                log!("watch"; "event queue for {} overflowed, rescanning", self.root.display());
                self.rescan();
            }
        }
    }

    /// Upsert every file present, remove every known file that vanished.
    fn rescan(&mut self) {
        self.debouncer.clear();
        let present = list_files(&self.root);

        let mut gone: Vec<_> = self.known.difference(&present).cloned().collect();
        gone.sort();
        for path in gone {
            self.dispatch(&path, Action::Remove);
        }

        let mut present: Vec<_> = present.into_iter().collect();
        present.sort();
        for path in present {
            self.dispatch(&path, Action::Upsert);
        }
    }
}

/// Relative names of the non-ignored files directly inside `dir`.
fn list_files(dir: &Path) -> FxHashSet<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return FxHashSet::default();
    };
    entries
        .flatten()
        .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
        .map(|e| PathBuf::from(e.file_name()))
        .filter(|p| !is_ignored(p))
        .collect()
}
