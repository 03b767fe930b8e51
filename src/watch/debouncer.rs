use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use super::types::Action;

/// Longest the listener sleeps with nothing pending, so it notices a stop.
pub(super) const IDLE_POLL: Duration = Duration::from_millis(250);

struct Pending {
    action: Action,
    last_seen: Instant,
    /// Arrival order of the first signal, for stable dispatch order.
    seq: u64,
}

/// Per-path quiet-window debouncer. The last signal for a path wins.
pub(super) struct Debouncer {
    window: Duration,
    pending: FxHashMap<PathBuf, Pending>,
    next_seq: u64,
}

impl Debouncer {
    pub(super) fn new(window: Duration) -> Self {
        Self {
            window,
            pending: FxHashMap::default(),
            next_seq: 0,
        }
    }

    pub(super) fn add(&mut self, path: PathBuf, action: Action) {
        self.add_at(path, action, Instant::now());
    }

    pub(super) fn add_at(&mut self, path: PathBuf, action: Action, now: Instant) {
        match self.pending.get_mut(&path) {
            Some(entry) => {
                if entry.action != action {
                    crate::debug!("watch"; "{} -> {}: {}", entry.action.label(), action.label(), path.display());
                }
                entry.action = action;
                entry.last_seen = now;
            }
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                self.pending.insert(
                    path,
                    Pending {
                        action,
                        last_seen: now,
                        seq,
                    },
                );
            }
        }
    }

    /// Remove and return every path whose quiet window has elapsed, in arrival order.
    pub(super) fn take_ready(&mut self) -> Vec<(PathBuf, Action)> {
        self.take_ready_at(Instant::now())
    }

    pub(super) fn take_ready_at(&mut self, now: Instant) -> Vec<(PathBuf, Action)> {
        let window = self.window;
        let ready: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, p)| now.saturating_duration_since(p.last_seen) >= window)
            .map(|(path, _)| path.clone())
            .collect();

        let mut out: Vec<_> = ready
            .into_iter()
            .filter_map(|path| self.pending.remove(&path).map(|p| (p.seq, path, p.action)))
            .collect();
        out.sort_by_key(|(seq, _, _)| *seq);
        out.into_iter().map(|(_, path, action)| (path, action)).collect()
    }

    /// Time until the earliest pending path becomes ready.
    pub(super) fn sleep_duration(&self) -> Duration {
        let now = Instant::now();
        self.pending
            .values()
            .map(|p| self.window.saturating_sub(now.saturating_duration_since(p.last_seen)))
            .min()
            .map_or(IDLE_POLL, |d| d.clamp(Duration::from_millis(1), IDLE_POLL))
    }

    pub(super) fn clear(&mut self) {
        self.pending.clear();
    }

    #[cfg(test)]
    pub(super) fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Correct a debounced action against what is on disk now.
///
/// An upsert for a path that vanished becomes a remove; a remove for a path
/// that exists again (atomic save) becomes an upsert.
pub(super) fn reconcile(full_path: &Path, action: Action) -> Action {
    let exists = full_path.is_file();
    match action {
        Action::Upsert if !exists => {
            crate::debug!("watch"; "upsert -> remove (gone): {}", full_path.display());
            Action::Remove
        }
        Action::Remove if exists => {
            crate::debug!("watch"; "remove -> upsert (exists): {}", full_path.display());
            Action::Upsert
        }
        action => action,
    }
}
