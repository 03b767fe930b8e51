//! Raw notify events → semantic signals.
//!
//! Which raw events count depends on the platform's event source. inotify
//! reports an editor's atomic save as close-after-write plus a rename pair,
//! and also emits create/modify noise for the same change; listening to all
//! of it would fire several upserts for one save. The table below picks the
//! subset per profile:
//!
//! | Event class   | Coalescing (inotify) | Broad (kqueue, FSEvents, Windows) |
//! |---------------|----------------------|-----------------------------------|
//! | close-write   | upsert               | upsert                            |
//! | moved-from    | remove               | remove                            |
//! | moved-to      | upsert               | upsert                            |
//! | moved (both)  | remove + upsert      | remove + upsert                   |
//! | rename (?)    | -                    | probe                             |
//! | delete        | remove               | remove                            |
//! | create        | -                    | upsert                            |
//! | data write    | -                    | upsert                            |
//!
//! `probe` resolves to upsert or remove by checking whether the path exists.

use std::path::{Path, PathBuf};

use notify::EventKind;
use notify::event::{AccessKind, AccessMode, ModifyKind, RenameMode};

use super::types::Action;

/// Platform capability of the native event source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventProfile {
    /// Distinguishes close-after-write and paired renames.
    Coalescing,
    /// Only reports create/remove/rename/write.
    Broad,
}

/// Platform-independent event class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum EventClass {
    CloseWrite,
    MovedFrom,
    MovedTo,
    MovedBoth,
    Renamed,
    Delete,
    Create,
    Write,
}

/// What a matched event class turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Signal {
    Upsert,
    Remove,
    /// First path removed, second path upserted.
    Move,
    /// Upsert if the path exists, remove otherwise.
    Probe,
}

const COALESCING: &[(EventClass, Signal)] = &[
    (EventClass::CloseWrite, Signal::Upsert),
    (EventClass::MovedFrom, Signal::Remove),
    (EventClass::MovedTo, Signal::Upsert),
    (EventClass::MovedBoth, Signal::Move),
    (EventClass::Delete, Signal::Remove),
];

const BROAD: &[(EventClass, Signal)] = &[
    (EventClass::CloseWrite, Signal::Upsert),
    (EventClass::MovedFrom, Signal::Remove),
    (EventClass::MovedTo, Signal::Upsert),
    (EventClass::MovedBoth, Signal::Move),
    (EventClass::Renamed, Signal::Probe),
    (EventClass::Delete, Signal::Remove),
    (EventClass::Create, Signal::Upsert),
    (EventClass::Write, Signal::Upsert),
];

impl EventProfile {
    /// Profile of the watcher notify picks on this platform.
    pub const fn native() -> Self {
        if cfg!(any(target_os = "linux", target_os = "android")) {
            Self::Coalescing
        } else {
            Self::Broad
        }
    }

    fn table(self) -> &'static [(EventClass, Signal)] {
        match self {
            Self::Coalescing => COALESCING,
            Self::Broad => BROAD,
        }
    }

    pub(super) fn signal(self, class: EventClass) -> Option<Signal> {
        self.table()
            .iter()
            .find(|(c, _)| *c == class)
            .map(|(_, signal)| *signal)
    }

    /// Translate one raw event into `(absolute path, action)` pairs.
    pub fn classify(self, event: &notify::Event) -> Vec<(PathBuf, Action)> {
        let Some(class) = EventClass::of(&event.kind) else {
            return Vec::new();
        };
        let Some(signal) = self.signal(class) else {
            return Vec::new();
        };

        match (signal, event.paths.as_slice()) {
            (Signal::Move, [from, to, ..]) => {
                vec![(from.clone(), Action::Remove), (to.clone(), Action::Upsert)]
            }
            // A move reported with a single path carries the destination only
            (Signal::Move, [to]) => vec![(to.clone(), Action::Upsert)],
            (Signal::Probe, paths) => paths
                .iter()
                .map(|p| (p.clone(), Action::probe(p)))
                .collect(),
            (Signal::Upsert, paths) => paths.iter().map(|p| (p.clone(), Action::Upsert)).collect(),
            (Signal::Remove, paths) => paths.iter().map(|p| (p.clone(), Action::Remove)).collect(),
            (Signal::Move, []) => Vec::new(),
        }
    }
}

/// Classification bound to one watched directory.
///
/// Runs in the notify callback so only meaningful changes reach the queue.
pub(super) struct ChangeFilter {
    root: PathBuf,
    profile: EventProfile,
}

impl ChangeFilter {
    pub(super) fn new(root: PathBuf, profile: EventProfile) -> Self {
        Self { root, profile }
    }

    /// Classified changes in `event`, relative to the root. Ignored files and
    /// nested paths are dropped.
    pub(super) fn changes(&self, event: &notify::Event) -> Vec<(PathBuf, Action)> {
        self.profile
            .classify(event)
            .into_iter()
            .filter(|(path, _)| !is_ignored(path))
            .filter_map(|(path, action)| Some((self.relative(&path)?, action)))
            .collect()
    }

    /// Strip the watched root; `None` for anything but a direct child.
    fn relative(&self, path: &Path) -> Option<PathBuf> {
        let relative = match path.strip_prefix(&self.root) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => PathBuf::from(path.file_name()?),
        };
        (relative.components().count() == 1).then_some(relative)
    }
}

impl EventClass {
    pub(super) fn of(kind: &EventKind) -> Option<Self> {
        Some(match kind {
            EventKind::Access(AccessKind::Close(AccessMode::Write)) => Self::CloseWrite,
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Self::MovedFrom,
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Self::MovedTo,
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => Self::MovedBoth,
            EventKind::Modify(ModifyKind::Name(_)) => Self::Renamed,
            EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any) => Self::Write,
            EventKind::Remove(_) => Self::Delete,
            EventKind::Create(_) => Self::Create,
            _ => return None,
        })
    }
}

/// Editor artifacts and hidden files never reach a handler.
pub fn is_ignored(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    name.is_empty()
        || matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "swx" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
        || name.starts_with('#')
        // vim probes directory writability with this name
        || name == "4913"
}
