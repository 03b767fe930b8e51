use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use notify::EventKind;
use notify::event::{
    AccessKind, AccessMode, CreateKind, DataChange, ModifyKind, RemoveKind, RenameMode,
};
use parking_lot::Mutex;
use tempfile::TempDir;

use super::classify::{ChangeFilter, EventClass, EventProfile, Signal, is_ignored};
use super::debouncer::{Debouncer, reconcile};
use super::queue;
use super::*;

fn make_event(paths: Vec<&str>, kind: EventKind) -> notify::Event {
    notify::Event {
        kind,
        paths: paths.into_iter().map(PathBuf::from).collect(),
        attrs: Default::default(),
    }
}

fn close_write() -> EventKind {
    EventKind::Access(AccessKind::Close(AccessMode::Write))
}

fn create_kind() -> EventKind {
    EventKind::Create(CreateKind::File)
}

fn modify_kind() -> EventKind {
    EventKind::Modify(ModifyKind::Data(DataChange::Any))
}

fn remove_kind() -> EventKind {
    EventKind::Remove(RemoveKind::File)
}

fn rename(mode: RenameMode) -> EventKind {
    EventKind::Modify(ModifyKind::Name(mode))
}

// =============================================================================
// classification
// =============================================================================

#[test]
fn test_coalescing_ignores_create_and_write_noise() {
    let profile = EventProfile::Coalescing;
    assert!(profile.classify(&make_event(vec!["/p/a.md"], create_kind())).is_empty());
    assert!(profile.classify(&make_event(vec!["/p/a.md"], modify_kind())).is_empty());

    let actions = profile.classify(&make_event(vec!["/p/a.md"], close_write()));
    assert_eq!(actions, vec![(PathBuf::from("/p/a.md"), Action::Upsert)]);
}

#[test]
fn test_coalescing_rename_pair() {
    let profile = EventProfile::Coalescing;
    let actions = profile.classify(&make_event(
        vec!["/p/a.md.new", "/p/a.md"],
        rename(RenameMode::Both),
    ));
    assert_eq!(
        actions,
        vec![
            (PathBuf::from("/p/a.md.new"), Action::Remove),
            (PathBuf::from("/p/a.md"), Action::Upsert),
        ]
    );

    let from = profile.classify(&make_event(vec!["/p/a.md"], rename(RenameMode::From)));
    assert_eq!(from, vec![(PathBuf::from("/p/a.md"), Action::Remove)]);
}

#[test]
fn test_broad_profile_uses_create_and_write() {
    let profile = EventProfile::Broad;
    assert_eq!(profile.signal(EventClass::Create), Some(Signal::Upsert));
    assert_eq!(profile.signal(EventClass::Write), Some(Signal::Upsert));
    assert_eq!(profile.signal(EventClass::Renamed), Some(Signal::Probe));
    assert_eq!(EventProfile::Coalescing.signal(EventClass::Create), None);
    assert_eq!(EventProfile::Coalescing.signal(EventClass::Renamed), None);
}

#[test]
fn test_broad_rename_probes_existence() {
    let dir = TempDir::new().unwrap();
    let present = dir.path().join("here.md");
    std::fs::write(&present, "x").unwrap();
    let missing = dir.path().join("gone.md");

    let event = notify::Event {
        kind: rename(RenameMode::Any),
        paths: vec![present.clone(), missing.clone()],
        attrs: Default::default(),
    };
    let actions = EventProfile::Broad.classify(&event);

    assert_eq!(
        actions,
        vec![(present, Action::Upsert), (missing, Action::Remove)]
    );
}

#[test]
fn test_metadata_events_ignored() {
    let kind = EventKind::Modify(ModifyKind::Metadata(notify::event::MetadataKind::Any));
    assert_eq!(EventClass::of(&kind), None);
    assert!(
        EventProfile::Broad
            .classify(&make_event(vec!["/p/a.md"], kind))
            .is_empty()
    );
}

#[test]
fn test_native_profile() {
    let expected = if cfg!(target_os = "linux") {
        EventProfile::Coalescing
    } else {
        EventProfile::Broad
    };
    if cfg!(any(target_os = "linux", target_os = "macos", target_os = "windows")) {
        assert_eq!(EventProfile::native(), expected);
    }
}

#[test]
fn test_temp_files_ignored() {
    for name in ["a.md.swp", "a.md~", ".a.md", "#a.md#", "4913", "a.tmp"] {
        assert!(is_ignored(Path::new(name)), "{name} should be ignored");
    }
    for name in ["a.md", "page.html", "site.scss"] {
        assert!(!is_ignored(Path::new(name)), "{name} should not be ignored");
    }
}

// =============================================================================
// debouncer
// =============================================================================

#[test]
fn test_last_signal_wins() {
    let mut debouncer = Debouncer::new(Duration::from_millis(100));
    let start = Instant::now();

    debouncer.add_at(PathBuf::from("a.md"), Action::Upsert, start);
    debouncer.add_at(PathBuf::from("a.md"), Action::Remove, start);
    debouncer.add_at(PathBuf::from("a.md"), Action::Upsert, start);

    let ready = debouncer.take_ready_at(start + Duration::from_millis(100));
    assert_eq!(ready, vec![(PathBuf::from("a.md"), Action::Upsert)]);
    assert!(debouncer.is_empty());
}

#[test]
fn test_not_ready_inside_window() {
    let mut debouncer = Debouncer::new(Duration::from_millis(100));
    let start = Instant::now();

    debouncer.add_at(PathBuf::from("a.md"), Action::Upsert, start);
    debouncer.add_at(PathBuf::from("a.md"), Action::Upsert, start + Duration::from_millis(60));

    // 100ms after the first signal but only 40ms after the last
    assert!(debouncer.take_ready_at(start + Duration::from_millis(100)).is_empty());
    assert_eq!(
        debouncer.take_ready_at(start + Duration::from_millis(160)).len(),
        1
    );
}

#[test]
fn test_zero_window_dispatches_immediately() {
    let mut debouncer = Debouncer::new(Duration::ZERO);
    let now = Instant::now();
    debouncer.add_at(PathBuf::from("b.md"), Action::Remove, now);
    debouncer.add_at(PathBuf::from("a.md"), Action::Upsert, now);

    assert_eq!(
        debouncer.take_ready_at(now),
        vec![
            (PathBuf::from("b.md"), Action::Remove),
            (PathBuf::from("a.md"), Action::Upsert),
        ]
    );
}

#[test]
fn test_sleep_duration_bounded() {
    let mut debouncer = Debouncer::new(Duration::from_millis(100));
    assert_eq!(debouncer.sleep_duration(), debouncer::IDLE_POLL);

    debouncer.add(PathBuf::from("a.md"), Action::Upsert);
    let dur = debouncer.sleep_duration();
    assert!(dur <= Duration::from_millis(100));
    assert!(dur >= Duration::from_millis(1));
}

#[test]
fn test_reconcile_against_disk() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("a.md");

    assert_eq!(reconcile(&file, Action::Upsert), Action::Remove);
    assert_eq!(reconcile(&file, Action::Remove), Action::Remove);

    std::fs::write(&file, "x").unwrap();
    assert_eq!(reconcile(&file, Action::Remove), Action::Upsert);
    assert_eq!(reconcile(&file, Action::Upsert), Action::Upsert);
}

// =============================================================================
// queue
// =============================================================================

fn change(path: &str, action: Action) -> queue::Change {
    (PathBuf::from(path), action)
}

#[test]
fn test_queue_evicting_other_path_overflows() {
    let (tx, rx) = queue::bounded(1);

    assert!(tx.push(change("a.md", Action::Upsert)));
    assert!(!rx.take_overflow());

    assert!(tx.push(change("b.md", Action::Upsert)));
    assert!(rx.take_overflow());
    assert!(!rx.take_overflow(), "flag is cleared on read");

    assert_eq!(rx.rx.try_recv().ok(), Some(change("b.md", Action::Upsert)));
    assert!(rx.rx.try_recv().is_err());
}

#[test]
fn test_queue_same_path_supersedes_without_overflow() {
    let (tx, rx) = queue::bounded(1);

    tx.push(change("a.md", Action::Upsert));
    tx.push(change("a.md", Action::Remove));
    tx.push(change("a.md", Action::Upsert));

    assert!(!rx.take_overflow());
    let got: Vec<_> = rx.rx.try_iter().collect();
    assert_eq!(got, vec![change("a.md", Action::Upsert)]);
}

#[test]
fn test_queue_keeps_order_within_capacity() {
    let (tx, rx) = queue::bounded(3);
    for name in ["a.md", "b.md", "c.md"] {
        tx.push(change(name, Action::Upsert));
    }
    assert!(!rx.take_overflow());
    let got: Vec<_> = rx.rx.try_iter().map(|(path, _)| path).collect();
    assert_eq!(
        got,
        vec![PathBuf::from("a.md"), PathBuf::from("b.md"), PathBuf::from("c.md")]
    );
}

#[test]
fn test_filter_keeps_direct_children_only() {
    let filter = ChangeFilter::new(PathBuf::from("/p"), EventProfile::Coalescing);

    assert_eq!(
        filter.changes(&make_event(vec!["/p/a.md"], close_write())),
        vec![change("a.md", Action::Upsert)]
    );
    assert!(filter.changes(&make_event(vec!["/p/a.md"], create_kind())).is_empty());
    assert!(filter.changes(&make_event(vec!["/p/a.md.swp"], close_write())).is_empty());
    assert!(filter.changes(&make_event(vec!["/p/sub/a.md"], close_write())).is_empty());
}

// =============================================================================
// listener
// =============================================================================

#[derive(Clone, Default)]
struct Recorder {
    calls: Arc<Mutex<Vec<(Action, PathBuf)>>>,
}

impl Recorder {
    fn calls(&self) -> Vec<(Action, PathBuf)> {
        self.calls.lock().clone()
    }

    fn count(&self, action: Action, path: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|(a, p)| *a == action && p == Path::new(path))
            .count()
    }

    fn wait_for(&self, action: Action, path: &str) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if self.count(action, path) > 0 {
                return true;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        false
    }
}

impl ContentHandler for Recorder {
    fn upsert(&self, path: &Path) -> anyhow::Result<()> {
        self.calls.lock().push((Action::Upsert, path.to_path_buf()));
        Ok(())
    }

    fn remove(&self, path: &Path) -> anyhow::Result<()> {
        self.calls.lock().push((Action::Remove, path.to_path_buf()));
        Ok(())
    }
}

fn test_config() -> WatchConfig {
    WatchConfig {
        channel_capacity: 64,
        overflow: OverflowPolicy::Drop,
        debounce_ms: 50,
    }
}

#[test]
fn test_missing_directory_is_fatal() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope");

    let result = Listener::new(&missing, &test_config()).spawn(Recorder::default());
    assert!(matches!(result, Err(WatchError::MissingDirectory(_))));
}

#[test]
fn test_file_path_is_not_a_directory() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("a.md");
    std::fs::write(&file, "x").unwrap();

    let result = Listener::new(&file, &test_config()).spawn(Recorder::default());
    assert!(matches!(result, Err(WatchError::NotADirectory(_))));
}

#[test]
fn test_listener_reports_relative_paths() {
    let dir = TempDir::new().unwrap();
    let recorder = Recorder::default();
    let _handle = Listener::new(dir.path(), &test_config())
        .spawn(recorder.clone())
        .unwrap();

    std::fs::write(dir.path().join("a.md"), "hello").unwrap();
    assert!(recorder.wait_for(Action::Upsert, "a.md"), "{:?}", recorder.calls());

    std::fs::remove_file(dir.path().join("a.md")).unwrap();
    assert!(recorder.wait_for(Action::Remove, "a.md"), "{:?}", recorder.calls());

    assert!(recorder.calls().iter().all(|(_, p)| p.is_relative()));
}

#[test]
fn test_atomic_save_upserts_once() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.md"), "v1").unwrap();

    let recorder = Recorder::default();
    let _handle = Listener::new(dir.path(), &test_config())
        .spawn(recorder.clone())
        .unwrap();

    // Editor-style save: write a temp file, then rename it over the original
    let tmp = dir.path().join("a.md.tmp");
    std::fs::write(&tmp, "v2").unwrap();
    std::fs::rename(&tmp, dir.path().join("a.md")).unwrap();

    assert!(recorder.wait_for(Action::Upsert, "a.md"), "{:?}", recorder.calls());
    std::thread::sleep(Duration::from_millis(300));

    assert_eq!(recorder.count(Action::Upsert, "a.md"), 1, "{:?}", recorder.calls());
    assert_eq!(recorder.count(Action::Remove, "a.md"), 0, "{:?}", recorder.calls());
    assert!(recorder.calls().iter().all(|(_, p)| p != Path::new("a.md.tmp")));
}

/// Fails every upsert after recording it.
#[derive(Clone, Default)]
struct Failing {
    seen: Arc<Mutex<Vec<PathBuf>>>,
}

impl ContentHandler for Failing {
    fn upsert(&self, path: &Path) -> anyhow::Result<()> {
        self.seen.lock().push(path.to_path_buf());
        anyhow::bail!("cannot parse {}", path.display())
    }

    fn remove(&self, _path: &Path) -> anyhow::Result<()> {
        Ok(())
    }
}

#[test]
fn test_handler_error_does_not_stop_listener() {
    let dir = TempDir::new().unwrap();
    let handler = Failing::default();
    let seen = Arc::clone(&handler.seen);

    let _handle = Listener::new(dir.path(), &test_config())
        .spawn(handler)
        .unwrap();

    std::fs::write(dir.path().join("bad.md"), "x").unwrap();
    std::fs::write(dir.path().join("good.md"), "y").unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while seen.lock().len() < 2 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(20));
    }
    let seen = seen.lock();
    assert!(seen.contains(&PathBuf::from("bad.md")));
    assert!(seen.contains(&PathBuf::from("good.md")));
}

#[test]
fn test_drop_handle_stops_listener() {
    let dir = TempDir::new().unwrap();
    let recorder = Recorder::default();
    let handle = Listener::new(dir.path(), &test_config())
        .spawn(recorder.clone())
        .unwrap();

    drop(handle);
    std::fs::write(dir.path().join("late.md"), "x").unwrap();
    std::thread::sleep(Duration::from_millis(300));

    assert!(recorder.calls().is_empty());
}

fn single_slot(overflow: OverflowPolicy) -> WatchConfig {
    WatchConfig {
        channel_capacity: 1,
        overflow,
        debounce_ms: 50,
    }
}

fn single_save_with_one_slot(overflow: OverflowPolicy) {
    let dir = TempDir::new().unwrap();
    for i in 0..20 {
        std::fs::write(dir.path().join(format!("p{i}.md")), "v1").unwrap();
    }

    let recorder = Recorder::default();
    let _handle = Listener::new(dir.path(), &single_slot(overflow))
        .spawn(recorder.clone())
        .unwrap();

    std::fs::write(dir.path().join("p0.md"), "v2").unwrap();
    assert!(recorder.wait_for(Action::Upsert, "p0.md"), "{:?}", recorder.calls());
    std::thread::sleep(Duration::from_millis(300));

    assert_eq!(
        recorder.calls(),
        vec![(Action::Upsert, PathBuf::from("p0.md"))]
    );
}

#[test]
fn test_single_save_with_one_slot_rescan() {
    single_save_with_one_slot(OverflowPolicy::Rescan);
}

#[test]
fn test_single_save_with_one_slot_drop() {
    single_save_with_one_slot(OverflowPolicy::Drop);
}

fn worker(root: &Path, overflow: OverflowPolicy, known: &[&str]) -> (Worker<Recorder>, Recorder) {
    let recorder = Recorder::default();
    let worker = Worker {
        root: root.to_path_buf(),
        overflow,
        debouncer: Debouncer::new(Duration::ZERO),
        handler: recorder.clone(),
        known: known.iter().map(PathBuf::from).collect(),
        stop: Arc::new(std::sync::atomic::AtomicBool::new(false)),
    };
    (worker, recorder)
}

#[test]
fn test_overflow_rescan_reconciles_with_disk() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.md"), "x").unwrap();
    std::fs::write(dir.path().join("b.md"), "y").unwrap();
    std::fs::write(dir.path().join(".hidden"), "z").unwrap();

    let (mut worker, recorder) =
        worker(dir.path(), OverflowPolicy::Rescan, &["a.md", "gone.md"]);
    worker.debouncer.add(PathBuf::from("stale.md"), Action::Upsert);
    worker.on_overflow();

    assert_eq!(
        recorder.calls(),
        vec![
            (Action::Remove, PathBuf::from("gone.md")),
            (Action::Upsert, PathBuf::from("a.md")),
            (Action::Upsert, PathBuf::from("b.md")),
        ]
    );
    assert!(worker.debouncer.take_ready().is_empty(), "pending changes are cleared");
    assert!(worker.known.contains(Path::new("b.md")));
    assert!(!worker.known.contains(Path::new("gone.md")));
}

#[test]
fn test_overflow_drop_only_warns() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.md"), "x").unwrap();

    let (mut worker, recorder) = worker(dir.path(), OverflowPolicy::Drop, &["gone.md"]);
    worker.on_overflow();

    assert!(recorder.calls().is_empty());
    assert!(worker.known.contains(Path::new("gone.md")));
}

#[test]
fn test_run_rescans_when_queue_overflowed() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.md"), "x").unwrap();

    let (worker, recorder) = worker(dir.path(), OverflowPolicy::Rescan, &[]);
    let stop = Arc::clone(&worker.stop);
    let (tx, rx) = queue::bounded(1);
    tx.push(change("old.md", Action::Upsert));
    tx.push(change("a.md", Action::Upsert));

    let thread = std::thread::spawn(move || worker.run(rx));
    assert!(recorder.wait_for(Action::Upsert, "a.md"), "{:?}", recorder.calls());
    stop.store(true, std::sync::atomic::Ordering::SeqCst);
    drop(tx);
    thread.join().unwrap();

    // old.md was evicted and is not on disk, so nothing mentions it
    assert!(recorder.calls().iter().all(|(_, p)| p != Path::new("old.md")));
}
