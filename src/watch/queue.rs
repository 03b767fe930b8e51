//! Bounded change queue between the notify thread and a listener.
//!
//! Only classified changes are queued; raw event noise is filtered out in the
//! notify callback. The producer never blocks: when the queue is full the
//! oldest change is evicted to make room. Evicting a change for the same path
//! as the incoming one loses nothing (the newer change supersedes it), so only
//! an eviction for a different path raises the overflow flag. Delivery is
//! otherwise at-most-once; the listener decides what an overflow means.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam::channel::{self, Receiver, Sender, TrySendError};

use super::types::Action;

/// A classified change: path relative to the watched directory, and what happened.
pub(super) type Change = (PathBuf, Action);

/// Producer half, owned by the notify callback.
pub(super) struct ChangeSender {
    tx: Sender<Change>,
    /// Used only to evict the oldest entry when full.
    evict: Receiver<Change>,
    overflow: Arc<AtomicBool>,
}

/// Consumer half, owned by the listener thread.
pub(super) struct ChangeReceiver {
    pub(super) rx: Receiver<Change>,
    overflow: Arc<AtomicBool>,
}

pub(super) fn bounded(capacity: usize) -> (ChangeSender, ChangeReceiver) {
    let (tx, rx) = channel::bounded(capacity.max(1));
    let overflow = Arc::new(AtomicBool::new(false));
    (
        ChangeSender {
            tx,
            evict: rx.clone(),
            overflow: Arc::clone(&overflow),
        },
        ChangeReceiver { rx, overflow },
    )
}

impl ChangeSender {
    /// Enqueue without blocking. Returns `false` once the consumer is gone.
    pub(super) fn push(&self, change: Change) -> bool {
        let change = match self.tx.try_send(change) {
            Ok(()) => return true,
            Err(TrySendError::Disconnected(_)) => return false,
            Err(TrySendError::Full(change)) => change,
        };

        if let Ok((evicted, _)) = self.evict.try_recv()
            && evicted != change.0
        {
            self.mark_overflow();
        }
        match self.tx.try_send(change) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.mark_overflow();
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Record that changes were lost upstream (e.g. the kernel queue overflowed).
    pub(super) fn mark_overflow(&self) {
        self.overflow.store(true, Ordering::SeqCst);
    }
}

impl ChangeReceiver {
    /// Read and clear the overflow flag.
    pub(super) fn take_overflow(&self) -> bool {
        self.overflow.swap(false, Ordering::SeqCst)
    }
}
