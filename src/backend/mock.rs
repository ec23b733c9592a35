use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::mpsc;

use super::{Notification, NotifyBackend, Registration, WatchHandle, WatchWaiter};
use crate::error::GpioError;

type Registry = Arc<Mutex<FxHashMap<PathBuf, Vec<MockWatch>>>>;

/// In-memory notification source. Nothing is delivered until the test
/// acting as the kernel calls [`MockNotifyBackend::notify`].
#[derive(Default)]
pub struct MockNotifyBackend {
    watches: Registry, // keyed by watched path
    next_id: AtomicU64,
}

struct MockWatch {
    id: u64,
    tx: mpsc::UnboundedSender<Notification>,
}

impl MockNotifyBackend {
    /// Reports a modification of `path` to every live watch on it and
    /// returns how many watches were notified.
    pub fn notify<P: AsRef<Path>>(&self, path: P) -> usize {
        let watches = self.watches.lock();
        watches
            .get(path.as_ref())
            .map(|list| {
                list.iter()
                    .filter(|w| w.tx.send(Notification::Modified).is_ok())
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn watch_count<P: AsRef<Path>>(&self, path: P) -> usize {
        self.watches
            .lock()
            .get(path.as_ref())
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Drops every watch on `path` without an unregister notification, so
    /// blocked waiters fail instead of shutting down cleanly.
    pub fn sever<P: AsRef<Path>>(&self, path: P) {
        self.watches.lock().remove(path.as_ref());
    }
}

impl NotifyBackend for MockNotifyBackend {
    fn register(&self, path: &Path) -> Result<Registration, GpioError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        self.watches
            .lock()
            .entry(path.to_path_buf())
            .or_default()
            .push(MockWatch { id, tx });

        Ok(Registration {
            waiter: Box::new(MockWaiter { rx }),
            handle: Box::new(MockHandle {
                watches: self.watches.clone(),
                path: path.to_path_buf(),
                id,
            }),
        })
    }
}

struct MockWaiter {
    rx: mpsc::UnboundedReceiver<Notification>,
}

impl WatchWaiter for MockWaiter {
    fn wait_next(&mut self) -> Result<Notification, GpioError> {
        self.rx
            .blocking_recv()
            .ok_or_else(|| GpioError::Watch("notification source closed".into()))
    }
}

struct MockHandle {
    watches: Registry,
    path: PathBuf,
    id: u64,
}

impl WatchHandle for MockHandle {
    fn unregister(&mut self) -> Result<(), GpioError> {
        let mut watches = self.watches.lock();
        let list = watches
            .get_mut(&self.path)
            .ok_or_else(|| GpioError::Watch("watch already removed".into()))?;
        let pos = list
            .iter()
            .position(|w| w.id == self.id)
            .ok_or_else(|| GpioError::Watch("watch already removed".into()))?;

        let watch = list.remove(pos);
        if list.is_empty() {
            watches.remove(&self.path);
        }
        let _ = watch.tx.send(Notification::Unregistered);
        Ok(())
    }
}
