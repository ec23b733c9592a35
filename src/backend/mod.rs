use std::path::Path;

use crate::error::GpioError;

#[cfg(feature = "inotify-watch")]
pub mod inotify;
pub mod mock;

#[cfg(feature = "inotify-watch")]
pub use self::inotify::InotifyBackend;
pub use mock::MockNotifyBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    /// The watched file's contents changed; the new value must be re-read.
    Modified,
    /// The watch is gone, either removed on purpose or because the file was.
    Unregistered,
}

/// Blocking side of a watch, owned by the watcher thread.
pub trait WatchWaiter: Send {
    fn wait_next(&mut self) -> Result<Notification, GpioError>;
}

/// Control side of a watch, owned by whoever shuts the watcher down.
pub trait WatchHandle: Send {
    /// Removing a watch must wake a waiter blocked on it with
    /// [`Notification::Unregistered`]. An error means the watch no longer
    /// exists, and the waiter has been or will be woken regardless.
    fn unregister(&mut self) -> Result<(), GpioError>;
}

pub struct Registration {
    pub waiter: Box<dyn WatchWaiter>,
    pub handle: Box<dyn WatchHandle>,
}

pub trait NotifyBackend: Send + Sync {
    fn register(&self, path: &Path) -> Result<Registration, GpioError>;
}
