mod backend;
mod command;
mod config;
mod error;
mod gpio;
mod sysfs;
mod watcher;

pub use backend::{
    MockNotifyBackend, Notification, NotifyBackend, Registration, WatchHandle, WatchWaiter,
};
pub use command::{Command, CommandQueue, CommandSerializer};
pub use config::{BlinkConfig, DEFAULT_SYSFS_ROOT, Direction};
pub use error::GpioError;
pub use gpio::{Event, Lifecycle, Pin, PinState};
pub use sysfs::SysfsGateway;
pub use watcher::{ChangeWatcher, EventReceiver, ObservedState};

#[cfg(feature = "inotify-watch")]
pub use backend::InotifyBackend;
