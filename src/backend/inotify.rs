use std::collections::VecDeque;
use std::io::ErrorKind;
use std::path::Path;

use ::inotify::{EventMask, Inotify, WatchDescriptor, WatchMask, Watches};
use log::debug;

use super::{Notification, NotifyBackend, Registration, WatchHandle, WatchWaiter};
use crate::error::GpioError;

const INOTIFY_BACKEND_EVENT_BUFFER_SIZE: usize = 1024;

/// Watches value files through one inotify instance per registration.
#[derive(Debug, Default, Clone, Copy)]
pub struct InotifyBackend;

impl InotifyBackend {
    pub fn new() -> Self {
        Self
    }
}

impl NotifyBackend for InotifyBackend {
    fn register(&self, path: &Path) -> Result<Registration, GpioError> {
        let inotify =
            Inotify::init().map_err(|e| GpioError::Watch(format!("inotify init: {e}")))?;
        let mut watches = inotify.watches();
        let wd = watches
            .add(path, WatchMask::MODIFY)
            .map_err(|e| GpioError::Watch(format!("add watch {}: {e}", path.display())))?;
        debug!("inotify watch registered on {}", path.display());

        Ok(Registration {
            waiter: Box::new(InotifyWaiter {
                inotify,
                buffer: vec![0; INOTIFY_BACKEND_EVENT_BUFFER_SIZE],
                pending: VecDeque::new(),
            }),
            handle: Box::new(InotifyHandle {
                watches,
                wd: Some(wd),
            }),
        })
    }
}

struct InotifyWaiter {
    inotify: Inotify,
    buffer: Vec<u8>,
    pending: VecDeque<Notification>,
}

impl WatchWaiter for InotifyWaiter {
    fn wait_next(&mut self) -> Result<Notification, GpioError> {
        loop {
            if let Some(notification) = self.pending.pop_front() {
                return Ok(notification);
            }

            let events = match self.inotify.read_events_blocking(&mut self.buffer) {
                Ok(events) => events,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(GpioError::Watch(format!("read inotify events: {e}"))),
            };
            for event in events {
                // IN_IGNORED follows inotify_rm_watch and removal of the file itself
                if event.mask.contains(EventMask::IGNORED) {
                    self.pending.push_back(Notification::Unregistered);
                } else if event
                    .mask
                    .intersects(EventMask::MODIFY | EventMask::Q_OVERFLOW)
                {
                    self.pending.push_back(Notification::Modified);
                }
            }
        }
    }
}

struct InotifyHandle {
    watches: Watches,
    wd: Option<WatchDescriptor>,
}

impl WatchHandle for InotifyHandle {
    fn unregister(&mut self) -> Result<(), GpioError> {
        match self.wd.take() {
            Some(wd) => self
                .watches
                .remove(wd)
                .map_err(|e| GpioError::Watch(format!("remove watch: {e}"))),
            None => Ok(()),
        }
    }
}
