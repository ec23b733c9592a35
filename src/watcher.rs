use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread::{self, JoinHandle};

use log::{debug, warn};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::backend::{Notification, NotifyBackend, WatchHandle, WatchWaiter};
use crate::error::GpioError;
use crate::gpio::{Event, PinState};
use crate::sysfs::SysfsGateway;

/// Last state the watcher confirmed. Written only by the watcher thread.
#[derive(Debug, Clone, Default)]
pub struct ObservedState(Arc<AtomicU8>);

impl ObservedState {
    pub fn load(&self) -> PinState {
        match self.0.load(Ordering::Acquire) {
            0 => PinState::Low,
            _ => PinState::High,
        }
    }

    fn store(&self, state: PinState) {
        let raw = match state {
            PinState::Low => 0,
            PinState::High => 1,
        };
        self.0.store(raw, Ordering::Release);
    }
}

/// Receiving end of a pin's event channel. Ends once the watcher exits.
pub struct EventReceiver {
    rx: mpsc::UnboundedReceiver<Event>,
}

impl EventReceiver {
    /// Must not be called from inside an async runtime; use [`Self::recv`] there.
    pub fn blocking_recv(&mut self) -> Option<Event> {
        self.rx.blocking_recv()
    }

    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Event> {
        self.rx.try_recv().ok()
    }

    /// True once the watcher has exited and dropped its sending end.
    pub fn is_closed(&self) -> bool {
        self.rx.is_closed()
    }

    pub fn into_stream(self) -> UnboundedReceiverStream<Event> {
        UnboundedReceiverStream::new(self.rx)
    }
}

impl Iterator for EventReceiver {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        self.blocking_recv()
    }
}

/// Background thread turning change notifications on a value file into
/// confirmed [`Event`]s.
pub struct ChangeWatcher {
    port: u32,
    watch: Box<dyn WatchHandle>,
    handle: Option<JoinHandle<()>>,
}

impl ChangeWatcher {
    pub fn spawn(
        port: u32,
        gateway: SysfsGateway,
        value_path: PathBuf,
        backend: &dyn NotifyBackend,
        state: ObservedState,
    ) -> Result<(Self, EventReceiver), GpioError> {
        let registration = backend.register(&value_path)?;
        let mut watch = registration.handle;
        let waiter = registration.waiter;
        let (tx, rx) = mpsc::unbounded_channel();

        let spawned = thread::Builder::new()
            .name(format!("gpio{port}-watch"))
            .spawn(move || watch_loop(port, gateway, value_path, waiter, state, tx));
        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                let _ = watch.unregister();
                return Err(GpioError::Worker(format!("spawn watcher for gpio {port}: {e}")));
            }
        };

        Ok((
            Self {
                port,
                watch,
                handle: Some(handle),
            },
            EventReceiver { rx },
        ))
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Unregisters the watch and joins the thread. An unregister error
    /// means the watch was already gone, so the waiter is woken either way.
    pub fn stop(mut self) -> Result<(), GpioError> {
        let result = self.watch.unregister();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!("gpio {}: watcher thread panicked", self.port);
        }
        result
    }
}

fn watch_loop(
    port: u32,
    gateway: SysfsGateway,
    value_path: PathBuf,
    mut waiter: Box<dyn WatchWaiter>,
    state: ObservedState,
    events: mpsc::UnboundedSender<Event>,
) {
    debug!("gpio {port}: watcher started");
    loop {
        match waiter.wait_next() {
            Ok(Notification::Modified) => {}
            Ok(Notification::Unregistered) => {
                debug!("gpio {port}: watch removed, watcher stopping");
                break;
            }
            Err(e) => {
                warn!("gpio {port}: notification source failed, watcher stopping: {e}");
                break;
            }
        }

        // notifications carry no payload, the value has to be read back
        let raw = match gateway.read_value(&value_path) {
            Ok(raw) => raw,
            Err(e) => {
                debug!("gpio {port}: skipping notification: {e}");
                continue;
            }
        };
        let Some(new_state) = PinState::from_value(&raw) else {
            debug!("gpio {port}: unparseable value {raw:?}");
            continue;
        };

        state.store(new_state);
        if events.send(Event { port, state: new_state }).is_err() {
            debug!("gpio {port}: event receiver dropped");
        }
    }
}
