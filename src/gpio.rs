use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};

use log::{info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::backend::NotifyBackend;
use crate::command::{Command, CommandQueue, CommandSerializer};
use crate::config::Direction;
use crate::error::GpioError;
use crate::sysfs::SysfsGateway;
use crate::watcher::{ChangeWatcher, EventReceiver, ObservedState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinState {
    Low,
    High,
}

impl PinState {
    /// Parses the first byte of a sysfs `value` attribute.
    pub fn from_value(raw: &[u8]) -> Option<Self> {
        match raw.first()? {
            b'0' => Some(PinState::Low),
            b'1' => Some(PinState::High),
            _ => None,
        }
    }
}

impl fmt::Display for PinState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinState::Low => f.write_str("LOW"),
            PinState::High => f.write_str("HIGH"),
        }
    }
}

/// A state transition confirmed by a change notification on the value file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Event {
    pub port: u32,
    pub state: PinState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Lifecycle {
    Open = 0,
    Closing = 1,
    Closed = 2,
}

impl Lifecycle {
    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Lifecycle::Open,
            1 => Lifecycle::Closing,
            _ => Lifecycle::Closed,
        }
    }
}

struct Workers {
    watcher: ChangeWatcher,
    serializer: CommandSerializer,
}

/// An exported gpio line with its watcher and serializer running.
///
/// `high`/`low` only queue a write; the resulting state shows up on the
/// receiver returned by [`Pin::events`] once the kernel reports the change.
pub struct Pin {
    port: u32,
    gateway: SysfsGateway,
    path: PathBuf,
    value_path: PathBuf,
    direction_path: PathBuf,
    state: ObservedState,
    lifecycle: AtomicU8,
    commands: CommandQueue,
    events: Mutex<Option<EventReceiver>>,
    workers: Mutex<Option<Workers>>,
}

impl Pin {
    /// Exports `port` under `/sys/class/gpio` and watches it with inotify.
    #[cfg(feature = "inotify-watch")]
    pub fn create(port: u32) -> Result<Self, GpioError> {
        Self::create_with(
            port,
            SysfsGateway::default(),
            &crate::backend::InotifyBackend::new(),
        )
    }

    pub fn create_with(
        port: u32,
        gateway: SysfsGateway,
        backend: &dyn NotifyBackend,
    ) -> Result<Self, GpioError> {
        gateway.export_port(port)?;
        gateway.ensure_exported(port)?;

        let value_path = gateway.value_path(port);
        let state = ObservedState::default();

        let (watcher, events) = ChangeWatcher::spawn(
            port,
            gateway.clone(),
            value_path.clone(),
            backend,
            state.clone(),
        )
        .inspect_err(|_| gateway.unexport_port(port))?;

        let (commands, serializer) =
            match CommandSerializer::spawn(port, gateway.clone(), value_path.clone()) {
                Ok(spawned) => spawned,
                Err(e) => {
                    let _ = watcher.stop();
                    gateway.unexport_port(port);
                    return Err(e);
                }
            };

        info!("gpio {port}: opened");
        Ok(Self {
            port,
            path: gateway.pin_dir(port),
            direction_path: gateway.direction_path(port),
            value_path,
            gateway,
            state,
            lifecycle: AtomicU8::new(Lifecycle::Open as u8),
            commands,
            events: Mutex::new(Some(events)),
            workers: Mutex::new(Some(Workers {
                watcher,
                serializer,
            })),
        })
    }

    pub fn port(&self) -> u32 {
        self.port
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn value_path(&self) -> &Path {
        &self.value_path
    }

    pub fn direction_path(&self) -> &Path {
        &self.direction_path
    }

    /// Most recently confirmed state; `Low` until the first event.
    pub fn state(&self) -> PinState {
        self.state.load()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle::from_raw(self.lifecycle.load(Ordering::Acquire))
    }

    pub fn is_closed(&self) -> bool {
        self.lifecycle() == Lifecycle::Closed
    }

    /// Hands out the event receiver. Only the first call gets it.
    pub fn events(&self) -> Option<EventReceiver> {
        self.events.lock().take()
    }

    /// Not enforced against `high`/`low`; the kernel decides what a write
    /// to an input line means.
    pub fn set_direction(&self, direction: Direction) -> Result<(), GpioError> {
        self.ensure_open()?;
        self.gateway.set_direction(&self.direction_path, direction)
    }

    pub fn high(&self) -> Result<(), GpioError> {
        self.submit(Command::SetHigh)
    }

    pub fn low(&self) -> Result<(), GpioError> {
        self.submit(Command::SetLow)
    }

    fn submit(&self, command: Command) -> Result<(), GpioError> {
        self.ensure_open()?;
        self.commands.submit(command)
    }

    fn ensure_open(&self) -> Result<(), GpioError> {
        match self.lifecycle() {
            Lifecycle::Open => Ok(()),
            Lifecycle::Closing | Lifecycle::Closed => Err(GpioError::Closed(self.port)),
        }
    }

    /// Stops the watcher, drains and stops the serializer, then unexports.
    /// Returns once both threads are gone, including when another caller
    /// is already closing the pin; later calls are no-ops.
    pub fn close(&self) {
        // held until Closed is stored so concurrent callers wait here
        let mut workers = self.workers.lock();
        if self
            .lifecycle
            .compare_exchange(
                Lifecycle::Open as u8,
                Lifecycle::Closing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return;
        }

        if let Some(workers) = workers.take() {
            // watch goes first so the final deactivation write is not reported
            if let Err(e) = workers.watcher.stop() {
                warn!("gpio {}: {e}", self.port);
            }
            if let Err(e) = self.commands.submit(Command::Terminate) {
                warn!("gpio {}: {e}", self.port);
            }
            workers.serializer.join();
        }

        self.gateway.unexport_port(self.port);
        self.lifecycle.store(Lifecycle::Closed as u8, Ordering::Release);
        info!("gpio {}: closed", self.port);
    }
}

impl Drop for Pin {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pin")
            .field("port", &self.port)
            .field("state", &self.state())
            .field("lifecycle", &self.lifecycle())
            .finish()
    }
}
