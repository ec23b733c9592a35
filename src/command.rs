use std::path::PathBuf;
use std::thread::{self, JoinHandle};

use log::{debug, warn};
use tokio::sync::mpsc;

use crate::error::GpioError;
use crate::sysfs::SysfsGateway;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetHigh,
    SetLow,
    /// Drives the line low one last time and stops the serializer.
    Terminate,
}

impl Command {
    fn value(self) -> &'static [u8] {
        match self {
            Command::SetHigh => b"1",
            Command::SetLow | Command::Terminate => b"0",
        }
    }
}

/// Sending end of the command channel. Cheap to clone; submission order
/// from one clone is the order of writes.
#[derive(Debug, Clone)]
pub struct CommandQueue {
    port: u32,
    tx: mpsc::UnboundedSender<Command>,
}

impl CommandQueue {
    /// Never blocks. Fails only once the serializer has exited.
    pub fn submit(&self, command: Command) -> Result<(), GpioError> {
        self.tx
            .send(command)
            .map_err(|_| GpioError::Closed(self.port))
    }
}

/// The only writer of a pin's value file.
pub struct CommandSerializer {
    port: u32,
    handle: JoinHandle<()>,
}

impl CommandSerializer {
    pub fn spawn(
        port: u32,
        gateway: SysfsGateway,
        value_path: PathBuf,
    ) -> Result<(CommandQueue, Self), GpioError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = thread::Builder::new()
            .name(format!("gpio{port}-cmd"))
            .spawn(move || command_loop(port, gateway, value_path, rx))
            .map_err(|e| GpioError::Worker(format!("spawn serializer for gpio {port}: {e}")))?;

        Ok((CommandQueue { port, tx }, Self { port, handle }))
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the loop to exit; submit [`Command::Terminate`] first.
    pub fn join(self) {
        if self.handle.join().is_err() {
            warn!("gpio {}: serializer thread panicked", self.port);
        }
    }
}

fn command_loop(
    port: u32,
    gateway: SysfsGateway,
    value_path: PathBuf,
    mut rx: mpsc::UnboundedReceiver<Command>,
) {
    debug!("gpio {port}: serializer started");
    while let Some(command) = rx.blocking_recv() {
        if let Err(e) = gateway.write_value(&value_path, command.value()) {
            warn!("gpio {port}: {command:?} failed: {e}");
        }
        if command == Command::Terminate {
            break;
        }
    }
    debug!("gpio {port}: serializer stopped");
}
