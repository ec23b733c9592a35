use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::config::{DEFAULT_SYSFS_ROOT, Direction};
use crate::error::GpioError;

/// Thin I/O layer over the sysfs gpio class directory.
///
/// Every write goes through an `O_SYNC` handle and is issued as a single
/// `write(2)` without truncation, so the kernel sees exactly one
/// modification per call.
#[derive(Debug, Clone)]
pub struct SysfsGateway {
    root: PathBuf,
}

impl Default for SysfsGateway {
    fn default() -> Self {
        Self::new(DEFAULT_SYSFS_ROOT)
    }
}

impl SysfsGateway {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn export_path(&self) -> PathBuf {
        self.root.join("export")
    }

    pub fn unexport_path(&self) -> PathBuf {
        self.root.join("unexport")
    }

    pub fn pin_dir(&self, port: u32) -> PathBuf {
        self.root.join(format!("gpio{port}"))
    }

    pub fn value_path(&self, port: u32) -> PathBuf {
        self.pin_dir(port).join("value")
    }

    pub fn direction_path(&self, port: u32) -> PathBuf {
        self.pin_dir(port).join("direction")
    }

    pub fn export_port(&self, port: u32) -> Result<(), GpioError> {
        write_sync(&self.export_path(), port.to_string().as_bytes())
            .map_err(|source| GpioError::Export { port, source })?;
        debug!("gpio {port}: export written");
        Ok(())
    }

    /// Best-effort; failures are logged and swallowed.
    pub fn unexport_port(&self, port: u32) {
        match write_sync(&self.unexport_path(), port.to_string().as_bytes()) {
            Ok(()) => debug!("gpio {port}: unexport written"),
            Err(e) => warn!("gpio {port}: unexport failed: {e}"),
        }
    }

    /// Some kernels accept an export for a line that does not exist and
    /// simply never create its directory.
    pub fn ensure_exported(&self, port: u32) -> Result<(), GpioError> {
        let path = self.pin_dir(port);
        match fs::metadata(&path) {
            Ok(meta) if meta.is_dir() => Ok(()),
            _ => Err(GpioError::PinNotFound { port, path }),
        }
    }

    pub fn write_value(&self, path: &Path, content: &[u8]) -> Result<(), GpioError> {
        write_sync(path, content).map_err(|e| GpioError::io(path, e))
    }

    pub fn read_value(&self, path: &Path) -> Result<Vec<u8>, GpioError> {
        let mut file = fs::File::open(path).map_err(|e| GpioError::io(path, e))?;
        let mut buf = Vec::with_capacity(4);
        file.read_to_end(&mut buf).map_err(|e| GpioError::io(path, e))?;
        Ok(buf)
    }

    pub fn set_direction(&self, path: &Path, direction: Direction) -> Result<(), GpioError> {
        self.write_value(path, direction.as_str().as_bytes())
    }
}

fn write_sync(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .custom_flags(libc::O_SYNC)
        .open(path)?;
    file.write_all(content)
}
