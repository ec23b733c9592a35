use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GpioError {
    #[error("Failed to export gpio {port}: {source}")]
    Export {
        port: u32,
        #[source]
        source: io::Error,
    },
    #[error("Gpio {port} not found: {} missing after export", path.display())]
    PinNotFound { port: u32, path: PathBuf },
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Watch error: {0}")]
    Watch(String),
    #[error("Worker error: {0}")]
    Worker(String),
    #[error("Gpio {0} is closed")]
    Closed(u32),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl GpioError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        GpioError::Io {
            path: path.into(),
            source,
        }
    }
}
