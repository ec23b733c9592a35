use std::{fmt, fs, path::Path, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::GpioError;

pub const DEFAULT_SYSFS_ROOT: &str = "/sys/class/gpio";

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings for the blink demo binary.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BlinkConfig {
    #[serde(default = "default_sysfs_root")]
    pub sysfs_root: PathBuf,
    #[serde(default = "default_ports")]
    pub ports: Vec<u32>,
    #[serde(default = "default_times")]
    pub times: u32,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_sysfs_root() -> PathBuf {
    PathBuf::from(DEFAULT_SYSFS_ROOT)
}

fn default_ports() -> Vec<u32> {
    vec![17, 18, 23, 24, 25]
}

fn default_times() -> u32 {
    3
}

fn default_interval_ms() -> u64 {
    100
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            sysfs_root: default_sysfs_root(),
            ports: default_ports(),
            times: default_times(),
            interval_ms: default_interval_ms(),
        }
    }
}

impl BlinkConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, GpioError> {
        let contents = fs::read_to_string(&path)
            .map_err(|e| GpioError::Config(format!("Failed to read config: {e}")))?;
        serde_json::from_str(&contents)
            .map_err(|e| GpioError::Config(format!("Invalid config json: {e}")))
    }
}
