#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use pinwatch::{Event, EventReceiver, SysfsGateway};
use tokio::time::{sleep, timeout};

pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);
pub const QUIET_PERIOD: Duration = Duration::from_millis(50);

/// Throwaway directory laid out like `/sys/class/gpio`.
pub struct FakeSysfs {
    pub root: PathBuf,
}

impl FakeSysfs {
    pub fn new(name: &str) -> Self {
        let root = std::env::temp_dir().join(format!("pinwatch-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(&root).expect("create fake sysfs root");
        fs::write(root.join("export"), b"").expect("create export");
        fs::write(root.join("unexport"), b"").expect("create unexport");
        Self { root }
    }

    /// Pre-creates the directory the kernel would make on export.
    pub fn with_line(self, port: u32) -> Self {
        let dir = self.root.join(format!("gpio{port}"));
        fs::create_dir_all(&dir).expect("create line dir");
        fs::write(dir.join("value"), b"0\n").expect("create value");
        fs::write(dir.join("direction"), b"").expect("create direction");
        self
    }

    pub fn gateway(&self) -> SysfsGateway {
        SysfsGateway::new(&self.root)
    }

    pub fn value_path(&self, port: u32) -> PathBuf {
        self.root.join(format!("gpio{port}")).join("value")
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.root.join(relative)).expect("read fake sysfs file")
    }
}

impl Drop for FakeSysfs {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

pub fn first_byte(path: &Path) -> Option<u8> {
    fs::read(path).ok().and_then(|raw| raw.first().copied())
}

/// Polls until the serializer's write has landed.
pub async fn wait_for_value(path: &Path, expected: u8) {
    let waited = timeout(RECV_TIMEOUT, async {
        while first_byte(path) != Some(expected) {
            sleep(Duration::from_millis(2)).await;
        }
    })
    .await;
    assert!(
        waited.is_ok(),
        "value file never became {:?}",
        expected as char
    );
}

pub async fn next_event(events: &mut EventReceiver) -> Option<Event> {
    timeout(RECV_TIMEOUT, events.recv())
        .await
        .expect("timed out waiting for event")
}

pub async fn assert_quiet(events: &mut EventReceiver) {
    sleep(QUIET_PERIOD).await;
    assert_eq!(events.try_recv(), None);
}
