use std::time::Duration;

use log::{error, info};
use tokio::task::JoinSet;
use tokio::time::sleep;

use pinwatch::{BlinkConfig, Direction, GpioError, InotifyBackend, Pin, SysfsGateway};

#[tokio::main]
async fn main() {
    env_logger::init();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("PINWATCH_CONFIG").ok());
    let config = match config_path {
        Some(path) => BlinkConfig::load_from_file(&path)
            .unwrap_or_else(|e| panic!("Failed to load config: {e}")),
        None => BlinkConfig::default(),
    };

    let gateway = SysfsGateway::new(&config.sysfs_root);
    let backend = InotifyBackend::new();
    let interval = Duration::from_millis(config.interval_ms);

    let mut tasks = JoinSet::new();
    for &port in &config.ports {
        let pin = Pin::create_with(port, gateway.clone(), &backend)
            .unwrap_or_else(|e| panic!("Failed to open gpio {port}: {e}"));
        info!("GPIO {port} - Initialized");
        tasks.spawn(blink(pin, config.times, interval));
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(port)) => info!("GPIO {port} - Closed"),
            Ok(Err(e)) => error!("{e}"),
            Err(e) => error!("blink task failed: {e}"),
        }
    }
}

async fn blink(pin: Pin, times: u32, interval: Duration) -> Result<u32, GpioError> {
    let port = pin.port();
    pin.set_direction(Direction::Out)?;
    let mut events = pin.events().ok_or(GpioError::Closed(port))?;

    for _ in 0..times {
        pin.high()?;
        if let Some(event) = events.recv().await {
            info!("GPIO {} - State: {}", event.port, event.state);
        }
        sleep(interval).await;

        pin.low()?;
        if let Some(event) = events.recv().await {
            info!("GPIO {} - State: {}", event.port, event.state);
        }
        sleep(interval).await;
    }

    tokio::task::spawn_blocking(move || pin.close())
        .await
        .map_err(|e| GpioError::Worker(format!("close gpio {port}: {e}")))?;
    Ok(port)
}
