//! KVM-Serial host binary.
//!
//! Usage: `kvm-serial [config.toml]`. The config path defaults to
//! `kvm-serial.toml` in the working directory.

use std::env;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use kvm_serial_host::capture::{self, mouse::MouseBackend, CaptureSession};
use kvm_serial_host::config::AppConfig;
use kvm_serial_host::transport;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("kvm-serial.toml"));
    let config = AppConfig::load(&config_path).context("loading configuration")?;

    let Some(port) = config.serial.port.clone() else {
        let available = transport::available_port_names();
        if available.is_empty() {
            bail!("no serial port configured in [serial] and none detected on this system");
        }
        bail!(
            "no serial port configured in [serial]; detected ports: {}",
            available.join(", ")
        );
    };
    let framer = transport::open_serial(&port, config.serial.baud)?;

    // The mouse hook runs on its own thread alongside the keyboard backend.
    let mouse_session = if config.mouse.enabled {
        let running = Arc::new(AtomicBool::new(true));
        let backend = MouseBackend::new(
            framer.clone(),
            Arc::clone(&running),
            config.mouse.screen_width,
            config.mouse.screen_height,
        );
        Some(CaptureSession::start(Box::new(backend), running).context("starting mouse capture")?)
    } else {
        None
    };

    let keyboard_running = Arc::new(AtomicBool::new(true));
    let keyboard = capture::create_backend(
        config.keyboard.backend,
        framer.clone(),
        config.keyboard.layout.char_map(),
        Arc::clone(&keyboard_running),
    );

    match keyboard {
        Some(mut backend) => {
            info!(
                backend = backend.name(),
                layout = %config.keyboard.layout,
                "keyboard capture starting"
            );
            // Blocks until Ctrl+Esc or an unrecoverable error.
            backend.run()?;
            if let Some(session) = mouse_session {
                session.stop()?;
            }
        }
        None => match mouse_session {
            // Mouse-only session: wait for the mouse thread instead.
            Some(session) => {
                info!("keyboard capture disabled; running mouse only (Ctrl-interrupt to quit)");
                session.join()?;
            }
            None => {
                warn!("neither keyboard nor mouse capture is enabled; nothing to do");
            }
        },
    }

    info!("capture stopped");
    Ok(())
}
