//! Serial transport to the CH9329 chip.
//!
//! All capture backends share one [`Framer`] behind a mutex so that frames
//! from concurrent threads (keyboard and mouse) never interleave on the
//! wire. The sink is boxed so tests can substitute an in-memory buffer for
//! the real serial port.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use kvm_serial_core::Framer;

pub mod mock;

/// Where encoded frames go. In production this wraps a serial port.
pub type ByteSink = Box<dyn Write + Send>;

/// A frame encoder shared between capture threads.
pub type SharedFramer = Arc<Mutex<Framer<ByteSink>>>;

/// Write timeout for the serial port. The CH9329 consumes frames far
/// faster than a human types, so a short timeout only trips on a dead link.
const WRITE_TIMEOUT: Duration = Duration::from_millis(500);

/// Errors raised while setting up the serial transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to open serial port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },
}

/// Wraps any byte sink in a shared frame encoder.
pub fn shared_framer(sink: ByteSink) -> SharedFramer {
    Arc::new(Mutex::new(Framer::new(sink)))
}

/// Opens the serial port to the CH9329 and returns a shared frame encoder
/// over it.
pub fn open_serial(port: &str, baud: u32) -> Result<SharedFramer, TransportError> {
    let sink = serialport::new(port, baud)
        .timeout(WRITE_TIMEOUT)
        .open()
        .map_err(|source| TransportError::Open {
            port: port.to_string(),
            source,
        })?;
    info!(port, baud, "serial transport open");
    Ok(shared_framer(Box::new(sink)))
}

/// Names of the serial ports currently present on the system. Used for the
/// hint printed when no port is configured. Enumeration failures are
/// reported as an empty list.
pub fn available_port_names() -> Vec<String> {
    match serialport::available_ports() {
        Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
        Err(e) => {
            warn!(error = %e, "could not enumerate serial ports");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MemorySink;
    use super::*;

    use kvm_serial_core::{Command, Scancode};

    #[test]
    fn test_shared_framer_serializes_writes_from_clones() {
        // Arrange
        let sink = MemorySink::new();
        let framer = shared_framer(Box::new(sink.clone()));
        let clone = Arc::clone(&framer);

        // Act: two handles writing through the same framer.
        framer
            .lock()
            .expect("transport lock poisoned")
            .send(Command::Keyboard, Scancode::RELEASE.as_bytes())
            .unwrap();
        clone
            .lock()
            .expect("transport lock poisoned")
            .send(Command::Keyboard, Scancode::RELEASE.as_bytes())
            .unwrap();

        // Assert: two complete 14-byte frames back to back.
        let bytes = sink.snapshot();
        assert_eq!(bytes.len(), 28);
        assert_eq!(&bytes[0..2], &[0x57, 0xAB]);
        assert_eq!(&bytes[14..16], &[0x57, 0xAB]);
    }
}
