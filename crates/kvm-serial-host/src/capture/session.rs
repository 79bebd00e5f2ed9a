//! Running a capture backend on its own thread.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{info, warn};

use super::{CaptureBackend, CaptureError};

/// A capture backend running on a dedicated thread.
///
/// The session owns the thread handle and a shared running flag. Clearing
/// the flag asks the backend to wind down cooperatively; every backend
/// polls it at least every 100ms.
pub struct CaptureSession {
    name: &'static str,
    running: Arc<AtomicBool>,
    handle: JoinHandle<Result<(), CaptureError>>,
}

impl CaptureSession {
    /// Spawns `backend` on a named thread. The caller keeps a clone of
    /// `running` if it wants to signal shutdown from elsewhere.
    pub fn start(
        mut backend: Box<dyn CaptureBackend>,
        running: Arc<AtomicBool>,
    ) -> io::Result<CaptureSession> {
        let name = backend.name();
        let handle = thread::Builder::new()
            .name(format!("capture-{name}"))
            .spawn(move || {
                info!(backend = name, "capture thread started");
                let result = backend.run();
                if let Err(ref e) = result {
                    warn!(backend = name, error = %e, "capture thread failed");
                }
                result
            })?;
        Ok(CaptureSession { name, running, handle })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Signals the backend to stop and waits for the thread to finish.
    pub fn stop(self) -> Result<(), CaptureError> {
        self.running.store(false, Ordering::SeqCst);
        self.join()
    }

    /// Waits for the thread without signalling it first. A panic in the
    /// backend is surfaced as [`CaptureError::Panicked`].
    pub fn join(self) -> Result<(), CaptureError> {
        match self.handle.join() {
            Ok(result) => result,
            Err(_) => Err(CaptureError::Panicked(self.name)),
        }
    }
}
