//! In-memory byte sinks for tests.
//!
//! These live in the production tree (not behind `cfg(test)`) so that
//! integration tests in `tests/` can use them as well.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use super::{shared_framer, SharedFramer};

/// A byte sink that records everything written to it. Cloning yields a
/// second handle to the same buffer, so a test can hand one clone to a
/// framer and keep the other for assertions.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything written so far.
    pub fn snapshot(&self) -> Vec<u8> {
        self.bytes.lock().expect("sink lock poisoned").clone()
    }

    /// Drains and returns everything written so far.
    pub fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.bytes.lock().expect("sink lock poisoned"))
    }

    /// Convenience: a shared framer writing into this sink.
    pub fn framer(&self) -> SharedFramer {
        shared_framer(Box::new(self.clone()))
    }
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes
            .lock()
            .expect("sink lock poisoned")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A byte sink whose writes always fail. Used to test that transport
/// errors propagate out of the capture backends.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingSink;

impl Write for FailingSink {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
    }
}
