//! Input capture backends.
//!
//! A capture backend watches one source of local input and forwards HID
//! reports over the shared serial transport:
//!
//! - [`listener`]: a global OS keyboard hook. Sees every keystroke
//!   regardless of window focus, including key-up events.
//! - [`terminal`]: reads the controlling terminal in raw mode. Needs no
//!   special privileges but only sees keys while the terminal is focused,
//!   and never sees key-up events.
//! - [`usb`]: reads boot-protocol reports straight from a second USB
//!   keyboard, bypassing the OS keymap entirely.
//! - [`mouse`]: a global pointer hook, run alongside whichever keyboard
//!   backend is active.
//!
//! All keyboard backends honor the same escape sequence: Ctrl+Esc stops
//! capture and returns control to the local machine. Ctrl+C is passed
//! through to the remote target with a warning, since intercepting it
//! would make remote shells unusable.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use kvm_serial_core::{CharMap, FrameError, Modifiers, Scancode, ScancodeError};

use crate::transport::SharedFramer;

pub mod listener;
pub mod mouse;
pub mod session;
pub mod terminal;
pub mod usb;

pub use session::CaptureSession;

/// Errors raised by a running capture backend.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("serial transport failure: {0}")]
    Transport(#[from] FrameError),

    #[error(transparent)]
    Report(#[from] ScancodeError),

    #[error("terminal I/O error: {0}")]
    Terminal(#[from] std::io::Error),

    #[error("global input hook failed: {0}")]
    Listener(String),

    #[error(transparent)]
    Usb(#[from] usb::UsbCaptureError),

    #[error("capture backend '{0}' panicked")]
    Panicked(&'static str),
}

/// A source of input events that can be pumped into the serial transport.
///
/// `run` blocks until the escape sequence fires, the running flag is
/// cleared, or an unrecoverable error occurs.
pub trait CaptureBackend: Send {
    fn name(&self) -> &'static str;
    fn run(&mut self) -> Result<(), CaptureError>;
}

/// Which keyboard backend to run. Selected in the `[keyboard]` section of
/// the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// No keyboard capture. Useful for a mouse-only session.
    None,
    /// Global OS keyboard hook.
    #[default]
    Listener,
    /// Raw-mode terminal reader.
    Terminal,
    /// USB HID passthrough from a dedicated keyboard.
    Usb,
}

impl BackendKind {
    pub const ALL: [BackendKind; 4] = [
        BackendKind::None,
        BackendKind::Listener,
        BackendKind::Terminal,
        BackendKind::Usb,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::None => "none",
            BackendKind::Listener => "listener",
            BackendKind::Terminal => "terminal",
            BackendKind::Usb => "usb",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unknown backend names are a hard error, same as unknown layouts.
#[derive(Debug, Error)]
#[error("unknown capture backend '{0}', expected one of: none, listener, terminal, usb")]
pub struct UnknownBackend(String);

impl FromStr for BackendKind {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BackendKind::ALL
            .iter()
            .copied()
            .find(|k| k.name() == s)
            .ok_or_else(|| UnknownBackend(s.to_string()))
    }
}

/// Constructs the backend for `kind`, or `None` when keyboard capture is
/// disabled.
pub fn create_backend(
    kind: BackendKind,
    framer: SharedFramer,
    char_map: CharMap,
    running: Arc<AtomicBool>,
) -> Option<Box<dyn CaptureBackend>> {
    match kind {
        BackendKind::None => None,
        BackendKind::Listener => Some(Box::new(listener::ListenerBackend::new(
            framer, char_map, running,
        ))),
        BackendKind::Terminal => Some(Box::new(terminal::TerminalBackend::new(
            framer, char_map, running,
        ))),
        BackendKind::Usb => Some(Box::new(usb::UsbBackend::new(framer, running))),
    }
}

/// Tracks which modifier keys are currently held, keyed by the backend's
/// native key type.
///
/// Backends that receive key-up events (the global listener) need this to
/// build combined reports: pressing `a` while Shift is held must produce a
/// single report carrying both. Releasing a key that was never tracked is
/// a no-op.
#[derive(Debug)]
pub struct ModifierMap<K> {
    held: HashMap<K, Modifiers>,
}

impl<K: Eq + Hash> ModifierMap<K> {
    pub fn new() -> Self {
        Self { held: HashMap::new() }
    }

    pub fn press(&mut self, key: K, modifiers: Modifiers) {
        self.held.insert(key, modifiers);
    }

    /// Returns true if the key was held.
    pub fn release(&mut self, key: &K) -> bool {
        self.held.remove(key).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    /// The union of all held modifier bits.
    pub fn union(&self) -> Modifiers {
        self.held
            .values()
            .fold(Modifiers::empty(), |acc, m| acc.union(*m))
    }

    /// Modifier-only reports for every held key, for merging with a
    /// freshly pressed key.
    pub fn scancodes(&self) -> Vec<Scancode> {
        self.held
            .values()
            .map(|m| Scancode::modifier_only(*m))
            .collect()
    }
}

impl<K: Eq + Hash> Default for ModifierMap<K> {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
