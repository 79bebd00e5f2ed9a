//! Raw-mode terminal backend.
//!
//! Reads keystrokes from the controlling terminal via `crossterm`. This
//! needs no elevated privileges and works over SSH, but it only sees keys
//! while the terminal has focus, and terminals deliver no key-up events,
//! so every press is followed immediately by a release report. Holding a
//! key on the remote target is therefore not possible from this backend;
//! use the listener or usb backend for that.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use tracing::{debug, warn};

use kvm_serial_core::keymap::hid;
use kvm_serial_core::{char_to_scancode, CharMap, Modifiers, Scancode};

use crate::transport::SharedFramer;

use super::{CaptureBackend, CaptureError};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct TerminalBackend {
    framer: SharedFramer,
    char_map: CharMap,
    running: Arc<AtomicBool>,
}

impl TerminalBackend {
    pub fn new(framer: SharedFramer, char_map: CharMap, running: Arc<AtomicBool>) -> Self {
        Self {
            framer,
            char_map,
            running,
        }
    }

    fn capture_loop(&mut self) -> Result<(), CaptureError> {
        while self.running.load(Ordering::SeqCst) {
            if !event::poll(POLL_INTERVAL)? {
                continue;
            }
            let Event::Key(key_event) = event::read()? else {
                continue;
            };
            // Some terminals report both press and release; only presses
            // matter here since a release is synthesized after each one.
            if key_event.kind == KeyEventKind::Release {
                continue;
            }

            let ctrl = key_event.modifiers.contains(KeyModifiers::CONTROL);
            if ctrl && key_event.code == KeyCode::Esc {
                warn!("Ctrl+Esc detected, stopping capture");
                break;
            }
            if ctrl && key_event.code == KeyCode::Char('c') {
                warn!("Ctrl+C is passed through to the remote target; press Ctrl+Esc to exit");
            }

            let Some(scancode) = key_event_to_scancode(&key_event, &self.char_map) else {
                debug!(code = ?key_event.code, "unrecognized terminal key, event dropped");
                continue;
            };
            debug!(report = ?scancode, "terminal key");

            let mut framer = self.framer.lock().expect("transport lock poisoned");
            framer.send_scancode(scancode.as_bytes())?;
            // No key-up events in a terminal; release immediately.
            framer.release()?;
        }
        Ok(())
    }
}

impl CaptureBackend for TerminalBackend {
    fn name(&self) -> &'static str {
        "terminal"
    }

    fn run(&mut self) -> Result<(), CaptureError> {
        terminal::enable_raw_mode()?;
        warn!("terminal capture active; press Ctrl+Esc to exit");
        let result = self.capture_loop();
        // Restore the terminal even when the loop failed.
        if let Err(e) = terminal::disable_raw_mode() {
            warn!(error = %e, "failed to restore terminal mode");
        }
        result
    }
}

/// Translates one terminal key event into a HID report, or `None` for keys
/// with no HID equivalent.
fn key_event_to_scancode(event: &KeyEvent, map: &CharMap) -> Option<Scancode> {
    let modifiers = event_modifiers(event.modifiers);
    let pressed = match event.code {
        // The terminal already applied shift to characters, so 'A' comes
        // in as 'A' and the layout table supplies the shift bit itself.
        KeyCode::Char(ch) => char_to_scancode(ch, map),
        KeyCode::Enter => Scancode::new(hid::ENTER, Modifiers::empty()),
        KeyCode::Esc => Scancode::new(hid::ESCAPE, Modifiers::empty()),
        KeyCode::Backspace => Scancode::new(hid::BACKSPACE, Modifiers::empty()),
        KeyCode::Tab => Scancode::new(hid::TAB, Modifiers::empty()),
        // Shift+Tab arrives as BackTab with the shift modifier stripped.
        KeyCode::BackTab => Scancode::new(hid::TAB, Modifiers(Modifiers::LEFT_SHIFT)),
        KeyCode::Delete => Scancode::new(hid::DELETE, Modifiers::empty()),
        KeyCode::Insert => Scancode::new(hid::INSERT, Modifiers::empty()),
        KeyCode::Home => Scancode::new(hid::HOME, Modifiers::empty()),
        KeyCode::End => Scancode::new(hid::END, Modifiers::empty()),
        KeyCode::PageUp => Scancode::new(hid::PAGE_UP, Modifiers::empty()),
        KeyCode::PageDown => Scancode::new(hid::PAGE_DOWN, Modifiers::empty()),
        KeyCode::Up => Scancode::new(hid::ARROW_UP, Modifiers::empty()),
        KeyCode::Down => Scancode::new(hid::ARROW_DOWN, Modifiers::empty()),
        KeyCode::Left => Scancode::new(hid::ARROW_LEFT, Modifiers::empty()),
        KeyCode::Right => Scancode::new(hid::ARROW_RIGHT, Modifiers::empty()),
        KeyCode::CapsLock => Scancode::new(hid::CAPS_LOCK, Modifiers::empty()),
        KeyCode::F(n @ 1..=12) => Scancode::new(hid::F1 + (n - 1), Modifiers::empty()),
        _ => return None,
    };
    // Merging a single key report with one modifier set cannot overflow.
    Scancode::merge(&[Scancode::modifier_only(modifiers), pressed]).ok()
}

/// Maps terminal modifier flags onto HID bits. Terminals do not
/// distinguish left from right, so the left-hand bits are used.
fn event_modifiers(modifiers: KeyModifiers) -> Modifiers {
    let mut bits = 0u8;
    if modifiers.contains(KeyModifiers::CONTROL) {
        bits |= Modifiers::LEFT_CTRL;
    }
    if modifiers.contains(KeyModifiers::SHIFT) {
        bits |= Modifiers::LEFT_SHIFT;
    }
    if modifiers.contains(KeyModifiers::ALT) {
        bits |= Modifiers::LEFT_ALT;
    }
    if modifiers.contains(KeyModifiers::SUPER) {
        bits |= Modifiers::LEFT_META;
    }
    Modifiers(bits)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
