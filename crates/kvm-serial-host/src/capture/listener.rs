//! Global keyboard hook backend.
//!
//! Uses `rdev` to install an OS-level keyboard hook, so keystrokes are
//! captured no matter which window has focus. This is the only keyboard
//! backend that sees key-up events, which makes held-modifier combos
//! (Ctrl+Alt+Del and friends) work exactly as typed.
//!
//! `rdev::listen` blocks its thread forever and has no stop API, so the
//! hook runs on a feeder thread that pumps events into a channel; the
//! backend drains the channel with a timeout so it can notice the running
//! flag. When capture ends the feeder thread is abandoned; it dies with
//! the process.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rdev::{Event, EventType, Key};
use tracing::{debug, error, warn};

use kvm_serial_core::keymap::hid;
use kvm_serial_core::{char_to_scancode, CharMap, Modifiers, Scancode};

use crate::transport::SharedFramer;

use super::{CaptureBackend, CaptureError, ModifierMap};

const RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// What the event loop should do after handling one event.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

pub struct ListenerBackend {
    framer: SharedFramer,
    char_map: CharMap,
    running: Arc<AtomicBool>,
    modifiers: ModifierMap<Key>,
}

impl ListenerBackend {
    pub fn new(framer: SharedFramer, char_map: CharMap, running: Arc<AtomicBool>) -> Self {
        Self {
            framer,
            char_map,
            running,
            modifiers: ModifierMap::new(),
        }
    }

    fn handle_event(&mut self, event: Event) -> Result<Flow, CaptureError> {
        match event.event_type {
            EventType::KeyPress(key) => self.on_press(key, event.name.as_deref()),
            EventType::KeyRelease(key) => {
                self.on_release(key)?;
                Ok(Flow::Continue)
            }
            // Pointer events are handled by the mouse backend.
            _ => Ok(Flow::Continue),
        }
    }

    fn on_press(&mut self, key: Key, name: Option<&str>) -> Result<Flow, CaptureError> {
        let ctrl_held = self.modifiers.union().ctrl();
        if ctrl_held && key == Key::Escape {
            warn!("Ctrl+Esc detected, stopping capture");
            return Ok(Flow::Exit);
        }
        if ctrl_held && key == Key::KeyC {
            warn!("Ctrl+C is passed through to the remote target; press Ctrl+Esc to exit");
        }

        let pressed = if let Some(modifier) = modifier_value(key) {
            self.modifiers.press(key, modifier);
            Scancode::modifier_only(modifier)
        } else if let Some(code) = named_key_code(key) {
            Scancode::new(code, Modifiers::empty())
        } else if let Some(ch) = name.and_then(|n| n.chars().next()) {
            char_to_scancode(ch, &self.char_map)
        } else {
            debug!(?key, "unrecognized key, event dropped");
            return Ok(Flow::Continue);
        };

        // One report carrying the new key plus every held modifier.
        let mut parts = self.modifiers.scancodes();
        parts.push(pressed);
        let merged = Scancode::merge(&parts)?;
        debug!(report = ?merged, "key press");
        self.framer
            .lock()
            .expect("transport lock poisoned")
            .send_scancode(merged.as_bytes())?;
        Ok(Flow::Continue)
    }

    fn on_release(&mut self, key: Key) -> Result<(), CaptureError> {
        // Non-modifier keys were never tracked; removing them is a no-op.
        self.modifiers.release(&key);
        let remaining = Scancode::merge(&self.modifiers.scancodes())?;
        let mut framer = self.framer.lock().expect("transport lock poisoned");
        if remaining.is_release() {
            framer.release()?;
        } else {
            framer.send_scancode(remaining.as_bytes())?;
        }
        Ok(())
    }
}

impl CaptureBackend for ListenerBackend {
    fn name(&self) -> &'static str {
        "listener"
    }

    fn run(&mut self) -> Result<(), CaptureError> {
        let (tx, rx) = mpsc::channel::<Event>();
        thread::Builder::new()
            .name("rdev-keyboard-hook".to_string())
            .spawn(move || {
                if let Err(e) = rdev::listen(move |event| {
                    // Receiver gone means capture ended; nothing to do.
                    let _ = tx.send(event);
                }) {
                    error!(error = ?e, "keyboard hook failed");
                }
            })
            .map_err(CaptureError::Terminal)?;

        warn!("global keyboard capture active; press Ctrl+Esc to exit");
        while self.running.load(Ordering::SeqCst) {
            let event = match rx.recv_timeout(RECV_TIMEOUT) {
                Ok(event) => event,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(CaptureError::Listener(
                        "keyboard hook thread exited unexpectedly".to_string(),
                    ));
                }
            };
            if self.handle_event(event)? == Flow::Exit {
                break;
            }
        }

        // Leave the target keyboard in a clean state.
        self.framer
            .lock()
            .expect("transport lock poisoned")
            .release()?;
        Ok(())
    }
}

/// Maps modifier keys to their HID bit. Left and right variants carry
/// distinct bits in byte 0 of the report.
fn modifier_value(key: Key) -> Option<Modifiers> {
    let bit = match key {
        Key::ControlLeft => Modifiers::LEFT_CTRL,
        Key::ControlRight => Modifiers::RIGHT_CTRL,
        Key::ShiftLeft => Modifiers::LEFT_SHIFT,
        Key::ShiftRight => Modifiers::RIGHT_SHIFT,
        Key::Alt => Modifiers::LEFT_ALT,
        Key::AltGr => Modifiers::RIGHT_ALT,
        Key::MetaLeft => Modifiers::LEFT_META,
        Key::MetaRight => Modifiers::RIGHT_META,
        _ => return None,
    };
    Some(Modifiers(bit))
}

/// Keys that have no character but a well-known HID code.
fn named_key_code(key: Key) -> Option<u8> {
    let code = match key {
        Key::Return => hid::ENTER,
        Key::Escape => hid::ESCAPE,
        Key::Backspace => hid::BACKSPACE,
        Key::Tab => hid::TAB,
        Key::Space => hid::SPACE,
        Key::CapsLock => hid::CAPS_LOCK,
        Key::F1 => hid::F1,
        Key::F2 => hid::F2,
        Key::F3 => hid::F3,
        Key::F4 => hid::F4,
        Key::F5 => hid::F5,
        Key::F6 => hid::F6,
        Key::F7 => hid::F7,
        Key::F8 => hid::F8,
        Key::F9 => hid::F9,
        Key::F10 => hid::F10,
        Key::F11 => hid::F11,
        Key::F12 => hid::F12,
        Key::PrintScreen => hid::PRINT_SCREEN,
        Key::ScrollLock => hid::SCROLL_LOCK,
        Key::Pause => hid::PAUSE,
        Key::Insert => hid::INSERT,
        Key::Home => hid::HOME,
        Key::PageUp => hid::PAGE_UP,
        Key::Delete => hid::DELETE,
        Key::End => hid::END,
        Key::PageDown => hid::PAGE_DOWN,
        Key::RightArrow => hid::ARROW_RIGHT,
        Key::LeftArrow => hid::ARROW_LEFT,
        Key::DownArrow => hid::ARROW_DOWN,
        Key::UpArrow => hid::ARROW_UP,
        _ => return None,
    };
    Some(code)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    use kvm_serial_core::Layout;

    use crate::transport::mock::MemorySink;

    fn backend_with_sink() -> (ListenerBackend, MemorySink) {
        let sink = MemorySink::new();
        let backend = ListenerBackend::new(
            sink.framer(),
            Layout::EnGb.char_map(),
            Arc::new(AtomicBool::new(true)),
        );
        (backend, sink)
    }

    /// Key report bytes of the last complete frame written.
    fn last_report(sink: &MemorySink) -> Vec<u8> {
        let bytes = sink.snapshot();
        assert!(bytes.len() >= 14 && bytes.len() % 14 == 0);
        bytes[bytes.len() - 14 + 5..bytes.len() - 1].to_vec()
    }

    #[test]
    fn test_character_press_is_forwarded() {
        // Arrange
        let (mut backend, sink) = backend_with_sink();

        // Act
        let flow = backend.on_press(Key::KeyA, Some("a")).unwrap();

        // Assert
        assert_eq!(flow, Flow::Continue);
        assert_eq!(last_report(&sink), vec![0x00, 0x00, 0x04, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_held_shift_merges_into_letter_report() {
        let (mut backend, sink) = backend_with_sink();

        backend.on_press(Key::ShiftLeft, None).unwrap();
        backend.on_press(Key::KeyA, Some("a")).unwrap();

        let report = last_report(&sink);
        assert_eq!(report[0], 0x02);
        assert_eq!(report[2], 0x04);
    }

    #[test]
    fn test_named_key_press_uses_hid_code() {
        let (mut backend, sink) = backend_with_sink();

        backend.on_press(Key::F5, None).unwrap();

        assert_eq!(last_report(&sink)[2], 0x3E);
    }

    #[test]
    fn test_unknown_char_maps_to_code_zero() {
        let (mut backend, sink) = backend_with_sink();

        backend.on_press(Key::Unknown(255), Some("€")).unwrap();

        assert_eq!(last_report(&sink)[2], 0x00);
    }

    #[test]
    fn test_unnamed_unknown_key_is_dropped() {
        let (mut backend, sink) = backend_with_sink();

        let flow = backend.on_press(Key::Unknown(255), None).unwrap();

        assert_eq!(flow, Flow::Continue);
        assert!(sink.snapshot().is_empty());
    }

    #[test]
    fn test_ctrl_esc_exits() {
        let (mut backend, _sink) = backend_with_sink();

        backend.on_press(Key::ControlLeft, None).unwrap();
        let flow = backend.on_press(Key::Escape, None).unwrap();

        assert_eq!(flow, Flow::Exit);
    }

    #[test]
    fn test_esc_without_ctrl_is_forwarded() {
        let (mut backend, sink) = backend_with_sink();

        let flow = backend.on_press(Key::Escape, None).unwrap();

        assert_eq!(flow, Flow::Continue);
        assert_eq!(last_report(&sink)[2], 0x29);
    }

    #[test]
    fn test_ctrl_c_is_forwarded_not_intercepted() {
        let (mut backend, sink) = backend_with_sink();

        backend.on_press(Key::ControlLeft, None).unwrap();
        let flow = backend.on_press(Key::KeyC, Some("\u{3}")).unwrap();

        // The press is forwarded with the ctrl bit set; capture continues.
        assert_eq!(flow, Flow::Continue);
        assert_eq!(last_report(&sink)[0], 0x01);
    }

    #[test]
    fn test_release_of_last_key_sends_all_zero_report() {
        let (mut backend, sink) = backend_with_sink();
        backend.on_press(Key::KeyA, Some("a")).unwrap();

        backend.on_release(Key::KeyA).unwrap();

        assert_eq!(last_report(&sink), vec![0u8; 8]);
    }

    #[test]
    fn test_releasing_one_of_two_modifiers_keeps_the_other() {
        let (mut backend, sink) = backend_with_sink();
        backend.on_press(Key::ControlLeft, None).unwrap();
        backend.on_press(Key::ShiftLeft, None).unwrap();

        backend.on_release(Key::ShiftLeft).unwrap();

        let report = last_report(&sink);
        assert_eq!(report[0], 0x01);
        assert_eq!(report[2], 0x00);
    }

    #[test]
    fn test_modifier_values_match_report_bits() {
        assert_eq!(
            modifier_value(Key::ControlLeft),
            Some(Modifiers(Modifiers::LEFT_CTRL))
        );
        assert_eq!(
            modifier_value(Key::ControlRight),
            Some(Modifiers(Modifiers::RIGHT_CTRL))
        );
        assert_eq!(modifier_value(Key::AltGr), Some(Modifiers(Modifiers::RIGHT_ALT)));
        assert_eq!(
            modifier_value(Key::MetaRight),
            Some(Modifiers(Modifiers::RIGHT_META))
        );
        assert_eq!(modifier_value(Key::KeyA), None);
    }

    #[test]
    fn test_function_keys_are_contiguous() {
        assert_eq!(named_key_code(Key::F1), Some(0x3A));
        assert_eq!(named_key_code(Key::F12), Some(0x45));
    }
}
