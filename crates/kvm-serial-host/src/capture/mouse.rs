//! Global pointer hook backend.
//!
//! Captures mouse movement, clicks, and scrolling through the same `rdev`
//! hook mechanism as the keyboard listener and forwards them as CH9329
//! mouse commands. Movement is sent as absolute coordinates scaled into
//! the chip's 0..4096 space; clicks and scrolling use the relative
//! command.
//!
//! The mouse backend has no escape sequence of its own; it stops when the
//! shared running flag is cleared (normally by the keyboard backend's
//! Ctrl+Esc).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rdev::{Button, Event, EventType};
use tracing::{debug, error, warn};

use kvm_serial_core::protocol::mouse::{absolute_payload, click_payload, scroll_payload};
use kvm_serial_core::{Command, FrameError, MouseButton};

use crate::transport::SharedFramer;

use super::{CaptureBackend, CaptureError};

const RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// Sends mouse operations over the shared transport.
///
/// Split out from the backend so the forwarding logic can be exercised
/// without an OS hook.
pub struct MouseOp {
    framer: SharedFramer,
    width: u32,
    height: u32,
}

impl MouseOp {
    pub fn new(framer: SharedFramer, width: u32, height: u32) -> Self {
        Self {
            framer,
            width,
            height,
        }
    }

    /// Moves the remote cursor to the given local screen position.
    pub fn on_move(&self, x: i32, y: i32) -> Result<(), FrameError> {
        let payload = absolute_payload(x, y, self.width, self.height);
        self.framer
            .lock()
            .expect("transport lock poisoned")
            .send(Command::MouseAbsolute, &payload)?;
        debug!(x, y, "mouse moved");
        Ok(())
    }

    /// Presses or releases a mouse button at the current position.
    pub fn on_click(&self, x: i32, y: i32, button: MouseButton, down: bool) -> Result<(), FrameError> {
        let payload = click_payload(button, down);
        self.framer
            .lock()
            .expect("transport lock poisoned")
            .send(Command::MouseRelative, &payload)?;
        debug!(x, y, ?button, down, "mouse click");
        Ok(())
    }

    /// Scrolls by the given wheel deltas.
    pub fn on_scroll(&self, x: i32, y: i32, dx: i16, dy: i16) -> Result<(), FrameError> {
        let payload = scroll_payload(dx, dy);
        self.framer
            .lock()
            .expect("transport lock poisoned")
            .send(Command::MouseRelative, &payload)?;
        debug!(x, y, dx, dy, "mouse scroll");
        Ok(())
    }
}

pub struct MouseBackend {
    op: MouseOp,
    running: Arc<AtomicBool>,
    /// Last observed cursor position, used for click/scroll logging.
    position: (i32, i32),
}

impl MouseBackend {
    pub fn new(framer: SharedFramer, running: Arc<AtomicBool>, width: u32, height: u32) -> Self {
        Self {
            op: MouseOp::new(framer, width, height),
            running,
            position: (0, 0),
        }
    }

    fn handle_event(&mut self, event: Event) -> Result<(), CaptureError> {
        match event.event_type {
            EventType::MouseMove { x, y } => {
                self.position = (x as i32, y as i32);
                self.op.on_move(self.position.0, self.position.1)?;
            }
            EventType::ButtonPress(button) => {
                if let Some(button) = map_button(button) {
                    self.op.on_click(self.position.0, self.position.1, button, true)?;
                }
            }
            EventType::ButtonRelease(button) => {
                if let Some(button) = map_button(button) {
                    self.op.on_click(self.position.0, self.position.1, button, false)?;
                }
            }
            EventType::Wheel { delta_x, delta_y } => {
                let dx = clamp_delta(delta_x);
                let dy = clamp_delta(delta_y);
                self.op.on_scroll(self.position.0, self.position.1, dx, dy)?;
            }
            // Keyboard events belong to the keyboard backends.
            _ => {}
        }
        Ok(())
    }
}

impl CaptureBackend for MouseBackend {
    fn name(&self) -> &'static str {
        "mouse"
    }

    fn run(&mut self) -> Result<(), CaptureError> {
        let (tx, rx) = mpsc::channel::<Event>();
        thread::Builder::new()
            .name("rdev-mouse-hook".to_string())
            .spawn(move || {
                if let Err(e) = rdev::listen(move |event| {
                    let _ = tx.send(event);
                }) {
                    error!(error = ?e, "mouse hook failed");
                }
            })
            .map_err(CaptureError::Terminal)?;

        warn!("mouse capture active");
        while self.running.load(Ordering::SeqCst) {
            match rx.recv_timeout(RECV_TIMEOUT) {
                Ok(event) => self.handle_event(event)?,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(CaptureError::Listener(
                        "mouse hook thread exited unexpectedly".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

fn map_button(button: Button) -> Option<MouseButton> {
    match button {
        Button::Left => Some(MouseButton::Left),
        Button::Right => Some(MouseButton::Right),
        Button::Middle => Some(MouseButton::Middle),
        Button::Unknown(code) => {
            debug!(code, "unknown mouse button, event dropped");
            None
        }
    }
}

/// Wheel deltas arrive as i64 but the wire format carries i16.
fn clamp_delta(delta: i64) -> i16 {
    delta.clamp(i16::MIN as i64, i16::MAX as i64) as i16
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
