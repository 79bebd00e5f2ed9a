//! CH9329 command framing.
//!
//! Wire format:
//! ```text
//! [head:2 = 57 AB][addr:1][cmd:1][len:1][payload:len][checksum:1]
//! ```
//! The checksum is the low byte of the sum of every preceding byte.  The
//! protocol is fire-and-forget: the chip sends no acknowledgement for
//! input reports and this layer performs no retries.  A frame is built
//! fresh per send and written to the transport in a single call, so a
//! caller that serializes access to the transport (one mutex around the
//! [`Framer`]) never interleaves partial frames.
//!
//! Based on the framing of the beijixiaohu/ch9329Comm protocol module.

use std::io::Write;

use thiserror::Error;
use tracing::trace;

use crate::scancode::{Scancode, REPORT_LEN};

/// The constant two-byte frame header.
pub const FRAME_HEAD: [u8; 2] = [0x57, 0xAB];

/// Default chip address.
pub const DEFAULT_ADDRESS: u8 = 0x00;

/// The length field is a single byte.
pub const MAX_PAYLOAD: usize = u8::MAX as usize;

/// CH9329 command bytes used by this system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    /// 8-byte HID boot-keyboard report.
    Keyboard = 0x02,
    /// Absolute mouse move (7-byte payload).
    MouseAbsolute = 0x04,
    /// Relative mouse click/scroll (5-byte payload).
    MouseRelative = 0x05,
}

/// Errors raised while framing or writing a packet.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The payload does not fit the one-byte length field.  Structural
    /// errors like this always fail fast; they are never coerced.
    #[error("payload too long for one frame: {len} bytes (max {MAX_PAYLOAD})")]
    PayloadTooLong { len: usize },

    /// The transport write failed.  Propagated unchanged; the backend
    /// decides whether to terminate.
    #[error("serial transport write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Builds one complete frame: header, address, command, length, payload,
/// checksum.
///
/// # Errors
///
/// Returns [`FrameError::PayloadTooLong`] if `payload` exceeds 255 bytes.
///
/// # Examples
///
/// ```rust
/// use kvm_serial_core::protocol::frame::{encode_frame, Command};
///
/// let frame = encode_frame(Command::Keyboard, 0x00, &[0x04; 8]).unwrap();
/// assert_eq!(frame.len(), 2 + 1 + 1 + 1 + 8 + 1);
/// assert_eq!(&frame[..2], &[0x57, 0xAB]);
/// ```
pub fn encode_frame(cmd: Command, address: u8, payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLong { len: payload.len() });
    }

    let mut frame = Vec::with_capacity(FRAME_HEAD.len() + 4 + payload.len());
    frame.extend_from_slice(&FRAME_HEAD);
    frame.push(address);
    frame.push(cmd as u8);
    frame.push(payload.len() as u8);
    frame.extend_from_slice(payload);

    // Low byte of the sum over header, address, command, length, payload.
    let checksum = frame.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    frame.push(checksum);
    Ok(frame)
}

/// Wraps a byte-oriented transport and writes checksummed frames to it.
///
/// The transport only needs to be an open, writable byte sink; serial
/// configuration (baud rate, port settings) happens before the sink is
/// handed over.
pub struct Framer<W> {
    writer: W,
    address: u8,
}

impl<W: Write> Framer<W> {
    /// Creates a framer talking to the default chip address.
    pub fn new(writer: W) -> Self {
        Framer {
            writer,
            address: DEFAULT_ADDRESS,
        }
    }

    /// Creates a framer with an explicit chip address.
    pub fn with_address(writer: W, address: u8) -> Self {
        Framer { writer, address }
    }

    /// Frames `payload` under `cmd` and writes it to the transport in one
    /// call.
    ///
    /// # Errors
    ///
    /// [`FrameError::PayloadTooLong`] for an oversized payload, or
    /// [`FrameError::Io`] if the transport write fails.
    pub fn send(&mut self, cmd: Command, payload: &[u8]) -> Result<(), FrameError> {
        let frame = encode_frame(cmd, self.address, payload)?;
        self.writer.write_all(&frame)?;
        Ok(())
    }

    /// Sends a raw keyboard report.
    ///
    /// Returns `Ok(false)` without sending when the report is shorter
    /// than 8 bytes. A truncated USB read is not worth tearing the
    /// capture loop down for, so short reports are dropped rather than
    /// treated as errors.
    pub fn send_scancode(&mut self, report: &[u8]) -> Result<bool, FrameError> {
        if report.len() < REPORT_LEN {
            trace!(len = report.len(), "short keyboard report dropped");
            return Ok(false);
        }
        self.send(Command::Keyboard, report)?;
        Ok(true)
    }

    /// Sends one [`Scancode`].
    pub fn send_report(&mut self, scancode: &Scancode) -> Result<(), FrameError> {
        self.send(Command::Keyboard, scancode.as_bytes())
    }

    /// Sends the all-zero report: no keys held.
    ///
    /// Every backend calls this on key-up so the remote target never
    /// sees a stuck key.
    pub fn release(&mut self) -> Result<(), FrameError> {
        self.send(Command::Keyboard, Scancode::RELEASE.as_bytes())
    }

    /// Access to the underlying transport (used by tests to inspect
    /// written bytes).
    pub fn get_ref(&self) -> &W {
        &self.writer
    }
}
