//! # kvm-serial-core
//!
//! Shared library for KVM-Serial: the Scancode model, keyboard layout
//! tables, ASCII/key translation, and the CH9329 serial wire protocol.
//!
//! KVM-Serial lets one computer act as keyboard and mouse for another by
//! emulating a USB HID device through a CH9329 serial-to-USB-HID bridge
//! chip.  The host captures native input events, translates them into
//! 8-byte HID boot-keyboard reports (or mouse payloads), and writes
//! checksummed command frames to the chip over a plain serial link.
//!
//! This crate is the pure core of that pipeline.  It has no dependency on
//! OS input APIs, USB libraries, or serial-port configuration: the only
//! seam to the outside world is a [`std::io::Write`] byte sink handed to
//! the [`protocol::frame::Framer`].
//!
//! # Architecture overview
//!
//! - **`scancode`** – The 8-byte HID boot-keyboard report: one modifier
//!   bitmask byte, one reserved byte, and up to six simultaneous key
//!   codes.  Includes the merge rules that combine "Shift held" and
//!   "letter pressed" into a single report.
//!
//! - **`keymap`** – Character-to-key-code tables.  A base en_GB ISO table
//!   with sparse per-layout overrides, plus the translator that decides
//!   whether a character needs the Shift modifier.
//!
//! - **`protocol`** – The CH9329 command framing (header, address,
//!   command, length, payload, checksum) and the absolute/relative mouse
//!   payload encoders.
//!
//! The host application (`kvm-serial-host`) layers the capture backends,
//! the serial transport, and the USB HID passthrough reader on top.

pub mod keymap;
pub mod protocol;
pub mod scancode;

// Re-export the most-used types at the crate root so callers can write
// `kvm_serial_core::Scancode` instead of the full module path.
pub use keymap::layout::{CharMap, Layout, LayoutError};
pub use keymap::translate::{char_to_scancode, scancode_to_key_name, string_to_scancodes};
pub use protocol::frame::{encode_frame, Command, FrameError, Framer, FRAME_HEAD};
pub use protocol::mouse::MouseButton;
pub use scancode::{Modifiers, Scancode, ScancodeError, MAX_KEYS, REPORT_LEN};
