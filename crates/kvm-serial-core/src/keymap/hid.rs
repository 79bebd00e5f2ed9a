//! Named USB HID Usage IDs (page 0x07, Keyboard/Keypad) used outside the
//! character tables.
//!
//! Only the keys the capture backends reference by name live here; the
//! printable characters are covered by [`crate::keymap::layout`].
//! Reference: USB HID Usage Tables 1.3, Section 10.

pub const ENTER: u8 = 0x28;
pub const ESCAPE: u8 = 0x29;
pub const BACKSPACE: u8 = 0x2A;
pub const TAB: u8 = 0x2B;
pub const SPACE: u8 = 0x2C;
pub const CAPS_LOCK: u8 = 0x39;

// Function keys F1..F12 are contiguous from 0x3A.
pub const F1: u8 = 0x3A;
pub const F2: u8 = 0x3B;
pub const F3: u8 = 0x3C;
pub const F4: u8 = 0x3D;
pub const F5: u8 = 0x3E;
pub const F6: u8 = 0x3F;
pub const F7: u8 = 0x40;
pub const F8: u8 = 0x41;
pub const F9: u8 = 0x42;
pub const F10: u8 = 0x43;
pub const F11: u8 = 0x44;
pub const F12: u8 = 0x45;

pub const PRINT_SCREEN: u8 = 0x46;
pub const SCROLL_LOCK: u8 = 0x47;
pub const PAUSE: u8 = 0x48;
pub const INSERT: u8 = 0x49;
pub const HOME: u8 = 0x4A;
pub const PAGE_UP: u8 = 0x4B;
pub const DELETE: u8 = 0x4C;
pub const END: u8 = 0x4D;
pub const PAGE_DOWN: u8 = 0x4E;
pub const ARROW_RIGHT: u8 = 0x4F;
pub const ARROW_LEFT: u8 = 0x50;
pub const ARROW_DOWN: u8 = 0x51;
pub const ARROW_UP: u8 = 0x52;

/// Key code for the letter C; byte 2 of the Ctrl+C pass-through report.
pub const KEY_C: u8 = 0x06;
