//! Keyboard layout tables and character/key translation.
//!
//! The canonical representation throughout KVM-Serial is the USB HID
//! Usage ID (page 0x07, Keyboard/Keypad) carried in report key slots.
//! Characters are resolved to key codes through a [`layout::CharMap`]
//! built once at startup from the base en_GB table plus per-layout
//! overrides.

pub mod hid;
pub mod layout;
pub mod translate;

pub use layout::{CharMap, Layout, LayoutError};
