//! The 8-byte HID boot-keyboard report and its merge rules.
//!
//! Layout of a report (USB HID 1.11, Appendix B.1 "Boot keyboard"):
//!
//! ```text
//! [modifiers:1][reserved:1][key0:1][key1:1][key2:1][key3:1][key4:1][key5:1]
//! ```
//!
//! Byte 0 is a bitmask of the eight modifier keys (see [`Modifiers`]),
//! byte 1 is always zero, and bytes 2–7 hold up to six simultaneously
//! pressed non-modifier key codes, zero padded.  This is both what the
//! CH9329 expects as the keyboard command payload and what a physical
//! keyboard's interrupt endpoint produces, so the USB passthrough backend
//! forwards these verbatim.
//!
//! A report is built fresh for every key press or release; merging never
//! mutates its inputs.

use std::fmt;

use thiserror::Error;

/// Length in bytes of a HID boot-keyboard report.
pub const REPORT_LEN: usize = 8;

/// Maximum number of simultaneous non-modifier key codes in one report.
///
/// This is the HID boot-protocol limit; n-key rollover beyond six keys is
/// deliberately unsupported.
pub const MAX_KEYS: usize = 6;

/// Errors produced by scancode construction and merging.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScancodeError {
    /// More than [`MAX_KEYS`] non-zero key codes were supplied to a merge.
    ///
    /// This is a hard error: the caller's modifier accounting is feeding
    /// too many held keys into one report, and silently truncating would
    /// drop keystrokes on the remote target.
    #[error("cannot pack more than {MAX_KEYS} simultaneous key codes into one report")]
    RolloverOverflow,
}

/// Modifier bitmask for report byte 0, in CH9329/HID bit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers(pub u8);

impl Modifiers {
    pub const LEFT_CTRL: u8 = 0x01;
    pub const LEFT_SHIFT: u8 = 0x02;
    pub const LEFT_ALT: u8 = 0x04;
    pub const LEFT_META: u8 = 0x08;
    pub const RIGHT_CTRL: u8 = 0x10;
    pub const RIGHT_SHIFT: u8 = 0x20;
    pub const RIGHT_ALT: u8 = 0x40;
    pub const RIGHT_META: u8 = 0x80;

    /// No modifiers held.
    pub const fn empty() -> Self {
        Modifiers(0)
    }

    /// Returns `true` if no modifier bit is set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Bitwise union with another modifier set.
    pub fn union(self, other: Modifiers) -> Modifiers {
        Modifiers(self.0 | other.0)
    }

    /// Returns `true` if either Ctrl modifier is active.
    pub fn ctrl(self) -> bool {
        self.0 & (Self::LEFT_CTRL | Self::RIGHT_CTRL) != 0
    }

    /// Returns `true` if either Shift modifier is active.
    pub fn shift(self) -> bool {
        self.0 & (Self::LEFT_SHIFT | Self::RIGHT_SHIFT) != 0
    }

    /// Returns `true` if either Alt modifier is active.
    pub fn alt(self) -> bool {
        self.0 & (Self::LEFT_ALT | Self::RIGHT_ALT) != 0
    }

    /// Returns `true` if either Meta (Win/Cmd/Super) modifier is active.
    pub fn meta(self) -> bool {
        self.0 & (Self::LEFT_META | Self::RIGHT_META) != 0
    }
}

/// One HID boot-keyboard report.
///
/// Constructed fresh per event via [`Scancode::new`] and combined with the
/// currently held modifiers via [`Scancode::merge`]; never mutated after
/// construction.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Scancode([u8; REPORT_LEN]);

impl Scancode {
    /// The all-zero "no keys held" report.
    ///
    /// Every backend sends this on key-up so the remote target never sees
    /// a stuck key.
    pub const RELEASE: Scancode = Scancode([0; REPORT_LEN]);

    /// Builds a report with `code` in the first key slot and the given
    /// modifier byte.
    pub fn new(code: u8, modifiers: Modifiers) -> Self {
        let mut bytes = [0u8; REPORT_LEN];
        bytes[0] = modifiers.0;
        bytes[2] = code;
        Scancode(bytes)
    }

    /// Builds a modifier-only report (no key code slots used).
    pub fn modifier_only(modifiers: Modifiers) -> Self {
        Scancode::new(0, modifiers)
    }

    /// Wraps a raw 8-byte report, e.g. one read from a keyboard's
    /// interrupt endpoint.
    pub fn from_report(bytes: [u8; REPORT_LEN]) -> Self {
        Scancode(bytes)
    }

    /// The raw report bytes, ready for the keyboard command payload.
    pub fn as_bytes(&self) -> &[u8; REPORT_LEN] {
        &self.0
    }

    /// The modifier bitmask (byte 0).
    pub fn modifiers(&self) -> Modifiers {
        Modifiers(self.0[0])
    }

    /// Iterates over the non-zero key codes in slot order.
    pub fn keys(&self) -> impl Iterator<Item = u8> + '_ {
        self.0[2..].iter().copied().filter(|&code| code != 0)
    }

    /// Returns `true` if this is the all-zero release report.
    pub fn is_release(&self) -> bool {
        self.0 == [0; REPORT_LEN]
    }

    /// Merges several reports into one.
    ///
    /// Modifier bytes are combined with bitwise OR; non-zero key codes are
    /// copied, in input order, into the next free key slot of the output.
    /// This is how "Shift + letter" or "Ctrl+Alt+key" reports are
    /// produced: one report per held modifier plus one for the pressed
    /// key, merged into a single packet.
    ///
    /// # Errors
    ///
    /// Returns [`ScancodeError::RolloverOverflow`] if the inputs carry
    /// more than [`MAX_KEYS`] non-zero key codes in total.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use kvm_serial_core::scancode::{Modifiers, Scancode};
    ///
    /// let shift = Scancode::modifier_only(Modifiers(Modifiers::LEFT_SHIFT));
    /// let key_a = Scancode::new(0x04, Modifiers::empty());
    /// let merged = Scancode::merge(&[shift, key_a]).unwrap();
    /// assert_eq!(merged.as_bytes(), &[0x02, 0, 0x04, 0, 0, 0, 0, 0]);
    /// ```
    pub fn merge(codes: &[Scancode]) -> Result<Scancode, ScancodeError> {
        let mut out = [0u8; REPORT_LEN];
        let mut filled = 2;
        for code in codes {
            out[0] |= code.0[0];
            for &key in &code.0[2..] {
                // Key slots are contiguous; the first zero ends the report.
                if key == 0 {
                    break;
                }
                if filled >= REPORT_LEN {
                    return Err(ScancodeError::RolloverOverflow);
                }
                out[filled] = key;
                filled += 1;
            }
        }
        Ok(Scancode(out))
    }
}

impl fmt::Debug for Scancode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scancode[")?;
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{byte:02x}")?;
        }
        write!(f, "]")
    }
}
