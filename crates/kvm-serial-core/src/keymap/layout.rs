//! Keyboard layout tables: a base en_GB ISO character table with sparse
//! per-layout overrides.
//!
//! # Why a base table plus overrides?
//!
//! HID key codes name physical key positions, not characters.  Which
//! character a position produces depends on the keyboard layout the
//! remote target is configured for.  Most positions agree between the
//! supported layouts, so each layout only records its differences from
//! the en_GB base: a replaced code, or `None` to mark a character as
//! unavailable in that locale (e.g. `£` on en_US).
//!
//! Layout names are a closed set ([`Layout`]); an unrecognized name is a
//! hard [`LayoutError::UnknownLayout`] wherever it is parsed.  There is
//! deliberately no silent fallback to the base layout: a typo in the
//! configuration would otherwise send wrong symbols to the remote target
//! without any visible failure.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors for layout resolution.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    /// The layout name is not one of the known set.
    #[error("unknown keyboard layout {0:?}; available layouts: en_GB, en_US")]
    UnknownLayout(String),
}

/// The closed set of supported keyboard layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Layout {
    /// UK ISO layout; source of truth for the base table.
    #[default]
    #[serde(rename = "en_GB")]
    EnGb,
    /// US ANSI layout.
    #[serde(rename = "en_US")]
    EnUs,
}

impl Layout {
    pub const ALL: [Layout; 2] = [Layout::EnGb, Layout::EnUs];

    /// The canonical layout name, as used in configuration files.
    pub fn name(self) -> &'static str {
        match self {
            Layout::EnGb => "en_GB",
            Layout::EnUs => "en_US",
        }
    }

    fn overrides(self) -> &'static [(char, Option<u8>)] {
        match self {
            Layout::EnGb => EN_GB_OVERRIDES,
            Layout::EnUs => EN_US_OVERRIDES,
        }
    }

    /// Builds the merged character table for this layout: a copy of the
    /// base table with this layout's overrides applied on top.
    pub fn char_map(self) -> CharMap {
        let mut map: HashMap<char, u8> = BASE_TABLE.iter().copied().collect();
        for &(ch, code) in self.overrides() {
            match code {
                Some(code) => {
                    map.insert(ch, code);
                }
                // The sentinel: this character does not exist in the layout.
                None => {
                    map.remove(&ch);
                }
            }
        }
        CharMap { map }
    }
}

impl FromStr for Layout {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "en_GB" => Ok(Layout::EnGb),
            "en_US" => Ok(Layout::EnUs),
            other => Err(LayoutError::UnknownLayout(other.to_string())),
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A resolved character-to-key-code table for one layout.
#[derive(Debug, Clone)]
pub struct CharMap {
    map: HashMap<char, u8>,
}

impl CharMap {
    /// Looks up the HID key code for a character, or `None` if the
    /// character is not typeable in this layout.
    pub fn code(&self, ch: char) -> Option<u8> {
        self.map.get(&ch).copied()
    }

    /// Returns `true` if the character is typeable in this layout.
    pub fn contains(&self, ch: char) -> bool {
        self.map.contains_key(&ch)
    }
}

// ── Base table (en_GB ISO) ────────────────────────────────────────────────────

/// Character → HID key code for the en_GB ISO layout.
///
/// Uppercase letters and shifted symbols map to the same physical key as
/// their unshifted partner; whether Shift is added is decided by the
/// translator, not this table.
#[rustfmt::skip]
const BASE_TABLE: &[(char, u8)] = &[
    // Lowercase letters
    ('a', 0x04), ('b', 0x05), ('c', 0x06), ('d', 0x07), ('e', 0x08), ('f', 0x09),
    ('g', 0x0A), ('h', 0x0B), ('i', 0x0C), ('j', 0x0D), ('k', 0x0E), ('l', 0x0F),
    ('m', 0x10), ('n', 0x11), ('o', 0x12), ('p', 0x13), ('q', 0x14), ('r', 0x15),
    ('s', 0x16), ('t', 0x17), ('u', 0x18), ('v', 0x19), ('w', 0x1A), ('x', 0x1B),
    ('y', 0x1C), ('z', 0x1D),
    // Digits (without shift)
    ('1', 0x1E), ('2', 0x1F), ('3', 0x20), ('4', 0x21), ('5', 0x22), ('6', 0x23),
    ('7', 0x24), ('8', 0x25), ('9', 0x26), ('0', 0x27),
    // Symbols (without shift)
    ('-', 0x2D), ('=', 0x2E), ('[', 0x2F), (']', 0x30), ('#', 0x32), (';', 0x33),
    ('\'', 0x34), ('`', 0x35), (',', 0x36), ('.', 0x37), ('/', 0x38), ('\\', 0x64),
    // Control characters
    ('\n', 0x28), ('\t', 0x2B), ('\u{8}', 0x2A), (' ', 0x2C),
    // Uppercase letters (with shift)
    ('A', 0x04), ('B', 0x05), ('C', 0x06), ('D', 0x07), ('E', 0x08), ('F', 0x09),
    ('G', 0x0A), ('H', 0x0B), ('I', 0x0C), ('J', 0x0D), ('K', 0x0E), ('L', 0x0F),
    ('M', 0x10), ('N', 0x11), ('O', 0x12), ('P', 0x13), ('Q', 0x14), ('R', 0x15),
    ('S', 0x16), ('T', 0x17), ('U', 0x18), ('V', 0x19), ('W', 0x1A), ('X', 0x1B),
    ('Y', 0x1C), ('Z', 0x1D),
    // Symbols (with shift) - UK ISO
    ('!', 0x1E), ('"', 0x1F), ('£', 0x20), ('$', 0x21), ('%', 0x22), ('^', 0x23),
    ('&', 0x24), ('*', 0x25), ('(', 0x26), (')', 0x27), ('_', 0x2D), ('+', 0x2E),
    ('{', 0x2F), ('}', 0x30), ('~', 0x32), (':', 0x33), ('@', 0x34), ('¬', 0x35),
    ('<', 0x36), ('>', 0x37), ('?', 0x38), ('|', 0x64),
];

// ── Per-layout overrides ──────────────────────────────────────────────────────

const EN_GB_OVERRIDES: &[(char, Option<u8>)] = &[];

/// US ANSI differences from the UK ISO base.
const EN_US_OVERRIDES: &[(char, Option<u8>)] = &[
    // Double quote: Shift+' in US, Shift+2 in UK.
    ('"', Some(0x34)),
    // At sign: Shift+2 in US, Shift+' in UK.
    ('@', Some(0x1F)),
    // Hash: Shift+3 in US; the UK key at 0x20 produces £ instead.
    ('#', Some(0x20)),
    // Pound sterling and not-sign do not exist on the US layout.
    ('£', None),
    ('¬', None),
];
