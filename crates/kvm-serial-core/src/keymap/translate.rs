//! Character/key translation into [`Scancode`]s, and the reverse mapping
//! used for diagnostic logging.
//!
//! Translation is best effort by design: a character the resolved layout
//! cannot type becomes a key-code-0 (no key) report rather than an error,
//! so a stray Unicode character in a pasted string never stops a capture
//! session.

use tracing::debug;

use crate::keymap::layout::CharMap;
use crate::scancode::{Modifiers, Scancode};
use thiserror::Error;

/// Errors for the typed-text expansion helpers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranslateError {
    /// `key_repeat` must be at least 1 (each character appears once).
    #[error("key_repeat must be >= 1, got {0}")]
    InvalidKeyRepeat(usize),
}

/// Unshifted punctuation reachable without the Shift key on the base
/// layout.  Anything typeable but outside this set (and outside
/// lowercase/digit/whitespace) is sent with Shift held.
const DIRECT_PUNCTUATION: &str = "-=[];',./\\`";

fn is_direct(ch: char) -> bool {
    ch.is_ascii_lowercase()
        || ch.is_ascii_digit()
        || matches!(ch, '\n' | '\t' | '\u{8}' | ' ')
        || DIRECT_PUNCTUATION.contains(ch)
}

/// Translates one character into a report under the given layout table.
///
/// Direct characters (lowercase letters, digits, whitespace, and the
/// unshifted punctuation set) build a report with no modifiers;
/// everything else present in the table builds one with Left Shift.
/// Characters absent from the table build a key-code-0 report, an
/// intentional best-effort policy for unmappable input, logged at debug
/// severity.
pub fn char_to_scancode(ch: char, map: &CharMap) -> Scancode {
    match map.code(ch) {
        Some(code) if is_direct(ch) => Scancode::new(code, Modifiers::empty()),
        Some(code) => Scancode::new(code, Modifiers(Modifiers::LEFT_SHIFT)),
        None => {
            debug!(character = ?ch, "no key code for character; sending no-key report");
            Scancode::new(0, Modifiers::empty())
        }
    }
}

/// Expands a string into the reports that would be produced by typing it.
///
/// `key_repeat` emulates a held key repeating (every character's report
/// is emitted that many times); `key_up` inserts that many all-zero
/// release reports after each character's repeat group, which a remote
/// target needs to distinguish "aa" from a single held "a".
///
/// # Errors
///
/// Returns [`TranslateError::InvalidKeyRepeat`] when `key_repeat` is 0.
pub fn string_to_scancodes(
    text: &str,
    map: &CharMap,
    key_repeat: usize,
    key_up: usize,
) -> Result<Vec<Scancode>, TranslateError> {
    if key_repeat < 1 {
        return Err(TranslateError::InvalidKeyRepeat(key_repeat));
    }

    let mut scancodes = Vec::with_capacity(text.chars().count() * (key_repeat + key_up));
    for ch in text.chars() {
        let sc = char_to_scancode(ch, map);
        for _ in 0..key_repeat {
            scancodes.push(sc);
        }
        for _ in 0..key_up {
            scancodes.push(Scancode::RELEASE);
        }
    }
    Ok(scancodes)
}

/// Decodes the first key of a raw report back to a readable name.
///
/// The tables are fixed to the UK ISO layout; this exists purely for the
/// USB passthrough reader's debug logging and key debounce, not for
/// translation, so layout awareness is not worth the complexity here.
/// Multi-character names (`"ESC"`, `"Home"`, arrows) are returned for
/// non-printing keys.  Returns `None` when no key slot maps to anything.
pub fn scancode_to_key_name(sc: &Scancode) -> Option<&'static str> {
    // Multiple keydowns before a key-up are buffered in the rollover
    // slots; take the first non-zero one.
    let key = sc.keys().next().unwrap_or(0);
    if sc.modifiers().shift() {
        shifted_key_name(key)
    } else {
        base_key_name(key)
    }
}

#[rustfmt::skip]
fn base_key_name(code: u8) -> Option<&'static str> {
    Some(match code {
        0x04 => "a", 0x05 => "b", 0x06 => "c", 0x07 => "d", 0x08 => "e", 0x09 => "f",
        0x0A => "g", 0x0B => "h", 0x0C => "i", 0x0D => "j", 0x0E => "k", 0x0F => "l",
        0x10 => "m", 0x11 => "n", 0x12 => "o", 0x13 => "p", 0x14 => "q", 0x15 => "r",
        0x16 => "s", 0x17 => "t", 0x18 => "u", 0x19 => "v", 0x1A => "w", 0x1B => "x",
        0x1C => "y", 0x1D => "z",
        0x1E => "1", 0x1F => "2", 0x20 => "3", 0x21 => "4", 0x22 => "5", 0x23 => "6",
        0x24 => "7", 0x25 => "8", 0x26 => "9", 0x27 => "0",
        0x2D => "-", 0x2E => "=", 0x2F => "[", 0x30 => "]", 0x31 => "#", 0x32 => "#",
        0x33 => ";", 0x34 => "'", 0x35 => "`", 0x36 => ",", 0x37 => ".", 0x38 => "/",
        0x39 => "CAPSLOCK", 0x29 => "ESC",
        0x4F => "→", 0x50 => "←", 0x51 => "↓", 0x52 => "↑",
        0x49 => "Ins", 0x4A => "Home", 0x4B => "PgUp", 0x4C => "Del", 0x4D => "End",
        0x4E => "PgDn",
        0x28 => "\n", 0x2C => " ", 0x2B => "\t", 0x2A => "\u{8}", 0x64 => "\\",
        _ => return None,
    })
}

#[rustfmt::skip]
fn shifted_key_name(code: u8) -> Option<&'static str> {
    Some(match code {
        0x04 => "A", 0x05 => "B", 0x06 => "C", 0x07 => "D", 0x08 => "E", 0x09 => "F",
        0x0A => "G", 0x0B => "H", 0x0C => "I", 0x0D => "J", 0x0E => "K", 0x0F => "L",
        0x10 => "M", 0x11 => "N", 0x12 => "O", 0x13 => "P", 0x14 => "Q", 0x15 => "R",
        0x16 => "S", 0x17 => "T", 0x18 => "U", 0x19 => "V", 0x1A => "W", 0x1B => "X",
        0x1C => "Y", 0x1D => "Z",
        0x1E => "!", 0x1F => "\"", 0x20 => "£", 0x21 => "$", 0x22 => "%", 0x23 => "^",
        0x24 => "&", 0x25 => "*", 0x26 => "(", 0x27 => ")",
        0x2D => "_", 0x2E => "+", 0x2F => "{", 0x30 => "}", 0x31 => "~", 0x32 => "~",
        0x33 => ":", 0x34 => "@", 0x35 => "¬", 0x36 => "<", 0x37 => ">", 0x38 => "?",
        0x64 => "|",
        // Non-printing keys read the same shifted or not.
        other => return base_key_name(other),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::layout::Layout;

    #[test]
    fn test_lowercase_letter_builds_unshifted_report() {
        let map = Layout::EnGb.char_map();
        let sc = char_to_scancode('a', &map);
        assert_eq!(sc.as_bytes(), &[0x00, 0x00, 0x04, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_uppercase_letter_builds_shifted_report() {
        let map = Layout::EnGb.char_map();
        let sc = char_to_scancode('A', &map);
        assert_eq!(sc.as_bytes(), &[0x02, 0x00, 0x04, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_digits_and_whitespace_are_direct() {
        let map = Layout::EnGb.char_map();
        for ch in ['7', ' ', '\n', '\t', '\u{8}'] {
            let sc = char_to_scancode(ch, &map);
            assert!(
                sc.modifiers().is_empty(),
                "{ch:?} should not require shift"
            );
        }
    }

    #[test]
    fn test_unshifted_punctuation_is_direct() {
        let map = Layout::EnGb.char_map();
        for ch in "-=[];',./\\`".chars() {
            let sc = char_to_scancode(ch, &map);
            assert!(
                sc.modifiers().is_empty(),
                "{ch:?} should not require shift"
            );
        }
    }

    #[test]
    fn test_shifted_symbols_get_left_shift() {
        let map = Layout::EnGb.char_map();
        for (ch, code) in [('!', 0x1E), ('£', 0x20), ('@', 0x34), (':', 0x33)] {
            let sc = char_to_scancode(ch, &map);
            assert_eq!(sc.as_bytes()[0], Modifiers::LEFT_SHIFT, "{ch:?}");
            assert_eq!(sc.as_bytes()[2], code, "{ch:?}");
        }
    }

    #[test]
    fn test_layout_overrides_flow_through_translation() {
        let us = Layout::EnUs.char_map();
        assert_eq!(char_to_scancode('"', &us).as_bytes()[2], 0x34);
        assert_eq!(char_to_scancode('@', &us).as_bytes()[2], 0x1F);
        assert_eq!(char_to_scancode('#', &us).as_bytes()[2], 0x20);
    }

    #[test]
    fn test_unmappable_character_yields_no_key_report_not_error() {
        let us = Layout::EnUs.char_map();
        // £ was removed by the en_US override sentinel.
        let sc = char_to_scancode('£', &us);
        assert_eq!(sc.as_bytes(), &[0x00, 0x00, 0x00, 0, 0, 0, 0, 0]);

        let sc = char_to_scancode('é', &us);
        assert_eq!(sc.as_bytes()[2], 0x00);
    }

    #[test]
    fn test_string_to_scancodes_types_each_character_once_by_default() {
        let map = Layout::EnGb.char_map();
        let codes = string_to_scancodes("hi", &map, 1, 0).unwrap();
        assert_eq!(codes.len(), 2);
        assert_eq!(codes[0].as_bytes()[2], 0x0B); // h
        assert_eq!(codes[1].as_bytes()[2], 0x0C); // i
    }

    #[test]
    fn test_string_to_scancodes_repeats_and_interleaves_key_ups() {
        let map = Layout::EnGb.char_map();
        let codes = string_to_scancodes("ab", &map, 2, 1).unwrap();

        // Per character: two repeats then one release.
        assert_eq!(codes.len(), 6);
        assert_eq!(codes[0].as_bytes()[2], 0x04);
        assert_eq!(codes[1].as_bytes()[2], 0x04);
        assert!(codes[2].is_release());
        assert_eq!(codes[3].as_bytes()[2], 0x05);
        assert_eq!(codes[4].as_bytes()[2], 0x05);
        assert!(codes[5].is_release());
    }

    #[test]
    fn test_string_to_scancodes_rejects_zero_repeat() {
        let map = Layout::EnGb.char_map();
        assert_eq!(
            string_to_scancodes("a", &map, 0, 0),
            Err(TranslateError::InvalidKeyRepeat(0))
        );
    }

    #[test]
    fn test_scancode_to_key_name_plain_and_shifted() {
        let plain = Scancode::new(0x04, Modifiers::empty());
        assert_eq!(scancode_to_key_name(&plain), Some("a"));

        let shifted = Scancode::new(0x04, Modifiers(Modifiers::LEFT_SHIFT));
        assert_eq!(scancode_to_key_name(&shifted), Some("A"));

        let right_shifted = Scancode::new(0x1F, Modifiers(Modifiers::RIGHT_SHIFT));
        assert_eq!(scancode_to_key_name(&right_shifted), Some("\""));
    }

    #[test]
    fn test_scancode_to_key_name_skips_leading_zero_slots() {
        // Rollover buffer: first slot empty, second carries the key.
        let sc = Scancode::from_report([0, 0, 0, 0x05, 0, 0, 0, 0]);
        assert_eq!(scancode_to_key_name(&sc), Some("b"));
    }

    #[test]
    fn test_scancode_to_key_name_unknown_code_is_none() {
        let sc = Scancode::new(0xE9, Modifiers::empty());
        assert_eq!(scancode_to_key_name(&sc), None);
        assert_eq!(scancode_to_key_name(&Scancode::RELEASE), None);
    }

    #[test]
    fn test_scancode_to_key_name_named_keys() {
        for (code, name) in [(0x29, "ESC"), (0x4A, "Home"), (0x52, "↑")] {
            let sc = Scancode::new(code, Modifiers::empty());
            assert_eq!(scancode_to_key_name(&sc), Some(name));
            // Shift does not rename non-printing keys.
            let sc = Scancode::new(code, Modifiers(Modifiers::LEFT_SHIFT));
            assert_eq!(scancode_to_key_name(&sc), Some(name));
        }
    }
}
