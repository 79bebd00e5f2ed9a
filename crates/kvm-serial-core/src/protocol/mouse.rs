//! Mouse payload encoding for the CH9329's absolute and relative
//! commands.
//!
//! Absolute moves scale screen pixels to the chip's 0–4096 coordinate
//! space; clicks and scrolls use the relative command with no
//! displacement.

/// Upper bound of the chip's absolute coordinate space per axis.
pub const ABS_RANGE: i64 = 4096;

/// Payload mode bytes.
const MODE_ABSOLUTE: u8 = 0x02;
const MODE_RELATIVE: u8 = 0x01;

/// Mouse button codes as the chip expects them in the relative payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MouseButton {
    Release = 0x00,
    Left = 0x01,
    Right = 0x02,
    Middle = 0x04,
}

/// Scales one pixel coordinate into the 0–4096 device range.
///
/// Floor division matches the original scaling behaviour for negative
/// coordinates.  A negative scaled value (the cursor is on a monitor
/// extending left of or above the primary display) is folded back into
/// range with `abs(4096 + scaled)`.  The fold is lossy and ambiguous for
/// large negative offsets; it is kept for chip-protocol compatibility
/// and deliberately not used anywhere else.
fn scale_axis(coord: i32, dimension: u32) -> u16 {
    debug_assert!(dimension > 0, "screen dimension must be non-zero");
    let scaled = (ABS_RANGE * i64::from(coord)).div_euclid(i64::from(dimension));
    let folded = if scaled < 0 {
        (ABS_RANGE + scaled).abs()
    } else {
        scaled
    };
    folded as u16
}

/// Builds the 7-byte absolute-move payload for a cursor at `(x, y)` on a
/// `width`×`height` screen.
///
/// Layout: mode `0x02`, button `0x00`, X and Y as little-endian u16 in
/// device coordinates, one pad byte.  Sent with command `0x04`.
pub fn absolute_payload(x: i32, y: i32, width: u32, height: u32) -> [u8; 7] {
    let dx = scale_axis(x, width).to_le_bytes();
    let dy = scale_axis(y, height).to_le_bytes();
    [MODE_ABSOLUTE, 0x00, dx[0], dx[1], dy[0], dy[1], 0x00]
}

/// Builds the 5-byte relative payload for a button press or release.
///
/// Layout: mode `0x01`, button code (or `0x00` on release), two zero
/// displacement bytes, one pad byte.  Sent with command `0x05`.
pub fn click_payload(button: MouseButton, down: bool) -> [u8; 5] {
    let code = if down {
        button as u8
    } else {
        MouseButton::Release as u8
    };
    [MODE_RELATIVE, code, 0x00, 0x00, 0x00]
}

/// Builds the 5-byte relative payload for a scroll of `(dx, dy)` wheel
/// ticks, big-endian signed.  Sent with command `0x05`.
pub fn scroll_payload(dx: i16, dy: i16) -> [u8; 5] {
    let dxb = dx.to_be_bytes();
    let dyb = dy.to_be_bytes();
    [MODE_RELATIVE, dxb[0], dxb[1], dyb[0], dyb[1]]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_payload_scales_exact_halves() {
        // 960/1920 and 540/1080 are exactly half of the 0-4096 range.
        let payload = absolute_payload(960, 540, 1920, 1080);

        assert_eq!(payload[0], 0x02);
        assert_eq!(payload[1], 0x00);
        assert_eq!(u16::from_le_bytes([payload[2], payload[3]]), 2048);
        assert_eq!(u16::from_le_bytes([payload[4], payload[5]]), 2048);
        assert_eq!(payload[6], 0x00);
    }

    #[test]
    fn test_absolute_payload_corners() {
        let origin = absolute_payload(0, 0, 1920, 1080);
        assert_eq!(u16::from_le_bytes([origin[2], origin[3]]), 0);
        assert_eq!(u16::from_le_bytes([origin[4], origin[5]]), 0);

        let far = absolute_payload(1919, 1079, 1920, 1080);
        assert_eq!(u16::from_le_bytes([far[2], far[3]]), 4093);
        assert_eq!(u16::from_le_bytes([far[4], far[5]]), 4092);
    }

    #[test]
    fn test_negative_coordinate_is_folded_into_range() {
        // scaled = (4096 * -100) // 1920 = -214 (floor division),
        // folded = abs(4096 - 214) = 3882.
        let payload = absolute_payload(-100, 540, 1920, 1080);

        let x = u16::from_le_bytes([payload[2], payload[3]]);
        assert_eq!(x, 3882);
        assert!(i64::from(x) <= ABS_RANGE);
    }

    #[test]
    fn test_negative_scaling_uses_floor_division() {
        // Truncating division would give -213 and a fold of 3883.
        let payload = absolute_payload(540, -100, 1080, 1920);
        let y = u16::from_le_bytes([payload[4], payload[5]]);
        assert_eq!(y, 3882);
    }

    #[test]
    fn test_click_payload_down_and_up() {
        assert_eq!(
            click_payload(MouseButton::Left, true),
            [0x01, 0x01, 0x00, 0x00, 0x00]
        );
        assert_eq!(
            click_payload(MouseButton::Right, true),
            [0x01, 0x02, 0x00, 0x00, 0x00]
        );
        assert_eq!(
            click_payload(MouseButton::Middle, true),
            [0x01, 0x04, 0x00, 0x00, 0x00]
        );
        // Button-up always sends the release code regardless of button.
        assert_eq!(
            click_payload(MouseButton::Left, false),
            [0x01, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_scroll_payload_is_signed_big_endian() {
        assert_eq!(scroll_payload(0, 1), [0x01, 0x00, 0x00, 0x00, 0x01]);
        assert_eq!(scroll_payload(0, -1), [0x01, 0x00, 0x00, 0xFF, 0xFF]);
        assert_eq!(scroll_payload(-2, 3), [0x01, 0xFF, 0xFE, 0x00, 0x03]);
    }

    #[test]
    fn test_button_codes_match_chip_protocol() {
        assert_eq!(MouseButton::Release as u8, 0x00);
        assert_eq!(MouseButton::Left as u8, 0x01);
        assert_eq!(MouseButton::Right as u8, 0x02);
        assert_eq!(MouseButton::Middle as u8, 0x04);
    }
}
