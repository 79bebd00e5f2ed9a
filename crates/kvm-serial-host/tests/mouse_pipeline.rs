//! End-to-end checks of the mouse path: pointer operations in, CH9329
//! frames out, through the same shared transport the backends use.

use kvm_serial_host::capture::mouse::MouseOp;
use kvm_serial_host::transport::mock::{FailingSink, MemorySink};
use kvm_serial_host::transport::shared_framer;

use kvm_serial_core::MouseButton;

/// Splits the sink contents into frames using the length byte.
fn split_frames(bytes: &[u8]) -> Vec<Vec<u8>> {
    let mut frames = Vec::new();
    let mut rest = bytes;
    while !rest.is_empty() {
        assert!(rest.len() >= 6, "truncated frame: {rest:02X?}");
        assert_eq!(&rest[0..2], &[0x57, 0xAB], "bad frame head");
        let total = 5 + rest[4] as usize + 1;
        frames.push(rest[..total].to_vec());
        rest = &rest[total..];
    }
    frames
}

#[test]
fn test_move_click_scroll_sequence_produces_valid_frames() {
    // Arrange
    let sink = MemorySink::new();
    let op = MouseOp::new(sink.framer(), 1920, 1080);

    // Act: move to the centre, left-click, scroll down one tick.
    op.on_move(960, 540).unwrap();
    op.on_click(960, 540, MouseButton::Left, true).unwrap();
    op.on_click(960, 540, MouseButton::Left, false).unwrap();
    op.on_scroll(960, 540, 0, -1).unwrap();

    // Assert
    let frames = split_frames(&sink.snapshot());
    assert_eq!(frames.len(), 4);

    // Absolute move: command 0x04, centre of the 4096 range on both axes.
    let abs = &frames[0];
    assert_eq!(abs[3], 0x04);
    assert_eq!(abs[4], 7);
    assert_eq!(u16::from_le_bytes([abs[7], abs[8]]), 2048);
    assert_eq!(u16::from_le_bytes([abs[9], abs[10]]), 2048);

    // Click press then release: command 0x05.
    assert_eq!(frames[1][3], 0x05);
    assert_eq!(frames[1][6], 0x01);
    assert_eq!(frames[2][6], 0x00);

    // Scroll: signed big-endian y delta.
    assert_eq!(&frames[3][6..10], &[0x00, 0x00, 0xFF, 0xFF]);
}

#[test]
fn test_every_frame_carries_a_valid_checksum() {
    let sink = MemorySink::new();
    let op = MouseOp::new(sink.framer(), 2560, 1440);

    op.on_move(0, 0).unwrap();
    op.on_move(2559, 1439).unwrap();
    op.on_click(100, 100, MouseButton::Right, true).unwrap();
    op.on_scroll(100, 100, 2, 3).unwrap();

    for frame in split_frames(&sink.snapshot()) {
        let (body, checksum) = frame.split_at(frame.len() - 1);
        let sum = body.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
        assert_eq!(checksum[0], sum, "frame {frame:02X?}");
    }
}

#[test]
fn test_transport_failure_surfaces_as_error() {
    let op = MouseOp::new(shared_framer(Box::new(FailingSink)), 1920, 1080);

    let result = op.on_move(10, 10);

    assert!(result.is_err());
}
