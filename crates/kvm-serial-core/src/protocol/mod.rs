//! CH9329 wire protocol: command framing and mouse payload encoding.

pub mod frame;
pub mod mouse;

pub use frame::{encode_frame, Command, FrameError, Framer};
pub use mouse::MouseButton;
