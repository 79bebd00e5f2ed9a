//! Host side of the KVM-Serial bridge.
//!
//! This crate turns local input into CH9329 serial frames. It provides:
//!
//! - [`transport`]: opening the serial port and sharing a frame encoder
//!   between capture threads.
//! - [`capture`]: the capture backends. Each backend watches one source of
//!   input (a global OS hook, the controlling terminal, or a raw USB
//!   keyboard) and forwards HID reports over the shared transport.
//! - [`config`]: the TOML configuration file that selects the serial port,
//!   keyboard backend, layout, and mouse options.
//!
//! The protocol and layout logic live in `kvm-serial-core`; this crate only
//! deals with the messy parts that touch the operating system.

pub mod capture;
pub mod config;
pub mod transport;
