//! USB HID passthrough backend.
//!
//! Reads boot-protocol reports directly from a second physical keyboard's
//! interrupt endpoint via `rusb` and forwards them to the CH9329
//! unchanged. Because the reports never pass through the OS keymap, this
//! backend is layout-agnostic and preserves n-key chords exactly as the
//! keyboard produced them (up to the 6-key boot-protocol limit).
//!
//! Requires permission to open the USB device; on Linux that usually
//! means a udev rule or running as root. The kernel driver is detached
//! from the interface while capture runs and re-attached afterwards, so
//! the keyboard stops typing into the host for the duration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rusb::{Device, DeviceHandle, Direction, GlobalContext, TransferType};
use thiserror::Error;
use tracing::{debug, info, warn};

use kvm_serial_core::{scancode_to_key_name, FrameError, Scancode, REPORT_LEN};

use crate::transport::SharedFramer;

use super::{CaptureBackend, CaptureError};

/// Interrupt read timeout. Keeps the loop responsive to the running flag
/// while idle.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Minimum time between forwarded reports. Bounds the frame rate on the
/// serial link when a keyboard floods identical reports.
const POLL_FLOOR: Duration = Duration::from_millis(50);

/// HID class/subclass/protocol triple identifying a boot keyboard.
const CLASS_HID: u8 = 0x03;
const SUBCLASS_BOOT: u8 = 0x01;
const PROTOCOL_KEYBOARD: u8 = 0x01;

#[derive(Debug, Error)]
pub enum UsbCaptureError {
    #[error("no usable USB backend: {0}")]
    NoBackend(#[source] rusb::Error),

    #[error("permission denied opening the keyboard; check udev rules or run as root")]
    PermissionDenied(#[source] rusb::Error),

    #[error("no boot-protocol USB keyboard found")]
    NoKeyboardFound,

    #[error(transparent)]
    Io(#[from] rusb::Error),

    #[error(transparent)]
    Transport(#[from] FrameError),
}

/// One interrupt-IN endpoint on a boot-protocol keyboard interface.
pub struct KeyboardEndpoint {
    device: Device<GlobalContext>,
    vendor_id: u16,
    product_id: u16,
    interface: u8,
    address: u8,
    max_packet_size: u16,
}

impl KeyboardEndpoint {
    pub fn vendor_id(&self) -> u16 {
        self.vendor_id
    }

    pub fn product_id(&self) -> u16 {
        self.product_id
    }
}

/// Scans the bus for boot-protocol keyboard endpoints.
///
/// Devices that cannot be inspected (already claimed, permission issues,
/// broken descriptors) are logged and skipped; an empty result is not an
/// error here so callers can distinguish "nothing attached" from "the
/// scan itself failed".
pub fn discover_keyboard_endpoints() -> Result<Vec<KeyboardEndpoint>, UsbCaptureError> {
    let devices = rusb::devices().map_err(UsbCaptureError::NoBackend)?;
    let mut found = Vec::new();
    for device in devices.iter() {
        match inspect_device(&device) {
            Ok(mut endpoints) => found.append(&mut endpoints),
            Err(e) => {
                debug!(
                    bus = device.bus_number(),
                    address = device.address(),
                    error = %e,
                    "skipping device"
                );
            }
        }
    }
    Ok(found)
}

fn inspect_device(device: &Device<GlobalContext>) -> Result<Vec<KeyboardEndpoint>, rusb::Error> {
    let descriptor = device.device_descriptor()?;
    let config = device.active_config_descriptor()?;
    let mut endpoints = Vec::new();
    for interface in config.interfaces() {
        for interface_descriptor in interface.descriptors() {
            if interface_descriptor.class_code() != CLASS_HID
                || interface_descriptor.sub_class_code() != SUBCLASS_BOOT
                || interface_descriptor.protocol_code() != PROTOCOL_KEYBOARD
            {
                continue;
            }
            for endpoint in interface_descriptor.endpoint_descriptors() {
                if endpoint.direction() == Direction::In
                    && endpoint.transfer_type() == TransferType::Interrupt
                {
                    endpoints.push(KeyboardEndpoint {
                        device: device.clone(),
                        vendor_id: descriptor.vendor_id(),
                        product_id: descriptor.product_id(),
                        interface: interface_descriptor.interface_number(),
                        address: endpoint.address(),
                        max_packet_size: endpoint.max_packet_size(),
                    });
                }
            }
        }
    }
    Ok(endpoints)
}

/// What to do with one report read from the keyboard.
#[derive(Debug, PartialEq, Eq)]
enum ReportAction {
    /// Ctrl+Esc: stop capturing without forwarding the report.
    Exit,
    /// Ctrl+C: forward, but remind the user how to exit.
    PassThroughWarning,
    Forward,
}

/// Classifies a raw report before it is forwarded. The escape sequence is
/// checked here, before the report reaches the wire, so Ctrl+Esc never
/// leaks to the remote target.
fn inspect_report(report: &[u8]) -> ReportAction {
    if report.len() < 3 || report[0] & 0x01 == 0 {
        return ReportAction::Forward;
    }
    match report[2] {
        0x29 => ReportAction::Exit,
        0x06 => ReportAction::PassThroughWarning,
        _ => ReportAction::Forward,
    }
}

/// The subset of USB device-handle operations the backend needs.
///
/// `DeviceHandle` has no test double, so the capture and cleanup logic
/// runs against this trait and tests substitute a scripted handle.
trait HidHandle {
    fn kernel_driver_active(&self, interface: u8) -> rusb::Result<bool>;
    fn detach_kernel_driver(&mut self, interface: u8) -> rusb::Result<()>;
    fn attach_kernel_driver(&mut self, interface: u8) -> rusb::Result<()>;
    fn claim_interface(&mut self, interface: u8) -> rusb::Result<()>;
    fn release_interface(&mut self, interface: u8) -> rusb::Result<()>;
    fn read_interrupt(
        &self,
        endpoint: u8,
        buf: &mut [u8],
        timeout: Duration,
    ) -> rusb::Result<usize>;
}

impl HidHandle for DeviceHandle<GlobalContext> {
    fn kernel_driver_active(&self, interface: u8) -> rusb::Result<bool> {
        DeviceHandle::kernel_driver_active(self, interface)
    }

    fn detach_kernel_driver(&mut self, interface: u8) -> rusb::Result<()> {
        DeviceHandle::detach_kernel_driver(self, interface)
    }

    fn attach_kernel_driver(&mut self, interface: u8) -> rusb::Result<()> {
        DeviceHandle::attach_kernel_driver(self, interface)
    }

    fn claim_interface(&mut self, interface: u8) -> rusb::Result<()> {
        DeviceHandle::claim_interface(self, interface)
    }

    fn release_interface(&mut self, interface: u8) -> rusb::Result<()> {
        DeviceHandle::release_interface(self, interface)
    }

    fn read_interrupt(
        &self,
        endpoint: u8,
        buf: &mut [u8],
        timeout: Duration,
    ) -> rusb::Result<usize> {
        DeviceHandle::read_interrupt(self, endpoint, buf, timeout)
    }
}

pub struct UsbBackend {
    framer: SharedFramer,
    running: Arc<AtomicBool>,
}

impl UsbBackend {
    pub fn new(framer: SharedFramer, running: Arc<AtomicBool>) -> Self {
        Self { framer, running }
    }

    /// Detaches the kernel driver, claims the interface, and runs the
    /// poll loop. The driver is re-attached no matter how the claim or
    /// the loop ends, so the local keyboard never stays dead after a
    /// failure.
    fn capture_from<H: HidHandle>(
        &self,
        handle: &mut H,
        interface: u8,
        address: u8,
        max_packet_size: u16,
    ) -> Result<(), UsbCaptureError> {
        // NotSupported means the platform has no kernel driver concept.
        let detached = match handle.kernel_driver_active(interface) {
            Ok(true) => {
                handle
                    .detach_kernel_driver(interface)
                    .map_err(UsbCaptureError::Io)?;
                true
            }
            Ok(false) => false,
            Err(rusb::Error::NotSupported) => false,
            Err(e) => return Err(UsbCaptureError::Io(e)),
        };

        let result = self.claim_and_poll(handle, interface, address, max_packet_size);

        if detached {
            if let Err(e) = handle.attach_kernel_driver(interface) {
                warn!(error = %e, "failed to re-attach kernel driver");
            }
        }
        result
    }

    fn claim_and_poll<H: HidHandle>(
        &self,
        handle: &mut H,
        interface: u8,
        address: u8,
        max_packet_size: u16,
    ) -> Result<(), UsbCaptureError> {
        handle
            .claim_interface(interface)
            .map_err(UsbCaptureError::Io)?;
        warn!("USB capture active; press Ctrl+Esc to exit");

        let result = self.poll_loop(handle, address, max_packet_size);

        if let Err(e) = handle.release_interface(interface) {
            warn!(error = %e, "failed to release interface");
        }
        result
    }

    fn poll_loop<H: HidHandle>(
        &self,
        handle: &H,
        address: u8,
        max_packet_size: u16,
    ) -> Result<(), UsbCaptureError> {
        let mut buf = vec![0u8; max_packet_size as usize];
        // Debounces the Ctrl+C warning across key-repeat reports.
        let mut last_key: Option<&'static str> = None;
        let mut last_sent = Instant::now() - POLL_FLOOR;

        while self.running.load(Ordering::SeqCst) {
            let len = match handle.read_interrupt(address, &mut buf, READ_TIMEOUT) {
                Ok(len) => len,
                Err(rusb::Error::Timeout) => continue,
                Err(e) => return Err(e.into()),
            };
            let report = &buf[..len];

            match inspect_report(report) {
                ReportAction::Exit => {
                    warn!("Ctrl+Esc detected, stopping capture");
                    return Ok(());
                }
                ReportAction::PassThroughWarning => {
                    if last_key != Some("c") {
                        warn!(
                            "Ctrl+C is passed through to the remote target; press Ctrl+Esc to exit"
                        );
                    }
                }
                ReportAction::Forward => {}
            }

            if len >= REPORT_LEN {
                let mut bytes = [0u8; REPORT_LEN];
                bytes.copy_from_slice(&report[..REPORT_LEN]);
                let scancode = Scancode::from_report(bytes);
                last_key = scancode_to_key_name(&scancode);
                if let Some(name) = last_key {
                    debug!(key = name, "forwarding report");
                }
            } else {
                last_key = None;
            }

            // Rate-limit writes so key repeat cannot flood the serial link.
            let elapsed = last_sent.elapsed();
            if elapsed < POLL_FLOOR {
                std::thread::sleep(POLL_FLOOR - elapsed);
            }
            let forwarded = self
                .framer
                .lock()
                .expect("transport lock poisoned")
                .send_scancode(report)
                .map_err(UsbCaptureError::Transport)?;
            if !forwarded {
                debug!(len, "short report dropped");
            }
            last_sent = Instant::now();
        }
        Ok(())
    }
}

impl CaptureBackend for UsbBackend {
    fn name(&self) -> &'static str {
        "usb"
    }

    fn run(&mut self) -> Result<(), CaptureError> {
        let endpoints = discover_keyboard_endpoints()?;
        let endpoint = endpoints.first().ok_or(UsbCaptureError::NoKeyboardFound)?;
        info!(
            vendor = format_args!("{:04x}", endpoint.vendor_id),
            product = format_args!("{:04x}", endpoint.product_id),
            interface = endpoint.interface,
            endpoint = endpoint.address,
            "using keyboard"
        );

        let mut handle = endpoint.device.open().map_err(|e| match e {
            rusb::Error::Access => UsbCaptureError::PermissionDenied(e),
            other => UsbCaptureError::Io(other),
        })?;

        self.capture_from(
            &mut handle,
            endpoint.interface,
            endpoint.address,
            endpoint.max_packet_size,
        )
        .map_err(CaptureError::Usb)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
