//! Device identity resolution and the libusb-backed handle.
//!
//! [`UsbOpener::open`] scans the USB bus for the camera matching a
//! [`DeviceIdentity`], opens it, and (optionally) claims the VideoControl
//! interface.  The returned [`UsbHandle`] releases the interface and
//! reattaches the kernel driver when dropped, so a handle never outlives the
//! operation that opened it.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use rusb::{Context, Device, DeviceHandle, UsbContext};
use serde::Serialize;

use crate::config::PtzConfig;
use crate::error::{PtzError, Result};
use crate::protocol::*;
use crate::session::{ControlHandle, DeviceOpener};

/// Stable identity of one physical camera.
///
/// Textual forms:
/// - `0x{location:x}{vid:04x}{pid:04x}`: location ID as reported by the
///   capture stack, followed by vendor and product IDs.
/// - `{vid:04x}:{pid:04x}`: first camera with those IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DeviceIdentity {
    pub vendor_id: u16,
    pub product_id: u16,
    pub location_id: Option<u32>,
}

impl DeviceIdentity {
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self { vendor_id, product_id, location_id: None }
    }

    pub fn with_location(mut self, location_id: u32) -> Self {
        self.location_id = Some(location_id);
        self
    }

    /// Whether a device with these properties is the one named.
    pub fn matches(&self, vendor_id: u16, product_id: u16, location_id: u32) -> bool {
        self.vendor_id == vendor_id
            && self.product_id == product_id
            && self.location_id.is_none_or(|loc| loc == location_id)
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location_id {
            Some(loc) => write!(f, "0x{:x}{:04x}{:04x}", loc, self.vendor_id, self.product_id),
            None => write!(f, "{:04x}:{:04x}", self.vendor_id, self.product_id),
        }
    }
}

impl FromStr for DeviceIdentity {
    type Err = PtzError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || PtzError::InvalidIdentity { value: s.to_string() };
        let s = s.trim();

        if let Some((vid, pid)) = s.split_once(':') {
            let vendor_id = u16::from_str_radix(vid, 16).map_err(|_| invalid())?;
            let product_id = u16::from_str_radix(pid, 16).map_err(|_| invalid())?;
            return Ok(Self::new(vendor_id, product_id));
        }

        let hex = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(invalid)?;
        // Location is variable width; vid and pid are always 4 digits each.
        if hex.len() <= 8 || hex.len() > 16 || !hex.is_ascii() {
            return Err(invalid());
        }
        let (loc, ids) = hex.split_at(hex.len() - 8);
        let location_id = u32::from_str_radix(loc, 16).map_err(|_| invalid())?;
        let vendor_id = u16::from_str_radix(&ids[..4], 16).map_err(|_| invalid())?;
        let product_id = u16::from_str_radix(&ids[4..], 16).map_err(|_| invalid())?;
        Ok(Self::new(vendor_id, product_id).with_location(location_id))
    }
}

/// Location ID in the capture-stack layout: bus number in the top byte,
/// then one nibble per hub port starting at bit 20.
pub fn location_id(bus: u8, ports: &[u8]) -> u32 {
    let mut id = (bus as u32) << 24;
    for (depth, &port) in ports.iter().take(6).enumerate() {
        id |= ((port as u32) & 0xF) << (20 - 4 * depth);
    }
    id
}

/// Opens cameras through libusb.
pub struct UsbOpener {
    context: Context,
    timeout: Duration,
    detach_kernel_driver: bool,
}

impl UsbOpener {
    pub fn new(config: &PtzConfig) -> Result<Self> {
        Ok(Self {
            context: Context::new()?,
            timeout: config.usb_timeout,
            detach_kernel_driver: config.detach_kernel_driver,
        })
    }

    /// First device on the bus matching `identity`.
    pub fn find_device(&self, identity: &DeviceIdentity) -> Result<Device<Context>> {
        for device in self.context.devices()?.iter() {
            let desc = match device.device_descriptor() {
                Ok(d) => d,
                Err(_) => continue,
            };
            let ports = device.port_numbers().unwrap_or_default();
            let location = location_id(device.bus_number(), &ports);
            if identity.matches(desc.vendor_id(), desc.product_id(), location) {
                return Ok(device);
            }
        }

        Err(PtzError::DeviceNotFound(identity.to_string()))
    }
}

impl DeviceOpener for UsbOpener {
    fn open(&self, identity: &DeviceIdentity) -> Result<Box<dyn ControlHandle>> {
        let device = self.find_device(identity)?;
        let handle = device
            .open()
            .map_err(|e| PtzError::OpenFailed(format!("{}: {}", identity, e)))?;

        let mut detached = false;
        if self.detach_kernel_driver {
            if handle.kernel_driver_active(UVC_CONTROL_INTERFACE).unwrap_or(false) {
                handle
                    .detach_kernel_driver(UVC_CONTROL_INTERFACE)
                    .map_err(|e| PtzError::OpenFailed(format!("detach kernel driver: {}", e)))?;
                detached = true;
                log::debug!("Temporarily detached kernel driver from interface {}", UVC_CONTROL_INTERFACE);
            }
            if let Err(e) = handle.claim_interface(UVC_CONTROL_INTERFACE) {
                if detached {
                    let _ = handle.attach_kernel_driver(UVC_CONTROL_INTERFACE);
                }
                return Err(PtzError::OpenFailed(format!("claim interface: {}", e)));
            }
        }

        Ok(Box::new(UsbHandle {
            handle,
            timeout: self.timeout,
            claimed: self.detach_kernel_driver,
            detached,
        }))
    }
}

/// An open libusb handle.  Closed on drop.
pub struct UsbHandle {
    handle: DeviceHandle<Context>,
    timeout: Duration,
    claimed: bool,
    detached: bool,
}

impl ControlHandle for UsbHandle {
    fn read_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
    ) -> Result<usize> {
        self.handle
            .read_control(request_type, request, value, index, buf, self.timeout)
            .map_err(|e| transfer_error(request, value, e))
    }

    fn write_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
    ) -> Result<usize> {
        self.handle
            .write_control(request_type, request, value, index, data, self.timeout)
            .map_err(|e| transfer_error(request, value, e))
    }
}

/// A STALL on endpoint 0 is the camera refusing the control; anything else
/// is a transport problem.
fn transfer_error(request: u8, value: u16, e: rusb::Error) -> PtzError {
    match e {
        rusb::Error::Pipe => PtzError::Stalled { request, value },
        e => PtzError::TransferFailed(format!("request 0x{:02x} wValue 0x{:04x}: {}", request, value, e)),
    }
}

impl Drop for UsbHandle {
    fn drop(&mut self) {
        if self.claimed {
            if let Err(e) = self.handle.release_interface(UVC_CONTROL_INTERFACE) {
                log::warn!("Failed to release interface: {}", e);
            }
        }

        // Best-effort reattach
        if self.detached {
            let _ = self.handle.attach_kernel_driver(UVC_CONTROL_INTERFACE);
        }
    }
}
