//! Custom error types for the uvc-ptz crate.
//!
//! Provides structured errors instead of `Box<dyn Error>`, so callers can
//! distinguish a device that could not be opened from a transport failure,
//! and both of those from a short transfer, which only means the camera does
//! not implement the selector.

use thiserror::Error;

use crate::codec::ControlSelector;

/// Top-level error type for all PTZ operations.
#[derive(Debug, Error)]
pub enum PtzError {
    /// The caller-supplied device identity could not be parsed.
    #[error("Invalid device identity '{value}'.\n\
             Expected 0x<location><vid:04x><pid:04x> or <vid>:<pid> in hex")]
    InvalidIdentity { value: String },

    /// No device on the bus matches the identity.
    #[error("Camera {0} not found. Make sure it's connected.")]
    DeviceNotFound(String),

    /// The device was found but could not be opened.
    #[error("Failed to open camera: {0}")]
    OpenFailed(String),

    /// The transport reported an error for a control transfer.
    #[error("UVC transfer failed: {0}")]
    TransferFailed(String),

    /// The camera answered with a STALL handshake, which is how most UVC
    /// devices reject a control they don't implement.
    #[error("Camera stalled request 0x{request:02x} on wValue 0x{value:04x}")]
    Stalled { request: u8, value: u16 },

    /// The transfer completed with fewer bytes than wLength.
    #[error("{selector} transferred {got} of {expected} bytes")]
    ShortTransfer {
        selector: ControlSelector,
        expected: usize,
        got: usize,
    },

    /// No viable control path exists for the requested action.
    #[error("{0} is not supported by this camera")]
    Unsupported(&'static str),

    /// A control payload did not match its selector's fixed length.
    #[error("{selector} payload must be exactly {expected} bytes, got {got}")]
    PayloadLength {
        selector: ControlSelector,
        expected: usize,
        got: usize,
    },

    /// SET_CUR was requested on a control that is only ever queried.
    #[error("{0} is read-only")]
    ReadOnlySelector(ControlSelector),

    /// A USB/libusb error outside a control transfer (enumeration, descriptors).
    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),

    /// The PTZ worker thread could not be started.
    #[error("Failed to start PTZ worker: {0}")]
    WorkerSpawn(std::io::Error),

    /// The PTZ worker has shut down and no longer accepts jobs.
    #[error("PTZ worker is no longer running")]
    WorkerGone,
}

impl PtzError {
    /// True when the error means "the camera lacks this control" rather than
    /// "something went wrong talking to it".
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::ShortTransfer { .. } | Self::Stalled { .. } | Self::Unsupported(_))
    }
}

/// Crate-level Result alias using [`PtzError`].
pub type Result<T> = std::result::Result<T, PtzError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_transfer_counts_as_unsupported() {
        let e = PtzError::ShortTransfer {
            selector: ControlSelector::ZoomRelative,
            expected: 3,
            got: 0,
        };
        assert!(e.is_unsupported());
        assert_eq!(e.to_string(), "Zoom (relative) transferred 0 of 3 bytes");
    }

    #[test]
    fn stall_counts_as_unsupported() {
        let e = PtzError::Stalled { request: 0x87, value: 0x0d00 };
        assert!(e.is_unsupported());
        assert_eq!(e.to_string(), "Camera stalled request 0x87 on wValue 0x0d00");
    }

    #[test]
    fn transport_failures_are_not_unsupported() {
        assert!(!PtzError::TransferFailed("pipe".into()).is_unsupported());
        assert!(!PtzError::OpenFailed("access".into()).is_unsupported());
    }

    #[test]
    fn payload_length_display() {
        let e = PtzError::PayloadLength {
            selector: ControlSelector::PanTiltRelative,
            expected: 4,
            got: 2,
        };
        assert_eq!(e.to_string(), "Pan/tilt (relative) payload must be exactly 4 bytes, got 2");
    }

    #[test]
    fn usb_error_converts() {
        let e: PtzError = rusb::Error::Access.into();
        assert!(matches!(e, PtzError::Usb(rusb::Error::Access)));
    }
}
