//! Protocol constants for UVC Camera Terminal PTZ controls.
//!
//! All magic numbers, request codes, and selector codes are defined here so
//! the rest of the codebase references named constants instead of raw hex.

use std::time::Duration;

// ---------------------------------------------------------------------------
// bmRequestType
// ---------------------------------------------------------------------------

/// bmRequestType for UVC class request (host-to-device, interface recipient).
pub const UVC_REQUEST_TYPE_OUT: u8 = 0x21;
/// bmRequestType for UVC class request (device-to-host, interface recipient).
pub const UVC_REQUEST_TYPE_IN: u8 = 0xA1;

// ---------------------------------------------------------------------------
// bRequest codes (UVC 1.1 §A.8)
// ---------------------------------------------------------------------------

/// SET_CUR bRequest.
pub const UVC_SET_CUR: u8 = 0x01;
/// GET_CUR bRequest.
pub const UVC_GET_CUR: u8 = 0x81;
/// GET_MIN bRequest.
pub const UVC_GET_MIN: u8 = 0x82;
/// GET_MAX bRequest.
pub const UVC_GET_MAX: u8 = 0x83;
/// GET_RES bRequest.
pub const UVC_GET_RES: u8 = 0x84;
/// GET_LEN bRequest.
pub const UVC_GET_LEN: u8 = 0x85;
/// GET_INFO bRequest.
pub const UVC_GET_INFO: u8 = 0x86;
/// GET_DEF bRequest.
pub const UVC_GET_DEF: u8 = 0x87;

// ---------------------------------------------------------------------------
// Camera Terminal control selectors (UVC 1.1 §A.9.4)
// ---------------------------------------------------------------------------

/// CT_ZOOM_ABSOLUTE_CONTROL: wFocalLength (u16).
pub const CT_ZOOM_ABSOLUTE_CONTROL: u8 = 0x0B;
/// CT_ZOOM_RELATIVE_CONTROL: bZoom, bDigitalZoom, bSpeed.
pub const CT_ZOOM_RELATIVE_CONTROL: u8 = 0x0C;
/// CT_PANTILT_ABSOLUTE_CONTROL: pan and tilt positions.
pub const CT_PANTILT_ABSOLUTE_CONTROL: u8 = 0x0D;
/// CT_PANTILT_RELATIVE_CONTROL: bPanRelative, bPanSpeed, bTiltRelative, bTiltSpeed.
pub const CT_PANTILT_RELATIVE_CONTROL: u8 = 0x0E;

/// Payload length of the zoom absolute control.
pub const ZOOM_ABSOLUTE_LEN: usize = 2;
/// Payload length of the zoom relative control.
pub const ZOOM_RELATIVE_LEN: usize = 3;
/// Payload length of the pan/tilt absolute control (pan u16 + tilt u16).
pub const PANTILT_ABSOLUTE_LEN: usize = 4;
/// Payload length of the pan/tilt relative control.
pub const PANTILT_RELATIVE_LEN: usize = 4;

/// wIndex for every request: Camera Terminal entity 1 (high byte) on
/// VideoControl interface 0 (low byte).  Fixed for the supported cameras.
pub const UVC_CAMERA_TERMINAL_INDEX: u16 = 0x0100;
/// VideoControl interface number, the low byte of [`UVC_CAMERA_TERMINAL_INDEX`].
pub const UVC_CONTROL_INTERFACE: u8 = (UVC_CAMERA_TERMINAL_INDEX & 0xFF) as u8;

// ---------------------------------------------------------------------------
// Direction bytes
// ---------------------------------------------------------------------------

/// bPanRelative value for moving left.
pub const PAN_LEFT: i8 = 1;
/// bPanRelative value for moving right.
pub const PAN_RIGHT: i8 = -1;
/// bTiltRelative value for moving up.
pub const TILT_UP: i8 = 1;
/// bTiltRelative value for moving down.
pub const TILT_DOWN: i8 = -1;
/// bZoom value for zooming in (telephoto).
pub const ZOOM_IN: i8 = 1;
/// bZoom value for zooming out (wide).
pub const ZOOM_OUT: i8 = -1;
/// Direction byte meaning "stop".
pub const DIRECTION_STOP: i8 = 0;

// ---------------------------------------------------------------------------
// Timing and stepping defaults
// ---------------------------------------------------------------------------

/// Default USB control transfer timeout.
pub const USB_TIMEOUT: Duration = Duration::from_secs(1);
/// How long a discrete move runs before the stop command.
pub const DISCRETE_SETTLE: Duration = Duration::from_millis(200);
/// Period between absolute zoom emulation ticks.
pub const ZOOM_TICK_INTERVAL: Duration = Duration::from_millis(100);
/// The absolute zoom range is traversed in this many steps.
pub const ZOOM_ABSOLUTE_STEPS: i32 = 50;
