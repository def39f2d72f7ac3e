//! Encode/decode of Camera Terminal PTZ control transfers.
//!
//! Every selector has a fixed payload geometry:
//!
//! | Selector          | Len | Bytes                                             |
//! |-------------------|-----|---------------------------------------------------|
//! | Zoom absolute     | 2   | focal length lo, hi                               |
//! | Zoom relative     | 3   | direction (i8), digital zoom (0), speed           |
//! | Pan/tilt absolute | 4   | pan lo, hi, tilt lo, hi (query only)              |
//! | Pan/tilt relative | 4   | pan dir (i8), pan speed, tilt dir (i8), tilt speed |
//!
//! Nothing here touches a device; see [`crate::session`] for the transport.

use std::fmt;

use crate::error::{PtzError, Result};
use crate::protocol::*;

/// Camera Terminal control addressed by a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlSelector {
    ZoomAbsolute,
    ZoomRelative,
    PanTiltAbsolute,
    PanTiltRelative,
}

impl ControlSelector {
    /// The UVC selector code (CT_*_CONTROL).
    pub fn code(self) -> u8 {
        match self {
            Self::ZoomAbsolute => CT_ZOOM_ABSOLUTE_CONTROL,
            Self::ZoomRelative => CT_ZOOM_RELATIVE_CONTROL,
            Self::PanTiltAbsolute => CT_PANTILT_ABSOLUTE_CONTROL,
            Self::PanTiltRelative => CT_PANTILT_RELATIVE_CONTROL,
        }
    }

    /// Fixed payload length (wLength).
    pub fn length(self) -> usize {
        match self {
            Self::ZoomAbsolute => ZOOM_ABSOLUTE_LEN,
            Self::ZoomRelative => ZOOM_RELATIVE_LEN,
            Self::PanTiltAbsolute => PANTILT_ABSOLUTE_LEN,
            Self::PanTiltRelative => PANTILT_RELATIVE_LEN,
        }
    }

    /// wValue: selector in the high byte, zero in the low byte.
    pub fn w_value(self) -> u16 {
        (self.code() as u16) << 8
    }

    /// Pan/tilt absolute is only ever queried.
    pub fn is_settable(self) -> bool {
        self != Self::PanTiltAbsolute
    }
}

impl fmt::Display for ControlSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZoomAbsolute => write!(f, "Zoom (absolute)"),
            Self::ZoomRelative => write!(f, "Zoom (relative)"),
            Self::PanTiltAbsolute => write!(f, "Pan/tilt (absolute)"),
            Self::PanTiltRelative => write!(f, "Pan/tilt (relative)"),
        }
    }
}

/// Sub-request of a class control transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Set,
    GetCur,
    GetMin,
    GetMax,
    GetRes,
    GetLen,
    GetInfo,
    GetDef,
}

impl RequestKind {
    /// bRequest code.
    pub fn code(self) -> u8 {
        match self {
            Self::Set => UVC_SET_CUR,
            Self::GetCur => UVC_GET_CUR,
            Self::GetMin => UVC_GET_MIN,
            Self::GetMax => UVC_GET_MAX,
            Self::GetRes => UVC_GET_RES,
            Self::GetLen => UVC_GET_LEN,
            Self::GetInfo => UVC_GET_INFO,
            Self::GetDef => UVC_GET_DEF,
        }
    }

    /// bmRequestType: host-to-device for SET_CUR, device-to-host otherwise.
    pub fn request_type(self) -> u8 {
        if self.is_set() {
            UVC_REQUEST_TYPE_OUT
        } else {
            UVC_REQUEST_TYPE_IN
        }
    }

    pub fn is_set(self) -> bool {
        self == Self::Set
    }
}

/// A fully formed control transfer.
///
/// The payload length always equals `selector.length()`; construction fails
/// otherwise.  For GET requests the payload is a zeroed receive buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlRequest {
    selector: ControlSelector,
    kind: RequestKind,
    payload: Vec<u8>,
}

impl ControlRequest {
    pub fn new(selector: ControlSelector, kind: RequestKind, payload: Vec<u8>) -> Result<Self> {
        if payload.len() != selector.length() {
            return Err(PtzError::PayloadLength {
                selector,
                expected: selector.length(),
                got: payload.len(),
            });
        }
        if kind.is_set() && !selector.is_settable() {
            return Err(PtzError::ReadOnlySelector(selector));
        }
        Ok(Self { selector, kind, payload })
    }

    /// A GET request with a zeroed buffer of the selector's length.
    pub fn query(selector: ControlSelector, kind: RequestKind) -> Result<Self> {
        Self::new(selector, kind, vec![0u8; selector.length()])
    }

    pub fn selector(&self) -> ControlSelector {
        self.selector
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn request_type(&self) -> u8 {
        self.kind.request_type()
    }

    pub fn request(&self) -> u8 {
        self.kind.code()
    }

    pub fn value(&self) -> u16 {
        self.selector.w_value()
    }

    pub fn index(&self) -> u16 {
        UVC_CAMERA_TERMINAL_INDEX
    }

    pub fn length(&self) -> u16 {
        self.payload.len() as u16
    }
}

/// Decoded payload of one selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlValue {
    ZoomAbsolute {
        focal_length: u16,
    },
    ZoomRelative {
        zoom: i8,
        digital_zoom: u8,
        speed: u8,
    },
    PanTiltAbsolute {
        pan: u16,
        tilt: u16,
    },
    PanTiltRelative {
        pan: i8,
        pan_speed: u8,
        tilt: i8,
        tilt_speed: u8,
    },
}

impl ControlValue {
    pub fn selector(&self) -> ControlSelector {
        match self {
            Self::ZoomAbsolute { .. } => ControlSelector::ZoomAbsolute,
            Self::ZoomRelative { .. } => ControlSelector::ZoomRelative,
            Self::PanTiltAbsolute { .. } => ControlSelector::PanTiltAbsolute,
            Self::PanTiltRelative { .. } => ControlSelector::PanTiltRelative,
        }
    }

    /// Raw little-endian payload bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        match *self {
            Self::ZoomAbsolute { focal_length } => pack16(focal_length).to_vec(),
            // The digital zoom byte is always sent as zero.
            Self::ZoomRelative { zoom, speed, .. } => vec![zoom as u8, 0, speed],
            Self::PanTiltAbsolute { pan, tilt } => {
                let [pan_lo, pan_hi] = pack16(pan);
                let [tilt_lo, tilt_hi] = pack16(tilt);
                vec![pan_lo, pan_hi, tilt_lo, tilt_hi]
            }
            Self::PanTiltRelative { pan, pan_speed, tilt, tilt_speed } => {
                vec![pan as u8, pan_speed, tilt as u8, tilt_speed]
            }
        }
    }
}

/// Split a 16-bit value into `[low, high]`.
pub fn pack16(value: u16) -> [u8; 2] {
    [(value & 0xFF) as u8, ((value >> 8) & 0xFF) as u8]
}

/// Join `low | high << 8`.
pub fn unpack16(low: u8, high: u8) -> u16 {
    (low as u16) | ((high as u16) << 8)
}

/// Build a request carrying `value`.
///
/// For GET kinds the value is ignored and a zeroed receive buffer is built,
/// so callers can use [`ControlRequest::query`] directly instead.
pub fn encode(kind: RequestKind, value: &ControlValue) -> Result<ControlRequest> {
    let selector = value.selector();
    if kind.is_set() {
        ControlRequest::new(selector, kind, value.to_bytes())
    } else {
        ControlRequest::query(selector, kind)
    }
}

/// Decode the bytes actually transferred for `selector`.
///
/// Fewer bytes than the selector's length is a [`PtzError::ShortTransfer`];
/// any excess is ignored.
pub fn decode(selector: ControlSelector, raw: &[u8]) -> Result<ControlValue> {
    let expected = selector.length();
    if raw.len() < expected {
        return Err(PtzError::ShortTransfer { selector, expected, got: raw.len() });
    }

    let value = match selector {
        ControlSelector::ZoomAbsolute => ControlValue::ZoomAbsolute {
            focal_length: unpack16(raw[0], raw[1]),
        },
        ControlSelector::ZoomRelative => ControlValue::ZoomRelative {
            zoom: raw[0] as i8,
            digital_zoom: raw[1],
            speed: raw[2],
        },
        ControlSelector::PanTiltAbsolute => ControlValue::PanTiltAbsolute {
            pan: unpack16(raw[0], raw[1]),
            tilt: unpack16(raw[2], raw[3]),
        },
        ControlSelector::PanTiltRelative => ControlValue::PanTiltRelative {
            pan: raw[0] as i8,
            pan_speed: raw[1],
            tilt: raw[2] as i8,
            tilt_speed: raw[3],
        },
    };
    Ok(value)
}
