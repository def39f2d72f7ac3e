//! What a selected camera can do, and the absolute zoom position we track.

use std::fmt;

use serde::Serialize;

/// Pan/tilt absolute limits (GET_MIN / GET_MAX), zero when not queried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PanTiltRange {
    pub pan_min: i16,
    pub pan_max: i16,
    pub tilt_min: i16,
    pub tilt_max: i16,
}

/// Probed control support for one camera.
///
/// Created empty when a device is selected, filled once by the prober and
/// read-only afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capability {
    pub supports_zoom_absolute: bool,
    pub supports_zoom_relative: bool,
    pub supports_pantilt_absolute: bool,
    pub supports_pantilt_relative: bool,
    /// Speed sent with every relative pan command (GET_DEF bPanSpeed).
    pub pan_speed: u8,
    /// Speed sent with every relative tilt command (GET_DEF bTiltSpeed).
    pub tilt_speed: u8,
    /// Speed sent with every relative zoom command (GET_DEF bSpeed).
    pub zoom_speed: u8,
    pub pantilt_range: PanTiltRange,
}

impl Capability {
    pub fn supports_pan(&self) -> bool {
        if self.supports_pantilt_relative {
            return self.pan_speed > 0;
        }
        if self.supports_pantilt_absolute {
            return self.pantilt_range.pan_max != self.pantilt_range.pan_min;
        }
        false
    }

    pub fn supports_tilt(&self) -> bool {
        if self.supports_pantilt_relative {
            return self.tilt_speed > 0;
        }
        if self.supports_pantilt_absolute {
            return self.pantilt_range.tilt_max != self.pantilt_range.tilt_min;
        }
        false
    }

    pub fn supports_zoom(&self) -> bool {
        self.supports_zoom_absolute || self.supports_zoom_relative
    }

    pub fn supports_preset(&self) -> bool {
        self.supports_pantilt_absolute && self.supports_zoom_absolute
    }

    /// Continuous zoom has to be stepped through the absolute control.
    pub fn needs_zoom_emulation(&self) -> bool {
        !self.supports_zoom_relative && self.supports_zoom_absolute
    }

    pub fn summary(&self) -> CapabilitySummary {
        CapabilitySummary {
            zoom: self.supports_zoom(),
            pan: self.supports_pan(),
            tilt: self.supports_tilt(),
            preset: self.supports_preset(),
        }
    }
}

/// The booleans a UI uses to enable or hide its controls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CapabilitySummary {
    pub zoom: bool,
    pub pan: bool,
    pub tilt: bool,
    pub preset: bool,
}

/// Zoom direction for relative commands and absolute stepping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ZoomDirection {
    In,
    Out,
}

impl ZoomDirection {
    /// bZoom byte: +1 in, -1 out.
    pub fn sign(self) -> i8 {
        match self {
            Self::In => crate::protocol::ZOOM_IN,
            Self::Out => crate::protocol::ZOOM_OUT,
        }
    }
}

impl fmt::Display for ZoomDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::In => "in",
            Self::Out => "out",
        })
    }
}

/// Result of one absolute zoom step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomStep {
    /// Position after clamping, the value to send.
    pub value: i16,
    /// The step reached `min` or `max`.
    pub boundary: bool,
}

/// Tracked absolute zoom position.  `min <= current <= max` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ZoomAbsoluteState {
    min: i16,
    max: i16,
    current: i16,
    step: i16,
}

impl ZoomAbsoluteState {
    /// `step = (max - min) / steps`, truncating.  A `max` below `min` is
    /// raised to `min`, and `current` is clamped into the range.
    pub fn new(min: i16, max: i16, current: i16, steps: i32) -> Self {
        let max = max.max(min);
        let span = max as i32 - min as i32;
        let step = (span / steps.max(1)).min(i16::MAX as i32) as i16;
        Self {
            min,
            max,
            current: current.clamp(min, max),
            step,
        }
    }

    pub fn min(&self) -> i16 {
        self.min
    }

    pub fn max(&self) -> i16 {
        self.max
    }

    pub fn current(&self) -> i16 {
        self.current
    }

    pub fn step(&self) -> i16 {
        self.step
    }

    /// Move one step toward `direction`, clamping to the bounds.
    pub fn step_toward(&mut self, direction: ZoomDirection) -> ZoomStep {
        let delta = match direction {
            ZoomDirection::In => self.step as i32,
            ZoomDirection::Out => -(self.step as i32),
        };
        let target = self.current as i32 + delta;
        let (value, boundary) = if target >= self.max as i32 && direction == ZoomDirection::In {
            (self.max, true)
        } else if target <= self.min as i32 && direction == ZoomDirection::Out {
            (self.min, true)
        } else {
            (target as i16, false)
        };
        self.current = value;
        ZoomStep { value, boundary }
    }
}
