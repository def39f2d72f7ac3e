//! Capability discovery through GET_DEF queries.
//!
//! Query order is fixed: zoom absolute, zoom relative, pan/tilt absolute,
//! pan/tilt relative.  A short transfer or a STALL means the camera lacks
//! the control;
//! a transport error is logged louder but has the same outcome.  Each query
//! runs in its own session bracket.

use crate::capability::{Capability, PanTiltRange, ZoomAbsoluteState};
use crate::codec::{ControlSelector, ControlValue, RequestKind};
use crate::error::{PtzError, Result};
use crate::session::DeviceSession;

/// Everything learned about a camera on selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceProfile {
    pub capability: Capability,
    /// Present only when absolute zoom is usable.
    pub zoom: Option<ZoomAbsoluteState>,
}

/// Run one query, turning failure into `None` with the right log level.
fn try_query(session: &DeviceSession, selector: ControlSelector, kind: RequestKind) -> Option<ControlValue> {
    match session.query(selector, kind) {
        Ok(value) => Some(value),
        Err(e) if e.is_unsupported() => {
            log::debug!("{} {:?} unsupported: {}", selector, kind, e);
            None
        }
        Err(e) => {
            log::warn!("{} {:?} failed: {}", selector, kind, e);
            None
        }
    }
}

/// Probe which PTZ controls `session`'s camera implements.
pub fn probe(session: &DeviceSession, zoom_steps: i32) -> DeviceProfile {
    let mut capability = Capability::default();

    capability.supports_zoom_absolute =
        try_query(session, ControlSelector::ZoomAbsolute, RequestKind::GetDef).is_some();

    if let Some(ControlValue::ZoomRelative { speed, .. }) =
        try_query(session, ControlSelector::ZoomRelative, RequestKind::GetDef)
    {
        capability.supports_zoom_relative = true;
        capability.zoom_speed = speed;
    }

    capability.supports_pantilt_absolute =
        try_query(session, ControlSelector::PanTiltAbsolute, RequestKind::GetDef).is_some();

    if let Some(ControlValue::PanTiltRelative { pan_speed, tilt_speed, .. }) =
        try_query(session, ControlSelector::PanTiltRelative, RequestKind::GetDef)
    {
        capability.supports_pantilt_relative = true;
        capability.pan_speed = pan_speed;
        capability.tilt_speed = tilt_speed;
    }

    if capability.supports_pantilt_absolute {
        capability.pantilt_range = probe_pantilt_range(session).unwrap_or_default();
    }

    let zoom = if capability.supports_zoom_absolute {
        match probe_zoom_bounds(session, zoom_steps) {
            Ok(state) => Some(state),
            Err(e) => {
                log::warn!("absolute zoom bounds unavailable, disabling absolute zoom: {}", e);
                capability.supports_zoom_absolute = false;
                None
            }
        }
    } else {
        None
    };

    log::debug!(
        "{}: zoom abs={} rel={} pan/tilt abs={} rel={} speeds pan={} tilt={} zoom={}",
        session.identity(),
        capability.supports_zoom_absolute,
        capability.supports_zoom_relative,
        capability.supports_pantilt_absolute,
        capability.supports_pantilt_relative,
        capability.pan_speed,
        capability.tilt_speed,
        capability.zoom_speed,
    );
    if let Some(z) = &zoom {
        log::debug!(
            "absolute zoom min={} max={} current={} step={}",
            z.min(),
            z.max(),
            z.current(),
            z.step()
        );
    }

    DeviceProfile { capability, zoom }
}

/// GET_MIN, GET_MAX, GET_CUR on zoom absolute, values read as signed.
fn probe_zoom_bounds(session: &DeviceSession, zoom_steps: i32) -> Result<ZoomAbsoluteState> {
    let read = |kind: RequestKind| -> Result<i16> {
        match session.query(ControlSelector::ZoomAbsolute, kind)? {
            ControlValue::ZoomAbsolute { focal_length } => Ok(focal_length as i16),
            other => Err(PtzError::TransferFailed(format!("unexpected reply {:?}", other))),
        }
    };
    let min = read(RequestKind::GetMin)?;
    let max = read(RequestKind::GetMax)?;
    let current = read(RequestKind::GetCur)?;
    Ok(ZoomAbsoluteState::new(min, max, current, zoom_steps))
}

fn probe_pantilt_range(session: &DeviceSession) -> Option<PanTiltRange> {
    let min = try_query(session, ControlSelector::PanTiltAbsolute, RequestKind::GetMin)?;
    let max = try_query(session, ControlSelector::PanTiltAbsolute, RequestKind::GetMax)?;
    match (min, max) {
        (
            ControlValue::PanTiltAbsolute { pan: pan_min, tilt: tilt_min },
            ControlValue::PanTiltAbsolute { pan: pan_max, tilt: tilt_max },
        ) => Some(PanTiltRange {
            pan_min: pan_min as i16,
            pan_max: pan_max as i16,
            tilt_min: tilt_min as i16,
            tilt_max: tilt_max as i16,
        }),
        _ => None,
    }
}
