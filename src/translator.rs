//! Turns requested actions into correctly sequenced control transfers.
//!
//! Routing per axis:
//!
//! - **Zoom**: relative control when present (pulse for a discrete click,
//!   start-only for a hold).  Otherwise one absolute step per discrete click;
//!   a held zoom is handed to the [`AbsoluteZoomEmulator`](crate::emulator::AbsoluteZoomEmulator).
//! - **Pan/tilt**: relative control only, sent for every action set (a
//!   zoom-only set carries a neutral direction).  A discrete click sends the move,
//!   waits the settle time, and sends a zero-direction stop in the same
//!   session bracket.  A hold sends the move and returns.
//!
//! Failures are logged and dropped here; the camera simply doesn't move.

use std::thread;
use std::time::Duration;

use crate::action::PtzActionSet;
use crate::capability::{Capability, ZoomAbsoluteState, ZoomDirection, ZoomStep};
use crate::codec::ControlValue;
use crate::error::{PtzError, Result};
use crate::prober::DeviceProfile;
use crate::protocol::DIRECTION_STOP;
use crate::session::{self, DeviceSession};

/// What a call to [`PtzTranslator::apply`] left for the caller to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// An absolute step was clamped at this end of the range.
    pub boundary: Option<ZoomDirection>,
    /// A held zoom needs absolute-step emulation in this direction.
    pub emulate: Option<ZoomDirection>,
}

/// Per-device PTZ state machine.
pub struct PtzTranslator {
    session: DeviceSession,
    capability: Capability,
    zoom: Option<ZoomAbsoluteState>,
    settle: Duration,
}

impl PtzTranslator {
    pub fn new(session: DeviceSession, profile: DeviceProfile, settle: Duration) -> Self {
        Self {
            session,
            capability: profile.capability,
            zoom: profile.zoom,
            settle,
        }
    }

    pub fn capability(&self) -> &Capability {
        &self.capability
    }

    pub fn zoom_state(&self) -> Option<&ZoomAbsoluteState> {
        self.zoom.as_ref()
    }

    /// Apply `actions` as a click (`continuous == false`) or the start of a hold.
    pub fn apply(&mut self, actions: &PtzActionSet, continuous: bool) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::default();

        for direction in actions.zoom_directions() {
            match self.zoom(direction, continuous) {
                Ok(ZoomRoute::Relative) => {}
                Ok(ZoomRoute::Stepped(step)) => {
                    if step.boundary {
                        outcome.boundary = Some(direction);
                    }
                }
                Ok(ZoomRoute::Emulate) => outcome.emulate = Some(direction),
                Err(e) => log_dropped("zoom", &e),
            }
        }

        // Runs for zoom-only sets too, with a neutral (0, 0) direction.
        if let Err(e) = self.pan_tilt(actions.pan(), actions.tilt(), continuous) {
            log_dropped("pan/tilt", &e);
        }

        outcome
    }

    /// Halt everything: zero-direction relative zoom and pan/tilt, sent
    /// whatever was started before.
    pub fn stop(&mut self) {
        let zoom_stop = ControlValue::ZoomRelative {
            zoom: DIRECTION_STOP,
            digital_zoom: 0,
            speed: 0,
        };
        if let Err(e) = self.session.set(&zoom_stop) {
            log_dropped("zoom stop", &e);
        }
        if let Err(e) = self.session.set(&self.pan_tilt_value(DIRECTION_STOP, DIRECTION_STOP)) {
            log_dropped("pan/tilt stop", &e);
        }
    }

    /// One absolute zoom step, clamped, sent as SET_CUR.
    ///
    /// The tracked position advances even when the transfer fails, so a
    /// boundary is still reported and emulation still terminates.
    pub fn step_absolute_zoom(&mut self, direction: ZoomDirection) -> Result<ZoomStep> {
        let state = self
            .zoom
            .as_mut()
            .ok_or(PtzError::Unsupported("absolute zoom"))?;
        let step = state.step_toward(direction);
        log::debug!("absolute zoom {:?} -> {} (boundary: {})", direction, step.value, step.boundary);

        let value = ControlValue::ZoomAbsolute { focal_length: step.value as u16 };
        if let Err(e) = self.session.set(&value) {
            log_dropped("absolute zoom", &e);
        }
        Ok(step)
    }

    fn zoom(&mut self, direction: ZoomDirection, continuous: bool) -> Result<ZoomRoute> {
        if self.capability.supports_zoom_relative {
            let start = ControlValue::ZoomRelative {
                zoom: direction.sign(),
                digital_zoom: 0,
                speed: self.capability.zoom_speed,
            };
            if continuous {
                self.session.set(&start)?;
            } else {
                let stop = ControlValue::ZoomRelative {
                    zoom: DIRECTION_STOP,
                    digital_zoom: 0,
                    speed: self.capability.zoom_speed,
                };
                self.pulse(&start, &stop)?;
            }
            return Ok(ZoomRoute::Relative);
        }

        if self.capability.supports_zoom_absolute {
            if continuous {
                return Ok(ZoomRoute::Emulate);
            }
            return self.step_absolute_zoom(direction).map(ZoomRoute::Stepped);
        }

        Err(PtzError::Unsupported("zoom"))
    }

    fn pan_tilt(&mut self, pan: i8, tilt: i8, continuous: bool) -> Result<()> {
        // Absolute pan/tilt is query-only.
        if !self.capability.supports_pantilt_relative {
            return Err(PtzError::Unsupported("pan/tilt movement"));
        }

        let start = self.pan_tilt_value(pan, tilt);
        if continuous {
            self.session.set(&start)
        } else {
            // Stop keeps the move's speed bytes.
            let stop = self.pan_tilt_value(DIRECTION_STOP, DIRECTION_STOP);
            self.pulse(&start, &stop)
        }
    }

    fn pan_tilt_value(&self, pan: i8, tilt: i8) -> ControlValue {
        ControlValue::PanTiltRelative {
            pan,
            pan_speed: self.capability.pan_speed,
            tilt,
            tilt_speed: self.capability.tilt_speed,
        }
    }

    /// Move, settle, stop, all under one open handle.  The stop is sent even
    /// when the move failed.
    fn pulse(&self, start: &ControlValue, stop: &ControlValue) -> Result<()> {
        let settle = self.settle;
        self.session.with_open_device(|handle| {
            let moved = session::set(handle, start);
            if moved.is_ok() {
                thread::sleep(settle);
            }
            let stopped = session::set(handle, stop);
            moved.and(stopped)
        })?
    }
}

enum ZoomRoute {
    Relative,
    Stepped(ZoomStep),
    Emulate,
}

fn log_dropped(what: &str, e: &PtzError) {
    if e.is_unsupported() {
        log::debug!("{} dropped: {}", what, e);
    } else {
        log::warn!("{} command dropped: {}", what, e);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Instant;

    use super::*;
    use crate::action::PtzAction::*;
    use crate::capability::ZoomAbsoluteState;
    use crate::codec::ControlSelector;
    use crate::mock::MockCamera;
    use crate::protocol::*;

    fn translator(camera: &MockCamera, capability: Capability, zoom: Option<ZoomAbsoluteState>) -> PtzTranslator {
        let session = DeviceSession::new(Arc::new(camera.clone()), MockCamera::identity());
        PtzTranslator::new(session, DeviceProfile { capability, zoom }, Duration::ZERO)
    }

    fn relative_camera() -> (MockCamera, Capability) {
        let camera = MockCamera::new().with_zoom_relative(0, 2).with_pantilt_relative(5, 3);
        let cap = Capability {
            supports_zoom_relative: true,
            supports_pantilt_relative: true,
            pan_speed: 5,
            tilt_speed: 3,
            zoom_speed: 2,
            ..Default::default()
        };
        (camera, cap)
    }

    #[test]
    fn discrete_diagonal_pulses_and_stops() {
        let (camera, cap) = relative_camera();
        let mut t = translator(&camera, cap, None);
        t.apply(&PtzActionSet::from([PanLeft, TiltUp]), false);

        assert_eq!(
            camera.sets_to(ControlSelector::PanTiltRelative),
            vec![vec![0x01, 5, 0x01, 3], vec![0, 5, 0, 3]]
        );
        // Move and stop share one bracket.
        assert_eq!(camera.opens(), 1);
        assert_eq!(camera.closes(), 1);
    }

    #[test]
    fn continuous_pan_sends_start_only() {
        let (camera, cap) = relative_camera();
        let mut t = translator(&camera, cap, None);
        t.apply(&PtzActionSet::from([PanRight, TiltDown]), true);
        assert_eq!(camera.sets_to(ControlSelector::PanTiltRelative), vec![vec![0xFF, 5, 0xFF, 3]]);
        assert_eq!(camera.closes(), 1);
    }

    #[test]
    fn relative_zoom_pulse() {
        let (camera, cap) = relative_camera();
        let mut t = translator(&camera, cap, None);
        let outcome = t.apply(&PtzActionSet::from([ZoomOut]), false);
        assert_eq!(outcome, ApplyOutcome::default());
        assert_eq!(
            camera.sets_to(ControlSelector::ZoomRelative),
            vec![vec![0xFF, 0, 2], vec![0, 0, 2]]
        );
    }

    #[test]
    fn zoom_click_also_pulses_neutral_pan_tilt() {
        let (camera, cap) = relative_camera();
        let mut t = translator(&camera, cap, None);
        t.apply(&PtzActionSet::from([ZoomIn]), false);

        let order: Vec<(u8, Vec<u8>)> = camera
            .sets()
            .into_iter()
            .map(|s| (s.selector_code(), s.data))
            .collect();
        assert_eq!(
            order,
            vec![
                (CT_ZOOM_RELATIVE_CONTROL, vec![0x01, 0, 2]),
                (CT_ZOOM_RELATIVE_CONTROL, vec![0, 0, 2]),
                (CT_PANTILT_RELATIVE_CONTROL, vec![0, 5, 0, 3]),
                (CT_PANTILT_RELATIVE_CONTROL, vec![0, 5, 0, 3]),
            ]
        );
        // One bracket per pulse.
        assert_eq!(camera.opens(), 2);
    }

    #[test]
    fn continuous_zoom_also_starts_neutral_pan_tilt() {
        let (camera, cap) = relative_camera();
        let mut t = translator(&camera, cap, None);
        t.apply(&PtzActionSet::from([ZoomOut]), true);
        assert_eq!(camera.sets_to(ControlSelector::ZoomRelative), vec![vec![0xFF, 0, 2]]);
        assert_eq!(camera.sets_to(ControlSelector::PanTiltRelative), vec![vec![0, 5, 0, 3]]);
    }

    #[test]
    fn discrete_stop_follows_after_settle() {
        let (camera, cap) = relative_camera();
        let session = DeviceSession::new(Arc::new(camera.clone()), MockCamera::identity());
        let settle = Duration::from_millis(50);
        let mut t = PtzTranslator::new(session, DeviceProfile { capability: cap, zoom: None }, settle);

        let started = Instant::now();
        t.apply(&PtzActionSet::from([PanLeft]), false);
        assert!(started.elapsed() >= settle);

        let sets = camera.sets();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].data, vec![0x01, 5, 0, 3]);
        assert_eq!(sets[1].data, vec![0, 5, 0, 3]);
        assert!(sets[1].at.duration_since(sets[0].at) >= settle);
    }

    #[test]
    fn continuous_relative_zoom_start() {
        let (camera, cap) = relative_camera();
        let mut t = translator(&camera, cap, None);
        t.apply(&PtzActionSet::from([ZoomIn]), true);
        assert_eq!(camera.sets_to(ControlSelector::ZoomRelative), vec![vec![0x01, 0, 2]]);
    }

    #[test]
    fn absolute_zoom_fallback() {
        let camera = MockCamera::new().with_zoom_absolute(0, 1000, 500);
        let cap = Capability { supports_zoom_absolute: true, ..Default::default() };
        let mut t = translator(&camera, cap, Some(ZoomAbsoluteState::new(0, 1000, 500, 50)));

        let outcome = t.apply(&PtzActionSet::from([ZoomIn]), false);
        assert_eq!(outcome.boundary, None);
        assert_eq!(camera.sets_to(ControlSelector::ZoomAbsolute), vec![vec![0x08, 0x02]]); // 520
        assert!(camera.sets_to(ControlSelector::ZoomRelative).is_empty());
        assert_eq!(t.zoom_state().unwrap().current(), 520);
    }

    #[test]
    fn absolute_zoom_boundary() {
        let camera = MockCamera::new().with_zoom_absolute(0, 1000, 990);
        let cap = Capability { supports_zoom_absolute: true, ..Default::default() };
        let mut t = translator(&camera, cap, Some(ZoomAbsoluteState::new(0, 1000, 990, 50)));

        let outcome = t.apply(&PtzActionSet::from([ZoomIn]), false);
        assert_eq!(outcome.boundary, Some(ZoomDirection::In));
        assert_eq!(camera.sets_to(ControlSelector::ZoomAbsolute), vec![vec![0xE8, 0x03]]);
    }

    #[test]
    fn continuous_absolute_zoom_requests_emulation() {
        let camera = MockCamera::new().with_zoom_absolute(0, 1000, 500);
        let cap = Capability { supports_zoom_absolute: true, ..Default::default() };
        let mut t = translator(&camera, cap, Some(ZoomAbsoluteState::new(0, 1000, 500, 50)));

        let outcome = t.apply(&PtzActionSet::from([ZoomOut]), true);
        assert_eq!(outcome.emulate, Some(ZoomDirection::Out));
        assert!(camera.transfers().is_empty());
    }

    #[test]
    fn pan_tilt_without_relative_is_dropped() {
        let camera = MockCamera::new().with_pantilt_absolute((-10, 10), (-10, 10));
        let cap = Capability { supports_pantilt_absolute: true, ..Default::default() };
        let mut t = translator(&camera, cap, None);
        t.apply(&PtzActionSet::from([PanLeft]), false);
        t.apply(&PtzActionSet::from([TiltUp]), true);
        assert!(camera.transfers().is_empty());
        assert_eq!(camera.opens(), 0);
    }

    #[test]
    fn stop_is_unconditional() {
        let camera = MockCamera::new();
        let mut t = translator(&camera, Capability::default(), None);
        t.stop();
        assert_eq!(camera.sets_to(ControlSelector::ZoomRelative), vec![vec![0, 0, 0]]);
        assert_eq!(camera.sets_to(ControlSelector::PanTiltRelative), vec![vec![0, 0, 0, 0]]);
    }

    #[test]
    fn transfer_failures_are_swallowed() {
        let (camera, cap) = relative_camera();
        camera.fail_transfers(true);
        let mut t = translator(&camera, cap, None);
        let outcome = t.apply(&PtzActionSet::from([PanLeft, ZoomIn]), false);
        assert_eq!(outcome, ApplyOutcome::default());
        assert_eq!(camera.opens(), camera.closes());
    }
}
