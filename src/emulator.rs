//! Continuous zoom on cameras that only have absolute zoom.
//!
//! The emulator owns no timer.  Whoever drives the UI calls [`tick`] every
//! [`ZOOM_TICK_INTERVAL`](crate::protocol::ZOOM_TICK_INTERVAL); each tick is
//! one absolute step in its own session bracket.  When a step clamps at the
//! range end the emulator disarms itself and reports
//! [`TickOutcome::BoundaryReached`] so the caller can cancel its timer.
//!
//! [`tick`]: AbsoluteZoomEmulator::tick

use crate::capability::ZoomDirection;
use crate::translator::PtzTranslator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not armed; nothing was sent.
    Idle,
    /// Stepped to this absolute position.
    Stepped(i16),
    /// Clamped at the end of the range; the emulator is now disarmed.
    BoundaryReached(ZoomDirection),
}

#[derive(Debug, Default)]
pub struct AbsoluteZoomEmulator {
    direction: Option<ZoomDirection>,
}

impl AbsoluteZoomEmulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm for `direction`.  Re-arming replaces the direction.
    pub fn start(&mut self, direction: ZoomDirection) {
        self.direction = Some(direction);
    }

    pub fn stop(&mut self) {
        self.direction = None;
    }

    pub fn active(&self) -> Option<ZoomDirection> {
        self.direction
    }

    pub fn tick(&mut self, translator: &mut PtzTranslator) -> TickOutcome {
        let Some(direction) = self.direction else {
            return TickOutcome::Idle;
        };

        match translator.step_absolute_zoom(direction) {
            Ok(step) if step.boundary => {
                self.direction = None;
                TickOutcome::BoundaryReached(direction)
            }
            Ok(step) => TickOutcome::Stepped(step.value),
            Err(e) => {
                log::debug!("zoom emulation stopped: {}", e);
                self.direction = None;
                TickOutcome::Idle
            }
        }
    }
}
