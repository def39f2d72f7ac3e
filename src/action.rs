//! Requested PTZ motions.
//!
//! Several actions may be active at once (pan + tilt for a diagonal, or a
//! zoom together with a move).  Opposing actions are resolved to a single
//! net direction per axis: when both are present, `PanRight` beats
//! `PanLeft` and `TiltDown` beats `TiltUp`.

use std::collections::BTreeSet;
use std::fmt;

use crate::capability::ZoomDirection;
use crate::protocol::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PtzAction {
    PanLeft,
    PanRight,
    TiltUp,
    TiltDown,
    ZoomIn,
    ZoomOut,
}

impl fmt::Display for PtzAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PanLeft => "left",
            Self::PanRight => "right",
            Self::TiltUp => "up",
            Self::TiltDown => "down",
            Self::ZoomIn => "in",
            Self::ZoomOut => "out",
        };
        f.write_str(name)
    }
}

/// A set of simultaneously requested actions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PtzActionSet {
    actions: BTreeSet<PtzAction>,
}

impl PtzActionSet {
    pub fn contains(&self, action: PtzAction) -> bool {
        self.actions.contains(&action)
    }

    pub fn iter(&self) -> impl Iterator<Item = PtzAction> + '_ {
        self.actions.iter().copied()
    }

    /// Net bPanRelative: +1 left, -1 right, 0 none.
    pub fn pan(&self) -> i8 {
        if self.contains(PtzAction::PanRight) {
            PAN_RIGHT
        } else if self.contains(PtzAction::PanLeft) {
            PAN_LEFT
        } else {
            DIRECTION_STOP
        }
    }

    /// Net bTiltRelative: +1 up, -1 down, 0 none.
    pub fn tilt(&self) -> i8 {
        if self.contains(PtzAction::TiltDown) {
            TILT_DOWN
        } else if self.contains(PtzAction::TiltUp) {
            TILT_UP
        } else {
            DIRECTION_STOP
        }
    }

    /// Requested zoom directions, `In` before `Out`.
    pub fn zoom_directions(&self) -> Vec<ZoomDirection> {
        let mut dirs = Vec::new();
        if self.contains(PtzAction::ZoomIn) {
            dirs.push(ZoomDirection::In);
        }
        if self.contains(PtzAction::ZoomOut) {
            dirs.push(ZoomDirection::Out);
        }
        dirs
    }
}

impl FromIterator<PtzAction> for PtzActionSet {
    fn from_iter<I: IntoIterator<Item = PtzAction>>(iter: I) -> Self {
        Self { actions: iter.into_iter().collect() }
    }
}

impl<const N: usize> From<[PtzAction; N]> for PtzActionSet {
    fn from(actions: [PtzAction; N]) -> Self {
        actions.into_iter().collect()
    }
}

impl fmt::Display for PtzActionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.iter().map(|a| a.to_string()).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PtzAction::*;

    #[test]
    fn diagonal_keeps_both_axes() {
        let set = PtzActionSet::from([PanLeft, TiltUp]);
        assert_eq!((set.pan(), set.tilt()), (1, 1));
    }

    #[test]
    fn opposing_actions_resolve_to_later_direction() {
        let set = PtzActionSet::from([PanLeft, PanRight, TiltUp, TiltDown]);
        assert_eq!((set.pan(), set.tilt()), (-1, -1));
    }

    #[test]
    fn zoom_only_has_neutral_pan_tilt() {
        let set = PtzActionSet::from([ZoomIn]);
        assert_eq!((set.pan(), set.tilt()), (0, 0));
        assert_eq!(set.zoom_directions(), vec![ZoomDirection::In]);
    }

    #[test]
    fn duplicates_collapse() {
        let set: PtzActionSet = [TiltDown, TiltDown, ZoomOut].into_iter().collect();
        assert_eq!(set.iter().count(), 2);
        assert_eq!(set.to_string(), "[down, out]");
    }
}
