use serde::{Deserialize, Serialize};

/// One tick's worth of controller intents.
///
/// Everything is edge-triggered (true only on the tick the button went down)
/// except `soft_drop`, which stays true while held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intents {
    pub move_left: bool,
    pub move_right: bool,
    pub soft_drop: bool,
    pub rotate_cw: bool,
    pub rotate_ccw: bool,
    pub debug_next_kind: bool,
    pub debug_prev_kind: bool,
}

impl Intents {
    pub const NONE: Intents = Intents {
        move_left: false,
        move_right: false,
        soft_drop: false,
        rotate_cw: false,
        rotate_ccw: false,
        debug_next_kind: false,
        debug_prev_kind: false,
    };

    pub fn left() -> Self {
        Self {
            move_left: true,
            ..Self::NONE
        }
    }

    pub fn right() -> Self {
        Self {
            move_right: true,
            ..Self::NONE
        }
    }

    pub fn soft_drop() -> Self {
        Self {
            soft_drop: true,
            ..Self::NONE
        }
    }

    pub fn rotate_cw() -> Self {
        Self {
            rotate_cw: true,
            ..Self::NONE
        }
    }

    pub fn rotate_ccw() -> Self {
        Self {
            rotate_ccw: true,
            ..Self::NONE
        }
    }
}

/// Turns raw "is pressed" samples into [`Intents`], firing edge-triggered
/// buttons once per press.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDetector {
    held: Intents,
}

impl EdgeDetector {
    pub fn sample(&mut self, pressed: Intents) -> Intents {
        let rising = |now: bool, before: bool| now && !before;
        let out = Intents {
            move_left: rising(pressed.move_left, self.held.move_left),
            move_right: rising(pressed.move_right, self.held.move_right),
            soft_drop: pressed.soft_drop,
            rotate_cw: rising(pressed.rotate_cw, self.held.rotate_cw),
            rotate_ccw: rising(pressed.rotate_ccw, self.held.rotate_ccw),
            debug_next_kind: rising(pressed.debug_next_kind, self.held.debug_next_kind),
            debug_prev_kind: rising(pressed.debug_prev_kind, self.held.debug_prev_kind),
        };
        self.held = pressed;
        out
    }
}
