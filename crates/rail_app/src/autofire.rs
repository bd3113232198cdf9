//! Scripted input for headless runs.

use std::cell::RefCell;
use std::rc::Rc;

use rail_game::{ControllerHandle, ScriptedController};

/// Presses fire on the first tick of every period and releases it on the
/// next, so the player throws once per period.
#[derive(Debug, Clone)]
pub struct Autofire {
    controller: Rc<RefCell<ScriptedController>>,
    period: u64,
}

impl Autofire {
    /// Fire every `period` ticks. A period of 0 never fires; a period of 1
    /// holds the button, which fires only once.
    #[must_use]
    pub fn new(period: u64) -> Self {
        Self {
            controller: Rc::new(RefCell::new(ScriptedController::new())),
            period,
        }
    }

    /// The controller to hand to the player.
    #[must_use]
    pub fn handle(&self) -> ControllerHandle {
        self.controller.clone()
    }

    /// Set the button for `tick_id` (1-based).
    pub fn drive(&self, tick_id: u64) {
        let pressed = self.period > 0 && (tick_id - 1) % self.period == 0;
        self.controller.borrow_mut().set_fire(pressed);
    }
}
