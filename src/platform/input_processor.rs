//=========================================================================
// Input Processor
//=========================================================================
//
// Converts Winit keyboard input into platform events.
//
// Architecture:
//   Winit KeyEvent → InputProcessor → Option<PlatformEvent> → core channel
//
// Only navigation keys are of interest: screens receive "back" through
// the screen system, everything else stays with the application.
// Key repeats are filtered so holding Escape pops a single screen.
//
//=========================================================================

//=== External Dependencies ===============================================

use winit::{
    event::ElementState,
    keyboard::{KeyCode, PhysicalKey},
};

//=== Internal Dependencies ===============================================

use crate::core::platform_bridge::PlatformEvent;

//=== InputProcessor ======================================================

/// Maps physical keys to platform events.
pub(crate) struct InputProcessor {
    back_keys: Vec<KeyCode>,
}

impl InputProcessor {
    pub(crate) fn new() -> Self {
        Self {
            back_keys: vec![KeyCode::Escape, KeyCode::BrowserBack],
        }
    }

    /// Converts a key transition (filters releases, repeats and unmapped keys).
    pub(crate) fn process_key(
        &self,
        key: PhysicalKey,
        state: ElementState,
        repeat: bool,
    ) -> Option<PlatformEvent> {
        if state != ElementState::Pressed || repeat {
            return None;
        }

        match key {
            PhysicalKey::Code(code) if self.back_keys.contains(&code) => Some(PlatformEvent::Back),
            _ => None,
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
