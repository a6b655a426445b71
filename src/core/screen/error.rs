//=========================================================================
// Screen Errors
//=========================================================================
//
// Error types surfaced by the screen subsystem.
//
// Most misuse (pushing a tracked screen, exceeding capacity) is skipped
// silently with a warning. Only `pop_to` reports a missing target, and
// screen resource hooks report load/unload failures for logging.
//
//=========================================================================

//=== Internal Dependencies ===============================================

use super::ScreenId;

//=== ScreenError =========================================================

/// Errors returned by [`ScreenSystem`](super::ScreenSystem) operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenError {
    /// The target screen is not on the active stack (or is already leaving).
    NotFound(ScreenId),
}

impl std::fmt::Display for ScreenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "Screen {} is not on the active stack", id),
        }
    }
}

impl std::error::Error for ScreenError {}

//=== ResourceError =======================================================

/// Failure reported by a screen's own `load`/`unload` hooks.
///
/// The manager only logs it: the screen still advances to its next
/// lifecycle phase, since the manager never owns the screen's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceError {
    message: String,
}

impl ResourceError {
    /// Creates a resource error with a human-readable reason.
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    /// Returns the failure reason.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ResourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Screen resource failure: {}", self.message)
    }
}

impl std::error::Error for ResourceError {}

//=========================================================================
// Unit Tests
//=========================================================================
