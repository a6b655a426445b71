//=========================================================================
// Platform Bridge Interface
//=========================================================================
//
// Platform-to-core interface types (events, requests and errors).
//
// Defines the contract between the render thread (platform) and the
// simulation thread (core). Both directions are plain channels:
//
//   Platform ──PlatformEvent──> Core      (bounded)
//   Core     ──CoreRequest────> Platform  (unbounded, polled per frame)
//
//=========================================================================

//=== PlatformEvent =======================================================

/// Events sent from platform to core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PlatformEvent {
    /// The user asked to go back (Escape, browser/hardware back key).
    Back,

    /// Window close requested.
    WindowClosed,
}

//=== CoreRequest =========================================================

/// Requests sent from core back to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CoreRequest {
    /// The top screen accepted a back request as "leave the application".
    Exit,
}

//=== PlatformError =======================================================

/// Platform initialization and runtime errors.
#[derive(Debug)]
pub enum PlatformError {
    /// Event loop creation failed (OS-level issue).
    EventLoopCreation(String),

    /// Event loop execution error.
    EventLoopExecution(String),
}

impl std::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EventLoopCreation(e) => write!(f, "Event loop creation failed: {}", e),
            Self::EventLoopExecution(e) => write!(f, "Event loop error: {}", e),
        }
    }
}

impl std::error::Error for PlatformError {}

//=========================================================================
// Unit Tests
//=========================================================================
