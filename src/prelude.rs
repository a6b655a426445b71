//=========================================================================
// Prelude
//=========================================================================
//
// Convenience module that re-exports commonly used types and traits.
//
// Usage:
//   use aetheric_screens::prelude::*;
//
//=========================================================================

//=== Public API ==========================================================

// Engine core
pub use crate::engine::{Engine, EngineBuilder};
pub use crate::PlatformError;

// Screen system
pub use crate::core::screen::{
    ResourceError, Screen, ScreenContext, ScreenError, ScreenHandle, ScreenId, ScreenSnapshot,
    ScreenSystem, DEFAULT_MAX_SCREENS,
};

// Render context
pub use crate::core::render_context::{context_task_channel, RenderScheduler};
