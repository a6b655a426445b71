//=========================================================================
// Deferred Tasks
//=========================================================================
//
// One-shot load/unload work that must run on the render thread.
//
// Flow:
//   ScreenState::request_task() → TaskPool slot → DeferredTask
//     → RenderScheduler::request_on_context_ready()
//     → (render thread) DeferredTask::run()
//          1. verify slot + expected collection (under lock)
//          2. Screen::load()/unload()             (no manager lock)
//          3. release slot, advance the screen    (under lock)
//
// A task only carries a slot handle and a weak reference to its system.
// Anything that invalidates the slot (completion, `reset`) turns a late
// fire into a silent no-op.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;
use std::sync::Weak;

use log::trace;

//=== Internal Dependencies ===============================================

use super::screen_system::{ScreenSystem, Shared};
use super::task_pool::TaskId;

//=== TaskKind ============================================================

/// Which screen resource hook a deferred task runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Load,
    Unload,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load => f.write_str("load"),
            Self::Unload => f.write_str("unload"),
        }
    }
}

//=== DeferredTask ========================================================

/// A pooled one-shot action bound to a single screen.
///
/// Not `Clone`: [`run`](Self::run) consumes the task, so it executes at
/// most once.
pub struct DeferredTask {
    id: TaskId,
    kind: TaskKind,
    system: Weak<Shared>,
}

impl DeferredTask {
    pub(crate) fn new(id: TaskId, kind: TaskKind, system: Weak<Shared>) -> Self {
        Self { id, kind, system }
    }

    /// Returns whether this task loads or unloads its screen.
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Executes the task. Must be called on the thread owning the graphics
    /// context, while that context is valid.
    pub fn run(self) {
        match self.system.upgrade() {
            Some(shared) => ScreenSystem::from_shared(shared).run_task(self.id, self.kind),
            None => trace!(target: "screens::task", "Screen system dropped, {} task skipped", self.kind),
        }
    }
}

impl fmt::Debug for DeferredTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredTask")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
