//=========================================================================
// Render Context Scheduling
//=========================================================================
//
// Hands deferred screen tasks to the thread that owns the graphics
// context.
//
// Architecture:
// ```text
//  Simulation Thread:                Render Thread:
//  ┌──────────────────────────┐     ┌───────────────────────────┐
//  │  ScreenSystem            │     │  Platform (window = ctx)  │
//  │   ├─ push()/update()     │     │   ↓                       │
//  │   └─ ContextScheduler ───┼────►│  ContextTaskRunner        │
//  │        (Sender)          │     │   └─ run_pending()        │
//  └──────────────────────────┘     │        └─ task.run()      │
//                                   └───────────────────────────┘
// ```
//
// The scheduler never runs a task itself. It only enqueues; the runner
// drains the queue at a point where the context is valid, before the
// next frame is requested.
//
//=========================================================================

//=== Module Declarations =================================================

mod context_queue;

//=== Public API ==========================================================

pub use context_queue::{context_task_channel, ContextScheduler, ContextTaskRunner};

//=== Internal Dependencies ===============================================

use crate::core::screen::DeferredTask;

//=== RenderScheduler Trait ===============================================

/// Accepts deferred tasks for execution on the render thread.
///
/// # Contract
///
/// Implementations must run every accepted task exactly once, on the thread
/// owning the graphics context, after that context is valid. They must
/// **not** run the task inside `request_on_context_ready`: the caller holds
/// the screen manager's lock while submitting.
pub trait RenderScheduler: Send + Sync {
    /// Queues `task` to run once the graphics context is ready.
    fn request_on_context_ready(&self, task: DeferredTask);
}
