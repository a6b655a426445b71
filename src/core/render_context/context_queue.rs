//=========================================================================
// Context Task Queue
//=========================================================================
//
// Channel-backed `RenderScheduler`.
//
//   ContextScheduler (Sender, cloneable) → unbounded channel
//     → ContextTaskRunner (Receiver, render thread) → DeferredTask::run()
//
// The channel is unbounded so submission never blocks while the screen
// manager lock is held. At most `2 * N` tasks can be outstanding per
// system anyway (the task pool bound).
//
//=========================================================================

//=== External Dependencies ===============================================

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{trace, warn};

//=== Internal Dependencies ===============================================

use super::RenderScheduler;
use crate::core::screen::DeferredTask;

//=== Construction ========================================================

/// Creates a connected scheduler/runner pair.
///
/// Give the scheduler to a [`ScreenSystem`](crate::core::screen::ScreenSystem)
/// and keep the runner on the thread that owns the graphics context.
pub fn context_task_channel() -> (ContextScheduler, ContextTaskRunner) {
    let (sender, receiver) = unbounded();
    (ContextScheduler { sender }, ContextTaskRunner { receiver })
}

//=== ContextScheduler ====================================================

/// Submission half. Enqueues only; never runs a task.
#[derive(Debug, Clone)]
pub struct ContextScheduler {
    sender: Sender<DeferredTask>,
}

impl RenderScheduler for ContextScheduler {
    fn request_on_context_ready(&self, task: DeferredTask) {
        trace!(target: "render", "Queued deferred {} task", task.kind());

        if self.sender.send(task).is_err() {
            warn!(target: "render", "Render thread gone, deferred task dropped");
        }
    }
}

//=== ContextTaskRunner ===================================================

/// Execution half. Lives on the render thread.
#[derive(Debug)]
pub struct ContextTaskRunner {
    receiver: Receiver<DeferredTask>,
}

impl ContextTaskRunner {
    /// Runs every queued task. Returns how many ran.
    ///
    /// Call only while the graphics context is valid. Tasks queued by the
    /// tasks themselves run in the same call.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;

        while let Ok(task) = self.receiver.try_recv() {
            task.run();
            ran += 1;
        }

        if ran > 0 {
            trace!(target: "render", "Ran {} deferred task(s)", ran);
        }
        ran
    }

    /// Number of tasks waiting for the context.
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
