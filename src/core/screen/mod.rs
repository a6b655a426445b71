//=========================================================================
// Screen System
//=========================================================================
//
// Drives application screens through their lifecycle:
//
//   push/replace → pending_load ─(load task, render thread)→ pending_push
//     ─(enter pump)→ stack ─(pop/pop_to/replace)→ pending_pop
//     ─(exit pump)→ pending_unload ─(unload task, render thread)→ gone
//
// Architecture:
//   ScreenSystem (cloneable handle)
//     └─ Arc<Shared>
//          ├─ Mutex<ScreenState>   collections, pumps, task pool
//          ├─ scheduler            render-context task submission
//          └─ command channel      requests issued from screen hooks
//
// The manager never inspects or destroys a screen. It only decides when
// the screen's own hooks run, and on which thread.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

//=== Module Declarations =================================================

mod command;
mod deferred;
mod error;
mod pumps;
mod screen_list;
mod screen_system;
mod state;
mod task_pool;

#[cfg(test)]
pub(crate) mod test_support;

//=== Public API ==========================================================

pub use command::{ScreenCommand, ScreenContext};
pub use deferred::{DeferredTask, TaskKind};
pub use error::{ResourceError, ScreenError};
pub use screen_system::{ScreenSnapshot, ScreenSystem};

//=== Constants ===========================================================

/// Default maximum stack depth `N`.
///
/// Bounds every screen collection; the task pool holds `2 * N` slots.
pub const DEFAULT_MAX_SCREENS: usize = 12;

//=== Screen Trait ========================================================

/// A navigable application view (menu, gameplay scene, dialog).
///
/// Only `update()` is required. Every other hook defaults to a no-op, and
/// both animation hooks default to finishing immediately.
///
/// # Threads
///
/// - `load` / `unload` run on the render thread, while the graphics
///   context is valid.
/// - Every other hook runs on the simulation thread while the screen
///   manager's lock is held. Use the [`ScreenContext`] to request stack
///   changes from inside a hook.
///
/// ```rust
/// # use aetheric_screens::prelude::*;
/// struct Title;
///
/// impl Screen for Title {
///     fn update(&mut self, _ctx: &ScreenContext, _dt: f32) {}
/// }
///
/// let handle = ScreenHandle::new(Title);
/// ```
pub trait Screen: Send {
    /// Acquires GPU-side resources. Runs on the render thread.
    fn load(&mut self) -> Result<(), ResourceError> {
        Ok(())
    }

    /// Releases GPU-side resources. Runs on the render thread.
    fn unload(&mut self) -> Result<(), ResourceError> {
        Ok(())
    }

    /// Called every tick while the screen is on the stack, and while it
    /// waits behind another exiting screen.
    fn update(&mut self, ctx: &ScreenContext, dt: f32);

    /// Entrance animation is about to start.
    fn start_enter(&mut self, _ctx: &ScreenContext) {}

    /// Advances the entrance animation. Returns `true` while it should continue.
    fn enter_update(&mut self, _ctx: &ScreenContext, _dt: f32) -> bool {
        false
    }

    /// Exit animation is about to start.
    fn start_exit(&mut self, _ctx: &ScreenContext) {}

    /// Advances the exit animation. Returns `true` while it should continue.
    fn exit_update(&mut self, _ctx: &ScreenContext, _dt: f32) -> bool {
        false
    }

    /// The screen lost control of the top of the stack.
    fn pause(&mut self, _ctx: &ScreenContext) {}

    /// The screen became the settled top of the stack.
    fn resume(&mut self, _ctx: &ScreenContext) {}

    /// Back navigation requested. Returns `true` if the application should exit.
    fn back(&mut self, _ctx: &ScreenContext) -> bool {
        false
    }
}

//=== ScreenId ============================================================

static NEXT_SCREEN_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`ScreenHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScreenId(u64);

impl ScreenId {
    fn next() -> Self {
        Self(NEXT_SCREEN_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw id value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//=== ScreenHandle ========================================================

struct ScreenCell {
    id: ScreenId,
    name: &'static str,
    screen: Mutex<Box<dyn Screen>>,
}

/// Shared identity of an application screen.
///
/// Cloning is cheap and every clone refers to the same screen. Equality is
/// identity: two handles are equal only if they wrap the same screen.
#[derive(Clone)]
pub struct ScreenHandle {
    inner: Arc<ScreenCell>,
}

impl ScreenHandle {
    /// Wraps an application screen.
    pub fn new<T: Screen + 'static>(screen: T) -> Self {
        let name = std::any::type_name::<T>();
        let name = name.rsplit("::").next().unwrap_or(name);

        Self {
            inner: Arc::new(ScreenCell {
                id: ScreenId::next(),
                name,
                screen: Mutex::new(Box::new(screen)),
            }),
        }
    }

    /// Returns the screen's identity.
    pub fn id(&self) -> ScreenId {
        self.inner.id
    }

    /// Returns the short type name of the wrapped screen (for logs).
    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// Runs `f` with exclusive access to the wrapped screen.
    ///
    /// A screen hook that panicked leaves its state as-is; the lock is
    /// recovered rather than propagated.
    pub(crate) fn with_screen<R>(&self, f: impl FnOnce(&mut dyn Screen) -> R) -> R {
        let mut guard = self.inner.screen.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut **guard)
    }
}

impl PartialEq for ScreenHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for ScreenHandle {}

impl fmt::Debug for ScreenHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.inner.name, self.inner.id)
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
