//=========================================================================
// Screen Commands
//=========================================================================
//
// Stack requests issued while the screen manager lock is held.
//
// Screen hooks run under the manager lock, so they cannot call the public
// API directly. They queue commands through the `ScreenContext` instead;
// the lock holder drains the queue before releasing the lock.
//
//   hook → ScreenContext::push() → channel → drain → ScreenState::push()
//
//=========================================================================

//=== External Dependencies ===============================================

use crossbeam_channel::Sender;
use log::warn;

//=== Internal Dependencies ===============================================

use super::ScreenHandle;

//=== ScreenCommand =======================================================

/// A deferred stack operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenCommand {
    /// Loads and enters a screen on top of the stack.
    Push(ScreenHandle),

    /// Exits the top screen.
    Pop,

    /// Exits every screen above `target` (and `target` itself unless `exclude`).
    PopTo { target: ScreenHandle, exclude: bool },

    /// Exits the whole stack, then loads and enters the screen.
    Replace(ScreenHandle),
}

//=== ScreenContext =======================================================

/// Handed to every simulation-thread screen hook.
///
/// Provides a read-only view of the manager taken just before the hook ran
/// and a way to request stack changes. Requests are applied after the
/// current step, in the order they were issued.
pub struct ScreenContext<'a> {
    commands: &'a Sender<ScreenCommand>,
    depth: usize,
    pending: bool,
}

impl<'a> ScreenContext<'a> {
    pub(crate) fn new(commands: &'a Sender<ScreenCommand>, depth: usize, pending: bool) -> Self {
        Self { commands, depth, pending }
    }

    //--- Queries ----------------------------------------------------------

    /// Number of screens on the active stack.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Whether any load, entrance or exit is outstanding.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    //--- Requests ---------------------------------------------------------

    /// Requests a push. See [`ScreenSystem::push`](super::ScreenSystem::push).
    pub fn push(&self, screen: ScreenHandle) {
        self.send(ScreenCommand::Push(screen));
    }

    /// Requests a pop. See [`ScreenSystem::pop`](super::ScreenSystem::pop).
    pub fn pop(&self) {
        self.send(ScreenCommand::Pop);
    }

    /// Requests a multi-pop. See [`ScreenSystem::pop_to`](super::ScreenSystem::pop_to).
    pub fn pop_to(&self, target: ScreenHandle, exclude: bool) {
        self.send(ScreenCommand::PopTo { target, exclude });
    }

    /// Requests a replace. See [`ScreenSystem::replace`](super::ScreenSystem::replace).
    pub fn replace(&self, screen: ScreenHandle) {
        self.send(ScreenCommand::Replace(screen));
    }

    fn send(&self, command: ScreenCommand) {
        if self.commands.send(command).is_err() {
            warn!(target: "screens", "Command queue disconnected, request dropped");
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
