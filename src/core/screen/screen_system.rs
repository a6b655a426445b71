//=========================================================================
// Screen System Handle
//=========================================================================
//
// Thread-safe public API over the screen state machine.
//
// Architecture:
//   ScreenSystem ──clone──> ScreenSystem      (same Arc<Shared>)
//        │
//        └─ with_state(f)
//             1. lock Mutex<ScreenState>
//             2. mark this thread as holding the lock
//             3. f(&mut state, &commands)
//             4. drain commands queued by screen hooks
//             5. submit requested deferred tasks to the scheduler
//             6. unmark, unlock
//
// Lock discipline:
//   - Acquisition always blocks; there is no timeout.
//   - Helpers take `&mut ScreenState` and never lock again.
//   - A public call made from inside a screen hook (same thread, same
//     system) is turned into a queued command instead of a deadlock.
//   - Deferred tasks only ever run on the render thread; their
//     completion re-acquires the lock from there.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::Cell;
use std::sync::{Arc, Mutex, PoisonError};

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, error, warn};

//=== Internal Dependencies ===============================================

use super::command::ScreenCommand;
use super::deferred::{DeferredTask, TaskKind};
use super::error::ScreenError;
use super::state::ScreenState;
use super::task_pool::TaskId;
use super::{ScreenHandle, ScreenId};
use crate::core::render_context::RenderScheduler;

//=== Lock Scope ==========================================================

thread_local! {
    /// Address of the `Shared` whose lock this thread currently holds.
    static HOLDING: Cell<usize> = const { Cell::new(0) };
}

/// Marks the current thread as holding a system's lock until dropped.
struct LockScope {
    previous: usize,
}

impl LockScope {
    fn enter(key: usize) -> Self {
        Self { previous: HOLDING.with(|h| h.replace(key)) }
    }

    fn is_held(key: usize) -> bool {
        HOLDING.with(|h| h.get() == key)
    }
}

impl Drop for LockScope {
    fn drop(&mut self) {
        HOLDING.with(|h| h.set(self.previous));
    }
}

//=== ScreenSnapshot ======================================================

/// Lock-guarded copy of every collection, by screen id.
///
/// `stack` excludes screens already queued for exit. Screens that have
/// finished entering but wait for the next commit are reported in
/// `pending_push`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScreenSnapshot {
    pub stack: Vec<ScreenId>,
    pub pending_load: Vec<ScreenId>,
    pub pending_push: Vec<ScreenId>,
    pub pending_pop: Vec<ScreenId>,
    pub pending_unload: Vec<ScreenId>,
}

impl ScreenSnapshot {
    /// Whether every screen appears in at most one collection.
    pub fn is_exclusive(&self) -> bool {
        let mut all: Vec<ScreenId> = self
            .stack
            .iter()
            .chain(&self.pending_load)
            .chain(&self.pending_push)
            .chain(&self.pending_pop)
            .chain(&self.pending_unload)
            .copied()
            .collect();
        let total = all.len();

        all.sort_unstable();
        all.dedup();
        all.len() == total
    }

    /// Total screens admitted towards the capacity limit.
    pub fn admitted(&self) -> usize {
        self.stack.len() + self.pending_load.len() + self.pending_push.len()
    }
}

//=== Shared ==============================================================

pub(crate) struct Shared {
    state: Mutex<ScreenState>,
    scheduler: Box<dyn RenderScheduler>,
    commands_tx: Sender<ScreenCommand>,
    commands_rx: Receiver<ScreenCommand>,
}

//=== ScreenSystem ========================================================

/// Screen stack manager.
///
/// Cheap to clone; every clone drives the same stack. All operations are
/// thread-safe. Misuse (pushing a screen that is already tracked, going
/// over capacity) is skipped with a warning rather than reported: poll
/// [`is_pending`](Self::is_pending) / [`top`](Self::top) to observe
/// the outcome.
///
/// # Example
///
/// ```rust
/// # use aetheric_screens::prelude::*;
/// struct Menu;
/// impl Screen for Menu {
///     fn update(&mut self, _ctx: &ScreenContext, _dt: f32) {}
/// }
///
/// let (scheduler, runner) = context_task_channel();
/// let screens = ScreenSystem::new(DEFAULT_MAX_SCREENS, scheduler);
/// let menu = ScreenHandle::new(Menu);
///
/// screens.push(menu.clone());
/// runner.run_pending();     // render thread: Menu::load()
/// screens.update(1.0 / 60.0); // simulation thread: Menu enters
/// screens.update(1.0 / 60.0); // commit: Menu joins the stack
///
/// assert_eq!(screens.top(), Some(menu));
/// ```
#[derive(Clone)]
pub struct ScreenSystem {
    shared: Arc<Shared>,
}

impl ScreenSystem {
    //--- Construction -----------------------------------------------------

    /// Creates an empty system bounded to `max_screens`.
    ///
    /// # Panics
    ///
    /// Panics if `max_screens == 0`.
    pub fn new<R>(max_screens: usize, scheduler: R) -> Self
    where
        R: RenderScheduler + 'static,
    {
        assert!(max_screens > 0, "Max screens must be positive");
        debug!(target: "screens", "Screen system created (capacity: {})", max_screens);

        let (commands_tx, commands_rx) = unbounded();

        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(ScreenState::new(max_screens)),
                scheduler: Box::new(scheduler),
                commands_tx,
                commands_rx,
            }),
        }
    }

    pub(crate) fn from_shared(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    //--- Stack Operations -------------------------------------------------

    /// Loads `screen` on the render thread, then plays its entrance on top
    /// of the stack.
    ///
    /// Pauses the current top if this is the first outstanding entrant.
    /// Ignored if `screen` is already tracked or the system is full.
    pub fn push(&self, screen: ScreenHandle) {
        if self.is_reentrant() {
            self.enqueue(ScreenCommand::Push(screen));
            return;
        }
        self.with_state(|state, commands| state.push(screen, commands));
    }

    /// Plays the exit of the top screen, then unloads it.
    ///
    /// Ignored if the stack is empty.
    pub fn pop(&self) {
        if self.is_reentrant() {
            self.enqueue(ScreenCommand::Pop);
            return;
        }
        self.with_state(|state, _| state.pop());
    }

    /// Exits every screen above `target`, and `target` itself unless
    /// `exclude` is set. Screens exit top-down, one at a time.
    ///
    /// # Errors
    ///
    /// Returns [`ScreenError::NotFound`] (and queues nothing) if `target`
    /// is not on the active stack. Calls made from inside a screen hook are
    /// queued and always return `Ok`.
    pub fn pop_to(&self, target: &ScreenHandle, exclude: bool) -> Result<(), ScreenError> {
        if self.is_reentrant() {
            self.enqueue(ScreenCommand::PopTo { target: target.clone(), exclude });
            return Ok(());
        }
        self.with_state(|state, _| state.pop_to(target, exclude))
    }

    /// Exits the whole stack, then loads and enters `screen`.
    ///
    /// Ignored if `screen` is already tracked or the system is full.
    pub fn replace(&self, screen: ScreenHandle) {
        if self.is_reentrant() {
            self.enqueue(ScreenCommand::Replace(screen));
            return;
        }
        self.with_state(|state, _| state.replace(screen));
    }

    /// Clears every collection and stops both pumps.
    ///
    /// Does not call `unload` on anything. Deferred tasks already handed
    /// to the scheduler become no-ops when they fire.
    pub fn reset(&self) {
        if self.is_reentrant() {
            warn!(target: "screens", "reset() called from a screen hook, ignored");
            return;
        }
        self.with_state(|state, _| state.reset());
    }

    //--- Tick -------------------------------------------------------------

    /// Advances the system by one simulation tick.
    ///
    /// Commits staged stack changes, updates every active screen, then
    /// steps the exit pump and the enter pump. Must be driven from the
    /// simulation thread.
    pub fn update(&self, dt: f32) {
        if self.is_reentrant() {
            warn!(target: "screens", "update() called from a screen hook, ignored");
            return;
        }
        self.with_state(|state, commands| state.update(dt, commands));
    }

    /// Forwards a back request to the top screen.
    ///
    /// Returns `true` if the application should exit.
    pub fn back(&self) -> bool {
        if self.is_reentrant() {
            warn!(target: "screens", "back() called from a screen hook, ignored");
            return false;
        }
        self.with_state(|state, commands| state.back(commands))
    }

    //--- Queries ----------------------------------------------------------

    /// The screen currently in control, if any.
    pub fn top(&self) -> Option<ScreenHandle> {
        self.read(|state| state.top().cloned())
    }

    /// Number of screens on the active stack.
    pub fn active_screen_count(&self) -> usize {
        self.read(ScreenState::depth)
    }

    /// Whether any load, entrance or exit is still outstanding.
    pub fn is_pending(&self) -> bool {
        self.read(ScreenState::is_pending)
    }

    /// Whether `screen` is tracked by any collection.
    pub fn contains(&self, screen: &ScreenHandle) -> bool {
        self.read(|state| state.is_tracked(screen))
    }

    /// Maximum number of admitted screens.
    pub fn capacity(&self) -> usize {
        self.read(ScreenState::capacity)
    }

    /// Copies every collection's membership.
    pub fn snapshot(&self) -> ScreenSnapshot {
        self.read(ScreenState::snapshot)
    }

    //--- Deferred Task Execution ------------------------------------------

    /// Runs a deferred task on the render thread.
    ///
    /// The screen's own hook runs without the manager lock so a slow load
    /// never stalls the simulation thread.
    pub(crate) fn run_task(&self, id: TaskId, kind: TaskKind) {
        if self.is_reentrant() {
            error!(target: "screens::task", "Deferred {} run from a screen hook, dropped", kind);
            return;
        }

        let Some(screen) = self.with_state(|state, _| state.begin_task(id)) else {
            return;
        };

        let result = screen.with_screen(|s| match kind {
            TaskKind::Load => s.load(),
            TaskKind::Unload => s.unload(),
        });

        if let Err(e) = result {
            error!(target: "screens::task", "{:?} {} failed: {}", screen, kind, e);
        }

        self.with_state(|state, _| state.finish_task(id));
    }

    //--- Internal Helpers -------------------------------------------------

    fn key(&self) -> usize {
        Arc::as_ptr(&self.shared) as usize
    }

    fn is_reentrant(&self) -> bool {
        LockScope::is_held(self.key())
    }

    fn enqueue(&self, command: ScreenCommand) {
        debug!(target: "screens", "Queued {:?} from inside a screen hook", command);
        if self.shared.commands_tx.send(command).is_err() {
            warn!(target: "screens", "Command queue disconnected, request dropped");
        }
    }

    fn read<R>(&self, f: impl FnOnce(&ScreenState) -> R) -> R
    where
        R: Default,
    {
        if self.is_reentrant() {
            warn!(target: "screens", "Screen system queried from a screen hook; use ScreenContext");
            return R::default();
        }
        let state = self.shared.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut ScreenState, &Sender<ScreenCommand>) -> R) -> R {
        let shared = &self.shared;
        let mut state = shared.state.lock().unwrap_or_else(PoisonError::into_inner);
        let _scope = LockScope::enter(self.key());

        let result = f(&mut state, &shared.commands_tx);

        // Requests from hooks apply in issue order; applying one may run
        // more hooks, which may queue more requests.
        while let Ok(command) = shared.commands_rx.try_recv() {
            Self::apply(&mut state, command, &shared.commands_tx);
        }

        let system = Arc::downgrade(shared);
        state.drain_requests(|id, kind| {
            shared
                .scheduler
                .request_on_context_ready(DeferredTask::new(id, kind, system.clone()));
        });

        result
    }

    fn apply(state: &mut ScreenState, command: ScreenCommand, commands: &Sender<ScreenCommand>) {
        match command {
            ScreenCommand::Push(screen) => state.push(screen, commands),
            ScreenCommand::Pop => state.pop(),
            ScreenCommand::PopTo { target, exclude } => {
                if let Err(e) = state.pop_to(&target, exclude) {
                    warn!(target: "screens", "Queued pop_to failed: {}", e);
                }
            }
            ScreenCommand::Replace(screen) => state.replace(screen),
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::screen::test_support::{Harness, Hook, Journal, DT};
    use crate::core::screen::{ResourceError, Screen, ScreenContext};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::thread;
    use std::time::{Duration, Instant};

    fn ids(screens: &[&ScreenHandle]) -> Vec<ScreenId> {
        screens.iter().map(|s| s.id()).collect()
    }

    //=====================================================================
    // Lifecycle Scenarios
    //=====================================================================

    #[test]
    fn push_onto_empty_stack() {
        let h = Harness::new(12);
        let a = h.journal.screen("A");

        h.system.push(a.clone());
        h.settle();

        assert_eq!(h.system.snapshot().stack, ids(&[&a]));
        assert_eq!(
            h.journal.lifecycle("A"),
            vec![Hook::Load, Hook::StartEnter, Hook::EnterUpdate, Hook::Resume]
        );
        assert_eq!(h.journal.count("A", Hook::Pause), 0);
    }

    #[test]
    fn push_pauses_previous_top_before_load() {
        let h = Harness::new(12);
        let (a, b) = (h.journal.screen("A"), h.journal.screen("B"));
        h.settle_push(&a);
        h.journal.clear();

        h.system.push(b.clone());
        assert_eq!(h.journal.count("A", Hook::Pause), 1, "pause is immediate");

        h.settle();

        assert!(h.journal.position("A", Hook::Pause) < h.journal.position("B", Hook::Load));
        assert_eq!(h.system.snapshot().stack, ids(&[&a, &b]));
        assert_eq!(h.journal.count("B", Hook::Resume), 1);
        assert_eq!(h.journal.count("A", Hook::Resume), 0);
    }

    #[test]
    fn pop_exits_top_and_resumes_new_top_once() {
        let h = Harness::new(12);
        let a = h.journal.screen("A");
        let b = h.journal.animated("B", 0, 2);
        h.settle_push(&a);
        h.settle_push(&b);
        h.journal.clear();

        h.system.pop();
        h.tick();

        // B is still animating out; A must not regain control yet
        assert_eq!(h.journal.lifecycle("B"), vec![Hook::Resume, Hook::StartExit, Hook::ExitUpdate]);
        assert_eq!(h.journal.count("A", Hook::Resume), 0);

        h.settle();

        assert_eq!(h.system.snapshot().stack, ids(&[&a]));
        assert_eq!(h.journal.count("A", Hook::Resume), 1);
        assert_eq!(h.journal.count("B", Hook::Unload), 1);
        assert_eq!(h.journal.count("B", Hook::ExitUpdate), 3);
    }

    #[test]
    fn pop_to_exclusive_exits_topmost_first_and_leaves_target_alone() {
        let h = Harness::new(12);
        let a = h.journal.screen("A");
        let b = h.journal.screen("B");
        let c = h.journal.animated("C", 0, 1);
        h.settle_push(&a);
        h.settle_push(&b);
        h.settle_push(&c);
        h.journal.clear();

        assert!(h.system.pop_to(&a, true).is_ok());
        assert_eq!(h.system.snapshot().pending_pop, ids(&[&c, &b]));

        h.tick();

        // B waits behind C and keeps receiving plain updates
        assert_eq!(h.journal.count("B", Hook::Update), 1);
        assert_eq!(h.journal.count("B", Hook::StartExit), 0);
        assert!(h.journal.lifecycle("A").is_empty());

        h.settle();

        assert!(h.journal.position("C", Hook::StartExit) < h.journal.position("B", Hook::StartExit));
        assert_eq!(h.system.snapshot().stack, ids(&[&a]));
        assert_eq!(h.journal.count("A", Hook::Pause), 0);
        assert_eq!(h.journal.lifecycle("A"), vec![Hook::Resume], "resumed once pops drain");
    }

    #[test]
    fn pop_to_inclusive_removes_target() {
        let h = Harness::new(12);
        let (a, b, c) = (h.journal.screen("A"), h.journal.screen("B"), h.journal.screen("C"));
        h.settle_push(&a);
        h.settle_push(&b);
        h.settle_push(&c);

        assert!(h.system.pop_to(&b, false).is_ok());
        h.settle();

        assert_eq!(h.system.snapshot().stack, ids(&[&a]));
        assert_eq!(h.journal.count("B", Hook::Unload), 1);
        assert_eq!(h.journal.count("C", Hook::Unload), 1);
    }

    #[test]
    fn replace_loads_after_unload_is_submitted() {
        let h = Harness::new(12);
        let (a, d) = (h.journal.screen("A"), h.journal.screen("D"));
        h.settle_push(&a);

        h.system.replace(d.clone());

        let snapshot = h.system.snapshot();
        assert_eq!(snapshot.pending_pop, ids(&[&a]));
        assert_eq!(snapshot.pending_load, ids(&[&d]));
        assert_eq!(h.runner.pending(), 0, "load waits for the exit pump");

        h.settle();

        assert!(h.journal.position("A", Hook::Unload) < h.journal.position("D", Hook::Load));
        assert_eq!(h.system.snapshot().stack, ids(&[&d]));
        assert_eq!(h.journal.count("D", Hook::Resume), 1);
    }

    #[test]
    fn replace_on_empty_stack_loads_immediately() {
        let h = Harness::new(12);
        let d = h.journal.screen("D");

        h.system.replace(d.clone());

        assert_eq!(h.runner.pending(), 1);
        h.settle();
        assert_eq!(h.system.top(), Some(d));
    }

    #[test]
    fn round_trip_restores_previous_top() {
        let h = Harness::new(12);
        let (a, b) = (h.journal.screen("A"), h.journal.screen("B"));
        h.settle_push(&a);
        let before = h.system.snapshot();
        h.journal.clear();

        h.settle_push(&b);
        h.system.pop();
        h.settle();

        assert_eq!(h.system.snapshot(), before);
        assert_eq!(h.journal.count("A", Hook::Resume), 1);
        assert_eq!(h.journal.count("A", Hook::Pause), 1);
    }

    #[test]
    fn batch_push_pauses_all_but_last() {
        let h = Harness::new(12);
        let (a, b, c) = (h.journal.screen("A"), h.journal.screen("B"), h.journal.screen("C"));

        h.system.push(a.clone());
        h.system.push(b.clone());
        h.system.push(c.clone());
        h.settle();

        assert_eq!(h.system.snapshot().stack, ids(&[&a, &b, &c]));
        assert_eq!(
            h.journal.lifecycle("A"),
            vec![Hook::Load, Hook::StartEnter, Hook::EnterUpdate, Hook::Pause]
        );
        assert_eq!(h.journal.count("B", Hook::Pause), 1);
        assert_eq!(h.journal.count("B", Hook::Resume), 0);
        assert_eq!(h.journal.count("C", Hook::Resume), 1);
        assert_eq!(h.journal.count("C", Hook::Pause), 0);
    }

    #[test]
    fn animated_entrance_joins_stack_on_following_commit() {
        let h = Harness::new(12);
        let a = h.journal.animated("A", 2, 0);

        h.system.push(a.clone());
        h.render();
        h.tick(); // start_enter + enter_update(0)
        h.tick();
        h.tick(); // animation done, staged
        assert!(h.system.top().is_none());
        assert!(h.system.is_pending());

        h.tick(); // commit

        assert_eq!(h.system.top(), Some(a));
        assert_eq!(h.journal.count("A", Hook::EnterUpdate), 3);
        assert_eq!(h.journal.count("A", Hook::Resume), 1);
    }

    //=====================================================================
    // Pump Exclusivity
    //=====================================================================

    #[test]
    fn enter_pump_is_frozen_while_popping() {
        let h = Harness::new(12);
        let a = h.journal.animated("A", 0, 2);
        let b = h.journal.animated("B", 3, 0);
        h.settle_push(&a);

        h.system.push(b.clone());
        h.frame(); // B loaded, entrance started
        h.journal.clear();

        h.system.pop();
        while !h.system.snapshot().pending_pop.is_empty() {
            h.tick();
        }
        h.settle();

        let last_exit = h
            .journal
            .all()
            .iter()
            .rposition(|(l, hook)| *l == "A" && *hook == Hook::ExitUpdate);
        let first_enter = h.journal.position("B", Hook::EnterUpdate);
        assert!(last_exit < first_enter, "enter resumed only after the exit finished");
        assert_eq!(h.system.top(), Some(b));
    }

    #[test]
    fn push_during_pop_defers_load_until_exit_drains() {
        let h = Harness::new(12);
        let (a, b, c) = (h.journal.screen("A"), h.journal.animated("B", 0, 2), h.journal.screen("C"));
        h.settle_push(&a);
        h.settle_push(&b);
        h.journal.clear();

        h.system.pop();
        h.system.push(c.clone());

        assert_eq!(h.runner.pending(), 0);
        assert_eq!(h.journal.count("A", Hook::Pause), 1);

        h.settle();

        assert!(h.journal.position("B", Hook::Unload) < h.journal.position("C", Hook::Load));
        assert_eq!(h.system.snapshot().stack, ids(&[&a, &c]));
        assert_eq!(h.journal.count("A", Hook::Resume), 0);
        assert_eq!(h.journal.count("C", Hook::Resume), 1);
    }

    //=====================================================================
    // Guards and Misuse
    //=====================================================================

    #[test]
    fn duplicate_push_is_ignored() {
        let h = Harness::new(12);
        let a = h.journal.screen("A");

        h.system.push(a.clone());
        h.system.push(a.clone());

        assert_eq!(h.system.snapshot().pending_load, ids(&[&a]));
        assert_eq!(h.runner.pending(), 1);
    }

    #[test]
    fn push_of_stacked_screen_is_ignored() {
        let h = Harness::new(12);
        let a = h.journal.screen("A");
        h.settle_push(&a);
        h.journal.clear();

        h.system.push(a.clone());
        h.system.replace(a.clone());

        assert!(!h.system.is_pending());
        assert!(h.journal.all().is_empty());
    }

    #[test]
    fn capacity_bounds_admitted_screens() {
        let h = Harness::new(3);
        let screens: Vec<_> = ["A", "B", "C", "D", "E"].iter().map(|l| h.journal.screen(l)).collect();

        for screen in &screens {
            h.system.push(screen.clone());
            assert!(h.system.snapshot().admitted() <= 3);
        }
        h.settle();

        assert_eq!(h.system.active_screen_count(), 3);
        assert_eq!(h.journal.count("D", Hook::Load), 0);
        assert_eq!(h.journal.count("E", Hook::Load), 0);
        assert!(!h.system.contains(&screens[4]));
    }

    #[test]
    fn pop_on_empty_stack_is_noop() {
        let h = Harness::new(12);

        h.system.pop();

        assert!(!h.system.is_pending());
        assert_eq!(h.system.snapshot(), ScreenSnapshot::default());
    }

    #[test]
    fn pop_to_missing_target_reports_not_found() {
        let h = Harness::new(12);
        let (a, stranger) = (h.journal.screen("A"), h.journal.screen("X"));
        h.settle_push(&a);

        let result = h.system.pop_to(&stranger, false);

        assert_eq!(result, Err(ScreenError::NotFound(stranger.id())));
        assert!(!h.system.is_pending());
    }

    #[test]
    fn pop_to_leaving_target_reports_not_found() {
        let h = Harness::new(12);
        let (a, b) = (h.journal.screen("A"), h.journal.screen("B"));
        h.settle_push(&a);
        h.settle_push(&b);

        h.system.pop();

        assert!(matches!(h.system.pop_to(&b, true), Err(ScreenError::NotFound(_))));
        assert_eq!(h.system.snapshot().pending_pop, ids(&[&b]));
    }

    #[test]
    fn queued_pop_is_hidden_from_queries() {
        let h = Harness::new(12);
        let (a, b) = (h.journal.screen("A"), h.journal.screen("B"));
        h.settle_push(&a);
        h.settle_push(&b);

        h.system.pop();

        assert_eq!(h.system.top(), Some(a.clone()));
        assert_eq!(h.system.active_screen_count(), 1);
        assert!(h.system.snapshot().is_exclusive());

        // A second pop before the commit takes the next screen down
        h.system.pop();
        assert_eq!(h.system.snapshot().pending_pop, ids(&[&b, &a]));
    }

    //=====================================================================
    // Reset and Stale Tasks
    //=====================================================================

    #[test]
    fn reset_turns_queued_tasks_into_noops() {
        let h = Harness::new(12);
        let a = h.journal.screen("A");

        h.system.push(a.clone());
        h.system.reset();

        assert_eq!(h.render(), 1);
        assert_eq!(h.journal.count("A", Hook::Load), 0);
        assert_eq!(h.system.snapshot(), ScreenSnapshot::default());

        // The pool is usable again after a reset
        h.settle_push(&a);
        assert_eq!(h.journal.count("A", Hook::Load), 1);
    }

    struct ResetOnLoad {
        system: Arc<Mutex<Option<ScreenSystem>>>,
        loads: Arc<AtomicBool>,
    }

    impl Screen for ResetOnLoad {
        fn load(&mut self) -> Result<(), ResourceError> {
            self.loads.store(true, Ordering::SeqCst);
            if let Some(system) = self.system.lock().unwrap().as_ref() {
                system.reset();
            }
            Ok(())
        }

        fn update(&mut self, _ctx: &ScreenContext, _dt: f32) {}
    }

    #[test]
    fn reset_while_loading_drops_completion() {
        let h = Harness::new(12);
        let slot = Arc::new(Mutex::new(Some(h.system.clone())));
        let loads = Arc::new(AtomicBool::new(false));
        let screen = ScreenHandle::new(ResetOnLoad { system: slot.clone(), loads: loads.clone() });

        h.system.push(screen.clone());
        h.render();

        assert!(loads.load(Ordering::SeqCst));
        assert!(!h.system.contains(&screen));
        assert_eq!(h.system.snapshot(), ScreenSnapshot::default());

        slot.lock().unwrap().take();
    }

    struct FailingLoad;

    impl Screen for FailingLoad {
        fn load(&mut self) -> Result<(), ResourceError> {
            Err(ResourceError::new("texture atlas missing"))
        }

        fn update(&mut self, _ctx: &ScreenContext, _dt: f32) {}
    }

    #[test]
    fn failed_load_still_advances() {
        let h = Harness::new(12);
        let screen = ScreenHandle::new(FailingLoad);

        h.settle_push(&screen);

        assert_eq!(h.system.active_screen_count(), 1);
    }

    //=====================================================================
    // Unload Backpressure
    //=====================================================================

    #[derive(Clone, Default)]
    struct HeldScheduler {
        tasks: Arc<Mutex<Vec<DeferredTask>>>,
    }

    impl HeldScheduler {
        fn run(&self, kind: TaskKind) {
            let ready: Vec<_> = {
                let mut tasks = self.tasks.lock().unwrap();
                let (ready, held): (Vec<_>, Vec<_>) =
                    tasks.drain(..).partition(|t| t.kind() == kind);
                *tasks = held;
                ready
            };
            ready.into_iter().for_each(DeferredTask::run);
        }
    }

    impl RenderScheduler for HeldScheduler {
        fn request_on_context_ready(&self, task: DeferredTask) {
            self.tasks.lock().unwrap().push(task);
        }
    }

    #[test]
    fn exit_waits_for_room_in_unload_queue() {
        let scheduler = HeldScheduler::default();
        let system = ScreenSystem::new(1, scheduler.clone());
        let journal = Journal::new();
        let (a, b) = (journal.screen("A"), journal.screen("B"));

        system.push(a.clone());
        scheduler.run(TaskKind::Load);
        system.update(DT);
        system.update(DT);
        system.pop();
        system.update(DT);
        assert_eq!(system.snapshot().pending_unload, vec![a.id()]);

        system.push(b.clone());
        scheduler.run(TaskKind::Load);
        system.update(DT);
        system.update(DT);
        assert_eq!(system.top(), Some(b.clone()));

        system.pop();
        system.update(DT);
        system.update(DT);
        assert_eq!(system.snapshot().pending_pop, vec![b.id()], "held behind A's unload");
        assert_eq!(journal.count("B", Hook::ExitUpdate), 1);

        scheduler.run(TaskKind::Unload);
        system.update(DT);

        assert_eq!(system.snapshot().pending_unload, vec![b.id()]);
        assert_eq!(journal.count("B", Hook::ExitUpdate), 1);
    }

    //=====================================================================
    // Requests From Screen Hooks
    //=====================================================================

    #[test]
    fn context_requests_apply_after_the_step() {
        let h = Harness::new(12);
        let b = h.journal.screen("B");
        let target = b.clone();
        let mut sent = false;
        let a = h
            .journal
            .recording("A", 0, 0)
            .on_update(move |ctx| {
                if !sent {
                    ctx.push(target.clone());
                    sent = true;
                }
            })
            .into_handle();

        h.system.push(a.clone());
        h.frame(); // A loaded and entered
        h.frame(); // A committed, then updated once

        assert_eq!(h.system.snapshot().pending_load, ids(&[&b]));
        assert_eq!(h.journal.count("A", Hook::Pause), 1);

        h.settle();
        assert_eq!(h.system.top(), Some(b));
    }

    #[test]
    fn public_call_from_hook_does_not_deadlock() {
        let h = Harness::new(12);
        let b = h.journal.screen("B");
        let system = h.system.clone();
        let target = b.clone();
        let mut sent = false;
        let a = h
            .journal
            .recording("A", 0, 0)
            .on_update(move |ctx| {
                if !sent {
                    assert_eq!(system.active_screen_count(), 0, "queries are unavailable here");
                    assert_eq!(ctx.depth(), 1);
                    system.push(target.clone());
                    sent = true;
                }
            })
            .into_handle();

        h.system.push(a.clone());
        h.settle();

        assert_eq!(h.system.top(), Some(b));
        assert_eq!(h.journal.count("A", Hook::Pause), 1);
        h.system.reset();
    }

    #[test]
    fn back_is_forwarded_to_top() {
        let h = Harness::new(12);
        let a = h.journal.recording("A", 0, 0).exits_on_back().into_handle();
        let b = h.journal.screen("B");

        assert!(!h.system.back(), "empty stack never exits");

        h.settle_push(&a);
        assert!(h.system.back());

        h.settle_push(&b);
        assert!(!h.system.back());
        assert_eq!(h.journal.count("B", Hook::Back), 1);
    }

    //=====================================================================
    // Invariants Under Arbitrary Sequences
    //=====================================================================

    #[test]
    fn membership_stays_exclusive_and_bounded() {
        const N: usize = 4;
        let h = Harness::new(N);
        let screens: Vec<_> = (0..8).map(|i| h.journal.animated("S", i % 3, (i + 1) % 3)).collect();
        let mut seed: u32 = 0x2545_f491;

        for _ in 0..400 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            let pick = &screens[(seed >> 8) as usize % screens.len()];

            match seed % 7 {
                0 | 1 => h.system.push(pick.clone()),
                2 => h.system.pop(),
                3 => {
                    let _ = h.system.pop_to(pick, seed & 1 == 0);
                }
                4 => h.system.replace(pick.clone()),
                5 => {
                    h.render();
                }
                _ => h.tick(),
            }

            let snapshot = h.system.snapshot();
            assert!(snapshot.is_exclusive(), "{:?}", snapshot);
            assert!(snapshot.admitted() <= N, "{:?}", snapshot);
        }

        h.settle();
        assert!(h.system.snapshot().is_exclusive());
    }

    //=====================================================================
    // Threads
    //=====================================================================

    struct ThreadProbe {
        loaded_on: Arc<Mutex<Option<thread::ThreadId>>>,
    }

    impl Screen for ThreadProbe {
        fn load(&mut self) -> Result<(), ResourceError> {
            *self.loaded_on.lock().unwrap() = Some(thread::current().id());
            Ok(())
        }

        fn update(&mut self, _ctx: &ScreenContext, _dt: f32) {}
    }

    #[test]
    fn loads_run_on_render_thread() {
        let (scheduler, runner) = crate::core::render_context::context_task_channel();
        let system = ScreenSystem::new(12, scheduler);
        let stop = Arc::new(AtomicBool::new(false));

        let render_stop = stop.clone();
        let render = thread::spawn(move || {
            while !render_stop.load(Ordering::SeqCst) {
                runner.run_pending();
                thread::sleep(Duration::from_millis(1));
            }
            thread::current().id()
        });

        let loaded_on = Arc::new(Mutex::new(None));
        let probe = ScreenHandle::new(ThreadProbe { loaded_on: loaded_on.clone() });
        system.push(probe.clone());

        let deadline = Instant::now() + Duration::from_secs(5);
        while system.top().as_ref() != Some(&probe) || system.is_pending() {
            assert!(Instant::now() < deadline, "screen never settled");
            system.update(DT);
            thread::sleep(Duration::from_millis(1));
        }

        stop.store(true, Ordering::SeqCst);
        let render_id = render.join().unwrap();

        assert_eq!(*loaded_on.lock().unwrap(), Some(render_id));
        assert_ne!(render_id, thread::current().id());
    }
}
