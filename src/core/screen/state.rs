//=========================================================================
// Screen State
//=========================================================================
//
// Authoritative collections and the per-tick state machine.
//
// Every method here runs with the manager lock held: `&mut ScreenState`
// is only reachable through the guard, so helpers never re-lock.
//
// Tick order:
//   1. commit    staging_remove → stack, staging_add → stack
//   2. update    every screen on the stack
//   3. exit      advance pending_pop head, retire to pending_unload
//   4. enter     advance pending_push head (frozen while pops remain)
//
// Membership: a screen lives in at most one of stack, pending_load,
// pending_push (incl. staging_add), pending_pop, pending_unload. Screens
// named in staging_remove are still physically in `stack` until the next
// commit but are already hidden from every query.
//
//=========================================================================

//=== External Dependencies ===============================================

use crossbeam_channel::Sender;
use log::{debug, error, trace, warn};

//=== Internal Dependencies ===============================================

use super::command::{ScreenCommand, ScreenContext};
use super::deferred::TaskKind;
use super::error::ScreenError;
use super::pumps::{EnterPump, ExitPump};
use super::screen_list::ScreenList;
use super::screen_system::ScreenSnapshot;
use super::task_pool::{TaskId, TaskPool};
use super::{Screen, ScreenHandle};

type Commands = Sender<ScreenCommand>;

//=== Staged ==============================================================

/// A screen that finished entering and waits for the next commit.
struct Staged {
    screen: ScreenHandle,

    /// Already paused by the enter pump (another entrant followed it).
    paused: bool,
}

//=== ScreenState =========================================================

pub(crate) struct ScreenState {
    capacity: usize,

    stack: ScreenList,
    pending_load: ScreenList,
    pending_push: ScreenList,
    pending_pop: ScreenList,
    pending_unload: ScreenList,

    staging_add: Vec<Staged>,
    staging_remove: ScreenList,

    enter: EnterPump,
    exit: ExitPump,

    tasks: TaskPool,

    /// Tasks allocated during the current lock scope, awaiting submission.
    requests: Vec<TaskId>,
}

impl ScreenState {
    //--- Construction -----------------------------------------------------

    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            stack: ScreenList::new(capacity),
            pending_load: ScreenList::new(capacity),
            pending_push: ScreenList::new(capacity),
            pending_pop: ScreenList::new(capacity),
            pending_unload: ScreenList::new(capacity),
            staging_add: Vec::with_capacity(capacity),
            staging_remove: ScreenList::new(capacity),
            enter: EnterPump::default(),
            exit: ExitPump::default(),
            tasks: TaskPool::new(capacity * 2),
            requests: Vec::with_capacity(capacity * 2),
        }
    }

    //--- Queries ----------------------------------------------------------

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// The stack as observers see it: screens already leaving are hidden.
    fn active(&self) -> impl DoubleEndedIterator<Item = &ScreenHandle> + '_ {
        let leaving = &self.staging_remove;
        self.stack.iter().filter(move |s| !leaving.contains(*s))
    }

    pub(crate) fn top(&self) -> Option<&ScreenHandle> {
        self.active().next_back()
    }

    pub(crate) fn depth(&self) -> usize {
        self.stack.len().saturating_sub(self.staging_remove.len())
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.entrants() > 0 || !self.pending_pop.is_empty() || !self.staging_remove.is_empty()
    }

    pub(crate) fn is_tracked(&self, screen: &ScreenHandle) -> bool {
        self.stack.contains(screen)
            || self.pending_load.contains(screen)
            || self.pending_push.contains(screen)
            || self.pending_pop.contains(screen)
            || self.pending_unload.contains(screen)
            || self.staging_add.iter().any(|staged| staged.screen == *screen)
    }

    pub(crate) fn snapshot(&self) -> ScreenSnapshot {
        let mut pending_push = self.pending_push.ids();
        pending_push.extend(self.staging_add.iter().map(|staged| staged.screen.id()));

        ScreenSnapshot {
            stack: self.active().map(ScreenHandle::id).collect(),
            pending_load: self.pending_load.ids(),
            pending_push,
            pending_pop: self.pending_pop.ids(),
            pending_unload: self.pending_unload.ids(),
        }
    }

    /// Screens admitted but not yet on the stack.
    fn entrants(&self) -> usize {
        self.pending_load.len() + self.pending_push.len() + self.staging_add.len()
    }

    /// Nothing is on its way in or out; the top may hold control.
    fn is_settled(&self) -> bool {
        self.entrants() == 0 && self.pending_pop.is_empty()
    }

    //--- Public Operations ------------------------------------------------

    pub(crate) fn push(&mut self, screen: ScreenHandle, commands: &Commands) {
        if self.is_tracked(&screen) {
            warn!(target: "screens", "{:?} is already tracked, skipping push", screen);
            return;
        }

        if self.depth() + self.entrants() >= self.capacity {
            warn!(
                target: "screens",
                "Screen capacity ({}) reached, skipping push of {:?}",
                self.capacity,
                screen
            );
            return;
        }

        // First entrant of a batch takes control away from the current top
        if self.entrants() == 0 {
            if let Some(top) = self.top() {
                self.pause(top, commands);
            }
        }

        debug!(target: "screens", "Queued {:?} for load", screen);
        self.pending_load.try_push(screen.clone());

        // While pops are running, the exit pump schedules the load once it drains
        if !self.exit.is_active() {
            Self::request_task(&mut self.tasks, &mut self.requests, TaskKind::Load, &screen);
        }
    }

    pub(crate) fn pop(&mut self) {
        let Some(top) = self.top().cloned() else {
            debug!(target: "screens", "Stack is empty, skipping pop");
            return;
        };

        self.begin_exit(top);
    }

    pub(crate) fn pop_to(&mut self, target: &ScreenHandle, exclude: bool) -> Result<(), ScreenError> {
        if !self.active().any(|s| s == target) {
            warn!(target: "screens", "{:?} is not on the stack, skipping pop_to", target);
            return Err(ScreenError::NotFound(target.id()));
        }

        // Top-down, so pending_pop exits the topmost screen first
        while let Some(top) = self.top().cloned() {
            if top == *target {
                if !exclude {
                    self.begin_exit(top);
                }
                break;
            }
            if !self.begin_exit(top) {
                break;
            }
        }

        Ok(())
    }

    pub(crate) fn replace(&mut self, screen: ScreenHandle) {
        if self.is_tracked(&screen) {
            warn!(target: "screens", "{:?} is already tracked, skipping replace", screen);
            return;
        }

        if self.entrants() >= self.capacity {
            warn!(
                target: "screens",
                "Screen capacity ({}) reached, skipping replace with {:?}",
                self.capacity,
                screen
            );
            return;
        }

        while let Some(top) = self.top().cloned() {
            if !self.begin_exit(top) {
                break;
            }
        }

        debug!(target: "screens", "Queued {:?} for load after replace", screen);
        self.pending_load.try_push(screen.clone());

        if !self.exit.is_active() {
            Self::request_task(&mut self.tasks, &mut self.requests, TaskKind::Load, &screen);
        }
    }

    pub(crate) fn back(&self, commands: &Commands) -> bool {
        let Some(top) = self.top() else {
            debug!(target: "screens", "Back requested with an empty stack");
            return false;
        };

        let exit = self.call(top, commands, |s, ctx| s.back(ctx));
        debug!(target: "screens", "{:?} handled back (exit application: {})", top, exit);
        exit
    }

    pub(crate) fn reset(&mut self) {
        debug!(target: "screens", "Resetting screen system");

        self.stack.clear();
        self.pending_load.clear();
        self.pending_push.clear();
        self.pending_pop.clear();
        self.pending_unload.clear();
        self.staging_add.clear();
        self.staging_remove.clear();
        self.enter.deactivate();
        self.exit.deactivate();
        self.tasks.reset();
        self.requests.clear();
    }

    //--- Tick -------------------------------------------------------------

    pub(crate) fn update(&mut self, dt: f32, commands: &Commands) {
        self.commit(commands);

        for screen in self.stack.iter() {
            self.call(screen, commands, |s, ctx| s.update(ctx, dt));
        }

        self.step_exit(dt, commands);
        self.step_enter(dt, commands);
    }

    //--- Commit Protocol --------------------------------------------------

    fn commit(&mut self, commands: &Commands) {
        if !self.staging_remove.is_empty() {
            for screen in self.staging_remove.iter() {
                self.stack.remove(screen);
            }
            self.staging_remove.clear();

            self.resume_top_if_settled(commands);
        }

        while !self.staging_add.is_empty() {
            let staged = self.staging_add.remove(0);

            if !self.stack.try_push(staged.screen.clone()) {
                error!(target: "screens", "Stack full, dropping entered {:?}", staged.screen);
                continue;
            }
            debug!(target: "screens", "{:?} joined the stack", staged.screen);

            if self.is_settled() {
                self.resume(&staged.screen, commands);
            } else if !staged.paused {
                self.pause(&staged.screen, commands);
            }
        }
    }

    fn resume_top_if_settled(&self, commands: &Commands) {
        if !self.is_settled() {
            return;
        }
        if let Some(top) = self.top() {
            self.resume(top, commands);
        }
    }

    //--- Exit Pump --------------------------------------------------------

    fn step_exit(&mut self, dt: f32, commands: &Commands) {
        if !self.exit.is_active() {
            return;
        }

        // Advance the screen already in flight
        if let Some(current) = self.exit.current().cloned() {
            let done = self.exit.is_finished()
                || !self.call(&current, commands, |s, ctx| s.exit_update(ctx, dt));

            if !done {
                self.update_waiting_pops(&current, dt, commands);
                return;
            }

            self.exit.finish();
            if !self.retire(&current) {
                return;
            }
            self.exit.clear();
        }

        // Start the next ones; instant exits chain within this step
        while let Some(next) = self.pending_pop.first().cloned() {
            trace!(target: "screens::pump", "Exit pump starting {:?}", next);
            self.exit.begin(next.clone());

            self.resume(&next, commands);
            self.call(&next, commands, |s, ctx| s.start_exit(ctx));
            let running = self.call(&next, commands, |s, ctx| s.exit_update(ctx, 0.0));

            if running {
                self.update_waiting_pops(&next, dt, commands);
                return;
            }

            self.exit.finish();
            if !self.retire(&next) {
                return;
            }
            self.exit.clear();
        }

        // Drained: loads held back while popping may proceed now
        debug!(target: "screens::pump", "Exit pump drained");
        self.exit.deactivate();
        self.schedule_held_loads();
        self.resume_top_if_settled(commands);
    }

    /// Screens queued behind the exiting one are not removed yet.
    fn update_waiting_pops(&self, current: &ScreenHandle, dt: f32, commands: &Commands) {
        for screen in self.pending_pop.iter().filter(|s| *s != current) {
            self.call(screen, commands, |s, ctx| s.update(ctx, dt));
        }
    }

    /// Moves a finished screen to pending_unload. Returns `false` if the
    /// unload queue is full; the exit pump retries next tick.
    fn retire(&mut self, screen: &ScreenHandle) -> bool {
        if self.pending_unload.is_full() {
            warn!(target: "screens::pump", "Unload queue full, holding {:?}", screen);
            return false;
        }

        debug!(target: "screens::pump", "{:?} finished exiting", screen);
        self.pending_pop.remove(screen);
        self.pending_unload.try_push(screen.clone());
        Self::request_task(&mut self.tasks, &mut self.requests, TaskKind::Unload, screen);
        true
    }

    fn schedule_held_loads(&mut self) {
        for screen in self.pending_load.iter() {
            if !self.tasks.holds(TaskKind::Load, screen) {
                Self::request_task(&mut self.tasks, &mut self.requests, TaskKind::Load, screen);
            }
        }
    }

    //--- Enter Pump -------------------------------------------------------

    fn step_enter(&mut self, dt: f32, commands: &Commands) {
        if self.exit.is_active() || !self.pending_pop.is_empty() || !self.enter.is_active() {
            return;
        }

        if let Some(current) = self.enter.current().cloned() {
            if self.call(&current, commands, |s, ctx| s.enter_update(ctx, dt)) {
                return;
            }
            self.finish_entrance(&current, commands);
        }

        while let Some(next) = self.pending_push.first().cloned() {
            trace!(target: "screens::pump", "Enter pump starting {:?}", next);
            self.enter.begin(next.clone());

            self.call(&next, commands, |s, ctx| s.start_enter(ctx));
            if self.call(&next, commands, |s, ctx| s.enter_update(ctx, 0.0)) {
                return;
            }
            self.finish_entrance(&next, commands);
        }

        debug!(target: "screens::pump", "Enter pump drained");
        self.enter.deactivate();
    }

    fn finish_entrance(&mut self, screen: &ScreenHandle, commands: &Commands) {
        debug!(target: "screens::pump", "{:?} finished entering", screen);
        self.enter.clear();
        self.pending_push.remove(screen);

        // Not the true top yet if another entrant is queued behind it
        let paused = !self.pending_push.is_empty();
        if paused {
            self.pause(screen, commands);
        }

        self.staging_add.push(Staged { screen: screen.clone(), paused });
    }

    //--- Deferred Tasks ---------------------------------------------------

    fn request_task(
        tasks: &mut TaskPool,
        requests: &mut Vec<TaskId>,
        kind: TaskKind,
        screen: &ScreenHandle,
    ) {
        match tasks.allocate(kind, screen.clone()) {
            Some(id) => {
                trace!(target: "screens::task", "Requested {} of {:?}", kind, screen);
                requests.push(id);
            }
            None => error!(
                target: "screens::task",
                "Task pool exhausted ({}/{} in use), {} of {:?} not scheduled",
                tasks.in_use(),
                tasks.capacity(),
                kind,
                screen
            ),
        }
    }

    /// Hands every task requested in this lock scope to `submit`.
    pub(crate) fn drain_requests(&mut self, mut submit: impl FnMut(TaskId, TaskKind)) {
        for id in self.requests.drain(..) {
            if let Some(entry) = self.tasks.get(id) {
                submit(id, entry.kind);
            }
        }
    }

    /// Validates a task about to run. Stale tasks are released and yield `None`.
    pub(crate) fn begin_task(&mut self, id: TaskId) -> Option<ScreenHandle> {
        let entry = self.tasks.get(id)?.clone();

        let expected = match entry.kind {
            TaskKind::Load => &self.pending_load,
            TaskKind::Unload => &self.pending_unload,
        };

        if expected.contains(&entry.screen) {
            return Some(entry.screen);
        }

        trace!(target: "screens::task", "Stale {} of {:?} dropped", entry.kind, entry.screen);
        self.tasks.release(id);
        None
    }

    /// Releases the task slot and moves its screen to the next phase.
    pub(crate) fn finish_task(&mut self, id: TaskId) {
        let Some(entry) = self.tasks.release(id) else {
            trace!(target: "screens::task", "Task finished after reset, ignored");
            return;
        };

        match entry.kind {
            TaskKind::Load => {
                if !self.pending_load.remove(&entry.screen) {
                    trace!(target: "screens::task", "{:?} left pending load, ignored", entry.screen);
                    return;
                }
                debug!(target: "screens::task", "{:?} loaded", entry.screen);
                if !self.pending_push.try_push(entry.screen.clone()) {
                    error!(target: "screens::task", "Push queue full, dropping {:?}", entry.screen);
                    return;
                }
                self.enter.activate();
            }
            TaskKind::Unload => {
                if self.pending_unload.remove(&entry.screen) {
                    debug!(target: "screens::task", "{:?} unloaded and released", entry.screen);
                } else {
                    trace!(target: "screens::task", "{:?} left pending unload, ignored", entry.screen);
                }
            }
        }
    }

    //--- Internal Helpers -------------------------------------------------

    /// Queues `screen` for exit. Returns `false` if pending_pop is full.
    fn begin_exit(&mut self, screen: ScreenHandle) -> bool {
        if self.pending_pop.is_full() {
            warn!(target: "screens", "Pop queue full, skipping {:?}", screen);
            return false;
        }

        debug!(target: "screens", "Queued {:?} for exit", screen);
        self.pending_pop.try_push(screen.clone());
        self.staging_remove.try_push(screen);
        self.exit.activate();
        true
    }

    fn context<'c>(&self, commands: &'c Commands) -> ScreenContext<'c> {
        ScreenContext::new(commands, self.depth(), self.is_pending())
    }

    fn call<R>(
        &self,
        screen: &ScreenHandle,
        commands: &Commands,
        hook: impl FnOnce(&mut dyn Screen, &ScreenContext) -> R,
    ) -> R {
        let ctx = self.context(commands);
        screen.with_screen(|s| hook(s, &ctx))
    }

    fn pause(&self, screen: &ScreenHandle, commands: &Commands) {
        trace!(target: "screens", "Pausing {:?}", screen);
        self.call(screen, commands, |s, ctx| s.pause(ctx));
    }

    fn resume(&self, screen: &ScreenHandle, commands: &Commands) {
        trace!(target: "screens", "Resuming {:?}", screen);
        self.call(screen, commands, |s, ctx| s.resume(ctx));
    }
}
