//=========================================================================
// Test Support
//=========================================================================
//
// Recording screens and a single-threaded harness for lifecycle tests.
//
// Every recording screen appends `(label, Hook)` to one shared journal,
// so tests can assert both per-screen counts and global call order.
// The harness plays both threads by hand: `tick()` is the simulation
// thread, `render()` is the render thread draining deferred tasks.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::sync::{Arc, Mutex, PoisonError};

//=== Internal Dependencies ===============================================

use super::{Screen, ScreenContext, ScreenHandle, ScreenSystem};
use crate::core::render_context::{context_task_channel, ContextTaskRunner};

//=== Hook ================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Hook {
    Load,
    Unload,
    Update,
    StartEnter,
    EnterUpdate,
    StartExit,
    ExitUpdate,
    Pause,
    Resume,
    Back,
}

//=== Journal =============================================================

#[derive(Clone, Default)]
pub(crate) struct Journal {
    calls: Arc<Mutex<Vec<(&'static str, Hook)>>>,
}

impl Journal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn record(&self, label: &'static str, hook: Hook) {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push((label, hook));
    }

    /// Screen whose animations finish on the first call.
    pub(crate) fn screen(&self, label: &'static str) -> ScreenHandle {
        self.animated(label, 0, 0)
    }

    /// Screen whose enter/exit animations run for that many extra calls.
    pub(crate) fn animated(&self, label: &'static str, enter: u32, exit: u32) -> ScreenHandle {
        ScreenHandle::new(self.recording(label, enter, exit))
    }

    pub(crate) fn recording(&self, label: &'static str, enter: u32, exit: u32) -> RecordingScreen {
        RecordingScreen {
            label,
            journal: self.clone(),
            enter_frames: enter,
            exit_frames: exit,
            enter_left: 0,
            exit_left: 0,
            back_exits: false,
            on_update: None,
        }
    }

    pub(crate) fn all(&self) -> Vec<(&'static str, Hook)> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub(crate) fn hooks(&self, label: &str) -> Vec<Hook> {
        self.all()
            .into_iter()
            .filter(|(l, _)| *l == label)
            .map(|(_, hook)| hook)
            .collect()
    }

    /// Hooks other than `Update` (lifecycle only).
    pub(crate) fn lifecycle(&self, label: &str) -> Vec<Hook> {
        self.hooks(label).into_iter().filter(|h| *h != Hook::Update).collect()
    }

    pub(crate) fn count(&self, label: &str, hook: Hook) -> usize {
        self.hooks(label).into_iter().filter(|h| *h == hook).count()
    }

    /// Position of the first `hook` call on `label` in the global order.
    pub(crate) fn position(&self, label: &str, hook: Hook) -> Option<usize> {
        self.all().iter().position(|(l, h)| *l == label && *h == hook)
    }

    pub(crate) fn clear(&self) {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

//=== RecordingScreen =====================================================

type UpdateAction = Box<dyn FnMut(&ScreenContext) + Send>;

pub(crate) struct RecordingScreen {
    label: &'static str,
    journal: Journal,
    enter_frames: u32,
    exit_frames: u32,
    enter_left: u32,
    exit_left: u32,
    back_exits: bool,
    on_update: Option<UpdateAction>,
}

impl RecordingScreen {
    pub(crate) fn exits_on_back(mut self) -> Self {
        self.back_exits = true;
        self
    }

    pub(crate) fn on_update(mut self, action: impl FnMut(&ScreenContext) + Send + 'static) -> Self {
        self.on_update = Some(Box::new(action));
        self
    }

    pub(crate) fn into_handle(self) -> ScreenHandle {
        ScreenHandle::new(self)
    }
}

impl Screen for RecordingScreen {
    fn load(&mut self) -> Result<(), super::ResourceError> {
        self.journal.record(self.label, Hook::Load);
        Ok(())
    }

    fn unload(&mut self) -> Result<(), super::ResourceError> {
        self.journal.record(self.label, Hook::Unload);
        Ok(())
    }

    fn update(&mut self, ctx: &ScreenContext, _dt: f32) {
        self.journal.record(self.label, Hook::Update);
        if let Some(action) = self.on_update.as_mut() {
            action(ctx);
        }
    }

    fn start_enter(&mut self, _ctx: &ScreenContext) {
        self.journal.record(self.label, Hook::StartEnter);
        self.enter_left = self.enter_frames;
    }

    fn enter_update(&mut self, _ctx: &ScreenContext, _dt: f32) -> bool {
        self.journal.record(self.label, Hook::EnterUpdate);
        if self.enter_left == 0 {
            return false;
        }
        self.enter_left -= 1;
        true
    }

    fn start_exit(&mut self, _ctx: &ScreenContext) {
        self.journal.record(self.label, Hook::StartExit);
        self.exit_left = self.exit_frames;
    }

    fn exit_update(&mut self, _ctx: &ScreenContext, _dt: f32) -> bool {
        self.journal.record(self.label, Hook::ExitUpdate);
        if self.exit_left == 0 {
            return false;
        }
        self.exit_left -= 1;
        true
    }

    fn pause(&mut self, _ctx: &ScreenContext) {
        self.journal.record(self.label, Hook::Pause);
    }

    fn resume(&mut self, _ctx: &ScreenContext) {
        self.journal.record(self.label, Hook::Resume);
    }

    fn back(&mut self, _ctx: &ScreenContext) -> bool {
        self.journal.record(self.label, Hook::Back);
        self.back_exits
    }
}

//=== Blank Screen ========================================================

struct Blank;

impl Screen for Blank {
    fn update(&mut self, _ctx: &ScreenContext, _dt: f32) {}
}

pub(crate) fn blank() -> ScreenHandle {
    ScreenHandle::new(Blank)
}

//=== Harness =============================================================

pub(crate) const DT: f32 = 1.0 / 60.0;

pub(crate) struct Harness {
    pub(crate) system: ScreenSystem,
    pub(crate) runner: ContextTaskRunner,
    pub(crate) journal: Journal,
}

impl Harness {
    pub(crate) fn new(capacity: usize) -> Self {
        let (scheduler, runner) = context_task_channel();
        Self {
            system: ScreenSystem::new(capacity, scheduler),
            runner,
            journal: Journal::new(),
        }
    }

    /// One simulation tick.
    pub(crate) fn tick(&self) {
        self.system.update(DT);
    }

    /// One render-thread pass over the deferred queue.
    pub(crate) fn render(&self) -> usize {
        self.runner.run_pending()
    }

    /// Render pass followed by a tick, like one frame of the engine.
    pub(crate) fn frame(&self) {
        self.render();
        self.tick();
    }

    /// Runs frames until nothing is pending anywhere. Panics if it never settles.
    pub(crate) fn settle(&self) {
        for _ in 0..100 {
            self.frame();
            let snapshot = self.system.snapshot();
            if !self.system.is_pending()
                && self.runner.pending() == 0
                && snapshot.pending_unload.is_empty()
            {
                return;
            }
        }
        panic!("screen system did not settle: {:?}", self.system.snapshot());
    }

    /// Pushes `screen` and runs until it is settled on top.
    pub(crate) fn settle_push(&self, screen: &ScreenHandle) {
        self.system.push(screen.clone());
        self.settle();
        assert_eq!(self.system.top().as_ref(), Some(screen));
    }
}
