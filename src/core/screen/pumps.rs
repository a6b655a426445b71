//=========================================================================
// Enter / Exit Pumps
//=========================================================================
//
// One-at-a-time animation sequencers.
//
// Each pump tracks whether it is active and which screen it is currently
// driving. The stepping logic lives in `ScreenState` (it needs the
// collections); the pumps only hold the cursor.
//
//   ExitPump:  pending_pop head → resume, start_exit, exit_update(0..)
//              → pending_unload
//   EnterPump: pending_push head → start_enter, enter_update(0..)
//              → staging_add
//
// The exit pump always has priority: the enter pump is frozen while any
// pop is outstanding.
//
//=========================================================================

//=== Internal Dependencies ===============================================

use super::ScreenHandle;

//=== ExitPump ============================================================

#[derive(Debug, Default)]
pub(crate) struct ExitPump {
    active: bool,
    current: Option<ScreenHandle>,

    /// The current screen finished its animation but could not be retired
    /// yet (unload queue full).
    finished: bool,
}

impl ExitPump {
    pub(crate) fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn activate(&mut self) {
        self.active = true;
    }

    pub(crate) fn deactivate(&mut self) {
        self.active = false;
        self.current = None;
        self.finished = false;
    }

    pub(crate) fn current(&self) -> Option<&ScreenHandle> {
        self.current.as_ref()
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.finished
    }

    pub(crate) fn begin(&mut self, screen: ScreenHandle) {
        self.current = Some(screen);
        self.finished = false;
    }

    pub(crate) fn finish(&mut self) {
        self.finished = true;
    }

    pub(crate) fn clear(&mut self) {
        self.current = None;
        self.finished = false;
    }
}

//=== EnterPump ===========================================================

#[derive(Debug, Default)]
pub(crate) struct EnterPump {
    active: bool,
    current: Option<ScreenHandle>,
}

impl EnterPump {
    pub(crate) fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn activate(&mut self) {
        self.active = true;
    }

    pub(crate) fn deactivate(&mut self) {
        self.active = false;
        self.current = None;
    }

    pub(crate) fn current(&self) -> Option<&ScreenHandle> {
        self.current.as_ref()
    }

    pub(crate) fn begin(&mut self, screen: ScreenHandle) {
        self.current = Some(screen);
    }

    pub(crate) fn clear(&mut self) {
        self.current = None;
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
