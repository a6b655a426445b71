//=========================================================================
// Aetheric Screens Engine
//
// Main entry point wiring the screen system to its two threads.
//
// Architecture:
// ```text
//     EngineBuilder  ──build()──>  Engine  ──run()──>  [Runtime]
//         │                          │
//         ├─ with_tps()              ├─ init(|screens| ...)
//         ├─ with_channel_capacity() └─ run(): spawns simulation thread,
//         ├─ with_max_screens()               runs platform (render thread),
//         └─ with_title()                     blocks until exit
// ```
//
//=========================================================================

//=== External Dependencies ===============================================

use crossbeam_channel::{bounded, unbounded};
use log::{error, info};

//=== Internal Dependencies ===============================================

use crate::core::platform_bridge::PlatformError;
use crate::core::render_context::{context_task_channel, ContextTaskRunner};
use crate::core::screen::{ScreenSystem, DEFAULT_MAX_SCREENS};
use crate::core::CoreSystemsOrchestrator;
use crate::platform::Platform;

//=== EngineBuilder =======================================================

/// Builder for configuring and constructing an [`Engine`].
///
/// # Default Values
///
/// - **TPS**: 60.0 (simulation ticks per second)
/// - **Channel capacity**: 128 platform events
/// - **Max screens**: [`DEFAULT_MAX_SCREENS`]
/// - **Title**: "Aetheric"
///
/// # Examples
///
/// ```no_run
/// use aetheric_screens::prelude::*;
///
/// struct Title;
/// impl Screen for Title {
///     fn update(&mut self, _ctx: &ScreenContext, _dt: f32) {}
///     fn back(&mut self, _ctx: &ScreenContext) -> bool { true }
/// }
///
/// EngineBuilder::new()
///     .with_tps(120.0)
///     .with_max_screens(8)
///     .build()
///     .init(|screens| screens.push(ScreenHandle::new(Title)))
///     .run()
///     .expect("platform failure");
/// ```
pub struct EngineBuilder {
    tps: f64,
    channel_capacity: usize,
    max_screens: usize,
    title: String,
}

impl EngineBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            tps: 60.0,
            channel_capacity: 128,
            max_screens: DEFAULT_MAX_SCREENS,
            title: String::from("Aetheric"),
        }
    }

    /// Sets the target ticks per second for the simulation thread.
    ///
    /// Each tick advances the screen system by `1 / tps` seconds.
    ///
    /// Default: 60.0
    ///
    /// # Panics
    ///
    /// Panics if `tps <= 0.0`.
    pub fn with_tps(mut self, tps: f64) -> Self {
        assert!(tps > 0.0, "TPS must be positive, got {}", tps);
        self.tps = tps;
        self
    }

    /// Sets the channel capacity for platform → core communication.
    ///
    /// Default: 128
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        assert!(capacity > 0, "Channel capacity must be positive");
        self.channel_capacity = capacity;
        self
    }

    /// Sets how many screens may be admitted at once (stack plus entrants).
    ///
    /// # Panics
    ///
    /// Panics if `max_screens == 0`.
    pub fn with_max_screens(mut self, max_screens: usize) -> Self {
        assert!(max_screens > 0, "Max screens must be positive");
        self.max_screens = max_screens;
        self
    }

    /// Sets the window title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Builds the engine instance.
    ///
    /// Creates the screen system and its render-thread task queue. Nothing
    /// runs until [`Engine::run`].
    pub fn build(self) -> Engine {
        info!(
            target: "core",
            "Building engine (TPS: {}, channel: {}, max screens: {})",
            self.tps,
            self.channel_capacity,
            self.max_screens
        );

        let (scheduler, runner) = context_task_channel();
        let screens = ScreenSystem::new(self.max_screens, scheduler);

        Engine {
            orchestrator: CoreSystemsOrchestrator::new(screens),
            runner,
            tps: self.tps,
            channel_capacity: self.channel_capacity,
            title: self.title,
        }
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//=== Engine ==============================================================

/// Screen engine runtime.
///
/// # Architecture
///
/// ```text
/// Engine
///   ├─► CoreSystemsOrchestrator (simulation thread @ TPS)
///   │     └─► ScreenSystem::update(dt)
///   │
///   └─► Platform (main thread = render thread)
///         └─► Window, ContextTaskRunner
///
/// Communication: PlatformEvent (bounded), CoreRequest (unbounded)
/// ```
pub struct Engine {
    orchestrator: CoreSystemsOrchestrator,
    runner: ContextTaskRunner,
    tps: f64,
    channel_capacity: usize,
    title: String,
}

impl Engine {
    //--- Access -----------------------------------------------------------

    /// Handle to the screen system. Clone it to drive screens from
    /// application code on any thread.
    pub fn screens(&self) -> &ScreenSystem {
        self.orchestrator.screens()
    }

    //--- Initialization ---------------------------------------------------

    /// Runs `init_fn` against the screen system before execution, typically
    /// to push the first screen. Its load runs once the window exists.
    pub fn init<F>(self, init_fn: F) -> Self
    where
        F: FnOnce(&ScreenSystem),
    {
        info!(target: "core", "Initializing screens");
        init_fn(self.screens());
        self
    }

    //--- Execution --------------------------------------------------------

    /// Starts the runtime and blocks until the application exits.
    ///
    /// # Lifecycle
    ///
    /// 1. Creates the platform → core and core → platform channels
    /// 2. Spawns the simulation thread at the configured TPS
    /// 3. Runs the platform event loop on this thread (blocks here)
    /// 4. On exit: platform sends `WindowClosed`, simulation thread stops
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] if the event loop cannot be created or
    /// fails. The simulation thread is still joined first.
    pub fn run(self) -> Result<(), PlatformError> {
        info!(target: "core", "Starting engine runtime (TPS: {})", self.tps);

        //--- 1. Create communication channels -----------------------------
        let (event_tx, event_rx) = bounded(self.channel_capacity);
        let (request_tx, request_rx) = unbounded();

        //--- 2. Spawn the simulation thread -------------------------------
        let core_handle = self.orchestrator.spawn_core_thread(event_rx, request_tx, self.tps);

        //--- 3. Launch the platform on this thread ------------------------
        let platform = Platform::new(self.title, event_tx, request_rx, self.runner);
        let result = platform.run();

        if let Err(e) = &result {
            error!(target: "platform", "Platform error: {}", e);
        }

        //--- 4. Wait for the simulation thread ----------------------------
        match core_handle.join() {
            Ok(()) => info!(target: "core", "Simulation thread terminated cleanly"),
            Err(e) => error!(target: "core", "Simulation thread panicked: {:?}", e),
        }

        info!(target: "core", "Engine shutdown complete");
        result
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
