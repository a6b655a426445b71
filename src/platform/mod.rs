//=========================================================================
// Platform Subsystem
//
// Runs the Winit event loop on the render thread and drains deferred
// screen work while the graphics context is valid.
//
// Architecture:
// ```text
//  Render Thread (main):                 Simulation Thread:
//  ┌──────────────────────────────┐     ┌──────────────────────┐
//  │  Winit Event Loop            │     │  CoreSystems         │
//  │   ├─ resumed: create window  │     │   └─ ScreenSystem    │
//  │   ├─ KeyboardInput           │     │        update(dt)    │
//  │   │    └─ InputProcessor ────┼────►│  PlatformEvent::Back │
//  │   └─ RedrawRequested         │     │                      │
//  │        ├─ ContextTaskRunner ◄┼─────┼─ deferred load/unload│
//  │        │    run_pending()    │     │                      │
//  │        └─ poll CoreRequest  ◄┼─────┼─ CoreRequest::Exit   │
//  └──────────────────────────────┘     └──────────────────────┘
// ```
//
// Frame Boundary: RedrawRequested
//   → Deferred tasks run only once a window exists (context valid)
//   → Core requests are polled after the tasks
//   → Next frame is requested
//
// Main thread requirement: Winit mandates the main thread on macOS/iOS,
// so this runs on the thread that called `Engine::run()`.
//
//=========================================================================

//=== Submodules ==========================================================

mod input_processor;

//=== External Crates =====================================================

use crossbeam_channel::{Receiver, Sender};
use log::*;
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowAttributes},
};

//=== Internal Imports ====================================================

use crate::core::platform_bridge::{CoreRequest, PlatformError, PlatformEvent};
use crate::core::render_context::ContextTaskRunner;
use input_processor::InputProcessor;

//=== Platform ============================================================

/// Window owner and render-thread task executor.
///
/// # Lifecycle
///
/// 1. **Construction**: `Platform::new(...)` wires the channels
/// 2. **Execution**: `platform.run()` blocks in the event loop
/// 3. **Frames**: every `RedrawRequested` drains deferred screen tasks
/// 4. **Shutdown**: window close or `CoreRequest::Exit` leaves the loop,
///    core is notified with `WindowClosed`
///
/// Not Send/Sync in practice: the window must stay on the main thread.
pub(crate) struct Platform {
    /// OS window handle (None until `resumed()` called).
    window: Option<Window>,

    /// Window title.
    title: String,

    /// Channel to the simulation thread.
    event_sender: Sender<PlatformEvent>,

    /// Requests from the simulation thread, polled once per frame.
    core_requests: Receiver<CoreRequest>,

    /// Deferred screen tasks, run while the context is valid.
    runner: ContextTaskRunner,

    input_processor: InputProcessor,
}

impl Platform {
    //--- Construction -----------------------------------------------------

    /// Does not create the window yet; that happens lazily in `resumed()`.
    pub(crate) fn new(
        title: impl Into<String>,
        event_sender: Sender<PlatformEvent>,
        core_requests: Receiver<CoreRequest>,
        runner: ContextTaskRunner,
    ) -> Self {
        info!(target: "platform", "Platform subsystem initialized");
        Self {
            window: None,
            title: title.into(),
            event_sender,
            core_requests,
            runner,
            input_processor: InputProcessor::new(),
        }
    }

    //--- Execution --------------------------------------------------------

    /// Runs the event loop until the window closes or core requests exit.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] if the event loop cannot be created or
    /// fails while running.
    pub(crate) fn run(mut self) -> Result<(), PlatformError> {
        debug!(target: "platform", "Starting Winit event loop");

        let event_loop =
            EventLoop::new().map_err(|e| PlatformError::EventLoopCreation(e.to_string()))?;

        let result = event_loop
            .run_app(&mut self)
            .map_err(|e| PlatformError::EventLoopExecution(e.to_string()));

        // Core may still be ticking if the loop ended without a close event
        self.notify_core(PlatformEvent::WindowClosed);
        result
    }

    //--- Frame Work -------------------------------------------------------

    /// Runs deferred tasks if the graphics context exists. Returns how many ran.
    fn run_context_tasks(&self) -> usize {
        if self.window.is_none() {
            trace!(target: "render", "No context yet, {} task(s) waiting", self.runner.pending());
            return 0;
        }
        self.runner.run_pending()
    }

    /// Drains core requests. Returns `true` if exit was requested.
    fn exit_requested(&self) -> bool {
        let mut exit = false;
        while let Ok(request) = self.core_requests.try_recv() {
            match request {
                CoreRequest::Exit => exit = true,
            }
        }
        exit
    }

    fn notify_core(&self, event: PlatformEvent) {
        if self.event_sender.send(event).is_err() {
            warn!(target: "platform", "Core channel disconnected, dropping {:?}", event);
        }
    }

    //--- Test Accessors ---------------------------------------------------

    #[cfg(test)]
    pub(crate) fn window(&self) -> Option<&Window> {
        self.window.as_ref()
    }
}

//=== Winit Integration ===================================================

impl ApplicationHandler for Platform {
    /// Creates the window (and with it, the context) if it doesn't exist yet.
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            debug!(target: "platform", "Window already exists (mobile resume?)");
            return;
        }

        let attrs = WindowAttributes::default()
            .with_title(self.title.clone())
            .with_inner_size(LogicalSize::new(800, 600));

        match event_loop.create_window(attrs) {
            Ok(window) => {
                info!(
                    target: "platform",
                    "Window created: {}x{} @ {}x DPI",
                    window.inner_size().width,
                    window.inner_size().height,
                    window.scale_factor()
                );
                window.request_redraw();
                self.window = Some(window);
            }
            Err(e) => {
                error!(target: "platform", "Window creation failed: {}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                info!(target: "platform", "Window close requested");
                event_loop.exit();
            }

            WindowEvent::KeyboardInput { event: key_event, .. } => {
                if let Some(event) = self.input_processor.process_key(
                    key_event.physical_key,
                    key_event.state,
                    key_event.repeat,
                ) {
                    trace!(target: "platform", "Key mapped to {:?}", event);
                    self.notify_core(event);
                }
            }

            WindowEvent::RedrawRequested => {
                // Frame boundary: the context is current here
                self.run_context_tasks();

                if self.exit_requested() {
                    info!(target: "platform", "Exit requested by core");
                    event_loop.exit();
                    return;
                }

                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }

            _ => {}
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
