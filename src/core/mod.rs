//=========================================================================
// Core Systems Orchestrator
//
// Coordinator for the simulation thread.
//
// Responsibilities:
// - Own the `ScreenSystem` handle used by the simulation loop
// - Receive platform events through the bridge channel
// - Forward back requests to the top screen, request exit when accepted
// - Tick the screen system at a fixed rate (TPS)
//
// Notes:
// The orchestrator runs independently from the platform layer. The only
// shared state is the screen system itself (internally locked) and the
// channels of the platform bridge. Deferred screen work never runs here;
// it is handed to the render thread by the system's scheduler.
//
//=========================================================================

//=== Module Declarations =================================================

pub mod render_context;
pub mod screen;

pub(crate) mod platform_bridge;

//=== External Dependencies ===============================================

use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, warn};

//=== Internal Dependencies ===============================================

use platform_bridge::{CoreRequest, EventCollector, PlatformEvent, TickControl};
use screen::ScreenSystem;

//=== CoreSystemsOrchestrator =============================================

/// Drives the screen system on its own thread at a fixed tick rate.
pub(crate) struct CoreSystemsOrchestrator {
    screens: ScreenSystem,
}

impl CoreSystemsOrchestrator {
    //--- Construction -----------------------------------------------------

    pub(crate) fn new(screens: ScreenSystem) -> Self {
        Self { screens }
    }

    pub(crate) fn screens(&self) -> &ScreenSystem {
        &self.screens
    }

    //--- spawn_core_thread() ---------------------------------------------
    //
    // Each tick:
    //  1. Collects platform events (exit on close/disconnect)
    //  2. Forwards back requests to the top screen
    //  3. Advances the screen system by one fixed step
    //  4. Sleeps to maintain fixed pacing
    //
    pub(crate) fn spawn_core_thread(
        self,
        receiver: Receiver<PlatformEvent>,
        requests: Sender<CoreRequest>,
        tps: f64,
    ) -> thread::JoinHandle<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / tps);
        let dt = frame_duration.as_secs_f32();

        thread::spawn(move || {
            let mut collector = EventCollector::new(receiver);
            info!(target: "core", "Simulation thread started ({} TPS)", tps);

            loop {
                let frame_start = Instant::now();

                if self.tick(&mut collector, &requests, dt) == TickControl::Exit {
                    info!(target: "core", "Simulation thread exiting");
                    break;
                }

                let elapsed = frame_start.elapsed();
                if elapsed < frame_duration {
                    thread::sleep(frame_duration - elapsed);
                }
            }
        })
    }

    //--- tick() -----------------------------------------------------------

    /// Runs one simulation step.
    fn tick(
        &self,
        collector: &mut EventCollector,
        requests: &Sender<CoreRequest>,
        dt: f32,
    ) -> TickControl {
        if collector.collect_frame() == TickControl::Exit {
            return TickControl::Exit;
        }

        for _ in 0..collector.back_requests() {
            if self.screens.back() {
                debug!(target: "core", "Top screen accepted back, requesting exit");
                if requests.send(CoreRequest::Exit).is_err() {
                    warn!(target: "core", "Platform gone, exit request dropped");
                    return TickControl::Exit;
                }
                break;
            }
        }

        self.screens.update(dt);
        TickControl::Continue
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
