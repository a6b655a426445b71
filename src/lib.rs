//=========================================================================
// Aetheric Screens — Library Root
//
// Screen lifecycle management for a two-thread 2D engine.
//
// Responsibilities:
// - Expose the screen system (`ScreenSystem`, `Screen`, `ScreenHandle`)
// - Expose the render-context scheduling seam (`RenderScheduler`)
// - Provide the `Engine` facade running the simulation and render threads
// - Keep the windowing layer (`platform`) hidden from end users
//
// Typical usage:
// ```no_run
// use aetheric_screens::prelude::*;
//
// struct Title;
// impl Screen for Title {
//     fn update(&mut self, _ctx: &ScreenContext, _dt: f32) {}
// }
//
// fn main() -> Result<(), PlatformError> {
//     EngineBuilder::new()
//         .build()
//         .init(|screens| screens.push(ScreenHandle::new(Title)))
//         .run()
// }
// ```
//
//=========================================================================

//--- Public Modules ------------------------------------------------------
//
// `core` contains the screen system and the render-context seam. It is
// public so the screen system can be embedded without the `Engine`.
//
pub mod core;
pub mod prelude;

//--- Internal Modules ----------------------------------------------------
//
// `platform` contains the winit integration (window, event loop) and is
// not part of the public API surface.
//
mod engine;
mod platform;

//--- Public Exports ------------------------------------------------------

pub use crate::core::platform_bridge::PlatformError;
pub use engine::{Engine, EngineBuilder};
