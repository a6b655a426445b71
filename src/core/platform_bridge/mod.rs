//=========================================================================
// Platform Bridge
//=========================================================================
//
// Bridges the platform layer (winit) with core systems.
//
// This module defines the contract between the platform implementation
// and core logic, so core code never names a windowing type.
//
// Components:
// - `interface`: Event, request and error definitions (the contract)
// - `event_collector`: Core-side event collection per tick
//
//=========================================================================

//=== Module Declarations =================================================

pub(crate) mod event_collector;
pub(crate) mod interface;

//=== Internal API ========================================================

pub(crate) use event_collector::{EventCollector, TickControl};
pub(crate) use interface::{CoreRequest, PlatformEvent};

//=== Public API ==========================================================

pub use interface::PlatformError;
