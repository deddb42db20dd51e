//=========================================================================
// Starward Engine - Library Root
//
// Frame-driven game state scheduler for the Starward client.
//
// Responsibilities:
// - Expose the engine entry point (`Engine`, `EngineBuilder`)
// - Expose the scheduler and state types through `core`
// - Keep the runtime wiring (`engine`) behind the top-level facade
//
// Typical usage:
// ```no_run
// use starward::prelude::*;
//
// let mut engine = EngineBuilder::<GamePayload>::new()
//     .register_state(GameState::Initialize, Boot)
//     // ...
//     .build()?;
// engine.run(GamePayload::Initialize(Default::default()))?;
// ```
//
//=========================================================================

//--- Public Modules ------------------------------------------------------
//
// `core` holds the state machine, its dispatcher, the state definitions,
// the event bus and the heartbeat. Most games only need the prelude.
//
pub mod core;
pub mod prelude;

//--- Internal Modules ----------------------------------------------------
//
// `engine` wires the heartbeat to the state machine.
//
mod engine;

//--- Public Exports ------------------------------------------------------

pub use engine::{Engine, EngineBuilder, EngineError};
