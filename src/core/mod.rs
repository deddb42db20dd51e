//=========================================================================
// Core Systems
//
// Everything that runs on the scheduler thread, plus the clock that
// drives it.
//
// Responsibilities:
// - `states`: state keys, payloads, lifecycle handlers
// - `scheduler`: the frame-driven state machine and its dispatcher
// - `event_bus`: typed notification queues for other subsystems
// - `heartbeat`: fixed-rate clock thread
//
//=========================================================================

pub mod event_bus;
pub mod heartbeat;
pub mod scheduler;
pub mod states;

//=== Re-exports ==========================================================

pub use event_bus::{Event, EventBus};
pub use heartbeat::{Heartbeat, HeartbeatEvent};
pub use scheduler::{Dispatcher, StateClient, StateMachine, StateMachineBuilder};
pub use states::{StateEvent, StateHandler, StateKey, StatePayload};
