//=========================================================================
// Scheduler
//=========================================================================
//
// Game-wide state scheduler: a single-threaded, frame-driven cooperative
// scheduler of deferred work bound to (state, event) pairs.
//
// Architecture:
//   Collaborators ──push / request_state──> Dispatcher ──> pending buffer
//                                                              ↓ (tick)
//   Heartbeat ──on_tick()──> StateMachine ──drain──> active queue
//                                 └─ advance ──> StateRegistry ──> StatePublisher
//
//=========================================================================

//=== Module Declarations =================================================

mod client;
mod dispatcher;
mod entry;
mod error;
mod lanes;
mod publisher;
mod state_machine;

//=== Public API ==========================================================

pub use client::StateClient;
pub use dispatcher::{BreakHook, Dispatcher, EntryOptions};
pub use entry::{
    Completion, CompletionState, EntryHandle, EntryId, EntrySnapshot, EntryStatus, TriggerOutcome,
};
pub use error::{ScheduleError, TransitionError};
pub use lanes::Lane;
pub use publisher::{ChannelPublisher, NullPublisher, StateChanged, StatePublisher};
pub use state_machine::{FaultPolicy, StateMachine, StateMachineBuilder};
