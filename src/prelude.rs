//=========================================================================
// Prelude
//=========================================================================
//
// Convenience module that re-exports commonly used types and traits.
//
// Usage:
//   use starward::prelude::*;
//
//=========================================================================

//=== Public API ==========================================================

// Engine core
pub use crate::engine::{Engine, EngineBuilder, EngineError};

// Scheduler
pub use crate::core::scheduler::{
    Completion, Dispatcher, EntryHandle, EntryOptions, FaultPolicy, Lane, ScheduleError,
    StateChanged, StateClient, StateMachine, StatePublisher, TransitionError,
};

// States
pub use crate::core::states::game::{
    GamePayload, GameState, HomePayload, InitializePayload, SessionPayload,
};
pub use crate::core::states::{StateContext, StateEvent, StateHandler, StateKey, StatePayload};

// Event bus
pub use crate::core::event_bus::EventBus;
