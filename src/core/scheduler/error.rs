//=========================================================================
// Scheduler Errors
//=========================================================================
//
// Invalid calls are reported to the caller immediately and never retried.
// Faults raised *inside* an entry are not errors at this level; they are
// recovered by the drain according to the configured FaultPolicy.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;

//=== Internal Dependencies ===============================================

use crate::core::states::StateKey;

//=== ScheduleError =======================================================

/// Argument validation failures on push calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// Description was empty or whitespace.
    BlankDescription,

    /// Caller identity was empty or whitespace.
    BlankCaller,

    /// No state has begun and no explicit binding was given.
    NoActiveState,

    /// The binding names the `Unknown` event.
    UnknownEvent,

    /// Blocking entries complete once; they cannot repeat.
    RepeatingBlocking,
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BlankDescription => write!(f, "Entry description must not be blank"),
            Self::BlankCaller => write!(f, "Entry caller must not be blank"),
            Self::NoActiveState => write!(f, "No state is active to bind the entry to"),
            Self::UnknownEvent => write!(f, "Entries cannot be bound to the Unknown event"),
            Self::RepeatingBlocking => write!(f, "Blocking entries cannot be repeating"),
        }
    }
}

impl std::error::Error for ScheduleError {}

//=== TransitionError =====================================================

/// Failures of a state request or lifecycle dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionError<S: StateKey> {
    /// No handler was registered for the state.
    UnregisteredState(S),

    /// A transition to another state is already underway.
    ///
    /// Only one pending transition is supported; the in-flight one is
    /// left untouched.
    TransitionInProgress {
        current: Option<S>,
        next: Option<S>,
        requested: S,
    },

    /// The state's handler is running a hook and cannot be re-entered.
    HandlerBusy(S),
}

impl<S: StateKey> fmt::Display for TransitionError<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnregisteredState(state) => {
                write!(f, "No handler registered for state {:?}", state)
            }
            Self::TransitionInProgress {
                current,
                next,
                requested,
            } => write!(
                f,
                "Cannot request {:?} while transitioning from {:?} to {:?}",
                requested, current, next
            ),
            Self::HandlerBusy(state) => {
                write!(f, "Handler for state {:?} is already running", state)
            }
        }
    }
}

impl<S: StateKey> std::error::Error for TransitionError<S> {}

//=== Tests ===============================================================
