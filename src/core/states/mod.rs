//=========================================================================
// State System
//=========================================================================
//
// Discrete application states and their lifecycle hooks.
//
// Architecture:
//   StatePayload ──state()──> StateKey ──registry──> Box<dyn StateHandler>
//
// Lifecycle (per handler):
//   initialize() → begin() → idle() → end() → (dormant, reusable)
//
// The scheduler owns *when* a hook fires; this module owns *what* a
// state is and how a hook is dispatched.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt::{self, Debug};
use std::hash::Hash;

//=== Internal Dependencies ===============================================

use crate::core::scheduler::Dispatcher;

//=== Module Declarations =================================================

pub mod game;
mod registry;

//=== Public API ==========================================================

pub(crate) use registry::{HandlerMap, StateRegistry};

//=== State Key Trait =====================================================

/// Marker trait for state identifiers.
///
/// Implemented by a closed, game-specific enum. `ALL` must list every
/// variant: builders refuse to build unless each one has a handler, so
/// routing a payload to its handler cannot fail at runtime.
pub trait StateKey: Clone + Copy + Eq + Hash + Debug + 'static {
    /// Every state the application can be in.
    const ALL: &'static [Self];
}

//=== State Event =========================================================

/// Lifecycle phase of the active state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StateEvent {
    /// No state has begun yet.
    #[default]
    Unknown,

    /// The state has just become current.
    Begin,

    /// Resting phase. Entered once after `Begin`.
    Idle,

    /// The state is about to hand over to the pending next state.
    End,
}

impl fmt::Display for StateEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "Unknown",
            Self::Begin => "Begin",
            Self::Idle => "Idle",
            Self::End => "End",
        };
        f.write_str(name)
    }
}

//=== Binding =============================================================

/// The (state, event) pair an entry is scheduled against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Binding<S: StateKey> {
    pub state: S,
    pub event: StateEvent,
}

impl<S: StateKey> Binding<S> {
    pub fn new(state: S, event: StateEvent) -> Self {
        Self { state, event }
    }

    /// Returns true if this binding is the active pair of `position`.
    pub fn is_active(&self, position: &StatePosition<S>) -> bool {
        position.current == Some(self.state) && position.event == self.event
    }

    /// Returns true if the bound state is current or about to become current.
    pub fn is_reachable(&self, position: &StatePosition<S>) -> bool {
        position.current == Some(self.state) || position.next == Some(self.state)
    }
}

//=== State Position ======================================================

/// Snapshot of the transition record.
///
/// `current` and `next` are equal except while a transition is underway.
/// Both are `None` until the first state is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatePosition<S: StateKey> {
    pub current: Option<S>,
    pub next: Option<S>,
    pub event: StateEvent,
}

impl<S: StateKey> StatePosition<S> {
    pub(crate) fn empty() -> Self {
        Self {
            current: None,
            next: None,
            event: StateEvent::Unknown,
        }
    }

    /// The active (state, event) pair, if a state has begun.
    pub fn active(&self) -> Option<Binding<S>> {
        match (self.current, self.event) {
            (Some(state), event) if event != StateEvent::Unknown => Some(Binding::new(state, event)),
            _ => None,
        }
    }

    /// Returns true while a transition to a different state is pending.
    pub fn in_transition(&self) -> bool {
        self.current != self.next
    }
}

//=== State Payload Trait =================================================

/// Value handed to a state when it is requested.
///
/// Implemented by a closed sum type over every state's payload. `state()`
/// is an exhaustive match that selects the handler receiving the request.
pub trait StatePayload: Clone + Debug + 'static {
    type State: StateKey;

    /// The state this payload asks to enter.
    fn state(&self) -> Self::State;
}

/// Shorthand for the state key of a payload type.
pub type StateOf<P> = <P as StatePayload>::State;

//=== State Context =======================================================

/// Data handed to a state handler's lifecycle hooks.
pub struct StateContext<'a, P: StatePayload> {
    state: StateOf<P>,
    event: StateEvent,
    payload: &'a P,
    dispatcher: &'a Dispatcher<P>,
}

impl<'a, P: StatePayload> StateContext<'a, P> {
    pub(crate) fn new(
        state: StateOf<P>,
        event: StateEvent,
        payload: &'a P,
        dispatcher: &'a Dispatcher<P>,
    ) -> Self {
        Self {
            state,
            event,
            payload,
            dispatcher,
        }
    }

    pub fn state(&self) -> StateOf<P> {
        self.state
    }

    pub fn event(&self) -> StateEvent {
        self.event
    }

    /// Payload of the latest request that targeted this state.
    pub fn payload(&self) -> &P {
        self.payload
    }

    /// Push/request API, for scheduling work from inside a hook.
    pub fn dispatcher(&self) -> &Dispatcher<P> {
        self.dispatcher
    }
}

//=== State Handler Trait =================================================

/// One discrete application state.
///
/// Handlers are registered once when the scheduler is built and live as
/// long as it does. All hooks default to doing nothing.
///
/// Work pushed from `begin` is bound to (state, Begin) and must finish
/// before the scheduler moves on to `idle`; likewise for `end` and the
/// commit of the next state.
pub trait StateHandler<P: StatePayload> {
    /// Called when a request selects this state, before it begins.
    fn initialize(&mut self, _payload: &P) {}

    /// Called when the state becomes current.
    fn begin(&mut self, _ctx: &StateContext<'_, P>) {}

    /// Called once after `begin` has settled.
    fn idle(&mut self, _ctx: &StateContext<'_, P>) {}

    /// Called when the state starts handing over to the next one.
    fn end(&mut self, _ctx: &StateContext<'_, P>) {}
}

//=== Tests ===============================================================
