//=========================================================================
// Dispatcher
//=========================================================================
//
// The push/request surface shared by every collaborator.
//
// Architecture:
//   Dispatcher (Rc, cloneable)
//     └─ Core
//          ├─ position:  current / next state + active event
//          ├─ pending:   entries pushed since the last drain
//          └─ registry:  state handlers + retained payloads
//
// Pushes only ever append to `pending`. The active queue belongs to the
// StateMachine and is never visible from here, which is what makes a
// push from inside a running entry or hook safe.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::any::type_name;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use log::{debug, info, warn};

//=== Internal Dependencies ===============================================

use super::client::StateClient;
use super::entry::{Completion, Entry, EntryHandle, EntryId, Work};
use super::error::{ScheduleError, TransitionError};
use super::lanes::Lane;
use crate::core::states::{
    Binding, StateEvent, StateKey, StateOf, StatePayload, StatePosition, StateRegistry,
};

//=== Types ===============================================================

/// Callback run by [`Dispatcher::push_break`] entries, given the caller.
pub type BreakHook = Rc<dyn Fn(&str)>;

//=== EntryOptions ========================================================

/// Optional settings for a push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryOptions<S: StateKey> {
    /// Keep the entry after it runs; it runs again every tick its
    /// binding is active.
    pub repeating: bool,

    /// Lane the entry belongs to. `None` is the strict default lane.
    pub lane: Option<Lane>,

    /// Explicit binding. `None` binds to the active pair at push time.
    pub binding: Option<Binding<S>>,
}

impl<S: StateKey> EntryOptions<S> {
    pub fn new() -> Self {
        Self {
            repeating: false,
            lane: None,
            binding: None,
        }
    }

    pub fn repeating(mut self) -> Self {
        self.repeating = true;
        self
    }

    pub fn lane(mut self, lane: impl Into<Lane>) -> Self {
        self.lane = Some(lane.into());
        self
    }

    pub fn bound_to(mut self, state: S, event: StateEvent) -> Self {
        self.binding = Some(Binding::new(state, event));
        self
    }
}

impl<S: StateKey> Default for EntryOptions<S> {
    fn default() -> Self {
        Self::new()
    }
}

//=== Core ================================================================

pub(crate) struct Core<P: StatePayload> {
    position: RefCell<StatePosition<StateOf<P>>>,
    pending: RefCell<Vec<Entry<StateOf<P>>>>,
    registry: StateRegistry<P>,
    next_id: Cell<u64>,
    break_hook: Option<BreakHook>,
    exit_requested: Cell<bool>,
}

//=== Dispatcher ==========================================================

/// Cloneable handle for pushing entries and requesting states.
///
/// Every clone refers to the same scheduler. Not `Send`: all work runs on
/// the thread that ticks the [`StateMachine`](super::StateMachine).
pub struct Dispatcher<P: StatePayload> {
    core: Rc<Core<P>>,
}

impl<P: StatePayload> Clone for Dispatcher<P> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<P: StatePayload> Dispatcher<P> {
    //--- Construction -----------------------------------------------------

    pub(crate) fn new(registry: StateRegistry<P>, break_hook: Option<BreakHook>) -> Self {
        Self {
            core: Rc::new(Core {
                position: RefCell::new(StatePosition::empty()),
                pending: RefCell::new(Vec::new()),
                registry,
                next_id: Cell::new(1),
                break_hook,
                exit_requested: Cell::new(false),
            }),
        }
    }

    //--- State Requests ---------------------------------------------------

    /// Asks for a transition to the state `payload` targets.
    ///
    /// - Target already current or pending: no-op.
    /// - Another transition underway: [`TransitionError::TransitionInProgress`],
    ///   leaving that transition untouched.
    /// - Otherwise the target's handler is initialized with `payload` and
    ///   the target becomes the next state. If no state is active yet, it
    ///   begins immediately.
    pub fn request_state(&self, payload: P) -> Result<(), TransitionError<StateOf<P>>> {
        let target = payload.state();
        let position = self.position();

        if position.current == Some(target) || position.next == Some(target) {
            debug!(target: "scheduler", "{:?} is already current or pending, request ignored", target);
            return Ok(());
        }

        if position.in_transition() {
            return Err(TransitionError::TransitionInProgress {
                current: position.current,
                next: position.next,
                requested: target,
            });
        }

        self.core.registry.initialize(&payload)?;

        let begins_now = self.with_position(|position| {
            position.next = Some(target);
            if position.current.is_none() {
                position.current = Some(target);
                position.event = StateEvent::Begin;
                true
            } else {
                false
            }
        });

        info!(target: "scheduler", "State {:?} requested (current: {:?})", target, position.current);

        if begins_now {
            self.dispatch(target, StateEvent::Begin)?;
        }

        Ok(())
    }

    //--- Non-blocking Pushes ----------------------------------------------

    /// Queues `action` against the active (state, event) pair.
    pub fn push<F>(
        &self,
        caller: &'static str,
        description: &str,
        action: F,
    ) -> Result<EntryHandle, ScheduleError>
    where
        F: FnMut() + 'static,
    {
        self.push_with(caller, description, EntryOptions::new(), action)
    }

    /// Queues `action` with explicit options (repeating, lane, binding).
    pub fn push_with<F>(
        &self,
        caller: &'static str,
        description: &str,
        options: EntryOptions<StateOf<P>>,
        action: F,
    ) -> Result<EntryHandle, ScheduleError>
    where
        F: FnMut() + 'static,
    {
        self.schedule(caller, description, options, Work::action(action))
    }

    //--- Blocking Pushes --------------------------------------------------

    /// Queues a continuation-style action that blocks until it calls
    /// [`Completion::complete`].
    pub fn push_blocking<F>(
        &self,
        caller: &'static str,
        description: &str,
        action: F,
    ) -> Result<EntryHandle, ScheduleError>
    where
        F: FnOnce(Completion) + 'static,
    {
        self.push_blocking_with(caller, description, EntryOptions::new(), action)
    }

    pub fn push_blocking_with<F>(
        &self,
        caller: &'static str,
        description: &str,
        options: EntryOptions<StateOf<P>>,
        action: F,
    ) -> Result<EntryHandle, ScheduleError>
    where
        F: FnOnce(Completion) + 'static,
    {
        self.schedule(caller, description, options, Work::blocking(action))
    }

    /// Runs `action` once, then blocks until `condition` returns true.
    pub fn push_blocking_until<A, C>(
        &self,
        caller: &'static str,
        description: &str,
        action: A,
        condition: C,
    ) -> Result<EntryHandle, ScheduleError>
    where
        A: FnOnce() + 'static,
        C: FnMut() -> bool + 'static,
    {
        self.push_blocking_until_with(caller, description, EntryOptions::new(), action, condition)
    }

    pub fn push_blocking_until_with<A, C>(
        &self,
        caller: &'static str,
        description: &str,
        options: EntryOptions<StateOf<P>>,
        action: A,
        condition: C,
    ) -> Result<EntryHandle, ScheduleError>
    where
        A: FnOnce() + 'static,
        C: FnMut() -> bool + 'static,
    {
        self.schedule(caller, description, options, Work::blocking_until(action, condition))
    }

    //--- Debugging --------------------------------------------------------

    /// Queues a break marker: logs the request and runs the break hook.
    pub fn push_break(&self, caller: &'static str) -> Result<EntryHandle, ScheduleError> {
        let hook = self.core.break_hook.clone();
        self.push(caller, "Break", move || {
            warn!(target: "scheduler", "Break requested by {}", caller);
            if let Some(hook) = &hook {
                hook(caller);
            }
        })
    }

    //--- Facades ----------------------------------------------------------

    /// A wrapper that stamps every push with `caller`.
    pub fn client(&self, caller: &'static str) -> StateClient<P> {
        StateClient::new(self.clone(), caller)
    }

    /// A wrapper that stamps every push with the type name of `T`.
    pub fn client_for<T: ?Sized>(&self) -> StateClient<P> {
        self.client(type_name::<T>())
    }

    //--- Queries ----------------------------------------------------------

    pub fn position(&self) -> StatePosition<StateOf<P>> {
        *self.core.position.borrow()
    }

    /// Entries pushed since the last tick.
    pub fn pending_len(&self) -> usize {
        self.core.pending.borrow().len()
    }

    //--- Exit -------------------------------------------------------------

    /// Asks the engine loop to stop after the current tick.
    pub fn request_exit(&self) {
        info!(target: "scheduler", "Exit requested");
        self.core.exit_requested.set(true);
    }

    pub fn exit_requested(&self) -> bool {
        self.core.exit_requested.get()
    }

    //--- Crate Internals --------------------------------------------------

    pub(crate) fn take_pending(&self) -> Vec<Entry<StateOf<P>>> {
        std::mem::take(&mut *self.core.pending.borrow_mut())
    }

    pub(crate) fn with_position<R>(
        &self,
        update: impl FnOnce(&mut StatePosition<StateOf<P>>) -> R,
    ) -> R {
        update(&mut self.core.position.borrow_mut())
    }

    pub(crate) fn dispatch(
        &self,
        state: StateOf<P>,
        event: StateEvent,
    ) -> Result<(), TransitionError<StateOf<P>>> {
        self.core.registry.dispatch(state, event, self)
    }

    //--- Internal Helpers -------------------------------------------------

    fn schedule(
        &self,
        caller: &'static str,
        description: &str,
        options: EntryOptions<StateOf<P>>,
        work: Work,
    ) -> Result<EntryHandle, ScheduleError> {
        if caller.trim().is_empty() {
            return Err(ScheduleError::BlankCaller);
        }
        if description.trim().is_empty() {
            return Err(ScheduleError::BlankDescription);
        }
        if options.repeating && work.is_blocking() {
            return Err(ScheduleError::RepeatingBlocking);
        }

        let binding = match options.binding {
            Some(binding) => binding,
            None => self.position().active().ok_or(ScheduleError::NoActiveState)?,
        };
        if binding.event == StateEvent::Unknown {
            return Err(ScheduleError::UnknownEvent);
        }

        let id = EntryId(self.core.next_id.get());
        self.core.next_id.set(id.0 + 1);

        let (entry, handle) = Entry::new(
            id,
            caller,
            description,
            binding,
            options.repeating,
            options.lane,
            work,
        );

        debug!(target: "scheduler", "Queued {}", entry);
        self.core.pending.borrow_mut().push(entry);

        Ok(handle)
    }
}
