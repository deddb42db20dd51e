//=========================================================================
// State Registry
//=========================================================================
//
// Owns every state handler plus the payload last routed to it, and
// performs lifecycle dispatch:
//
//   dispatch(state, event) → handler.begin/idle/end() → publish StateChanged
//
// Handlers sit behind their own RefCell so a hook may re-enter the
// dispatcher (push work, request another state) without aliasing the
// handler that is currently running.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::RefCell;
use std::collections::HashMap;

use log::{debug, error, warn};

//=== Internal Dependencies ===============================================

use super::{StateContext, StateEvent, StateHandler, StateKey, StateOf, StatePayload};
use crate::core::scheduler::{Dispatcher, StateChanged, StatePublisher, TransitionError};

//=== Types ===============================================================

/// Handlers collected by a builder before validation.
pub(crate) type HandlerMap<P> = HashMap<StateOf<P>, Box<dyn StateHandler<P>>>;

struct StateSlot<P: StatePayload> {
    handler: RefCell<Box<dyn StateHandler<P>>>,
    payload: RefCell<Option<P>>,
}

//=== StateRegistry =======================================================

pub(crate) struct StateRegistry<P: StatePayload> {
    slots: HashMap<StateOf<P>, StateSlot<P>>,
    publisher: RefCell<Box<dyn StatePublisher<P>>>,
}

impl<P: StatePayload> StateRegistry<P> {
    //--- Construction -----------------------------------------------------

    /// Builds the registry, requiring a handler for every state key.
    pub(crate) fn new(
        handlers: HandlerMap<P>,
        publisher: Box<dyn StatePublisher<P>>,
    ) -> Result<Self, TransitionError<StateOf<P>>> {
        if let Some(missing) = <StateOf<P> as StateKey>::ALL
            .iter()
            .find(|state| !handlers.contains_key(state))
        {
            return Err(TransitionError::UnregisteredState(*missing));
        }

        let slots = handlers
            .into_iter()
            .map(|(state, handler)| {
                let slot = StateSlot {
                    handler: RefCell::new(handler),
                    payload: RefCell::new(None),
                };
                (state, slot)
            })
            .collect();

        Ok(Self {
            slots,
            publisher: RefCell::new(publisher),
        })
    }

    //--- Routing ----------------------------------------------------------

    /// Hands `payload` to the handler of the state it targets.
    ///
    /// The payload is retained for that state's lifecycle hooks and
    /// replaces whatever an earlier request left behind.
    pub(crate) fn initialize(&self, payload: &P) -> Result<(), TransitionError<StateOf<P>>> {
        let state = payload.state();
        let slot = self.slot(state)?;

        {
            let mut handler = slot
                .handler
                .try_borrow_mut()
                .map_err(|_| TransitionError::HandlerBusy(state))?;
            handler.initialize(payload);
        }

        *slot.payload.borrow_mut() = Some(payload.clone());
        Ok(())
    }

    //--- Lifecycle Dispatch -----------------------------------------------

    /// Runs the hook for `event` on `state`, then broadcasts the change.
    pub(crate) fn dispatch(
        &self,
        state: StateOf<P>,
        event: StateEvent,
        dispatcher: &Dispatcher<P>,
    ) -> Result<(), TransitionError<StateOf<P>>> {
        let slot = self.slot(state)?;

        let Some(payload) = slot.payload.borrow().clone() else {
            error!(target: "states", "State {:?} reached {} without a payload", state, event);
            return Ok(());
        };

        debug!(target: "states", "{:?} → {}", state, event);

        {
            let mut handler = slot
                .handler
                .try_borrow_mut()
                .map_err(|_| TransitionError::HandlerBusy(state))?;
            let ctx = StateContext::new(state, event, &payload, dispatcher);

            match event {
                StateEvent::Begin => handler.begin(&ctx),
                StateEvent::Idle => handler.idle(&ctx),
                StateEvent::End => handler.end(&ctx),
                StateEvent::Unknown => {}
            }
        }

        self.publish(StateChanged {
            state,
            event,
            payload,
        });

        Ok(())
    }

    //--- Internal Helpers -------------------------------------------------

    fn slot(&self, state: StateOf<P>) -> Result<&StateSlot<P>, TransitionError<StateOf<P>>> {
        self.slots
            .get(&state)
            .ok_or(TransitionError::UnregisteredState(state))
    }

    fn publish(&self, change: StateChanged<P>) {
        match self.publisher.try_borrow_mut() {
            Ok(mut publisher) => publisher.publish(&change),
            Err(_) => warn!(
                target: "states",
                "Publisher busy, dropped {:?}/{} notification",
                change.state, change.event
            ),
        }
    }
}

//=== Tests ===============================================================
