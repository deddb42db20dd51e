//=========================================================================
// State Publisher
//=========================================================================
//
// Outbound notification of every lifecycle dispatch.
//
//   registry.dispatch() ──StateChanged──> StatePublisher
//                                           ├─ Rc<RefCell<EventBus>>
//                                           ├─ ChannelPublisher (crossbeam)
//                                           └─ NullPublisher
//
// Fire-and-forget: nothing is acknowledged or awaited.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::RefCell;
use std::rc::Rc;

use crossbeam_channel::{Sender, TrySendError};
use log::warn;

//=== Internal Dependencies ===============================================

use crate::core::event_bus::EventBus;
use crate::core::states::{StateEvent, StateOf, StatePayload};

//=== StateChanged ========================================================

/// Broadcast after each Begin/Idle/End hook has run.
#[derive(Debug, Clone, PartialEq)]
pub struct StateChanged<P: StatePayload> {
    pub state: StateOf<P>,
    pub event: StateEvent,
    pub payload: P,
}

//=== StatePublisher Trait ================================================

/// Capability injected into the scheduler for broadcasting state changes.
pub trait StatePublisher<P: StatePayload> {
    fn publish(&mut self, change: &StateChanged<P>);
}

//=== NullPublisher =======================================================

/// Discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPublisher;

impl<P: StatePayload> StatePublisher<P> for NullPublisher {
    fn publish(&mut self, _change: &StateChanged<P>) {}
}

//=== Event Bus ===========================================================

/// Pushes notifications onto a shared [`EventBus`].
///
/// Consumers read them with `bus.read::<StateChanged<P>>()` and clear
/// them once every interested system has looked.
impl<P: StatePayload> StatePublisher<P> for Rc<RefCell<EventBus>> {
    fn publish(&mut self, change: &StateChanged<P>) {
        match self.try_borrow_mut() {
            Ok(mut bus) => bus.publish(change.clone()),
            Err(_) => warn!(
                target: "states",
                "Event bus borrowed elsewhere, dropped {:?}/{} notification",
                change.state, change.event
            ),
        }
    }
}

//=== ChannelPublisher ====================================================

/// Forwards notifications to observers on other threads.
///
/// Never blocks the scheduler: a full or disconnected channel drops the
/// notification with a warning.
pub struct ChannelPublisher<P: StatePayload + Send> {
    sender: Sender<StateChanged<P>>,
}

impl<P: StatePayload + Send> ChannelPublisher<P> {
    pub fn new(sender: Sender<StateChanged<P>>) -> Self {
        Self { sender }
    }
}

impl<P: StatePayload + Send> StatePublisher<P> for ChannelPublisher<P> {
    fn publish(&mut self, change: &StateChanged<P>) {
        match self.sender.try_send(change.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => warn!(
                target: "states",
                "State channel full, dropped {:?}/{} notification",
                dropped.state, dropped.event
            ),
            Err(TrySendError::Disconnected(dropped)) => warn!(
                target: "states",
                "State channel disconnected, dropped {:?}/{} notification",
                dropped.state, dropped.event
            ),
        }
    }
}

//=== Tests ===============================================================
