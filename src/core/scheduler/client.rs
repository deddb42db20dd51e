//=========================================================================
// State Client
//=========================================================================
//
// Per-caller facade over the Dispatcher. Stamps every entry with the
// caller's identity so queue snapshots show who scheduled what.
//
//=========================================================================

//=== Internal Dependencies ===============================================

use super::dispatcher::{Dispatcher, EntryOptions};
use super::entry::{Completion, EntryHandle};
use super::error::{ScheduleError, TransitionError};
use crate::core::states::{StateOf, StatePayload};

//=== StateClient =========================================================

/// A [`Dispatcher`] bound to one caller.
///
/// Created with [`Dispatcher::client`] or [`Dispatcher::client_for`].
pub struct StateClient<P: StatePayload> {
    dispatcher: Dispatcher<P>,
    caller: &'static str,
}

impl<P: StatePayload> Clone for StateClient<P> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
            caller: self.caller,
        }
    }
}

impl<P: StatePayload> StateClient<P> {
    pub(crate) fn new(dispatcher: Dispatcher<P>, caller: &'static str) -> Self {
        Self { dispatcher, caller }
    }

    pub fn caller(&self) -> &'static str {
        self.caller
    }

    pub fn dispatcher(&self) -> &Dispatcher<P> {
        &self.dispatcher
    }

    pub fn request_state(&self, payload: P) -> Result<(), TransitionError<StateOf<P>>> {
        self.dispatcher.request_state(payload)
    }

    pub fn push<F>(&self, description: &str, action: F) -> Result<EntryHandle, ScheduleError>
    where
        F: FnMut() + 'static,
    {
        self.dispatcher.push(self.caller, description, action)
    }

    pub fn push_with<F>(
        &self,
        description: &str,
        options: EntryOptions<StateOf<P>>,
        action: F,
    ) -> Result<EntryHandle, ScheduleError>
    where
        F: FnMut() + 'static,
    {
        self.dispatcher.push_with(self.caller, description, options, action)
    }

    pub fn push_blocking<F>(&self, description: &str, action: F) -> Result<EntryHandle, ScheduleError>
    where
        F: FnOnce(Completion) + 'static,
    {
        self.dispatcher.push_blocking(self.caller, description, action)
    }

    pub fn push_blocking_with<F>(
        &self,
        description: &str,
        options: EntryOptions<StateOf<P>>,
        action: F,
    ) -> Result<EntryHandle, ScheduleError>
    where
        F: FnOnce(Completion) + 'static,
    {
        self.dispatcher
            .push_blocking_with(self.caller, description, options, action)
    }

    pub fn push_blocking_until<A, C>(
        &self,
        description: &str,
        action: A,
        condition: C,
    ) -> Result<EntryHandle, ScheduleError>
    where
        A: FnOnce() + 'static,
        C: FnMut() -> bool + 'static,
    {
        self.dispatcher
            .push_blocking_until(self.caller, description, action, condition)
    }

    pub fn push_break(&self) -> Result<EntryHandle, ScheduleError> {
        self.dispatcher.push_break(self.caller)
    }
}

//=== Tests ===============================================================
