//=========================================================================
// Entries
//=========================================================================
//
// The atomic unit of deferred work.
//
//   Non-blocking:  FnMut()              → runs once per eligible tick
//   Blocking:      FnOnce(Completion)   → runs once, then polls until
//                                          the action calls complete()
//
// Lifecycle:
//   push → pending buffer → active queue → trigger() … → dropped
//
//=========================================================================

//=== External Dependencies ===============================================

use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

//=== Internal Dependencies ===============================================

use super::lanes::Lane;
use crate::core::states::{Binding, StateKey};

//=== EntryId =============================================================

/// Unique, monotonically increasing entry identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub(crate) u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//=== EntryStatus =========================================================

/// Last observed lifecycle status of an entry.
///
/// Diagnostic only. Scheduling decisions never read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryStatus {
    /// Pushed, not yet examined by a drain.
    Queued,

    /// Bound to a pair that is not active yet.
    Waiting,

    /// Currently being triggered.
    Calling,

    /// Triggered and still pending; holds the gate.
    Blocking,

    /// Skipped this pass because an earlier entry holds the gate.
    Blocked,

    /// The last trigger panicked.
    Faulted,
}

//=== TriggerOutcome ======================================================

/// Result of triggering an entry once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// Work for this tick is complete.
    Done,

    /// Still waiting on its completion.
    Pending,

    /// The action panicked; carries the panic message.
    Faulted(String),
}

//=== Completion ==========================================================

/// Progress of a blocking entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionState {
    NotStarted,
    Pending,
    Done,
}

/// Continuation handed to a blocking action.
///
/// Call [`Completion::complete`] once the operation has finished; the
/// scheduler notices on its next trigger of the entry. Cloning shares
/// the same underlying flag.
#[derive(Debug, Clone)]
pub struct Completion {
    state: Rc<Cell<CompletionState>>,
}

impl Completion {
    pub(crate) fn new() -> Self {
        Self {
            state: Rc::new(Cell::new(CompletionState::NotStarted)),
        }
    }

    fn start(&self) {
        if self.state.get() == CompletionState::NotStarted {
            self.state.set(CompletionState::Pending);
        }
    }

    /// Signals that the blocking operation has finished. Idempotent.
    pub fn complete(&self) {
        self.state.set(CompletionState::Done);
    }

    pub fn is_complete(&self) -> bool {
        self.state.get() == CompletionState::Done
    }

    pub fn state(&self) -> CompletionState {
        self.state.get()
    }
}

//=== EntryHandle =========================================================

/// Handle returned by every push.
///
/// Cancelling removes the entry at the start of its next examination,
/// before it is triggered. This is the only way to retire a repeating
/// entry while its state is still active.
#[derive(Debug, Clone)]
pub struct EntryHandle {
    id: EntryId,
    cancelled: Rc<Cell<bool>>,
}

impl EntryHandle {
    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

//=== EntrySnapshot =======================================================

/// Read-only view of a queued entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySnapshot<S: StateKey> {
    pub id: EntryId,
    pub caller: &'static str,
    pub description: String,
    pub binding: Binding<S>,
    pub repeating: bool,
    pub blocking: bool,
    pub lane: Option<Lane>,
    pub status: EntryStatus,
}

//=== Work ================================================================

pub(crate) enum Work {
    Action(Box<dyn FnMut()>),
    Blocking {
        start: Option<Box<dyn FnOnce(Completion)>>,
        completion: Completion,
        poll: Option<Box<dyn FnMut() -> bool>>,
    },
}

impl Work {
    pub(crate) fn action<F>(action: F) -> Self
    where
        F: FnMut() + 'static,
    {
        Self::Action(Box::new(action))
    }

    pub(crate) fn blocking<F>(action: F) -> Self
    where
        F: FnOnce(Completion) + 'static,
    {
        Self::Blocking {
            start: Some(Box::new(action)),
            completion: Completion::new(),
            poll: None,
        }
    }

    /// Runs `action` once, then completes as soon as `condition` holds.
    ///
    /// The condition is first checked on the same trigger that ran the
    /// action.
    pub(crate) fn blocking_until<A, C>(action: A, condition: C) -> Self
    where
        A: FnOnce() + 'static,
        C: FnMut() -> bool + 'static,
    {
        Self::Blocking {
            start: Some(Box::new(move |_| action())),
            completion: Completion::new(),
            poll: Some(Box::new(condition)),
        }
    }

    pub(crate) fn is_blocking(&self) -> bool {
        matches!(self, Self::Blocking { .. })
    }

    /// Returns true when done for this tick.
    fn run(&mut self) -> bool {
        match self {
            Self::Action(action) => {
                action();
                true
            }
            Self::Blocking {
                start,
                completion,
                poll,
            } => {
                if let Some(start) = start.take() {
                    completion.start();
                    start(completion.clone());
                }

                if !completion.is_complete() {
                    if let Some(condition) = poll {
                        if condition() {
                            completion.complete();
                        }
                    }
                }

                completion.is_complete()
            }
        }
    }
}

//=== Entry ===============================================================

pub(crate) struct Entry<S: StateKey> {
    id: EntryId,
    caller: &'static str,
    description: String,
    binding: Binding<S>,
    repeating: bool,
    lane: Option<Lane>,
    cancelled: Rc<Cell<bool>>,
    status: EntryStatus,
    work: Work,
}

impl<S: StateKey> Entry<S> {
    //--- Construction -----------------------------------------------------

    pub(crate) fn new(
        id: EntryId,
        caller: &'static str,
        description: &str,
        binding: Binding<S>,
        repeating: bool,
        lane: Option<Lane>,
        work: Work,
    ) -> (Self, EntryHandle) {
        let cancelled = Rc::new(Cell::new(false));
        let handle = EntryHandle {
            id,
            cancelled: cancelled.clone(),
        };

        let entry = Self {
            id,
            caller,
            description: description.to_string(),
            binding,
            repeating,
            lane,
            cancelled,
            status: EntryStatus::Queued,
            work,
        };

        (entry, handle)
    }

    //--- Accessors --------------------------------------------------------

    pub(crate) fn binding(&self) -> &Binding<S> {
        &self.binding
    }

    pub(crate) fn lane(&self) -> Option<&Lane> {
        self.lane.as_ref()
    }

    pub(crate) fn is_repeating(&self) -> bool {
        self.repeating
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }

    pub(crate) fn set_status(&mut self, status: EntryStatus) {
        self.status = status;
    }

    //--- Execution --------------------------------------------------------

    /// Runs the entry's work once, catching panics as faults.
    pub(crate) fn trigger(&mut self) -> TriggerOutcome {
        self.status = EntryStatus::Calling;

        let work = &mut self.work;
        match panic::catch_unwind(AssertUnwindSafe(|| work.run())) {
            Ok(true) => TriggerOutcome::Done,
            Ok(false) => {
                self.status = EntryStatus::Blocking;
                TriggerOutcome::Pending
            }
            Err(cause) => {
                self.status = EntryStatus::Faulted;
                TriggerOutcome::Faulted(panic_message(cause.as_ref()))
            }
        }
    }

    //--- Diagnostics ------------------------------------------------------

    pub(crate) fn snapshot(&self) -> EntrySnapshot<S> {
        EntrySnapshot {
            id: self.id,
            caller: self.caller,
            description: self.description.clone(),
            binding: self.binding,
            repeating: self.repeating,
            blocking: self.work.is_blocking(),
            lane: self.lane.clone(),
            status: self.status,
        }
    }
}

impl<S: StateKey> fmt::Display for Entry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {} @ {:?}/{}",
            self.id, self.caller, self.description, self.binding.state, self.binding.event
        )
    }
}

fn panic_message(cause: &(dyn Any + Send)) -> String {
    if let Some(message) = cause.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = cause.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

//=== Tests ===============================================================
