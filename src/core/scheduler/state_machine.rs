//=========================================================================
// State Machine
//=========================================================================
//
// Frame-driven cooperative scheduler.
//
// Each tick:
//   1. Promote pending entries into the active queue (FIFO)
//   2. Drain the active queue through a LaneGate
//   3. Keep the survivors
//   4. Stop if anything is still blocking
//   5. Otherwise advance the (state, event) pair by one micro-step
//
// Transition protocol (one micro-step per unblocked tick):
//
//   Begin ──> Idle ──(next ≠ current)──> End ──> Begin(next)
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, error, info, trace, warn};

//=== Internal Dependencies ===============================================

use super::dispatcher::{BreakHook, Dispatcher};
use super::entry::{Entry, EntrySnapshot, EntryStatus, TriggerOutcome};
use super::error::TransitionError;
use super::lanes::LaneGate;
use super::publisher::{NullPublisher, StatePublisher};
use crate::core::states::{
    HandlerMap, StateEvent, StateHandler, StateKey, StateOf, StatePayload, StatePosition,
    StateRegistry,
};

//=== FaultPolicy =========================================================

/// What the drain does with a non-repeating entry whose trigger panicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultPolicy {
    /// Treat the fault as completion: log it and drop the entry.
    ///
    /// One faulty action cannot wedge the state machine.
    #[default]
    Complete,

    /// Treat the fault as still pending: keep the entry and hold the
    /// gate, so no transition happens past a failed operation.
    Block,
}

//=== StateMachineBuilder =================================================

/// Builder for a [`StateMachine`].
///
/// Every [`StateKey::ALL`](crate::core::states::StateKey::ALL) variant
/// needs a handler before [`build`](Self::build) succeeds.
pub struct StateMachineBuilder<P: StatePayload> {
    handlers: HandlerMap<P>,
    publisher: Box<dyn StatePublisher<P>>,
    fault_policy: FaultPolicy,
    break_hook: Option<BreakHook>,
}

impl<P: StatePayload> StateMachineBuilder<P> {
    /// Creates a builder with no handlers and a [`NullPublisher`].
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            publisher: Box::new(NullPublisher),
            fault_policy: FaultPolicy::default(),
            break_hook: None,
        }
    }

    /// Registers the handler for `state`, replacing any earlier one.
    pub fn register_state<H>(mut self, state: StateOf<P>, handler: H) -> Self
    where
        H: StateHandler<P> + 'static,
    {
        if self.handlers.insert(state, Box::new(handler)).is_some() {
            warn!(target: "scheduler", "State {:?} was already registered and has been replaced", state);
        }
        self
    }

    /// Sets where `StateChanged` notifications go.
    pub fn with_publisher<T>(mut self, publisher: T) -> Self
    where
        T: StatePublisher<P> + 'static,
    {
        self.publisher = Box::new(publisher);
        self
    }

    /// Default: [`FaultPolicy::Complete`].
    pub fn with_fault_policy(mut self, policy: FaultPolicy) -> Self {
        self.fault_policy = policy;
        self
    }

    /// Sets the callback run by break entries.
    pub fn with_break_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) + 'static,
    {
        let hook: BreakHook = Rc::new(hook);
        self.break_hook = Some(hook);
        self
    }

    /// Builds the state machine.
    ///
    /// # Errors
    ///
    /// [`TransitionError::UnregisteredState`] if a state has no handler.
    pub fn build(self) -> Result<StateMachine<P>, TransitionError<StateOf<P>>> {
        let registry = StateRegistry::new(self.handlers, self.publisher)?;

        info!(
            target: "scheduler",
            "State machine built ({} states, fault policy: {:?})",
            <StateOf<P> as StateKey>::ALL.len(),
            self.fault_policy
        );

        Ok(StateMachine {
            dispatcher: Dispatcher::new(registry, self.break_hook),
            active: Vec::new(),
            fault_policy: self.fault_policy,
            frame: 0,
            elapsed: 0.0,
        })
    }
}

impl<P: StatePayload> Default for StateMachineBuilder<P> {
    fn default() -> Self {
        Self::new()
    }
}

//=== StateMachine ========================================================

/// Game-wide state scheduler.
///
/// Owns the active entry queue and drives transitions from
/// [`on_tick`](Self::on_tick). Collaborators interact through a cloned
/// [`Dispatcher`].
pub struct StateMachine<P: StatePayload> {
    dispatcher: Dispatcher<P>,
    active: Vec<Entry<StateOf<P>>>,
    fault_policy: FaultPolicy,
    frame: u64,
    elapsed: f64,
}

impl<P: StatePayload> StateMachine<P> {
    pub fn builder() -> StateMachineBuilder<P> {
        StateMachineBuilder::new()
    }

    //--- Accessors --------------------------------------------------------

    pub fn dispatcher(&self) -> &Dispatcher<P> {
        &self.dispatcher
    }

    pub fn position(&self) -> StatePosition<StateOf<P>> {
        self.dispatcher.position()
    }

    /// Shorthand for [`Dispatcher::request_state`].
    pub fn request_state(&self, payload: P) -> Result<(), TransitionError<StateOf<P>>> {
        self.dispatcher.request_state(payload)
    }

    /// Read-only snapshot of the active queue.
    ///
    /// Entries pushed since the last tick are not included until they
    /// are promoted; see [`pending_len`](Self::pending_len).
    pub fn entries(&self) -> Vec<EntrySnapshot<StateOf<P>>> {
        self.active.iter().map(Entry::snapshot).collect()
    }

    /// Entries pushed since the last tick, not yet in [`entries`](Self::entries).
    pub fn pending_len(&self) -> usize {
        self.dispatcher.pending_len()
    }

    /// Number of ticks processed.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Sum of all tick deltas, in seconds.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    //--- Tick -------------------------------------------------------------

    /// Runs one scheduler tick. Called once per frame by the clock source.
    pub fn on_tick(&mut self, delta_seconds: f64) {
        self.frame += 1;
        self.elapsed += delta_seconds;

        let gate = self.drain();

        if gate.is_blocked() {
            trace!(
                target: "scheduler",
                "Frame {}: transition held (lane: {:?})",
                self.frame,
                gate.blocking_lane()
            );
            return;
        }

        self.advance();
    }

    //--- Drain ------------------------------------------------------------

    fn drain(&mut self) -> LaneGate {
        let promoted = self.dispatcher.take_pending();
        self.active.extend(promoted);

        let queue = std::mem::take(&mut self.active);
        let mut surviving = Vec::with_capacity(queue.len());
        let mut gate = LaneGate::default();

        for mut entry in queue {
            if entry.is_cancelled() {
                debug!(target: "scheduler", "Cancelled {}", entry);
                continue;
            }

            if !gate.admits(entry.lane()) {
                entry.set_status(EntryStatus::Blocked);
                surviving.push(entry);
                continue;
            }

            // Re-read every time: a trigger may have requested a state.
            let position = self.dispatcher.position();

            if !entry.binding().is_active(&position) {
                if entry.binding().is_reachable(&position) {
                    entry.set_status(EntryStatus::Waiting);
                    surviving.push(entry);
                } else if entry.is_repeating() {
                    debug!(target: "scheduler", "Retired {}", entry);
                } else {
                    warn!(target: "scheduler", "Dropped {}: binding can no longer become active", entry);
                }
                continue;
            }

            let outcome = entry.trigger();

            if entry.is_repeating() {
                if let TriggerOutcome::Faulted(message) = &outcome {
                    error!(target: "scheduler", "{} faulted: {}", entry, message);
                }
                surviving.push(entry);
                continue;
            }

            match outcome {
                TriggerOutcome::Done => {
                    debug!(target: "scheduler", "Completed {}", entry);
                }
                TriggerOutcome::Pending => {
                    gate.block(entry.lane());
                    surviving.push(entry);
                }
                TriggerOutcome::Faulted(message) => {
                    error!(target: "scheduler", "{} faulted: {}", entry, message);
                    if self.fault_policy == FaultPolicy::Block {
                        gate.block(entry.lane());
                        surviving.push(entry);
                    }
                }
            }
        }

        self.active = surviving;
        gate
    }

    //--- Micro-step -------------------------------------------------------

    fn advance(&self) {
        let step = self.dispatcher.with_position(|position| {
            let current = position.current?;
            let transitioning = position.next != position.current;

            match (transitioning, position.event) {
                (true, StateEvent::Idle) => {
                    position.event = StateEvent::End;
                    Some((current, StateEvent::End))
                }
                (true, StateEvent::End) => {
                    let next = position.next?;
                    position.current = Some(next);
                    position.event = StateEvent::Begin;
                    Some((next, StateEvent::Begin))
                }
                // Also when a transition was requested during Begin, so it
                // proceeds through Idle instead of stalling.
                (_, StateEvent::Begin) => {
                    position.event = StateEvent::Idle;
                    Some((current, StateEvent::Idle))
                }
                _ => None,
            }
        });

        if let Some((state, event)) = step {
            if let Err(err) = self.dispatcher.dispatch(state, event) {
                error!(target: "scheduler", "Dispatching {:?}/{} failed: {}", state, event, err);
            }
        }
    }
}

//=========================================================================
// Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::*;
    use crate::core::event_bus::EventBus;
    use crate::core::scheduler::{Completion, EntryOptions, ScheduleError, StateChanged};
    use crate::core::states::game::{
        GamePayload, GameState, HomePayload, InitializePayload, SessionPayload,
    };
    use crate::core::states::StateContext;

    const DT: f64 = 1.0 / 60.0;

    type Log = Rc<RefCell<Vec<String>>>;

    //--- Fixtures ---------------------------------------------------------

    struct Probe {
        state: GameState,
        log: Log,
    }

    impl Probe {
        fn record(&self, what: &str) {
            self.log.borrow_mut().push(format!("{:?}:{}", self.state, what));
        }
    }

    impl StateHandler<GamePayload> for Probe {
        fn initialize(&mut self, _payload: &GamePayload) {
            self.record("init");
        }

        fn begin(&mut self, _ctx: &StateContext<'_, GamePayload>) {
            self.record("Begin");
        }

        fn idle(&mut self, _ctx: &StateContext<'_, GamePayload>) {
            self.record("Idle");
        }

        fn end(&mut self, _ctx: &StateContext<'_, GamePayload>) {
            self.record("End");
        }
    }

    fn boot() -> GamePayload {
        GamePayload::Initialize(InitializePayload::default())
    }

    fn home() -> GamePayload {
        GamePayload::Home(HomePayload::default())
    }

    fn game() -> GamePayload {
        GamePayload::Game(SessionPayload {
            save_slot: None,
            galaxy_seed: 7,
        })
    }

    fn builder(log: &Log) -> StateMachineBuilder<GamePayload> {
        GameState::ALL.iter().fold(StateMachine::builder(), |builder, &state| {
            builder.register_state(
                state,
                Probe {
                    state,
                    log: log.clone(),
                },
            )
        })
    }

    fn machine() -> (StateMachine<GamePayload>, Log) {
        let log = Log::default();
        let machine = builder(&log).build().expect("every state registered");
        (machine, log)
    }

    /// Brings a machine to (Home, Idle).
    fn settle_home(machine: &mut StateMachine<GamePayload>) {
        machine.request_state(home()).expect("home request");
        machine.on_tick(DT);
        assert_pair(machine, GameState::Home, StateEvent::Idle);
    }

    fn at_home_idle() -> (StateMachine<GamePayload>, Log) {
        let (mut machine, log) = machine();
        settle_home(&mut machine);
        (machine, log)
    }

    fn assert_pair(machine: &StateMachine<GamePayload>, state: GameState, event: StateEvent) {
        let position = machine.position();
        assert_eq!(
            (position.current, position.event),
            (Some(state), event),
            "unexpected active pair"
        );
    }

    fn counter(count: &Rc<Cell<u32>>) -> impl FnMut() + 'static {
        let count = count.clone();
        move || count.set(count.get() + 1)
    }

    fn stash() -> Rc<RefCell<Option<Completion>>> {
        Rc::new(RefCell::new(None))
    }

    //=====================================================================
    // Construction
    //=====================================================================

    #[test]
    fn build_requires_every_state() {
        let log = Log::default();
        let result = StateMachine::<GamePayload>::builder()
            .register_state(
                GameState::Home,
                Probe {
                    state: GameState::Home,
                    log,
                },
            )
            .build();

        assert!(matches!(
            result,
            Err(TransitionError::UnregisteredState(GameState::Initialize))
        ));
    }

    #[test]
    fn first_request_begins_immediately() {
        let (machine, log) = machine();
        machine.request_state(boot()).expect("boot request");

        assert_pair(&machine, GameState::Initialize, StateEvent::Begin);
        assert_eq!(*log.borrow(), vec!["Initialize:init", "Initialize:Begin"]);
    }

    //=====================================================================
    // Draining
    //=====================================================================

    #[test]
    fn entries_run_fifo_and_are_removed() {
        let (mut machine, _) = at_home_idle();
        let order = Rc::new(RefCell::new(Vec::new()));

        for name in ["first", "second", "third"] {
            let order = order.clone();
            machine
                .dispatcher()
                .push("Tests", name, move || order.borrow_mut().push(name))
                .expect("valid push");
        }

        machine.on_tick(DT);

        assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
        assert!(machine.entries().is_empty());
    }

    #[test]
    fn blocking_entry_halts_strangers_not_kin() {
        let (mut machine, _) = at_home_idle();
        let dispatcher = machine.dispatcher().clone();
        let order = Rc::new(RefCell::new(Vec::new()));
        let done = stash();

        let (order_in, done_in) = (order.clone(), done.clone());
        dispatcher
            .push_blocking_with("Tests", "E1", EntryOptions::new().lane("A"), move |completion| {
                order_in.borrow_mut().push("E1");
                *done_in.borrow_mut() = Some(completion);
            })
            .expect("valid push");

        let order_in = order.clone();
        dispatcher
            .push("Tests", "E2", move || order_in.borrow_mut().push("E2"))
            .expect("valid push");

        let order_in = order.clone();
        dispatcher
            .push_with("Tests", "E3", EntryOptions::new().lane("A"), move || {
                order_in.borrow_mut().push("E3")
            })
            .expect("valid push");

        machine.on_tick(DT);
        assert_eq!(*order.borrow(), vec!["E1", "E3"]);

        let statuses: Vec<_> = machine.entries().iter().map(|e| e.status).collect();
        assert_eq!(statuses, vec![EntryStatus::Blocking, EntryStatus::Blocked]);

        machine.on_tick(DT);
        assert_eq!(*order.borrow(), vec!["E1", "E3"]);

        done.borrow().as_ref().expect("E1 started").complete();
        machine.on_tick(DT);

        assert_eq!(*order.borrow(), vec!["E1", "E3", "E2"]);
        assert!(machine.entries().is_empty());
    }

    #[test]
    fn push_from_trigger_runs_next_tick() {
        let (mut machine, _) = at_home_idle();
        let dispatcher = machine.dispatcher().clone();
        let inner_runs = Rc::new(Cell::new(0));

        let inner = inner_runs.clone();
        machine
            .dispatcher()
            .push("Tests", "outer", move || {
                dispatcher
                    .push("Tests", "inner", counter(&inner))
                    .expect("reentrant push");
            })
            .expect("valid push");

        machine.on_tick(DT);
        assert_eq!(inner_runs.get(), 0);
        assert_eq!(machine.dispatcher().pending_len(), 1);

        machine.on_tick(DT);
        assert_eq!(inner_runs.get(), 1);
    }

    #[test]
    fn unreachable_binding_is_dropped_untriggered() {
        let (mut machine, _) = at_home_idle();
        let runs = Rc::new(Cell::new(0));

        machine
            .dispatcher()
            .push_with(
                "Tests",
                "boot-only work",
                EntryOptions::new().bound_to(GameState::Initialize, StateEvent::Begin),
                counter(&runs),
            )
            .expect("valid push");

        machine.on_tick(DT);

        assert_eq!(runs.get(), 0);
        assert!(machine.entries().is_empty());
    }

    //=====================================================================
    // Repeating & Cancellation
    //=====================================================================

    #[test]
    fn repeating_entry_never_self_removes() {
        let (mut machine, _) = at_home_idle();
        machine.request_state(game()).expect("game request");
        for _ in 0..3 {
            machine.on_tick(DT);
        }
        assert_pair(&machine, GameState::Game, StateEvent::Idle);

        let runs = Rc::new(Cell::new(0));
        machine
            .dispatcher()
            .push_with("Tests", "scan sector", EntryOptions::new().repeating(), counter(&runs))
            .expect("valid push");

        for _ in 0..50 {
            machine.on_tick(DT);
        }

        assert_eq!(runs.get(), 50);
        let entries = machine.entries();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].repeating);
        assert_eq!(entries[0].binding.state, GameState::Game);
        assert_eq!(entries[0].binding.event, StateEvent::Idle);
    }

    #[test]
    fn cancelled_repeating_entry_is_removed() {
        let (mut machine, _) = at_home_idle();
        let runs = Rc::new(Cell::new(0));

        let handle = machine
            .dispatcher()
            .push_with("Tests", "poll beacon", EntryOptions::new().repeating(), counter(&runs))
            .expect("valid push");

        machine.on_tick(DT);
        machine.on_tick(DT);
        handle.cancel();
        machine.on_tick(DT);

        assert_eq!(runs.get(), 2);
        assert!(machine.entries().is_empty());
    }

    #[test]
    fn repeating_entry_retires_when_state_is_left() {
        let (mut machine, _) = at_home_idle();
        let runs = Rc::new(Cell::new(0));

        machine
            .dispatcher()
            .push_with("Tests", "menu ambience", EntryOptions::new().repeating(), counter(&runs))
            .expect("valid push");
        machine.on_tick(DT);

        machine.request_state(game()).expect("game request");
        machine.on_tick(DT); // runs once more, then Home → End
        machine.on_tick(DT); // (Home, End): waiting; commit Game
        machine.on_tick(DT); // Home neither current nor next: retired

        assert_eq!(runs.get(), 2);
        assert!(machine.entries().is_empty());
    }

    //=====================================================================
    // Transitions
    //=====================================================================

    #[test]
    fn request_state_is_idempotent() {
        let (machine, log) = at_home_idle();

        machine.request_state(game()).expect("first request");
        machine.request_state(game()).expect("second request");

        let inits = log.borrow().iter().filter(|l| *l == "Game:init").count();
        assert_eq!(inits, 1);
        assert_eq!(machine.position().next, Some(GameState::Game));
    }

    #[test]
    fn concurrent_transition_is_rejected() {
        let (mut machine, _) = at_home_idle();
        machine.request_state(game()).expect("game request");

        let err = machine.request_state(boot()).unwrap_err();
        assert_eq!(
            err,
            TransitionError::TransitionInProgress {
                current: Some(GameState::Home),
                next: Some(GameState::Game),
                requested: GameState::Initialize,
            }
        );
        assert_eq!(machine.position().next, Some(GameState::Game));

        machine.on_tick(DT);
        machine.on_tick(DT);
        assert_pair(&machine, GameState::Game, StateEvent::Begin);
    }

    #[test]
    fn transition_takes_two_ticks() {
        let (mut machine, log) = at_home_idle();
        machine.request_state(game()).expect("game request");

        machine.on_tick(DT);
        assert_pair(&machine, GameState::Home, StateEvent::End);

        machine.on_tick(DT);
        assert_pair(&machine, GameState::Game, StateEvent::Begin);

        machine.on_tick(DT);
        assert_pair(&machine, GameState::Game, StateEvent::Idle);

        assert_eq!(
            *log.borrow(),
            vec![
                "Home:init",
                "Home:Begin",
                "Home:Idle",
                "Game:init",
                "Home:End",
                "Game:Begin",
                "Game:Idle",
            ]
        );
    }

    #[test]
    fn idle_is_entered_once() {
        let (mut machine, log) = at_home_idle();
        for _ in 0..10 {
            machine.on_tick(DT);
        }

        let idles = log.borrow().iter().filter(|l| *l == "Home:Idle").count();
        assert_eq!(idles, 1);
    }

    #[test]
    fn request_during_begin_proceeds_through_idle() {
        let (mut machine, _) = machine();
        machine.request_state(home()).expect("home request");
        machine.request_state(game()).expect("game request");

        machine.on_tick(DT);
        assert_pair(&machine, GameState::Home, StateEvent::Idle);
        machine.on_tick(DT);
        assert_pair(&machine, GameState::Home, StateEvent::End);
        machine.on_tick(DT);
        assert_pair(&machine, GameState::Game, StateEvent::Begin);
    }

    #[test]
    fn dormant_binding_waits_for_its_turn() {
        let (mut machine, _) = at_home_idle();
        machine.request_state(game()).expect("game request");
        let runs = Rc::new(Cell::new(0));

        machine
            .dispatcher()
            .push_with(
                "Tests",
                "spawn fleet",
                EntryOptions::new().bound_to(GameState::Game, StateEvent::Begin),
                counter(&runs),
            )
            .expect("valid push");

        machine.on_tick(DT);
        assert_eq!(runs.get(), 0);
        assert_eq!(machine.entries()[0].status, EntryStatus::Waiting);

        machine.on_tick(DT);
        assert_pair(&machine, GameState::Game, StateEvent::Begin);
        assert_eq!(runs.get(), 0);

        machine.on_tick(DT);
        assert_eq!(runs.get(), 1);

        machine.on_tick(DT);
        assert_eq!(runs.get(), 1);
        assert!(machine.entries().is_empty());
    }

    #[test]
    fn blocking_entry_holds_transition() {
        let (mut machine, _) = at_home_idle();
        let done = stash();

        let done_in = done.clone();
        machine
            .dispatcher()
            .push_blocking("Tests", "autosave", move |completion| {
                *done_in.borrow_mut() = Some(completion);
            })
            .expect("valid push");

        machine.on_tick(DT);
        machine.request_state(game()).expect("game request");
        for _ in 0..3 {
            machine.on_tick(DT);
        }
        assert_pair(&machine, GameState::Home, StateEvent::Idle);

        done.borrow().as_ref().expect("autosave started").complete();
        machine.on_tick(DT);
        assert_pair(&machine, GameState::Home, StateEvent::End);
        assert!(machine.entries().is_empty());
    }

    #[test]
    fn blocking_until_condition_holds_transition() {
        let (mut machine, _) = at_home_idle();
        let ready = Rc::new(Cell::new(false));
        let started = Rc::new(Cell::new(0));

        let (ready_in, started_in) = (ready.clone(), started.clone());
        machine
            .dispatcher()
            .push_blocking_until(
                "Tests",
                "warm up jump drive",
                move || started_in.set(started_in.get() + 1),
                move || ready_in.get(),
            )
            .expect("valid push");
        machine.request_state(game()).expect("game request");

        machine.on_tick(DT);
        machine.on_tick(DT);
        assert_pair(&machine, GameState::Home, StateEvent::Idle);

        ready.set(true);
        machine.on_tick(DT);
        assert_pair(&machine, GameState::Home, StateEvent::End);
        assert_eq!(started.get(), 1);
    }

    #[test]
    fn work_pushed_from_begin_holds_idle() {
        struct Loader {
            done: Rc<RefCell<Option<Completion>>>,
        }

        impl StateHandler<GamePayload> for Loader {
            fn begin(&mut self, ctx: &StateContext<'_, GamePayload>) {
                let done = self.done.clone();
                ctx.dispatcher()
                    .push_blocking("Loader", "load sector", move |completion| {
                        *done.borrow_mut() = Some(completion);
                    })
                    .expect("valid push");
            }
        }

        let log = Log::default();
        let done = stash();
        let mut machine = builder(&log)
            .register_state(GameState::Game, Loader { done: done.clone() })
            .build()
            .expect("every state registered");

        machine.request_state(game()).expect("game request");
        for _ in 0..3 {
            machine.on_tick(DT);
        }
        assert_pair(&machine, GameState::Game, StateEvent::Begin);

        done.borrow().as_ref().expect("load started").complete();
        machine.on_tick(DT);
        assert_pair(&machine, GameState::Game, StateEvent::Idle);
    }

    //=====================================================================
    // Faults
    //=====================================================================

    #[test]
    fn fault_counts_as_completion_by_default() {
        let (mut machine, _) = at_home_idle();
        machine
            .dispatcher()
            .push("Tests", "corrupt save", || panic!("checksum mismatch"))
            .expect("valid push");
        machine.request_state(game()).expect("game request");

        machine.on_tick(DT);

        assert!(machine.entries().is_empty());
        assert_pair(&machine, GameState::Home, StateEvent::End);
    }

    #[test]
    fn fault_blocks_under_block_policy() {
        let log = Log::default();
        let mut machine = builder(&log)
            .with_fault_policy(FaultPolicy::Block)
            .build()
            .expect("every state registered");
        settle_home(&mut machine);

        machine
            .dispatcher()
            .push("Tests", "corrupt save", || panic!("checksum mismatch"))
            .expect("valid push");
        machine.request_state(game()).expect("game request");

        machine.on_tick(DT);
        machine.on_tick(DT);

        assert_pair(&machine, GameState::Home, StateEvent::Idle);
        let entries = machine.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, EntryStatus::Faulted);
    }

    //=====================================================================
    // Validation
    //=====================================================================

    #[test]
    fn push_without_active_state_is_rejected() {
        let (machine, _) = machine();
        let result = machine.dispatcher().push("Tests", "too early", || {});
        assert_eq!(result.unwrap_err(), ScheduleError::NoActiveState);
    }

    #[test]
    fn push_arguments_are_validated() {
        let (machine, _) = at_home_idle();
        let dispatcher = machine.dispatcher();

        assert_eq!(
            dispatcher.push("Tests", "   ", || {}).unwrap_err(),
            ScheduleError::BlankDescription
        );
        assert_eq!(
            dispatcher.push("", "work", || {}).unwrap_err(),
            ScheduleError::BlankCaller
        );
        assert_eq!(
            dispatcher
                .push_with(
                    "Tests",
                    "work",
                    EntryOptions::new().bound_to(GameState::Home, StateEvent::Unknown),
                    || {}
                )
                .unwrap_err(),
            ScheduleError::UnknownEvent
        );
        assert_eq!(
            dispatcher
                .push_blocking_with("Tests", "work", EntryOptions::new().repeating(), |done| {
                    done.complete()
                })
                .unwrap_err(),
            ScheduleError::RepeatingBlocking
        );
        assert_eq!(dispatcher.pending_len(), 0);
    }

    //=====================================================================
    // Notifications & Debugging
    //=====================================================================

    #[test]
    fn state_changes_are_published_in_order() {
        let log = Log::default();
        let bus = Rc::new(RefCell::new(EventBus::new()));
        let mut machine = builder(&log)
            .with_publisher(bus.clone())
            .build()
            .expect("every state registered");

        settle_home(&mut machine);
        machine.request_state(game()).expect("game request");
        machine.on_tick(DT);
        machine.on_tick(DT);

        let bus = bus.borrow();
        let changes = bus.read::<StateChanged<GamePayload>>();
        let pairs: Vec<_> = changes.iter().map(|c| (c.state, c.event)).collect();
        assert_eq!(
            pairs,
            vec![
                (GameState::Home, StateEvent::Begin),
                (GameState::Home, StateEvent::Idle),
                (GameState::Home, StateEvent::End),
                (GameState::Game, StateEvent::Begin),
            ]
        );
        assert_eq!(changes[3].payload, game());
    }

    #[test]
    fn break_entry_runs_hook() {
        let log = Log::default();
        let hits = Rc::new(RefCell::new(Vec::new()));
        let hits_in = hits.clone();
        let mut machine = builder(&log)
            .with_break_hook(move |caller| hits_in.borrow_mut().push(caller.to_string()))
            .build()
            .expect("every state registered");
        settle_home(&mut machine);

        machine.dispatcher().push_break("NavigationPresenter").expect("valid push");
        machine.on_tick(DT);

        assert_eq!(*hits.borrow(), vec!["NavigationPresenter".to_string()]);
    }

    #[test]
    fn frame_and_elapsed_accumulate() {
        let (mut machine, _) = machine();
        machine.on_tick(0.5);
        machine.on_tick(0.25);

        assert_eq!(machine.frame(), 2);
        assert!((machine.elapsed() - 0.75).abs() < f64::EPSILON);
    }
}
