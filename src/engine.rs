//=========================================================================
// Starward Engine
//
// Main entry point: owns the state machine and drives it from the
// heartbeat until a state asks to exit.
//
// Architecture:
// ```text
//     EngineBuilder  ──build()──>  Engine  ──run(initial)──>  [Runtime]
//         │                          │
//         ├─ with_tps()              ├─ requests the initial state
//         ├─ with_channel_capacity() ├─ spawns the heartbeat
//         └─ register_state() ...    └─ ticks until exit is requested
// ```
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;

use log::{error, info};

//=== Internal Dependencies ===============================================

use crate::core::heartbeat::{Heartbeat, HeartbeatEvent};
use crate::core::scheduler::{
    Dispatcher, FaultPolicy, StateMachine, StateMachineBuilder, StatePublisher, TransitionError,
};
use crate::core::states::{StateHandler, StateKey, StateOf, StatePayload};

//=== EngineError =========================================================

/// Failures that stop [`Engine::run`] or [`EngineBuilder::build`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError<S: StateKey> {
    /// Building the state machine or requesting the initial state failed.
    Transition(TransitionError<S>),

    /// The heartbeat thread stopped before exit was requested.
    HeartbeatStopped,
}

impl<S: StateKey> fmt::Display for EngineError<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transition(err) => write!(f, "State transition failed: {}", err),
            Self::HeartbeatStopped => write!(f, "Heartbeat stopped unexpectedly"),
        }
    }
}

impl<S: StateKey> std::error::Error for EngineError<S> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transition(err) => Some(err),
            Self::HeartbeatStopped => None,
        }
    }
}

impl<S: StateKey> From<TransitionError<S>> for EngineError<S> {
    fn from(err: TransitionError<S>) -> Self {
        Self::Transition(err)
    }
}

//=== EngineBuilder =======================================================

/// Builder for configuring and constructing an [`Engine`].
///
/// # Default Values
///
/// - **TPS**: 60.0 (scheduler ticks per second)
/// - **Channel capacity**: 128 heartbeat frames
/// - **Fault policy**: [`FaultPolicy::Complete`]
///
/// # Examples
///
/// ```no_run
/// use starward::EngineBuilder;
/// use starward::core::states::StateHandler;
/// use starward::core::states::game::{GamePayload, GameState, InitializePayload};
///
/// struct Quiet;
/// impl StateHandler<GamePayload> for Quiet {}
///
/// let mut engine = EngineBuilder::<GamePayload>::new()
///     .with_tps(120.0)
///     .register_state(GameState::Initialize, Quiet)
///     .register_state(GameState::Home, Quiet)
///     .register_state(GameState::Game, Quiet)
///     .build()
///     .expect("every state registered");
///
/// engine
///     .run(GamePayload::Initialize(InitializePayload::default()))
///     .expect("clean exit");
/// ```
pub struct EngineBuilder<P: StatePayload> {
    tps: f64,
    channel_capacity: usize,
    state_machine: StateMachineBuilder<P>,
}

impl<P: StatePayload> EngineBuilder<P> {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            tps: 60.0,
            channel_capacity: 128,
            state_machine: StateMachineBuilder::new(),
        }
    }

    /// Sets the target ticks per second for the scheduler.
    ///
    /// Default: 60.0
    ///
    /// # Panics
    ///
    /// Panics if `tps <= 0.0`.
    pub fn with_tps(mut self, tps: f64) -> Self {
        assert!(tps > 0.0, "TPS must be positive, got {}", tps);
        self.tps = tps;
        self
    }

    /// Sets how many heartbeat frames may queue up while a tick runs long.
    ///
    /// Default: 128
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        assert!(capacity > 0, "Channel capacity must be positive");
        self.channel_capacity = capacity;
        self
    }

    //--- State Machine Options --------------------------------------------

    pub fn register_state<H>(mut self, state: StateOf<P>, handler: H) -> Self
    where
        H: StateHandler<P> + 'static,
    {
        self.state_machine = self.state_machine.register_state(state, handler);
        self
    }

    pub fn with_publisher<T>(mut self, publisher: T) -> Self
    where
        T: StatePublisher<P> + 'static,
    {
        self.state_machine = self.state_machine.with_publisher(publisher);
        self
    }

    pub fn with_fault_policy(mut self, policy: FaultPolicy) -> Self {
        self.state_machine = self.state_machine.with_fault_policy(policy);
        self
    }

    pub fn with_break_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) + 'static,
    {
        self.state_machine = self.state_machine.with_break_hook(hook);
        self
    }

    //--- Build ------------------------------------------------------------

    /// Builds the engine.
    ///
    /// # Errors
    ///
    /// [`EngineError::Transition`] if a state has no handler.
    pub fn build(self) -> Result<Engine<P>, EngineError<StateOf<P>>> {
        info!("Building engine (TPS: {}, channel: {})", self.tps, self.channel_capacity);

        Ok(Engine {
            state_machine: self.state_machine.build()?,
            tps: self.tps,
            channel_capacity: self.channel_capacity,
        })
    }
}

impl<P: StatePayload> Default for EngineBuilder<P> {
    fn default() -> Self {
        Self::new()
    }
}

//=== Engine ==============================================================

/// Starward runtime.
///
/// # Architecture
///
/// ```text
/// Engine (calling thread)
///   ├─► StateMachine: drain + micro-step, once per frame
///   │
///   └─► Heartbeat (clock thread @ TPS)
///         └─► Update { delta } over a bounded channel
/// ```
pub struct Engine<P: StatePayload> {
    state_machine: StateMachine<P>,
    tps: f64,
    channel_capacity: usize,
}

impl<P: StatePayload> Engine<P> {
    //--- Accessors --------------------------------------------------------

    /// Handle for pushing work and requesting states before or during
    /// [`run`](Self::run).
    pub fn dispatcher(&self) -> Dispatcher<P> {
        self.state_machine.dispatcher().clone()
    }

    pub fn state_machine(&self) -> &StateMachine<P> {
        &self.state_machine
    }

    //--- Execution --------------------------------------------------------

    /// Requests `initial` and ticks the state machine until a state calls
    /// [`Dispatcher::request_exit`].
    ///
    /// # Lifecycle
    ///
    /// 1. Requests the initial state (its Begin runs immediately)
    /// 2. Spawns the heartbeat at the configured TPS
    /// 3. Ticks once per heartbeat frame
    /// 4. On exit: stops and joins the heartbeat thread
    ///
    /// # Errors
    ///
    /// - [`EngineError::Transition`] if the initial request is rejected
    /// - [`EngineError::HeartbeatStopped`] if the clock thread dies
    pub fn run(&mut self, initial: P) -> Result<(), EngineError<StateOf<P>>> {
        info!("Starting engine runtime (TPS: {})", self.tps);

        //--- 1. Enter the initial state ---------------------------------
        self.state_machine.request_state(initial)?;

        //--- 2. Start the clock -------------------------------------------
        let mut heartbeat = Heartbeat::spawn(self.tps, self.channel_capacity);

        //--- 3. Tick until exit -------------------------------------------
        while !self.state_machine.dispatcher().exit_requested() {
            match heartbeat.recv() {
                Ok(HeartbeatEvent::Update { delta }) => self.state_machine.on_tick(delta),
                Err(_) => {
                    error!("Heartbeat disconnected before exit was requested");
                    return Err(EngineError::HeartbeatStopped);
                }
            }
        }

        //--- 4. Cleanup ---------------------------------------------------
        heartbeat.stop();

        info!(
            "Engine shutdown complete ({} frames, {:.2}s)",
            self.state_machine.frame(),
            self.state_machine.elapsed()
        );
        Ok(())
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
