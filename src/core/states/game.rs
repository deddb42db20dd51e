//=========================================================================
// Game States
//=========================================================================
//
// The closed set of states the Starward client moves through, and the
// payload sum type that selects between them.
//
//   Initialize ──> Home ──> Game
//                   ↑        │
//                   └────────┘
//
//=========================================================================

//=== Internal Dependencies ===============================================

use super::{StateKey, StatePayload};

//=== GameState ===========================================================

/// Top-level application state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameState {
    /// Boot: services, settings and saves are brought up.
    Initialize,

    /// Main menu and galaxy overview.
    Home,

    /// In-flight simulation.
    Game,
}

impl StateKey for GameState {
    const ALL: &'static [Self] = &[Self::Initialize, Self::Home, Self::Game];
}

//=== Payloads ============================================================

/// Request to (re)enter the boot state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitializePayload {
    /// Skip the splash sequence (set on soft restarts).
    pub skip_intro: bool,
}

/// Request to show the home screen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HomePayload {
    /// Open the save browser instead of the main menu.
    pub open_saves: bool,
}

/// Request to start or resume a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionPayload {
    /// Save slot to load, or `None` for a new expedition.
    pub save_slot: Option<u32>,

    /// Seed for a new galaxy. Ignored when loading a save.
    pub galaxy_seed: u64,
}

/// Payload of a state request, one variant per [`GameState`].
#[derive(Debug, Clone, PartialEq)]
pub enum GamePayload {
    Initialize(InitializePayload),
    Home(HomePayload),
    Game(SessionPayload),
}

impl StatePayload for GamePayload {
    type State = GameState;

    fn state(&self) -> GameState {
        match self {
            Self::Initialize(_) => GameState::Initialize,
            Self::Home(_) => GameState::Home,
            Self::Game(_) => GameState::Game,
        }
    }
}

impl From<InitializePayload> for GamePayload {
    fn from(payload: InitializePayload) -> Self {
        Self::Initialize(payload)
    }
}

impl From<HomePayload> for GamePayload {
    fn from(payload: HomePayload) -> Self {
        Self::Home(payload)
    }
}

impl From<SessionPayload> for GamePayload {
    fn from(payload: SessionPayload) -> Self {
        Self::Game(payload)
    }
}

//=== Tests ===============================================================
