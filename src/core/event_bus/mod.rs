//=========================================================================
// Event Bus
//=========================================================================
//
// Typed, per-type event queues shared by the systems living on the
// scheduler thread.
//
// Architecture:
//   StatePublisher → publish<E>() → HashMap<TypeId, Vec<E>>
//                                        ↓
//   Presenters, saves, analytics ← read<E>() (shared)
//                                        ↓
//   Owner of the frame ─────────→ clear<E>() / drain<E>()
//
//=========================================================================

//=== Module Declarations =================================================

mod event_bus;
mod event_queue;

//=== Public API ==========================================================

pub use event_bus::{Event, EventBus};
