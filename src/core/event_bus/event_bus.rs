//=========================================================================
// Event Bus
//=========================================================================
//
// Pattern: publish → read (N consumers) → clear | drain → repeat
//
//=========================================================================

//=== External Dependencies ===============================================

use std::any::TypeId;
use std::collections::HashMap;

//=== Internal Dependencies ===============================================

use super::event_queue::EventQueue;

//=== Public API ==========================================================

/// Marker trait for types that can travel on the [`EventBus`].
///
/// Implemented for every `'static` type. The bus lives on the scheduler
/// thread, so events need not be `Send`.
pub trait Event: 'static {}

impl<T: 'static> Event for T {}

//=========================================================================

/// Process-wide bus keeping one queue per event type.
///
/// Events stay queued until explicitly cleared or drained, so several
/// systems can observe the same notification.
#[derive(Default)]
pub struct EventBus {
    queues: HashMap<TypeId, Box<dyn EventQueue>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            queues: HashMap::new(),
        }
    }

    //--- Publishing -------------------------------------------------------

    /// Appends an event to the queue for its type.
    pub fn publish<E: Event>(&mut self, event: E) {
        let queue = self
            .queues
            .entry(TypeId::of::<E>())
            .or_insert_with(|| Box::new(Vec::<E>::new()));

        // Keyed by TypeId, so the downcast always matches.
        if let Some(queue) = queue.as_any_mut().downcast_mut::<Vec<E>>() {
            queue.push(event);
        }
    }

    //--- Consuming --------------------------------------------------------

    /// All queued events of type `E`, oldest first.
    pub fn read<E: Event>(&self) -> &[E] {
        self.queue::<E>().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Removes and returns all queued events of type `E`.
    pub fn drain<E: Event>(&mut self) -> Vec<E> {
        self.queues
            .get_mut(&TypeId::of::<E>())
            .and_then(|q| q.as_any_mut().downcast_mut::<Vec<E>>())
            .map(|q| q.drain(..).collect())
            .unwrap_or_default()
    }

    //--- Query API --------------------------------------------------------

    pub fn has_events<E: Event>(&self) -> bool {
        self.count::<E>() > 0
    }

    pub fn count<E: Event>(&self) -> usize {
        self.queues
            .get(&TypeId::of::<E>())
            .map(|q| q.len())
            .unwrap_or(0)
    }

    //--- Clearing ---------------------------------------------------------

    /// Clears events of type `E`, keeping the allocation for reuse.
    pub fn clear<E: Event>(&mut self) {
        if let Some(queue) = self.queues.get_mut(&TypeId::of::<E>()) {
            queue.clear_queue();
        }
    }

    /// Clears every queue, keeping allocations.
    pub fn clear_all(&mut self) {
        for queue in self.queues.values_mut() {
            queue.clear_queue();
        }
    }

    //--- Internal Helpers -------------------------------------------------

    fn queue<E: Event>(&self) -> Option<&Vec<E>> {
        self.queues
            .get(&TypeId::of::<E>())
            .and_then(|q| q.as_any().downcast_ref::<Vec<E>>())
    }
}

//=========================================================================
// Tests
//=========================================================================
