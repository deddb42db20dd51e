//=========================================================================
// Event Queue Trait
//=========================================================================
//
// Type-erased view of a `Vec<E>` so queues of different event types can
// share one HashMap.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::any::Any;

//=== Internal Dependencies ===============================================

use super::Event;

//=========================================================================

/// Operations on an event queue that do not need the concrete type.
pub(super) trait EventQueue {
    /// Clears all events while keeping the allocation.
    fn clear_queue(&mut self);

    fn len(&self) -> usize;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<E: Event> EventQueue for Vec<E> {
    fn clear_queue(&mut self) {
        self.clear();
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

//=========================================================================
// Tests
//=========================================================================
