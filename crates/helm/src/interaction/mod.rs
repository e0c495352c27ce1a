//! Touch interaction core: slot placements, hit-testing, gesture timing and the drag session.

pub mod drag;
pub mod engine;
pub mod gesture;
pub mod hit;
pub mod placement;
pub mod slot;
pub mod timer;

pub use drag::{
    CancelReason, DragController, DragOutcome, DragPayload, Placement, PlaceCallback, Stage,
    StartError,
};
pub use engine::{Engine, Interaction};
pub use gesture::{
    Gesture, GestureClassifier, GestureConfig, GesturePhase, Origin, PointerEvent, PointerId,
    PointerPhase,
};
pub use hit::{Hit, HitResolver, HitTier, Registry, Role};
pub use placement::{PlacementMap, PlacementStore};
pub use slot::{Group, ParseSlotError, SlotIndex};

use std::cell::Cell;
use std::rc::Rc;

pub const SLOT_COUNT: usize = 8;
pub const GROUP_SIZE: usize = 4;

/// Shared "edit mode" flag. Clones observe the same value.
#[derive(Debug, Clone, Default)]
pub struct EditMode(Rc<Cell<bool>>);

impl EditMode {
    pub fn new(active: bool) -> Self {
        Self(Rc::new(Cell::new(active)))
    }

    pub fn is_active(&self) -> bool {
        self.0.get()
    }

    pub fn set(&self, active: bool) {
        self.0.set(active);
    }

    /// Returns the new value.
    pub fn toggle(&self) -> bool {
        let active = !self.0.get();
        self.0.set(active);
        active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_mode_is_shared_between_clones() {
        let owner = EditMode::default();
        let observer = owner.clone();

        assert!(owner.toggle());
        assert!(observer.is_active());

        observer.set(false);
        assert!(!owner.is_active());
    }
}
