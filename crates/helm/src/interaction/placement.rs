use super::SLOT_COUNT;
use super::slot::SlotIndex;
use crate::catalog::ActionId;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

/// Assignment of actions to the eight slots at one point in time.
///
/// An action id appears in at most one slot. All mutation goes through
/// [`PlacementMap::with_move`] and [`PlacementMap::with_cleared`], which preserve that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct PlacementMap([Option<ActionId>; SLOT_COUNT]);

impl PlacementMap {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Applies `(slot, action)` pairs in order, as if each were dropped in turn.
    pub fn from_assignments(assignments: impl IntoIterator<Item = (SlotIndex, ActionId)>) -> Self {
        assignments
            .into_iter()
            .fold(Self::empty(), |map, (slot, action)| map.with_move(action, slot))
    }

    pub fn get(&self, slot: SlotIndex) -> Option<ActionId> {
        self.0[slot.as_index()]
    }

    pub fn slot_of(&self, action: ActionId) -> Option<SlotIndex> {
        SlotIndex::ALL
            .into_iter()
            .find(|&slot| self.get(slot) == Some(action))
    }

    pub fn is_placed(&self, action: ActionId) -> bool {
        self.slot_of(action).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotIndex, Option<ActionId>)> + '_ {
        SlotIndex::ALL.into_iter().map(|slot| (slot, self.get(slot)))
    }

    /// Places `action` at `destination`, vacating its previous slot. Whatever occupied
    /// `destination` becomes unplaced.
    pub fn with_move(&self, action: ActionId, destination: SlotIndex) -> Self {
        let mut next = *self;
        if let Some(source) = self.slot_of(action) {
            next.0[source.as_index()] = None;
        }
        next.0[destination.as_index()] = Some(action);
        next
    }

    pub fn with_cleared(&self, slot: SlotIndex) -> Self {
        let mut next = *self;
        next.0[slot.as_index()] = None;
        next
    }
}

/// Shared owner of the current [`PlacementMap`].
///
/// Every mutation swaps in a whole new snapshot under one write lock, so a reader
/// holding an `Arc` from [`PlacementStore::snapshot`] never sees half of a move.
#[derive(Debug, Clone, Default)]
pub struct PlacementStore {
    current: Arc<RwLock<Arc<PlacementMap>>>,
}

impl PlacementStore {
    pub fn new(initial: PlacementMap) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(initial))),
        }
    }

    pub fn snapshot(&self) -> Arc<PlacementMap> {
        self.current.read().clone()
    }

    /// Returns the unchanged snapshot (same `Arc`) when `action` already sits at
    /// `destination`.
    pub fn move_action(&self, action: ActionId, destination: SlotIndex) -> Arc<PlacementMap> {
        let mut current = self.current.write();
        if current.get(destination) == Some(action) {
            return current.clone();
        }
        *current = Arc::new(current.with_move(action, destination));
        current.clone()
    }

    pub fn clear(&self, slot: SlotIndex) -> Arc<PlacementMap> {
        let mut current = self.current.write();
        *current = Arc::new(current.with_cleared(slot));
        current.clone()
    }

    pub fn replace(&self, map: PlacementMap) -> Arc<PlacementMap> {
        let mut current = self.current.write();
        *current = Arc::new(map);
        current.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(i: usize) -> SlotIndex {
        SlotIndex::new(i).unwrap()
    }

    fn id(i: u32) -> ActionId {
        ActionId::new(i)
    }

    fn assert_exclusive(map: &PlacementMap) {
        let mut seen = Vec::new();
        for (_, occupant) in map.iter() {
            if let Some(action) = occupant {
                assert!(!seen.contains(&action), "{action} placed twice in {map:?}");
                seen.push(action);
            }
        }
    }

    #[test]
    fn test_moves_never_duplicate_an_action() {
        let store = PlacementStore::default();
        let moves = [(1, 0), (2, 1), (1, 1), (3, 7), (2, 7), (1, 4), (3, 4), (3, 4), (2, 0)];
        for (action, dest) in moves {
            let map = store.move_action(id(action), slot(dest));
            assert_exclusive(&map);
            assert_eq!(map.get(slot(dest)), Some(id(action)));
        }
    }

    #[test]
    fn test_slot_to_slot_move_is_single_transition() {
        let store = PlacementStore::new(PlacementMap::from_assignments([(slot(2), id(7))]));
        let before = store.snapshot();

        let after = store.move_action(id(7), slot(5));

        assert_eq!(before.get(slot(2)), Some(id(7)));
        assert_eq!(before.get(slot(5)), None);
        assert_eq!(after.get(slot(2)), None);
        assert_eq!(after.get(slot(5)), Some(id(7)));
    }

    #[test]
    fn test_move_onto_own_slot_returns_same_snapshot() {
        let store = PlacementStore::new(PlacementMap::from_assignments([(slot(3), id(4))]));
        let before = store.snapshot();

        let after = store.move_action(id(4), slot(3));

        assert!(Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn test_overwrite_evicts_previous_occupant() {
        let store = PlacementStore::new(PlacementMap::from_assignments([
            (slot(0), id(7)),
            (slot(5), id(9)),
        ]));

        let map = store.move_action(id(7), slot(5));

        assert_eq!(map.get(slot(0)), None);
        assert_eq!(map.get(slot(5)), Some(id(7)));
        assert!(!map.is_placed(id(9)));
    }

    #[test]
    fn test_clear_is_unconditional() {
        let store = PlacementStore::new(PlacementMap::from_assignments([(slot(1), id(2))]));
        assert_eq!(store.clear(slot(1)).get(slot(1)), None);
        assert_eq!(*store.clear(slot(6)), PlacementMap::empty());
    }

    #[test]
    fn test_from_assignments_collapses_duplicates() {
        let map = PlacementMap::from_assignments([(slot(0), id(1)), (slot(3), id(1))]);
        assert_eq!(map.get(slot(0)), None);
        assert_eq!(map.slot_of(id(1)), Some(slot(3)));
    }

    #[test]
    fn test_serializes_as_array() {
        let map = PlacementMap::from_assignments([(slot(2), id(7))]);
        assert_eq!(
            serde_json::to_string(&map).unwrap(),
            "[null,null,7,null,null,null,null,null]"
        );
    }
}
