use super::gesture::Origin;
use super::hit::{HitResolver, Registry};
use super::placement::PlacementMap;
use super::slot::SlotIndex;
use crate::catalog::{ActionId, Catalog};
use crate::geometry::{Point, Rect};
use crate::scene::{DragSurface, ElementId};
use thiserror::Error;

pub const DEFAULT_PROXY_SIZE: f64 = 80.0;

/// What is being dragged and where it came from. `source` is `None` for palette drags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragPayload {
    pub action: ActionId,
    pub source: Option<SlotIndex>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub action: ActionId,
    pub source: Option<SlotIndex>,
    pub destination: SlotIndex,
}

pub type PlaceCallback = Box<dyn FnMut(Placement)>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartError {
    #[error("a drag session is already active")]
    AlreadyActive,
    #[error("{0:?} cannot be dragged")]
    NotDraggable(Origin),
    #[error("action {0} is not in the catalog")]
    UnknownAction(ActionId),
    #[error("action {action} is already placed in slot {slot}")]
    AlreadyPlaced { action: ActionId, slot: SlotIndex },
    #[error("slot {0} is empty")]
    EmptySlot(SlotIndex),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    SameSlot,
    NoTarget,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragOutcome {
    Committed(Placement),
    Cancelled(CancelReason),
}

/// Everything a drag session reads from or writes to.
pub struct Stage<'a, S: ?Sized> {
    pub surface: &'a mut S,
    pub registry: &'a Registry,
    pub catalog: &'a Catalog,
    pub placements: &'a PlacementMap,
}

#[derive(Debug, Clone, Copy)]
struct Session {
    payload: DragPayload,
    proxy: ElementId,
    hovered: Option<SlotIndex>,
}

/// Owns the single drag session: the proxy, the hover highlight and the commit decision.
pub struct DragController {
    session: Option<Session>,
    proxy_size: f64,
    on_place: PlaceCallback,
}

impl std::fmt::Debug for DragController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DragController")
            .field("session", &self.session)
            .field("proxy_size", &self.proxy_size)
            .finish_non_exhaustive()
    }
}

impl DragController {
    pub fn new(proxy_size: f64, on_place: PlaceCallback) -> Self {
        Self {
            session: None,
            proxy_size,
            on_place,
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn payload(&self) -> Option<DragPayload> {
        self.session.map(|s| s.payload)
    }

    pub fn hovered(&self) -> Option<SlotIndex> {
        self.session.and_then(|s| s.hovered)
    }

    /// Takes effect on the next session.
    pub fn set_proxy_size(&mut self, size: f64) {
        self.proxy_size = size;
    }

    pub fn start<S: DragSurface + ?Sized>(
        &mut self,
        stage: &mut Stage<'_, S>,
        origin: Origin,
        point: Point,
    ) -> Result<DragPayload, StartError> {
        if self.session.is_some() {
            return Err(StartError::AlreadyActive);
        }

        let payload = match origin {
            Origin::Palette(action) => {
                if !stage.catalog.contains(action) {
                    return Err(StartError::UnknownAction(action));
                }
                if let Some(slot) = stage.placements.slot_of(action) {
                    return Err(StartError::AlreadyPlaced { action, slot });
                }
                DragPayload {
                    action,
                    source: None,
                }
            }
            Origin::Slot(slot) => {
                let action = stage
                    .placements
                    .get(slot)
                    .ok_or(StartError::EmptySlot(slot))?;
                DragPayload {
                    action,
                    source: Some(slot),
                }
            }
            other => return Err(StartError::NotDraggable(other)),
        };

        let proxy = stage
            .surface
            .show_proxy(payload.action, self.proxy_frame(point));
        let hovered = HitResolver::new(&*stage.surface, stage.registry).resolve_slot(point);
        stage.surface.set_highlight(hovered);

        log::debug!(
            "Drag of action {} started from {:?}, hovering {:?}",
            payload.action,
            payload.source,
            hovered
        );
        self.session = Some(Session {
            payload,
            proxy,
            hovered,
        });
        Ok(payload)
    }

    /// Follows the finger. Returns whether the hovered slot changed.
    pub fn update<S: DragSurface + ?Sized>(&mut self, stage: &mut Stage<'_, S>, point: Point) -> bool {
        let frame = self.proxy_frame(point);
        let Some(session) = self.session.as_mut() else {
            return false;
        };

        stage.surface.move_proxy(session.proxy, frame);
        let hovered = HitResolver::new(&*stage.surface, stage.registry).resolve_slot(point);
        if hovered == session.hovered {
            return false;
        }
        session.hovered = hovered;
        stage.surface.set_highlight(hovered);
        true
    }

    /// `None` when no session is active.
    pub fn end<S: DragSurface + ?Sized>(
        &mut self,
        stage: &mut Stage<'_, S>,
        point: Point,
    ) -> Option<DragOutcome> {
        let session = self.session.take()?;
        let target = HitResolver::new(&*stage.surface, stage.registry).resolve_slot(point);
        Self::teardown(stage, &session);

        let outcome = match target {
            None => DragOutcome::Cancelled(CancelReason::NoTarget),
            Some(destination) if Some(destination) == session.payload.source => {
                DragOutcome::Cancelled(CancelReason::SameSlot)
            }
            Some(destination) => {
                let placement = Placement {
                    action: session.payload.action,
                    source: session.payload.source,
                    destination,
                };
                log::info!(
                    "Placing action {} in slot {} (from {:?})",
                    placement.action,
                    placement.destination,
                    placement.source
                );
                (self.on_place)(placement);
                DragOutcome::Committed(placement)
            }
        };
        Some(outcome)
    }

    /// Cleans up without committing. Safe to call with no session.
    pub fn abort<S: DragSurface + ?Sized>(&mut self, stage: &mut Stage<'_, S>) -> Option<DragOutcome> {
        let session = self.session.take()?;
        Self::teardown(stage, &session);
        log::debug!("Drag of action {} aborted", session.payload.action);
        Some(DragOutcome::Cancelled(CancelReason::Aborted))
    }

    fn teardown<S: DragSurface + ?Sized>(stage: &mut Stage<'_, S>, session: &Session) {
        stage.surface.remove_proxy(session.proxy);
        stage.surface.set_highlight(None);
    }

    fn proxy_frame(&self, center: Point) -> Rect {
        Rect::centered(center, self.proxy_size, self.proxy_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::hit::Role;
    use crate::interaction::placement::PlacementStore;
    use crate::scene::Scene;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    fn slot(i: usize) -> SlotIndex {
        SlotIndex::new(i).unwrap()
    }

    /// Eight 100x100 slots in a row, slot `i` at x = i * 100.
    fn row() -> (Scene, Registry) {
        let mut scene = Scene::new();
        let mut registry = Registry::new();
        for slot in SlotIndex::ALL {
            let x = slot.as_index() as f64 * 100.0;
            let element = scene.insert(Rect::new(x + 1.0, 0.0, 98.0, 100.0));
            registry.register(element, Role::Slot(slot));
        }
        (scene, registry)
    }

    fn center_of(i: usize) -> Point {
        Point::new(i as f64 * 100.0 + 50.0, 50.0)
    }

    struct Bench {
        scene: Scene,
        registry: Registry,
        catalog: Catalog,
        store: PlacementStore,
        placed: Rc<RefCell<Vec<Placement>>>,
        drag: DragController,
    }

    impl Bench {
        fn new() -> Self {
            let (scene, registry) = row();
            let store = PlacementStore::default();
            let placed = Rc::new(RefCell::new(Vec::new()));
            let drag = {
                let store = store.clone();
                let placed = placed.clone();
                DragController::new(
                    DEFAULT_PROXY_SIZE,
                    Box::new(move |p: Placement| {
                        store.move_action(p.action, p.destination);
                        placed.borrow_mut().push(p);
                    }),
                )
            };
            Self {
                scene,
                registry,
                catalog: Catalog::builtin(),
                store,
                placed,
                drag,
            }
        }

        fn drag(&mut self, origin: Origin, from: Point, to: Point) -> Result<DragOutcome, StartError> {
            let placements = *self.store.snapshot();
            let mut stage = Stage {
                surface: &mut self.scene,
                registry: &self.registry,
                catalog: &self.catalog,
                placements: &placements,
            };
            self.drag.start(&mut stage, origin, from)?;
            self.drag.update(&mut stage, to);
            Ok(self.drag.end(&mut stage, to).unwrap())
        }
    }

    #[test]
    fn test_end_to_end_palette_then_slot_then_eviction() {
        let mut b = Bench::new();
        let palette = Point::new(50.0, 500.0);

        let first = b.drag(Origin::Palette(ActionId::new(7)), palette, center_of(2));
        assert_eq!(
            first,
            Ok(DragOutcome::Committed(Placement {
                action: ActionId::new(7),
                source: None,
                destination: slot(2),
            }))
        );
        assert_eq!(b.store.snapshot().get(slot(2)), Some(ActionId::new(7)));

        let second = b.drag(Origin::Slot(slot(2)), center_of(2), center_of(5));
        assert!(matches!(second, Ok(DragOutcome::Committed(_))));
        let map = b.store.snapshot();
        assert_eq!(map.get(slot(2)), None);
        assert_eq!(map.get(slot(5)), Some(ActionId::new(7)));

        let third = b.drag(Origin::Palette(ActionId::new(9)), palette, center_of(5));
        assert!(matches!(third, Ok(DragOutcome::Committed(_))));
        let map = b.store.snapshot();
        assert_eq!(map.get(slot(5)), Some(ActionId::new(9)));
        assert!(!map.is_placed(ActionId::new(7)));

        assert_eq!(b.placed.borrow().len(), 3);
        assert!(b.scene.proxy().is_none());
        assert_eq!(b.scene.highlighted(), None);
    }

    #[test]
    fn test_drop_on_own_slot_is_cancelled_without_callback() {
        let mut b = Bench::new();
        b.store.move_action(ActionId::new(4), slot(3));
        let before = b.store.snapshot();

        let outcome = b.drag(Origin::Slot(slot(3)), center_of(3), Point::new(360.0, 40.0));

        assert_eq!(outcome, Ok(DragOutcome::Cancelled(CancelReason::SameSlot)));
        assert!(b.placed.borrow().is_empty());
        assert!(Arc::ptr_eq(&before, &b.store.snapshot()));
    }

    #[test]
    fn test_release_over_nothing_is_no_target() {
        let mut b = Bench::new();
        let outcome = b.drag(
            Origin::Palette(ActionId::new(1)),
            Point::new(50.0, 500.0),
            Point::new(50.0, 900.0),
        );
        assert_eq!(outcome, Ok(DragOutcome::Cancelled(CancelReason::NoTarget)));
        assert!(b.placed.borrow().is_empty());
    }

    #[test]
    fn test_abort_cleans_up_and_is_idempotent() {
        let mut b = Bench::new();
        let placements = *b.store.snapshot();
        let mut stage = Stage {
            surface: &mut b.scene,
            registry: &b.registry,
            catalog: &b.catalog,
            placements: &placements,
        };

        b.drag
            .start(&mut stage, Origin::Palette(ActionId::new(3)), Point::new(50.0, 500.0))
            .unwrap();
        assert!(b.drag.update(&mut stage, center_of(6)));
        assert!(!b.drag.update(&mut stage, Point::new(640.0, 60.0)));
        assert_eq!(stage.surface.highlighted(), Some(slot(6)));
        assert!(stage.surface.proxy().is_some());

        assert_eq!(
            b.drag.abort(&mut stage),
            Some(DragOutcome::Cancelled(CancelReason::Aborted))
        );
        assert_eq!(b.drag.abort(&mut stage), None);
        assert_eq!(b.drag.end(&mut stage, center_of(6)), None);

        assert!(!b.drag.is_active());
        assert!(stage.surface.proxy().is_none());
        assert_eq!(stage.surface.highlighted(), None);
        assert!(b.placed.borrow().is_empty());
    }

    #[test]
    fn test_start_rejections_leave_controller_inactive() {
        let mut b = Bench::new();
        b.store.move_action(ActionId::new(7), slot(0));
        let placements = *b.store.snapshot();
        let mut stage = Stage {
            surface: &mut b.scene,
            registry: &b.registry,
            catalog: &b.catalog,
            placements: &placements,
        };
        let at = Point::new(50.0, 500.0);

        assert_eq!(
            b.drag.start(&mut stage, Origin::Palette(ActionId::new(7)), at),
            Err(StartError::AlreadyPlaced {
                action: ActionId::new(7),
                slot: slot(0)
            })
        );
        assert_eq!(
            b.drag.start(&mut stage, Origin::Palette(ActionId::new(999)), at),
            Err(StartError::UnknownAction(ActionId::new(999)))
        );
        assert_eq!(
            b.drag.start(&mut stage, Origin::Slot(slot(4)), at),
            Err(StartError::EmptySlot(slot(4)))
        );
        assert_eq!(
            b.drag.start(&mut stage, Origin::Background, at),
            Err(StartError::NotDraggable(Origin::Background))
        );
        assert!(!b.drag.is_active());
        assert!(stage.surface.proxy().is_none());

        b.drag.start(&mut stage, Origin::Slot(slot(0)), at).unwrap();
        assert_eq!(
            b.drag.start(&mut stage, Origin::Palette(ActionId::new(2)), at),
            Err(StartError::AlreadyActive)
        );
    }

    #[test]
    fn test_proxy_is_centered_under_finger() {
        let mut b = Bench::new();
        b.drag.set_proxy_size(60.0);
        let placements = *b.store.snapshot();
        let mut stage = Stage {
            surface: &mut b.scene,
            registry: &b.registry,
            catalog: &b.catalog,
            placements: &placements,
        };

        b.drag
            .start(&mut stage, Origin::Palette(ActionId::new(5)), center_of(1))
            .unwrap();

        let proxy = stage.surface.proxy().unwrap();
        assert_eq!(proxy.action, ActionId::new(5));
        assert_eq!(proxy.frame, Rect::new(120.0, 20.0, 60.0, 60.0));
        assert_eq!(b.drag.hovered(), Some(slot(1)));
    }
}
