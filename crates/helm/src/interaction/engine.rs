use super::EditMode;
use super::drag::{
    DEFAULT_PROXY_SIZE, DragController, DragOutcome, DragPayload, Placement, Stage, StartError,
};
use super::gesture::{Gesture, GestureClassifier, GestureConfig, GesturePhase, Origin, PointerEvent};
use super::hit::{HitResolver, Registry, Role};
use super::placement::{PlacementMap, PlacementStore};
use super::slot::SlotIndex;
use crate::catalog::Catalog;
use crate::geometry::Point;
use crate::scene::DragSurface;
use std::rc::Rc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub gesture: GestureConfig,
    pub proxy_size: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gesture: GestureConfig::default(),
            proxy_size: DEFAULT_PROXY_SIZE,
        }
    }
}

/// What the engine reports back to the host after routing a gesture.
#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    Pressing(Origin),
    Tapped(Origin),
    Scrolled,
    DragStarted(DragPayload),
    HoverChanged(Option<SlotIndex>),
    Dropped(DragOutcome),
    DragRejected(StartError),
    EditModeToggled(bool),
}

/// Glues the gesture classifier to the drag controller over one surface.
pub struct Engine<S: DragSurface> {
    surface: S,
    registry: Registry,
    catalog: Rc<Catalog>,
    store: PlacementStore,
    edit_mode: EditMode,
    gestures: GestureClassifier,
    drag: DragController,
}

impl<S: DragSurface> Engine<S> {
    /// Commits from the drag controller go straight into `store`.
    pub fn new(
        surface: S,
        registry: Registry,
        catalog: Rc<Catalog>,
        store: PlacementStore,
        edit_mode: EditMode,
        config: EngineConfig,
    ) -> Self {
        let drag = {
            let store = store.clone();
            DragController::new(
                config.proxy_size,
                Box::new(move |placement: Placement| {
                    store.move_action(placement.action, placement.destination);
                }),
            )
        };
        Self {
            surface,
            registry,
            catalog,
            store,
            edit_mode,
            gestures: GestureClassifier::new(config.gesture),
            drag,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn edit_mode(&self) -> &EditMode {
        &self.edit_mode
    }

    pub fn placements(&self) -> &PlacementStore {
        &self.store
    }

    pub fn phase(&self) -> GesturePhase {
        self.gestures.phase()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_active()
    }

    /// New timings and proxy size apply from the next gesture.
    pub fn reconfigure(&mut self, config: EngineConfig) {
        self.gestures.set_config(config.gesture);
        self.drag.set_proxy_size(config.proxy_size);
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.gestures.next_deadline()
    }

    /// Timers due at or before `event.time` fire first, so the result does not depend on
    /// whether the host ticked in between.
    pub fn handle_pointer(&mut self, event: &PointerEvent) -> Vec<Interaction> {
        let mut out = self.tick(event.time);
        let placements = self.store.snapshot();
        let gesture = self.gestures.process(event, self.edit_mode.is_active(), |point| {
            classify_origin(&self.surface, &self.registry, &placements, point)
        });
        out.extend(gesture.and_then(|gesture| self.route(gesture)));
        out
    }

    /// Fires due timers. Call when [`Engine::next_deadline`] has passed.
    pub fn tick(&mut self, now: Instant) -> Vec<Interaction> {
        self.gestures
            .poll(now)
            .into_iter()
            .filter_map(|gesture| self.route(gesture))
            .collect()
    }

    /// Drops any gesture in flight, tearing down an active drag without committing.
    pub fn reset(&mut self) -> Option<Interaction> {
        self.gestures.reset();
        self.route(Gesture::DragCancel)
    }

    fn route(&mut self, gesture: Gesture) -> Option<Interaction> {
        let placements = self.store.snapshot();
        let mut stage = Stage {
            surface: &mut self.surface,
            registry: &self.registry,
            catalog: &self.catalog,
            placements: &placements,
        };

        match gesture {
            Gesture::Pressing(origin) => Some(Interaction::Pressing(origin)),
            Gesture::Tap(origin) => Some(Interaction::Tapped(origin)),
            Gesture::Scroll => Some(Interaction::Scrolled),
            Gesture::DragStart { origin, position } => {
                match self.drag.start(&mut stage, origin, position) {
                    Ok(payload) => Some(Interaction::DragStarted(payload)),
                    Err(e) => {
                        log::debug!("Drag refused: {e}");
                        self.gestures.reject_drag();
                        Some(Interaction::DragRejected(e))
                    }
                }
            }
            Gesture::DragMove(point) => self
                .drag
                .update(&mut stage, point)
                .then(|| Interaction::HoverChanged(self.drag.hovered())),
            Gesture::DragEnd(point) => self.drag.end(&mut stage, point).map(Interaction::Dropped),
            Gesture::DragCancel => self.drag.abort(&mut stage).map(Interaction::Dropped),
            Gesture::LongPressEdit(slot) => {
                let active = self.edit_mode.toggle();
                log::info!(
                    "Long press on slot {slot}, edit mode {}",
                    if active { "on" } else { "off" }
                );
                Some(Interaction::EditModeToggled(active))
            }
        }
    }
}

/// What a pointer-down at `point` would start from.
///
/// Slots count only while occupied. An element without a registered role (an icon or
/// label nobody tagged) falls back to slot geometry.
pub fn classify_origin<S: DragSurface + ?Sized>(
    surface: &S,
    registry: &Registry,
    placements: &PlacementMap,
    point: Point,
) -> Origin {
    let occupied = |slot: SlotIndex| {
        if placements.get(slot).is_some() {
            Origin::Slot(slot)
        } else {
            Origin::Background
        }
    };

    let role = surface
        .element_at(point)
        .and_then(|element| registry.nearest(element, Some));

    match role {
        Some(Role::PaletteItem(action)) => Origin::Palette(action),
        Some(Role::Slot(slot) | Role::Content { parent: slot }) => occupied(slot),
        Some(Role::DeleteAffordance(slot)) => Origin::DeleteAffordance(slot),
        None => HitResolver::new(surface, registry)
            .resolve_slot(point)
            .map_or(Origin::Background, occupied),
    }
}
