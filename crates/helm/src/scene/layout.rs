//! The steering-wheel screen: two diamond clusters of four slots above a palette grid.

use super::Scene;
use crate::catalog::Catalog;
use crate::geometry::{Point, Rect};
use crate::interaction::{Group, Registry, Role, SlotIndex};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const START_OFFSET: f64 = -PI / 2.0;
const ANGLE_STEP: f64 = PI / 2.0;
const LABEL_HEIGHT: f64 = 18.0;
const HEADER_HEIGHT: f64 = 32.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WheelLayout {
    pub left_center: Point,
    pub right_center: Point,
    /// Distance from a cluster center to each of its slot centers.
    pub cluster_radius: f64,
    pub slot_size: f64,
    pub delete_size: f64,
    pub palette_origin: Point,
    pub palette_columns: usize,
    pub tile_width: f64,
    pub tile_height: f64,
    pub tile_gap: f64,
}

impl Default for WheelLayout {
    fn default() -> Self {
        Self {
            left_center: Point::new(320.0, 220.0),
            right_center: Point::new(960.0, 220.0),
            cluster_radius: 110.0,
            slot_size: 96.0,
            delete_size: 28.0,
            palette_origin: Point::new(40.0, 460.0),
            palette_columns: 8,
            tile_width: 140.0,
            tile_height: 110.0,
            tile_gap: 10.0,
        }
    }
}

impl WheelLayout {
    /// Slot 0 of each group sits at the top, then clockwise.
    pub fn slot_center(&self, slot: SlotIndex) -> Point {
        let center = match slot.group() {
            Group::Left => self.left_center,
            Group::Right => self.right_center,
        };
        let angle = START_OFFSET + slot.offset() as f64 * ANGLE_STEP;
        center.offset(
            self.cluster_radius * angle.cos(),
            self.cluster_radius * angle.sin(),
        )
    }

    pub fn slot_frame(&self, slot: SlotIndex) -> Rect {
        Rect::centered(self.slot_center(slot), self.slot_size, self.slot_size)
    }
}

/// Lays out every slot and every catalog action, registering roles as the presentation
/// layer would. Slot labels are left untagged.
pub fn build_wheel(catalog: &Catalog, layout: &WheelLayout) -> (Scene, Registry) {
    let mut scene = Scene::new();
    let mut registry = Registry::new();

    for slot in SlotIndex::ALL {
        let frame = layout.slot_frame(slot);
        let slot_el = scene.insert(frame);
        registry.register(slot_el, Role::Slot(slot));

        let inset = layout.slot_size * 0.1;
        let content = scene.insert(Rect::new(
            frame.x + inset,
            frame.y + inset,
            frame.width - 2.0 * inset,
            frame.height - 2.0 * inset - LABEL_HEIGHT,
        ));
        registry.register(content, Role::Content { parent: slot });
        registry.set_parent(content, slot_el);

        let icon_size = frame.height * 0.5;
        let icon = scene.insert(Rect::centered(
            Point::new(frame.center().x, frame.y + inset + icon_size / 2.0),
            icon_size,
            icon_size,
        ));
        registry.set_parent(icon, content);

        scene.insert(Rect::new(
            frame.x,
            frame.bottom() - LABEL_HEIGHT,
            frame.width,
            LABEL_HEIGHT,
        ));

        let delete = scene.insert(Rect::centered(
            Point::new(frame.right(), frame.y),
            layout.delete_size,
            layout.delete_size,
        ));
        registry.register(delete, Role::DeleteAffordance(slot));
        registry.set_parent(delete, slot_el);
    }

    let columns = layout.palette_columns.max(1);
    let mut y = layout.palette_origin.y;
    for (_, actions) in catalog.categories() {
        scene.insert(Rect::new(
            layout.palette_origin.x,
            y,
            columns as f64 * (layout.tile_width + layout.tile_gap),
            HEADER_HEIGHT,
        ));
        y += HEADER_HEIGHT;

        for (i, action) in actions.iter().enumerate() {
            let (row, column) = (i / columns, i % columns);
            let tile = scene.insert(Rect::new(
                layout.palette_origin.x + column as f64 * (layout.tile_width + layout.tile_gap),
                y + row as f64 * (layout.tile_height + layout.tile_gap),
                layout.tile_width,
                layout.tile_height,
            ));
            registry.register(tile, Role::PaletteItem(action.id));
        }

        let rows = actions.len().div_ceil(columns);
        y += rows as f64 * (layout.tile_height + layout.tile_gap);
    }

    (scene, registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ActionId;
    use crate::interaction::{HitResolver, HitTier};
    use crate::scene::Surface;

    #[test]
    fn test_slot_frames_do_not_overlap() {
        let layout = WheelLayout::default();
        for a in SlotIndex::ALL {
            for b in SlotIndex::ALL.into_iter().filter(|&b| b != a) {
                let (fa, fb) = (layout.slot_frame(a), layout.slot_frame(b));
                let overlap = fa.x < fb.right() && fb.x < fa.right() && fa.y < fb.bottom() && fb.y < fa.bottom();
                assert!(!overlap, "slots {a} and {b} overlap");
            }
        }
    }

    #[test]
    fn test_diamond_orientation() {
        let layout = WheelLayout::default();
        let top = layout.slot_center(SlotIndex::new(0).unwrap());
        let right = layout.slot_center(SlotIndex::new(1).unwrap());

        assert!((top.x - layout.left_center.x).abs() < 1e-9);
        assert!(top.y < layout.left_center.y);
        assert!(right.x > layout.left_center.x);
        assert!(layout.slot_center(SlotIndex::new(4).unwrap()).x > layout.right_center.x - 1e-9);
    }

    #[test]
    fn test_every_slot_and_action_is_registered() {
        let catalog = Catalog::builtin();
        let layout = WheelLayout::default();
        let (scene, registry) = build_wheel(&catalog, &layout);
        let resolver = HitResolver::new(&scene, &registry);

        for slot in SlotIndex::ALL {
            assert!(registry.slot_element(slot).is_some());
            let frame = layout.slot_frame(slot);

            let icon_hit = resolver.resolve(frame.center()).unwrap();
            assert_eq!(icon_hit.slot, slot);
            assert_eq!(icon_hit.tier, HitTier::Direct);

            let label_point = Point::new(frame.center().x, frame.bottom() - LABEL_HEIGHT / 2.0);
            let label_hit = resolver.resolve(label_point).unwrap();
            assert_eq!(label_hit.slot, slot);
            assert_eq!(label_hit.tier, HitTier::Geometry);
        }

        let tiles = catalog
            .iter()
            .filter(|action| {
                (0..scene.len() as u32)
                    .any(|i| registry.role(i.into()) == Some(Role::PaletteItem(action.id)))
            })
            .count();
        assert_eq!(tiles, catalog.len());
    }

    #[test]
    fn test_palette_tile_is_topmost_at_its_center() {
        let catalog = Catalog::builtin();
        let layout = WheelLayout::default();
        let (scene, registry) = build_wheel(&catalog, &layout);

        let first_tile = Rect::new(
            layout.palette_origin.x,
            layout.palette_origin.y + HEADER_HEIGHT,
            layout.tile_width,
            layout.tile_height,
        );
        let element = scene.element_at(first_tile.center()).unwrap();

        assert_eq!(registry.role(element), Some(Role::PaletteItem(ActionId::new(1))));
    }
}
