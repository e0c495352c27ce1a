use super::SLOT_COUNT;
use super::slot::{Group, SlotIndex};
use crate::catalog::ActionId;
use crate::geometry::Point;
use crate::scene::{ElementId, Surface};
use std::collections::HashMap;

/// Parent links deeper than this are treated as a cycle and cut off.
const MAX_ANCESTRY: usize = 16;

/// What an element means to the interaction core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    PaletteItem(ActionId),
    Slot(SlotIndex),
    /// The area inside a slot that shows its icon and label.
    Content { parent: SlotIndex },
    DeleteAffordance(SlotIndex),
}

/// Element -> role and element -> parent mappings, populated by the presentation layer.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    roles: HashMap<ElementId, Role>,
    parents: HashMap<ElementId, ElementId>,
    slots: [Option<ElementId>; SLOT_COUNT],
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, element: ElementId, role: Role) {
        if let Role::Slot(slot) = role {
            self.slots[slot.as_index()] = Some(element);
        }
        self.roles.insert(element, role);
    }

    pub fn set_parent(&mut self, child: ElementId, parent: ElementId) {
        self.parents.insert(child, parent);
    }

    pub fn forget(&mut self, element: ElementId) {
        if let Some(Role::Slot(slot)) = self.roles.remove(&element)
            && self.slots[slot.as_index()] == Some(element)
        {
            self.slots[slot.as_index()] = None;
        }
        self.parents.remove(&element);
    }

    pub fn role(&self, element: ElementId) -> Option<Role> {
        self.roles.get(&element).copied()
    }

    pub fn slot_element(&self, slot: SlotIndex) -> Option<ElementId> {
        self.slots[slot.as_index()]
    }

    /// `element` itself, then its registered ancestors, nearest first.
    pub fn ancestry(&self, element: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        std::iter::successors(Some(element), |e| self.parents.get(e).copied()).take(MAX_ANCESTRY)
    }

    /// First role along the ancestry of `element` that `pick` accepts.
    pub fn nearest<T>(&self, element: ElementId, pick: impl Fn(Role) -> Option<T>) -> Option<T> {
        self.ancestry(element)
            .filter_map(|e| self.role(e))
            .find_map(pick)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTier {
    Direct,
    Content,
    Geometry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub slot: SlotIndex,
    pub tier: HitTier,
}

/// Maps a viewport point to the slot under it.
///
/// Tag lookups run first; when the element under the point carries no usable tag (an
/// icon or label the presentation layer never registered, or an element detached
/// mid-gesture), every registered slot's bounds are tested directly, left group first.
#[derive(Debug)]
pub struct HitResolver<'a, S: Surface + ?Sized> {
    surface: &'a S,
    registry: &'a Registry,
}

impl<'a, S: Surface + ?Sized> HitResolver<'a, S> {
    pub fn new(surface: &'a S, registry: &'a Registry) -> Self {
        Self { surface, registry }
    }

    pub fn resolve(&self, point: Point) -> Option<Hit> {
        let tagged = self.surface.element_at(point).and_then(|element| {
            let direct = self.registry.nearest(element, |role| match role {
                Role::Slot(slot) => Some(Hit {
                    slot,
                    tier: HitTier::Direct,
                }),
                _ => None,
            });
            direct.or_else(|| {
                self.registry.nearest(element, |role| match role {
                    Role::Content { parent } => Some(Hit {
                        slot: parent,
                        tier: HitTier::Content,
                    }),
                    _ => None,
                })
            })
        });

        tagged.or_else(|| self.resolve_by_geometry(point))
    }

    pub fn resolve_slot(&self, point: Point) -> Option<SlotIndex> {
        self.resolve(point).map(|hit| hit.slot)
    }

    fn resolve_by_geometry(&self, point: Point) -> Option<Hit> {
        [Group::Left, Group::Right]
            .into_iter()
            .flat_map(Group::slots)
            .find(|&slot| {
                self.registry
                    .slot_element(slot)
                    .and_then(|e| self.surface.bounds(e))
                    .is_some_and(|r| r.contains(point))
            })
            .map(|slot| Hit {
                slot,
                tier: HitTier::Geometry,
            })
    }
}
