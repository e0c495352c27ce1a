use derive_more::{AsRef, Deref, Display, From, Into};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    From,
    Into,
)]
#[serde(transparent)]
pub struct ActionId(u32);

impl ActionId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

/// Opaque handle to an icon asset, relative to the asset root.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, Deref, From, Into, AsRef,
)]
#[serde(transparent)]
pub struct IconRef(String);

esplink::impl_string_newtype!(IconRef);

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, Deref, From, Into, AsRef,
)]
#[serde(transparent)]
pub struct ActionLabel(String);

esplink::impl_string_newtype!(ActionLabel);

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, Deref, From, Into, AsRef,
)]
#[serde(transparent)]
pub struct Category(String);

esplink::impl_string_newtype!(Category);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    pub id: ActionId,
    pub icon: IconRef,
    pub label: ActionLabel,
    pub category: Category,
}

const BUILTIN: &[(&str, &[(u32, &str)])] = &[
    (
        "Media & Entertainment",
        &[
            (1, "Assistant"),
            (2, "Apple Music"),
            (3, "Navigation"),
            (4, "Radio"),
            (5, "Phone"),
            (6, "Speech Control"),
        ],
    ),
    (
        "Vehicle Controls",
        &[
            (7, "Camera"),
            (8, "Passenger Lock"),
            (9, "Cruise Control"),
            (10, "Pet Mode"),
            (11, "Driving Modes"),
            (12, "Emergency"),
            (13, "Fan Speed"),
            (14, "Self-Driving"),
            (15, "Left Indicator"),
            (16, "Right Indicator"),
            (17, "Light Modes"),
            (18, "Temperature"),
            (19, "Wiper Speed"),
        ],
    ),
    (
        "Comfort & Convenience",
        &[
            (20, "Memory Position"),
            (21, "Fold Mirrors"),
            (22, "Sun Roof"),
            (23, "Heated Seats"),
            (24, "Interior Lights"),
            (25, "Home"),
            (26, "Work"),
        ],
    ),
];

/// Immutable set of actions a slot can be assigned, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Catalog {
    actions: Vec<Action>,
    by_id: HashMap<ActionId, usize>,
}

impl Catalog {
    pub fn builtin() -> Self {
        let actions = BUILTIN
            .iter()
            .flat_map(|(category, items)| {
                items.iter().map(move |&(id, label)| Action {
                    id: ActionId::new(id),
                    icon: IconRef::new(format!("icons/{label}.png")),
                    label: ActionLabel::from(label),
                    category: Category::from(*category),
                })
            })
            .collect();
        Self::from_actions(actions)
    }

    /// Later duplicates of an id are dropped.
    pub fn from_actions(actions: Vec<Action>) -> Self {
        let mut by_id = HashMap::with_capacity(actions.len());
        let actions: Vec<Action> = actions
            .into_iter()
            .filter(|a| {
                let fresh = !by_id.contains_key(&a.id);
                if fresh {
                    by_id.insert(a.id, by_id.len());
                } else {
                    log::warn!("Duplicate action id {} ignored", a.id);
                }
                fresh
            })
            .collect();
        Self { actions, by_id }
    }

    pub fn get(&self, id: ActionId) -> Option<&Action> {
        self.by_id.get(&id).map(|&i| &self.actions[i])
    }

    pub fn contains(&self, id: ActionId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Categories in catalog order, each with its actions.
    pub fn categories(&self) -> Vec<(&Category, Vec<&Action>)> {
        let mut out: Vec<(&Category, Vec<&Action>)> = Vec::new();
        for action in &self.actions {
            match out.iter_mut().find(|(c, _)| **c == action.category) {
                Some((_, items)) => items.push(action),
                None => out.push((&action.category, vec![action])),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_ids_are_unique_and_complete() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.len(), 26);
        for id in 1..=26 {
            assert!(catalog.contains(ActionId::new(id)), "missing action {id}");
        }
        assert!(!catalog.contains(ActionId::new(27)));
    }

    #[test]
    fn test_lookup_and_categories() {
        let catalog = Catalog::builtin();
        let cruise = catalog.get(ActionId::new(9)).unwrap();
        assert_eq!(cruise.label.as_str(), "Cruise Control");
        assert_eq!(cruise.icon.as_str(), "icons/Cruise Control.png");
        assert_eq!(cruise.category.as_str(), "Vehicle Controls");

        let categories = catalog.categories();
        let names: Vec<&str> = categories.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(
            names,
            ["Media & Entertainment", "Vehicle Controls", "Comfort & Convenience"]
        );
        assert_eq!(categories[1].1.len(), 13);
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let make = |id, label: &str| Action {
            id: ActionId::new(id),
            icon: IconRef::from("x.png"),
            label: ActionLabel::from(label),
            category: Category::from("c"),
        };
        let catalog = Catalog::from_actions(vec![make(1, "first"), make(1, "second"), make(2, "b")]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(ActionId::new(1)).unwrap().label.as_str(), "first");
        assert_eq!(catalog.get(ActionId::new(2)).unwrap().label.as_str(), "b");
    }
}
