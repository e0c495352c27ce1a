use super::{GROUP_SIZE, SLOT_COUNT};
use derive_more::Display;
use serde::Serialize;
use serde_with::DeserializeFromStr;
use std::str::FromStr;
use strum::{Display as StrumDisplay, EnumIter, EnumString};
use thiserror::Error;

/// The two button clusters on the wheel. Left holds slots 0-3, right holds 4-7.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, EnumString, EnumIter, StrumDisplay,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    #[strum(serialize = "left", serialize = "l")]
    Left,
    #[strum(serialize = "right", serialize = "r")]
    Right,
}

impl Group {
    pub fn base(&self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => GROUP_SIZE,
        }
    }

    pub fn slots(self) -> impl Iterator<Item = SlotIndex> {
        let base = self.base();
        (base..base + GROUP_SIZE).map(SlotIndex)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid slot '{0}': expected 0-7, left-0..left-3 or right-0..right-3")]
pub struct ParseSlotError(String);

/// Index of one of the eight button slots.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, DeserializeFromStr, Display,
)]
#[serde(into = "usize")]
pub struct SlotIndex(usize);

impl SlotIndex {
    pub const ALL: [SlotIndex; SLOT_COUNT] = [
        SlotIndex(0),
        SlotIndex(1),
        SlotIndex(2),
        SlotIndex(3),
        SlotIndex(4),
        SlotIndex(5),
        SlotIndex(6),
        SlotIndex(7),
    ];

    pub fn new(index: usize) -> Option<Self> {
        (index < SLOT_COUNT).then_some(Self(index))
    }

    pub fn in_group(group: Group, offset: usize) -> Option<Self> {
        (offset < GROUP_SIZE).then(|| Self(group.base() + offset))
    }

    pub fn as_index(&self) -> usize {
        self.0
    }

    pub fn group(&self) -> Group {
        if self.0 < GROUP_SIZE {
            Group::Left
        } else {
            Group::Right
        }
    }

    /// Position inside the slot's group, 0-3.
    pub fn offset(&self) -> usize {
        self.0 - self.group().base()
    }
}

impl From<SlotIndex> for usize {
    fn from(slot: SlotIndex) -> Self {
        slot.0
    }
}

impl FromStr for SlotIndex {
    type Err = ParseSlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseSlotError(s.to_string());
        let s = s.trim();

        if let Ok(index) = s.parse::<usize>() {
            return Self::new(index).ok_or_else(err);
        }

        let split = s.find(|c: char| c.is_ascii_digit()).ok_or_else(err)?;
        let (group, offset) = s.split_at(split);
        let group: Group = group
            .trim_end_matches(['-', '_'])
            .parse()
            .map_err(|_| err())?;
        let offset = offset.parse::<usize>().map_err(|_| err())?;
        Self::in_group(group, offset).ok_or_else(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_deserialization() {
        let cases = vec![
            ("\"0\"", 0),
            ("\"7\"", 7),
            ("\"left-0\"", 0),
            ("\"Left-3\"", 3),
            ("\"l2\"", 2),
            ("\"right-0\"", 4),
            ("\"R3\"", 7),
            ("\"right_1\"", 5),
        ];

        for (json, expected) in cases {
            let deserialized: SlotIndex = serde_json::from_str(json).unwrap();
            assert_eq!(deserialized.as_index(), expected, "parsing {json}");
        }
    }

    #[test]
    fn test_slot_rejects_out_of_range() {
        for raw in ["8", "left-4", "middle-1", "", "r", "-1"] {
            assert!(raw.parse::<SlotIndex>().is_err(), "{raw:?} should not parse");
        }
    }

    #[test]
    fn test_groups() {
        let left: Vec<usize> = Group::Left.slots().map(|s| s.as_index()).collect();
        let right: Vec<usize> = Group::Right.slots().map(|s| s.as_index()).collect();
        assert_eq!(left, [0, 1, 2, 3]);
        assert_eq!(right, [4, 5, 6, 7]);

        let slot = SlotIndex::new(6).unwrap();
        assert_eq!(slot.group(), Group::Right);
        assert_eq!(slot.offset(), 2);
        assert_eq!(serde_json::to_string(&slot).unwrap(), "6");
    }
}
