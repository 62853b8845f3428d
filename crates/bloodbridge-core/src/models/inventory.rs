use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(feature = "ts")]
use ts_rs::TS;

use super::blood::BloodGroup;

/// Below this many units a group is flagged critical.
pub const CRITICAL_STOCK_THRESHOLD: u32 = 20;

/// Below this many units a group is flagged low.
pub const LOW_STOCK_THRESHOLD: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub enum StockLevel {
    Critical,
    Low,
    Stable,
}

impl StockLevel {
    pub fn for_units(units: u32) -> Self {
        if units < CRITICAL_STOCK_THRESHOLD {
            StockLevel::Critical
        } else if units < LOW_STOCK_THRESHOLD {
            StockLevel::Low
        } else {
            StockLevel::Stable
        }
    }
}

impl fmt::Display for StockLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StockLevel::Critical => write!(f, "Critical"),
            StockLevel::Low => write!(f, "Low"),
            StockLevel::Stable => write!(f, "Stable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("inventory is missing blood group {0}")]
pub struct MissingGroupError(pub BloodGroup);

/// Stock count for every blood group. The key set is fixed: a snapshot that
/// omits a group fails to deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<BloodGroup, u32>",
    into = "BTreeMap<BloodGroup, u32>"
)]
pub struct Inventory {
    stock: [u32; 8],
}

impl Inventory {
    pub fn empty() -> Self {
        Self { stock: [0; 8] }
    }

    /// Stock levels the demo starts from.
    pub fn seed() -> Self {
        Self::from_pairs([
            (BloodGroup::APositive, 85),
            (BloodGroup::ANegative, 20),
            (BloodGroup::BPositive, 65),
            (BloodGroup::BNegative, 15),
            (BloodGroup::OPositive, 110),
            (BloodGroup::ONegative, 12),
            (BloodGroup::AbPositive, 45),
            (BloodGroup::AbNegative, 8),
        ])
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (BloodGroup, u32)>) -> Self {
        let mut inventory = Self::empty();
        for (group, units) in pairs {
            inventory.set(group, units);
        }
        inventory
    }

    pub fn get(&self, group: BloodGroup) -> u32 {
        self.stock[group as usize]
    }

    pub fn set(&mut self, group: BloodGroup, units: u32) {
        self.stock[group as usize] = units;
    }

    /// Log donated units into stock.
    pub fn add(&mut self, group: BloodGroup, units: u32) {
        let slot = &mut self.stock[group as usize];
        *slot = slot.saturating_add(units);
    }

    pub fn level(&self, group: BloodGroup) -> StockLevel {
        StockLevel::for_units(self.get(group))
    }

    /// All groups in display order.
    pub fn iter(&self) -> impl Iterator<Item = (BloodGroup, u32)> + '_ {
        BloodGroup::ALL.into_iter().map(|group| (group, self.get(group)))
    }

    /// Groups that need attention, most urgent first, then in display order.
    pub fn low_stock(&self) -> Vec<(BloodGroup, u32, StockLevel)> {
        let mut entries: Vec<_> = self
            .iter()
            .map(|(group, units)| (group, units, StockLevel::for_units(units)))
            .filter(|(_, _, level)| *level != StockLevel::Stable)
            .collect();
        entries.sort_by_key(|(group, _, level)| (*level, *group));
        entries
    }

    pub fn total(&self) -> u64 {
        self.stock.iter().map(|&units| u64::from(units)).sum()
    }
}

impl Default for Inventory {
    fn default() -> Self {
        Self::seed()
    }
}

impl TryFrom<BTreeMap<BloodGroup, u32>> for Inventory {
    type Error = MissingGroupError;

    fn try_from(map: BTreeMap<BloodGroup, u32>) -> Result<Self, Self::Error> {
        let mut inventory = Self::empty();
        for group in BloodGroup::ALL {
            let units = map.get(&group).copied().ok_or(MissingGroupError(group))?;
            inventory.set(group, units);
        }
        Ok(inventory)
    }
}

impl From<Inventory> for BTreeMap<BloodGroup, u32> {
    fn from(inventory: Inventory) -> Self {
        inventory.iter().collect()
    }
}
