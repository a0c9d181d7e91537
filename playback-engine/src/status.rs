//! Player and item status enumerations

use std::fmt;

use serde::{Deserialize, Serialize};

/// Readiness of the engine as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlayerStatus {
    /// Not yet determined
    #[default]
    Unknown,
    /// The engine can play items
    ReadyToPlay,
    /// The engine can no longer play; see the engine error
    Failed,
}

impl PlayerStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, PlayerStatus::Failed)
    }
}

impl fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlayerStatus::Unknown => "unknown",
            PlayerStatus::ReadyToPlay => "readyToPlay",
            PlayerStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Readiness of the current media item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ItemStatus {
    /// The item has not finished loading
    #[default]
    Unknown,
    /// The item is ready to be played
    ReadyToPlay,
    /// The item failed to load; see the item error
    Failed,
}

impl ItemStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, ItemStatus::ReadyToPlay)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ItemStatus::Failed)
    }

    /// Numeric code, matching the order of the variants
    pub fn raw_value(&self) -> u8 {
        match self {
            ItemStatus::Unknown => 0,
            ItemStatus::ReadyToPlay => 1,
            ItemStatus::Failed => 2,
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ItemStatus::Unknown => "unknown",
            ItemStatus::ReadyToPlay => "readyToPlay",
            ItemStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}
