//! Door configuration table
//!
//! Static, externally authored list of doors: for each door feature, the scene
//! node names that make up the door, whether it starts open and what kind of
//! door it is. The collision core reads it to seed door collider metadata and
//! never writes it back.

use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Behavioural class of a door
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DoorKind {
    /// Regular single door
    #[default]
    Normal,
    /// Double or oversized door
    Large,
    /// Opening without a leaf; never blocks projectiles
    AlwaysOpen,
}

/// Door metadata carried by a door collider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoorState {
    /// Current open flag
    pub open: bool,
    /// Door class
    pub kind: DoorKind,
    /// Feature name the door belongs to
    pub group: String,
}

impl DoorState {
    /// Whether a projectile should be tested against this door
    pub fn blocks_projectiles(&self) -> bool {
        !self.open && self.kind != DoorKind::AlwaysOpen
    }
}

/// One row of the door table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoorEntry {
    /// Feature name grouping the door leaves
    pub feature: String,
    /// Scene node names of the door leaves
    pub names: Vec<String>,
    /// Initial open flag
    #[serde(default)]
    pub open: bool,
    /// Door class
    #[serde(default)]
    pub kind: DoorKind,
}

impl DoorEntry {
    /// Seed state for one of this entry's door leaves
    pub fn state(&self) -> DoorState {
        DoorState {
            open: self.open,
            kind: self.kind,
            group: self.feature.clone(),
        }
    }
}

/// The door table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DoorConfiguration {
    /// All configured doors
    pub doors: Vec<DoorEntry>,
}

impl Config for DoorConfiguration {}

impl DoorConfiguration {
    /// Entry listing `name` among its door leaves
    pub fn lookup(&self, name: &str) -> Option<&DoorEntry> {
        self.doors
            .iter()
            .find(|entry| entry.names.iter().any(|n| n == name))
    }

    /// Whether `name` is a configured door leaf
    pub fn is_door(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r#"
        [[doors]]
        feature = "gym_entrance"
        names = ["door_1", "door_2"]
        kind = "Large"

        [[doors]]
        feature = "arch"
        names = ["arch_gap"]
        open = true
        kind = "AlwaysOpen"
    "#;

    #[test]
    fn test_lookup_by_any_grouped_name() {
        let table = DoorConfiguration::from_str_with_format(TABLE, "doors.toml").unwrap();

        let entry = table.lookup("door_2").unwrap();
        assert_eq!(entry.feature, "gym_entrance");
        assert_eq!(entry.kind, DoorKind::Large);
        assert!(!entry.open);
        assert!(table.lookup("window").is_none());
    }

    #[test]
    fn test_state_blocks_projectiles() {
        let table = DoorConfiguration::from_str_with_format(TABLE, "doors.toml").unwrap();

        let closed = table.lookup("door_1").unwrap().state();
        assert!(closed.blocks_projectiles());

        let arch = DoorState { open: false, ..table.lookup("arch_gap").unwrap().state() };
        assert!(!arch.blocks_projectiles());

        let opened = DoorState { open: true, ..closed };
        assert!(!opened.blocks_projectiles());
    }
}
