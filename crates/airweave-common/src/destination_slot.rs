//! Destination slot roles, shared by the multiplexer (C11), the dispatcher
//! (C9), and the metadata store (C4) — spec §3, §4.9.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotRole {
    // Declaration order doubles as `Ord`, giving the Active, Shadow,
    // Deprecated sort `Multiplexer::list` requires for free.
    Active,
    Shadow,
    Deprecated,
}

impl SlotRole {
    /// ACTIVE and SHADOW slots receive writes; DEPRECATED is inert.
    pub fn receives_writes(self) -> bool {
        matches!(self, SlotRole::Active | SlotRole::Shadow)
    }

    pub fn serves_queries(self) -> bool {
        matches!(self, SlotRole::Active)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SlotRole::Active => "ACTIVE",
            SlotRole::Shadow => "SHADOW",
            SlotRole::Deprecated => "DEPRECATED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(SlotRole::Active),
            "SHADOW" => Some(SlotRole::Shadow),
            "DEPRECATED" => Some(SlotRole::Deprecated),
            _ => None,
        }
    }
}

/// One row of `sync_connection`: which connection currently backs a sync
/// in which role, and since when.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DestinationSlot {
    pub role: SlotRole,
    pub created_at: DateTime<Utc>,
    pub connection_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(role: SlotRole, created_at: i64, connection_id: Uuid) -> DestinationSlot {
        DestinationSlot {
            role,
            created_at: DateTime::from_timestamp(created_at, 0).unwrap(),
            connection_id,
        }
    }

    #[test]
    fn sorts_active_before_shadow_before_deprecated() {
        let a = slot(SlotRole::Deprecated, 0, Uuid::nil());
        let b = slot(SlotRole::Active, 100, Uuid::nil());
        let c = slot(SlotRole::Shadow, 50, Uuid::nil());

        let mut slots = vec![a.clone(), b.clone(), c.clone()];
        slots.sort();

        assert_eq!(slots, vec![b, c, a]);
    }

    #[test]
    fn ties_within_a_role_break_by_creation_time() {
        let older = slot(SlotRole::Shadow, 1, Uuid::nil());
        let newer = slot(SlotRole::Shadow, 2, Uuid::nil());

        let mut slots = vec![newer.clone(), older.clone()];
        slots.sort();

        assert_eq!(slots, vec![older, newer]);
    }

    #[test]
    fn role_round_trips_through_its_string_form() {
        for role in [SlotRole::Active, SlotRole::Shadow, SlotRole::Deprecated] {
            assert_eq!(SlotRole::parse(role.as_str()), Some(role));
        }
    }
}
