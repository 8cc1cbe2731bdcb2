//! Persisted declarative sync configuration (spec §3).

use serde::{Deserialize, Serialize};

use crate::error::{AirweaveError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DestinationsConfig {
    pub skip_qdrant: bool,
    pub skip_vespa: bool,
    pub target_destinations: Vec<String>,
    pub exclude_destinations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlersConfig {
    pub enable_vector_handlers: bool,
    pub enable_raw_data_handler: bool,
    pub enable_postgres_handler: bool,
}

impl Default for HandlersConfig {
    fn default() -> Self {
        Self {
            enable_vector_handlers: true,
            enable_raw_data_handler: true,
            enable_postgres_handler: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CursorConfig {
    pub skip_load: bool,
    pub skip_updates: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BehaviorConfig {
    pub skip_hash_comparison: bool,
    pub replay_from_arf: bool,
    /// Drives orphan reclamation (spec §4.8 step 5, §9 open question: delta
    /// sources that never run full syncs accrue orphans indefinitely unless
    /// an operator schedules one).
    pub force_full_sync: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub destinations: DestinationsConfig,
    pub handlers: HandlersConfig,
    pub cursor: CursorConfig,
    pub behavior: BehaviorConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            destinations: DestinationsConfig::default(),
            handlers: HandlersConfig::default(),
            cursor: CursorConfig::default(),
            behavior: BehaviorConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Invariant (spec §3): `target_destinations ∩ exclude_destinations = ∅`.
    pub fn validate(&self) -> Result<()> {
        let overlap: Vec<&String> = self
            .destinations
            .target_destinations
            .iter()
            .filter(|d| self.destinations.exclude_destinations.contains(d))
            .collect();

        if !overlap.is_empty() {
            return Err(AirweaveError::Validation(format!(
                "target_destinations and exclude_destinations overlap: {:?}",
                overlap
            )));
        }
        Ok(())
    }

    /// Preset: default behavior, all destinations, all handlers.
    pub fn normal() -> Self {
        Self::default()
    }

    /// Preset: write only to Qdrant-shaped vector destinations.
    pub fn qdrant_only() -> Self {
        Self {
            destinations: DestinationsConfig {
                skip_vespa: true,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Preset: write only to Vespa.
    pub fn vespa_only() -> Self {
        Self {
            destinations: DestinationsConfig {
                skip_qdrant: true,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Preset: archive only — disable vector + postgres handlers.
    pub fn archive_only() -> Self {
        Self {
            handlers: HandlersConfig {
                enable_vector_handlers: false,
                enable_raw_data_handler: true,
                enable_postgres_handler: false,
            },
            ..Default::default()
        }
    }

    /// Preset: replay from ARF — read-only with respect to the source and
    /// metadata store (spec §4.10: replay syncs typically disable the
    /// archive handler and the metadata handler).
    pub fn replay_from_archive() -> Self {
        Self {
            handlers: HandlersConfig {
                enable_vector_handlers: true,
                enable_raw_data_handler: false,
                enable_postgres_handler: false,
            },
            behavior: BehaviorConfig {
                replay_from_arf: true,
                ..Default::default()
            },
            cursor: CursorConfig {
                skip_load: true,
                skip_updates: true,
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_destination_sets_rejected() {
        let mut cfg = SyncConfig::normal();
        cfg.destinations.target_destinations = vec!["qdrant".into()];
        cfg.destinations.exclude_destinations = vec!["qdrant".into()];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn disjoint_destination_sets_accepted() {
        let mut cfg = SyncConfig::normal();
        cfg.destinations.target_destinations = vec!["qdrant".into()];
        cfg.destinations.exclude_destinations = vec!["vespa".into()];
        assert!(cfg.validate().is_ok());
    }
}
