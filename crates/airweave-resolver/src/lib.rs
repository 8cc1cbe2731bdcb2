//! Hash-based action resolution (spec §4.6, C7).

pub mod resolver;

pub use resolver::{resolve, ActionBatch, ResolvedDelete, ResolvedInsert, ResolvedKeep, ResolvedUpdate};
