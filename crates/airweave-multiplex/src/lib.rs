//! Destination slot transitions (spec §3, §4.9, C11). Slot roles
//! themselves live in `airweave_common::destination_slot` since the
//! dispatcher and metadata store reference them too; this crate owns the
//! transitions (`fork`, `switch`) and their transactional invariant.

pub mod multiplexer;

pub use airweave_common::destination_slot::{DestinationSlot, SlotRole};
pub use multiplexer::{Multiplexer, ResyncRequest};
