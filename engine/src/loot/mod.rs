//! Loot generation: reference resolution followed by a deterministic roll.

pub mod resolve;
pub mod roll;

pub use resolve::{InlineTemplate, LootReference, Resolver, SlotHint};
pub use roll::{ItemStats, Provenance, RolledItem, Roller};
