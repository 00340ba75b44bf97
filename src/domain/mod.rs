//! Domain layer: entity identity, the mmWave eligibility catalog, and the
//! process-wide interest registry.
//!
//! The registry is the only state shared between concurrently running
//! relays; everything else here is plain data.

pub mod entity_catalog;
pub mod entity_id;
pub mod interest_registry;

pub use entity_catalog::is_mmwave_entity;
pub use entity_id::EntityId;
pub use interest_registry::{InterestRegistry, InterestSet};
