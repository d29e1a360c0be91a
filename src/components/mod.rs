//! Capability units and the keys they are registered under.
//!
//! Submodules overview:
//! - [`capability`] – interned capability keys
//! - [`unit`] – unit storage, creation, manager lists, attach/detach and disposal

pub mod capability;
pub mod unit;

pub use capability::{CapabilityKey, CapabilityTable};
pub use unit::UnitSpec;
