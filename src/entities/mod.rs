//! Graph storage and the operations on it.
//!
//! Submodules overview:
//! - [`arena`] – generational handles ([`NodeId`], [`UnitId`]) and their storage
//! - [`world`] – the [`World`] owning every node and unit
//! - [`node`] – naming, engine membership, parenting and child order
//! - [`sleep`] – reference-counted sleep
//! - [`registry`] – per-node capability registry and system tags
//! - [`dispose`] – node disposal

pub mod arena;
pub mod dispose;
pub mod node;
pub mod registry;
pub mod sleep;
pub mod world;

pub use arena::{NodeId, UnitId};
pub use node::SystemTag;
pub use world::World;
