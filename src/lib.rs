//! Entity graph library.
//!
//! A runtime object graph: hierarchical nodes carrying capability units,
//! with priority-ordered notifications for every structural change.
//!
//! - [`collections`] – keyed ordered list used for children and managers
//! - [`components`] – capability keys and units
//! - [`entities`] – the [`World`](entities::World), nodes, sleep, registry, disposal
//! - [`events`] – the notification channel and the per-node/per-unit channels
//! - [`resources`] – engine collaborator and configuration
//! - [`systems`] – diagnostics

pub mod collections;
pub mod components;
pub mod entities;
pub mod events;
pub mod resources;
pub mod systems;
