//! Shared resources consumed by the graph.
//!
//! Submodules overview:
//! - [`engine`] – the engine collaborator seam and a simple registry implementation
//! - [`graphconfig`] – INI-backed defaults for worlds, dumps and debug checks

pub mod engine;
pub mod graphconfig;
