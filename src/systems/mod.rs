//! Graph-wide passes that read the world without changing it.
//!
//! Submodules overview
//! - [`dump`] – text dumps and serializable snapshots of subtrees

pub mod dump;
