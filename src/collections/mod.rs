//! Container types shared by the graph.
//!
//! - [`orderedlist`] – duplicate-free list with O(1) membership and positional moves

pub mod orderedlist;

pub use orderedlist::OrderedList;
