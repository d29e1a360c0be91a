//! Notification channels and the events raised on them.
//!
//! The graph announces every change synchronously through [`signal::Signal`]
//! channels instead of being polled. Renderers, schedulers and debugging
//! tools subscribe to the channels they care about.
//!
//! Submodules:
//! - [`signal`] – the priority-ordered multicast channel itself
//! - [`node`] – channels and argument shapes raised by hierarchy nodes
//! - [`unit`] – channels and argument shapes raised by capability units
pub mod node;
pub mod signal;
pub mod unit;
