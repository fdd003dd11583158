//! Click and open tracking.
//!
//! Outgoing HTML can have its links routed through a jump endpoint, and the
//! endpoints themselves are served by [`Tracker`].

mod endpoints;
mod links;

pub use endpoints::{PIXEL_PNG, PingResponse, Tracker};
pub use links::{jump_link, rewrite_links};
