//! Alert identity, acknowledgement, and unread projection.
//!
//! Submodules:
//! - `identity` - derives a stable alert identity from a fused summary.
//! - `acknowledgements` - TTL-bounded read-state, swept lazily on read.
//! - `unread` - intersects summaries with the store for the live badge.

pub mod acknowledgements;
pub mod identity;
pub mod unread;
