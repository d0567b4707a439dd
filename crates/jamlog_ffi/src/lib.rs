//! Flutter-facing bindings for Jamlog core.

pub mod api;
