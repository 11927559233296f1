//! Flutter-facing bindings for the Lifeboard task engine.
//! All exported calls live in [`api`] and are sync, snapshot-in, envelope-out.

pub mod api;
