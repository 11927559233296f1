//! Task hierarchy views over a store snapshot.
//!
//! # Responsibility
//! - Build lookup maps from the flat edge list (`index`).
//! - Pair those maps with node lookup for evaluators (`graph`).
//!
//! # Invariants
//! - Maps are rebuilt per evaluation from the caller's snapshot.
//! - Task entities never carry back-pointers; relations live only in the maps.

pub mod graph;
pub mod index;
