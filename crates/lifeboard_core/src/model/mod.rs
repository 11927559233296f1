//! Task domain model shared by the priority, hierarchy and recurrence engines.
//!
//! # Responsibility
//! - Define canonical data structures read from the store snapshot.
//! - Keep raw stored shapes tolerant and validated shapes strict.
//!
//! # Invariants
//! - Every task is identified by a stable `TaskId` issued by the store.
//! - The engine never mutates model values it receives.

pub mod recurrence;
pub mod schedule;
pub mod task;
