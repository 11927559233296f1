//! Engine use-case services.
//!
//! # Responsibility
//! - Turn snapshot views into state-change recommendations for callers.
//! - Keep UI/FFI layers decoupled from graph and calendar details.
//!
//! # Invariants
//! - Services never mutate the snapshot; callers persist accepted deltas.

pub mod completion_service;
pub mod recurrence_service;
