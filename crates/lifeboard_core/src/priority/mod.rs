//! Priority mapping for importance/urgency scoring.
//!
//! # Responsibility
//! - Convert between the linear UI slider scale and the stored log scale.
//! - Classify scored tasks into Eisenhower quadrants.

pub mod quadrant;
pub mod scale;
