//! Linear <-> logarithmic priority scale.
//!
//! # Invariants
//! - Both scales span `0..=10` and both ends map to themselves.
//! - `log_to_linear(linear_to_log(x)) ≈ x` within floating rounding.
//! - Inputs outside the range are clamped; NaN is treated as `0`.

/// Lower bound shared by both scales.
pub const PRIORITY_MIN: f64 = 0.0;
/// Upper bound shared by both scales.
pub const PRIORITY_MAX: f64 = 10.0;

/// `ln(PRIORITY_MAX + 1)`, the normalizer that pins `10 -> 10`.
fn log_span() -> f64 {
    (PRIORITY_MAX + 1.0).ln()
}

fn clamp_priority(value: f64) -> f64 {
    if value.is_nan() {
        return PRIORITY_MIN;
    }
    value.clamp(PRIORITY_MIN, PRIORITY_MAX)
}

/// Converts a linear slider value to the stored log-scale value.
pub fn linear_to_log(value: f64) -> f64 {
    let linear = clamp_priority(value);
    PRIORITY_MAX * (1.0 + linear).ln() / log_span()
}

/// Converts a stored log-scale value back to the linear slider value.
pub fn log_to_linear(value: f64) -> f64 {
    let stored = clamp_priority(value);
    let linear = (stored * log_span() / PRIORITY_MAX).exp() - 1.0;
    linear.clamp(PRIORITY_MIN, PRIORITY_MAX)
}
