//! Pure numeric helpers shared by the processor and the calculator.

/// Clamp `value` into `[min, max]`.
///
/// NaN collapses to `min` so a poisoned sample can never escape a range.
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.max(min).min(max)
}

/// Round to the nearest 0.5, halves rounding up (2.25 -> 2.5, 2.75 -> 3.0).
pub fn round_to_half(value: f64) -> f64 {
    (value * 2.0 + 0.5).floor() / 2.0
}

/// Exponential moving average: `previous * (1 - alpha) + current * alpha`.
pub fn ema(previous: f64, current: f64, alpha: f64) -> f64 {
    previous * (1.0 - alpha) + current * alpha
}
