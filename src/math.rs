//! Small numeric helpers shared by the control components.

/// Constrain `amt` to `[low, high]`. NaN maps to the middle of the range.
pub fn constrain_float(amt: f32, low: f32, high: f32) -> f32 {
    if amt.is_nan() {
        return (low + high) / 2.0;
    }

    if amt < low {
        return low;
    }

    if amt > high {
        return high;
    }

    amt
}

/// Returns true if `value` is within the closed range `[low, high]`.
pub fn in_range(value: f32, low: f32, high: f32) -> bool {
    value >= low && value <= high
}

/// Sign of `value` as -1, 0 or 1.
///
/// Unlike `f32::signum` zero maps to zero, which the anti-windup test relies on.
pub fn sign(value: f32) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}

/// Linearly map `x` from `[in_min, in_max]` to `[out_min, out_max]`.
pub fn map_range(x: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
    (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}

/// Convert a time interval in microseconds to seconds.
pub fn micros_to_secs(us: u32) -> f32 {
    us as f32 * 1.0e-6
}
