use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
///
/// Used for recipe experience values, where stochastic rounding needs a
/// deterministic fractional part.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Convert an f64 to Fixed64. Use only for initialization, never in the tick loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Multiply a whole count by a fixed-point rate, saturating at the type bounds.
#[inline]
pub fn scale_by_count(rate: Fixed64, count: u32) -> Fixed64 {
    rate.saturating_mul(Fixed64::from_num(count))
}
