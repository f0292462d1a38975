//! Numeric helpers for probabilities and loosely typed wire values.

use num_traits::cast::cast;
use serde_json::Number;

use crate::constants::FULL_PROBABILITY;

/// Greatest common divisor of two integers.
#[must_use]
pub const fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

/// Greatest common divisor of a set of probabilities.
///
/// Zeros do not contribute; an empty or all-zero set yields 1.
#[must_use]
pub fn gcd_all<I>(values: I) -> u32
where
    I: IntoIterator<Item = u32>,
{
    match values.into_iter().fold(0, gcd) {
        0 => 1,
        g => g,
    }
}

/// Split [`FULL_PROBABILITY`] across `count` targets.
///
/// Every target receives `100 / count` and the first `100 % count` targets
/// receive one extra point, so the shares always sum to exactly 100.
#[must_use]
pub fn equal_split(count: usize) -> Vec<u32> {
    let Ok(n) = u32::try_from(count) else {
        return Vec::new();
    };
    if n == 0 {
        return Vec::new();
    }
    let base = FULL_PROBABILITY / n;
    let remainder = FULL_PROBABILITY % n;
    (0..n).map(|i| base + u32::from(i < remainder)).collect()
}

/// Percentage share of `occurrences` out of `total`, with the fraction dropped.
#[must_use]
pub fn floor_share(occurrences: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let share = occurrences.saturating_mul(FULL_PROBABILITY as usize) / total;
    u32::try_from(share).unwrap_or(u32::MAX)
}

/// Truncate a float percentage to a whole percent, returning `None` for
/// negative or non-finite input.
#[must_use]
pub fn f64_to_percent(value: f64) -> Option<u32> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    let max = cast::<u32, f64>(u32::MAX).unwrap_or(f64::MAX);
    cast::<f64, u32>(value.min(max).trunc())
}

/// Interpret a JSON number as a whole percent.
#[must_use]
pub fn number_to_percent(value: &Number) -> Option<u32> {
    if let Some(whole) = value.as_u64() {
        return Some(u32::try_from(whole).unwrap_or(u32::MAX));
    }
    value.as_f64().and_then(f64_to_percent)
}

/// Parse a text scalar into a JSON number the way the player runtime reads it.
///
/// Integers stay integers, floats with no fraction collapse to integers and
/// blank or non-numeric text yields `None`.
#[must_use]
pub fn parse_numeric(text: &str) -> Option<Number> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(whole) = trimmed.parse::<i64>() {
        return Some(Number::from(whole));
    }
    let float = trimmed.parse::<f64>().ok().filter(|f| f.is_finite())?;
    if float.fract() == 0.0
        && let Some(whole) = cast::<f64, i64>(float)
    {
        return Some(Number::from(whole));
    }
    Number::from_f64(float)
}
