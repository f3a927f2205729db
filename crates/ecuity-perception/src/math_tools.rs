//! Numeric primitives shared by the depth processor and the sensory adapter.
//!
//! Everything here is a pure function over its arguments.
//!
//! # Distance categories
//!
//! A threshold distance `T` (mm) and a category count `N` split the monitored
//! range `[0, T)` into `N` equal segments indexed `0..N`, nearest first.
//! Anything at or beyond `T` falls into the overflow category `N`.
//!
//! Nearer obstacles should vibrate faster, so a dominant category `c` maps to
//! the frequency `(N - c) * multiplier`; the overflow category maps to `0`
//! ("do not vibrate").
//!
//! ```rust
//! use ecuity_perception::math_tools::{category_counts_to_frequency, distance_to_category};
//!
//! assert_eq!(distance_to_category(1500.0, 3000, 3), 1);
//! assert_eq!(distance_to_category(3000.0, 3000, 3), 3);
//! assert_eq!(category_counts_to_frequency(3, &[0, 7, 2, 1], 1).unwrap(), 2);
//! ```

use ecuity_types::EcuityError;

/// Median of `values`, sorting the slice in place.
///
/// Even cardinality yields the mean of the two central order statistics.
///
/// # Errors
///
/// Returns [`EcuityError::EmptyInput`] when `values` is empty.
pub fn median(values: &mut [u16]) -> Result<f64, EcuityError> {
    if values.is_empty() {
        return Err(EcuityError::EmptyInput);
    }

    values.sort_unstable();
    let half = values.len() / 2;

    if values.len() % 2 == 0 {
        Ok((f64::from(values[half - 1]) + f64::from(values[half])) / 2.0)
    } else {
        Ok(f64::from(values[half]))
    }
}

/// Arithmetic mean of `values`.
///
/// # Errors
///
/// Returns [`EcuityError::EmptyInput`] when `values` is empty.
pub fn mean(values: &[u16]) -> Result<f64, EcuityError> {
    if values.is_empty() {
        return Err(EcuityError::EmptyInput);
    }
    let sum: u64 = values.iter().map(|&v| u64::from(v)).sum();
    Ok(sum as f64 / values.len() as f64)
}

/// Smallest value in `values`, i.e. the nearest sample of a depth tile.
///
/// # Errors
///
/// Returns [`EcuityError::EmptyInput`] when `values` is empty.
pub fn min(values: &[u16]) -> Result<f64, EcuityError> {
    values
        .iter()
        .min()
        .map(|&v| f64::from(v))
        .ok_or(EcuityError::EmptyInput)
}

/// Index of the distance category `distance` (mm) belongs to.
///
/// Returns `num_categories` for `distance >= threshold`, otherwise
/// `floor(distance / threshold * num_categories)`.
pub fn distance_to_category(distance: f64, threshold: u32, num_categories: usize) -> usize {
    let threshold = f64::from(threshold);
    if distance >= threshold {
        num_categories
    } else {
        // distance < threshold keeps the product below num_categories
        ((distance / threshold) * num_categories as f64).floor() as usize
    }
}

/// Convert a category histogram into a vibration frequency (Hz).
///
/// The dominant category is the first index holding the maximum count.
///
/// # Errors
///
/// Returns [`EcuityError::EmptyInput`] when `counts` is empty and
/// [`EcuityError::InvalidArgument`] when the frequency does not fit a `u32`.
pub fn category_counts_to_frequency(
    num_categories: usize,
    counts: &[u32],
    multiplier: u32,
) -> Result<u32, EcuityError> {
    let dominant = argmax(counts).ok_or(EcuityError::EmptyInput)?;
    let steps = num_categories.saturating_sub(dominant);
    let steps = u32::try_from(steps).map_err(|_| {
        EcuityError::InvalidArgument(format!("{num_categories} categories overflow a frequency"))
    })?;
    steps.checked_mul(multiplier).ok_or_else(|| {
        EcuityError::InvalidArgument(format!(
            "{steps} steps x {multiplier} Hz overflows a frequency"
        ))
    })
}

// Lowest index wins ties.
fn argmax(values: &[u32]) -> Option<usize> {
    let mut best: Option<(usize, u32)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, max)) if v <= max => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}
