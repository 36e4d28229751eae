//! Merge algebra for partial aggregates
//!
//! Every record type folds an incoming partial into an existing one:
//! counting fields add, game sets union, and derived rates are never stored,
//! only recomputed from the current totals. That makes merge commutative and
//! associative, so batch completion order never changes the final totals.

use super::types::KeyedRecords;
use std::collections::btree_map::Entry;

/// Fold another partial aggregate for the same key into `self`
pub trait Merge {
    fn merge(&mut self, incoming: Self);
}

/// Value-returning form of [`Merge::merge`]
pub fn merge<R: Merge>(mut existing: R, incoming: R) -> R {
    existing.merge(incoming);
    existing
}

/// Merge every record of `partial` into `accumulator`, creating keys lazily
pub fn merge_keyed<R: Merge>(accumulator: &mut KeyedRecords<R>, partial: KeyedRecords<R>) {
    for (key, incoming) in partial {
        match accumulator.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(incoming);
            }
            Entry::Occupied(mut slot) => slot.get_mut().merge(incoming),
        }
    }
}

/// `numerator / denominator`, or `None` when the denominator is zero
pub fn ratio(numerator: u64, denominator: u64) -> Option<f64> {
    if denominator == 0 {
        None
    } else {
        Some(numerator as f64 / denominator as f64)
    }
}

/// Sum of two optional rates; a missing term counts as zero, both missing is `None`
pub fn sum_present(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (None, None) => None,
        _ => Some(a.unwrap_or(0.0) + b.unwrap_or(0.0)),
    }
}

/// Difference of two optional rates with the same zero-substitution rule
pub fn difference_present(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (None, None) => None,
        _ => Some(a.unwrap_or(0.0) - b.unwrap_or(0.0)),
    }
}

/// Round to three decimals; applied only when a record is exported
pub fn round3(value: Option<f64>) -> Option<f64> {
    value.map(|v| (v * 1000.0).round() / 1000.0)
}
