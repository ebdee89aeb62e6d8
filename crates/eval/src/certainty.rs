//! Certainty factor algebra.
//!
//! A certainty factor (CF) is a degree of belief in [-1, 1]. Evidence
//! from independent rules is merged pairwise with a combination function;
//! every result is clamped to [-CF_BOUND, CF_BOUND] so accumulated belief
//! never reaches absolute proof or disproof.

use serde::{Deserialize, Serialize};

/// Magnitude limit applied after every combination step.
pub const CF_BOUND: f64 = 0.99;

/// Clamp a value into [-CF_BOUND, CF_BOUND]. NaN maps to 0.0.
pub fn clamp_cf(cf: f64) -> f64 {
    if cf.is_nan() {
        return 0.0;
    }
    cf.clamp(-CF_BOUND, CF_BOUND)
}

/// Signed MYCIN combination.
///
/// - both >= 0: `cf1 + cf2 * (1 - cf1)`
/// - both < 0:  `cf1 + cf2 * (1 + cf1)`
/// - mixed:     `(cf1 + cf2) / (1 - min(|cf1|, |cf2|))`
///
/// Commutative, and associative up to floating point rounding, for
/// inputs inside the clamp bound.
pub fn combine_signed(cf1: f64, cf2: f64) -> f64 {
    let result = if cf1 >= 0.0 && cf2 >= 0.0 {
        cf1 + cf2 * (1.0 - cf1)
    } else if cf1 < 0.0 && cf2 < 0.0 {
        cf1 + cf2 * (1.0 + cf1)
    } else {
        let denom = 1.0 - cf1.abs().min(cf2.abs());
        if denom <= 0.0 {
            // Full belief against full disbelief.
            0.0
        } else {
            (cf1 + cf2) / denom
        }
    };
    clamp_cf(result)
}

/// Simple-positive combination: `cf1 + cf2 * (1 - cf1)`.
///
/// Only meaningful when all evidence is positive.
pub fn combine_simple(cf1: f64, cf2: f64) -> f64 {
    clamp_cf(cf1 + cf2 * (1.0 - cf1))
}

/// The combination function a knowledge base uses for every rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Combination {
    #[default]
    SignedMycin,
    SimplePositive,
}

impl Combination {
    pub fn apply(self, cf1: f64, cf2: f64) -> f64 {
        match self {
            Combination::SignedMycin => combine_signed(cf1, cf2),
            Combination::SimplePositive => combine_simple(cf1, cf2),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Combination::SignedMycin => "signed_mycin",
            Combination::SimplePositive => "simple_positive",
        }
    }
}

/// Fold a sequence of rule contributions starting from zero belief.
pub fn replay<I>(combination: Combination, contributions: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    contributions
        .into_iter()
        .fold(0.0, |acc, cf| combination.apply(acc, cf))
}
