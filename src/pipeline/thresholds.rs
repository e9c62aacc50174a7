//! Decision thresholds for the triage engine.
//!
//! One validated object instead of scattered constants, so tests can run
//! the engine under multiple threshold regimes without code change.

use crate::error::ConfigError;

/// The three decision bands applied to every probability field.
///
/// - below `lower`: the signal is confidently absent
/// - at or above `upper`: the signal is confidently present
/// - strictly between the two: the uncertain band that drives manual
///   review
/// - `mid`: tie-break used only inside the review bucket to assign a
///   best-guess label
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub lower: f64,
    pub mid: f64,
    pub upper: f64,
}

impl Thresholds {
    /// Build a validated threshold set. Requires
    /// `0 <= lower < mid < upper <= 1`.
    pub fn new(lower: f64, mid: f64, upper: f64) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&lower) || !(0.0..=1.0).contains(&upper) {
            return Err(ConfigError::Thresholds(format!(
                "bounds must lie in [0, 1], got lower={lower}, upper={upper}"
            )));
        }
        if !(lower < mid && mid < upper) {
            return Err(ConfigError::Thresholds(format!(
                "expected lower < mid < upper, got {lower} / {mid} / {upper}"
            )));
        }
        Ok(Self { lower, mid, upper })
    }

    /// True when `p` falls strictly inside the uncertain band.
    pub fn uncertain(&self, p: f64) -> bool {
        p > self.lower && p < self.upper
    }

    /// True when `p` is confidently present or confidently absent,
    /// i.e. not in the uncertain band. Both comparisons are strict, so
    /// a value exactly at either bound is neither decisive nor
    /// uncertain.
    pub fn decisive(&self, p: f64) -> bool {
        p > self.upper || p < self.lower
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            lower: 0.4,
            mid: 0.5,
            upper: 0.75,
        }
    }
}
