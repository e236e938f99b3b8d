use serde::{Deserialize, Serialize};
use std::fmt;

/// The outcome of a division that may have no meaningful value.
///
/// A zero denominator yields `Undefined` instead of NaN or infinity, so callers
/// can tell "computed to undefined" apart from "failed to compute".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Ratio {
    Value(f64),
    Undefined,
}

impl Ratio {
    pub fn of(numerator: f64, denominator: f64) -> Self {
        if denominator == 0.0 {
            Ratio::Undefined
        } else {
            Ratio::Value(numerator / denominator)
        }
    }

    pub fn percent(numerator: f64, denominator: f64) -> Self {
        Self::of(numerator, denominator).map(|v| v * 100.0)
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Ratio::Value(v) => Some(v),
            Ratio::Undefined => None,
        }
    }

    pub fn is_undefined(self) -> bool {
        matches!(self, Ratio::Undefined)
    }

    pub fn map(self, f: impl FnOnce(f64) -> f64) -> Self {
        match self {
            Ratio::Value(v) => Ratio::Value(f(v)),
            Ratio::Undefined => Ratio::Undefined,
        }
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ratio::Value(v) => match f.precision() {
                Some(p) => write!(f, "{:.*}", p, v),
                None => write!(f, "{}", v),
            },
            Ratio::Undefined => f.write_str("undefined"),
        }
    }
}
