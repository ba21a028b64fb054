//! Uncertainty distributions built from SimaPro shape fields.
//!
//! SimaPro stores an uncertainty kind and three shape cells next to each
//! amount. Lognormal shape 1 is the squared geometric standard deviation and
//! Normal shape 1 the variance. Triangular and Uniform use shapes 2 and 3 as
//! bounds.
//!
//! Invalid shape values never abort a parse: the distribution degrades to
//! `Undefined` with a warning. Cells that aren't numbers at all are fatal.

use crate::blocks::fields::NumberFormat;
use crate::error::{Result, SimaProError};
use crate::models::RawUncertainty;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Validated uncertainty distribution around an amount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum UncertaintyDistribution {
    Undefined {
        amount: f64,
        loc: f64,
    },
    Lognormal {
        amount: f64,
        loc: f64,
        scale: f64,
        negative: bool,
    },
    Normal {
        amount: f64,
        loc: f64,
        scale: f64,
        negative: bool,
    },
    Triangular {
        amount: f64,
        loc: f64,
        minimum: f64,
        maximum: f64,
        negative: bool,
    },
    Uniform {
        amount: f64,
        loc: f64,
        minimum: f64,
        maximum: f64,
        negative: bool,
    },
}

impl UncertaintyDistribution {
    pub fn undefined(amount: f64) -> Self {
        Self::Undefined { amount, loc: amount }
    }

    pub fn amount(&self) -> f64 {
        match self {
            Self::Undefined { amount, .. }
            | Self::Lognormal { amount, .. }
            | Self::Normal { amount, .. }
            | Self::Triangular { amount, .. }
            | Self::Uniform { amount, .. } => *amount,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Undefined { .. } => "Undefined",
            Self::Lognormal { .. } => "Lognormal",
            Self::Normal { .. } => "Normal",
            Self::Triangular { .. } => "Triangular",
            Self::Uniform { .. } => "Uniform",
        }
    }

    /// Rescale under a multiplicative unit conversion
    pub fn rescale(&self, factor: f64) -> Self {
        if factor == 0.0 {
            warn!("Scaling by zero removes all uncertainty: {:?}", self);
            return Self::undefined(0.0);
        }

        let amount = self.amount() * factor;
        match *self {
            Self::Undefined { loc, .. } => Self::Undefined { amount, loc },
            Self::Lognormal { scale, .. } => Self::Lognormal {
                amount,
                loc: amount.abs().ln(),
                scale,
                negative: amount < 0.0,
            },
            Self::Normal { scale, .. } => Self::Normal {
                amount,
                loc: amount,
                scale: scale * factor.abs(),
                negative: amount < 0.0,
            },
            Self::Triangular {
                minimum, maximum, ..
            } => {
                let (minimum, maximum) = scaled_bounds(minimum, maximum, factor);
                Self::Triangular {
                    amount,
                    loc: amount,
                    minimum,
                    maximum,
                    negative: amount < 0.0,
                }
            }
            Self::Uniform {
                minimum, maximum, ..
            } => {
                let (minimum, maximum) = scaled_bounds(minimum, maximum, factor);
                Self::Uniform {
                    amount,
                    loc: amount,
                    minimum,
                    maximum,
                    negative: amount < 0.0,
                }
            }
        }
    }
}

fn scaled_bounds(minimum: f64, maximum: f64, factor: f64) -> (f64, f64) {
    if factor < 0.0 {
        (maximum * factor, minimum * factor)
    } else {
        (minimum * factor, maximum * factor)
    }
}

/// Build a distribution from raw SimaPro uncertainty cells
pub fn distribution(
    amount: f64,
    raw: &RawUncertainty,
    numbers: &NumberFormat,
    line_no: usize,
) -> Result<UncertaintyDistribution> {
    let field1 = numbers.require(&raw.field1, "uncertainty field 1", line_no)?;
    let field2 = numbers.require(&raw.field2, "uncertainty field 2", line_no)?;
    let field3 = numbers.require(&raw.field3, "uncertainty field 3", line_no)?;

    let negative = amount < 0.0;
    let dist = match raw.kind.as_str() {
        "Undefined" => UncertaintyDistribution::undefined(amount),
        "Lognormal" => {
            if amount == 0.0 || field1 <= 0.0 {
                warn!(
                    "Invalid lognormal distribution on line {}: {}|{}",
                    line_no, amount, field1
                );
                return Ok(UncertaintyDistribution::undefined(amount));
            }
            UncertaintyDistribution::Lognormal {
                amount,
                loc: amount.abs().ln(),
                scale: field1.sqrt().ln(),
                negative,
            }
        }
        "Normal" => {
            if field1 <= 0.0 {
                warn!(
                    "Invalid normal distribution (sigma <= 0) on line {}: {}",
                    line_no, field1
                );
                return Ok(UncertaintyDistribution::undefined(amount));
            }
            UncertaintyDistribution::Normal {
                amount,
                loc: amount,
                scale: field1.sqrt(),
                negative,
            }
        }
        "Triangle" | "Triangular" => {
            if !(field2 <= amount && amount <= field3) {
                warn!(
                    "Invalid triangular distribution on line {}: {}|{}|{}",
                    line_no, amount, field2, field3
                );
                return Ok(UncertaintyDistribution::undefined(amount));
            }
            UncertaintyDistribution::Triangular {
                amount,
                loc: amount,
                minimum: field2,
                maximum: field3,
                negative,
            }
        }
        "Uniform" => {
            if !(field2 <= amount && amount <= field3) {
                warn!(
                    "Invalid uniform distribution on line {}: {}|{}|{}",
                    line_no, amount, field2, field3
                );
                return Ok(UncertaintyDistribution::undefined(amount));
            }
            UncertaintyDistribution::Uniform {
                amount,
                loc: amount,
                minimum: field2,
                maximum: field3,
                negative,
            }
        }
        other => {
            return Err(SimaProError::UnknownUncertaintyKind {
                kind: other.to_string(),
                line_no,
            });
        }
    };

    Ok(dist)
}
