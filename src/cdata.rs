//! Consolidated data: a pre-aggregated value plus provenance counters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// How the samples behind a [`ConsolidatedData`] were combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConsolidationFunction {
    Avg,
    Min,
    Max,
}

impl fmt::Display for ConsolidationFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConsolidationFunction::Avg => "AVG",
            ConsolidationFunction::Min => "MIN",
            ConsolidationFunction::Max => "MAX",
        })
    }
}

impl FromStr for ConsolidationFunction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AVG" => Ok(ConsolidationFunction::Avg),
            "MIN" => Ok(ConsolidationFunction::Min),
            "MAX" => Ok(ConsolidationFunction::Max),
            _ => Err(Error::InvalidParameter(format!(
                "unknown consolidation function {s:?} (expected AVG, MIN or MAX)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedData {
    pub value: f64,
    /// Samples that were undefined and left out of `value`.
    pub undefined_count: i32,
    /// Samples that contributed to `value`.
    pub value_count: i32,
    pub function: Option<ConsolidationFunction>,
}

impl ConsolidatedData {
    /// A single defined sample.
    pub fn sample(value: f64) -> Self {
        Self {
            value,
            undefined_count: 0,
            value_count: 1,
            function: None,
        }
    }

    /// Parse the input form: a floating point number, optionally preceded
    /// by whitespace. The result counts as one defined sample.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidFormat`: empty input, not a number, a number too
    ///   large for `f64`, or anything (including whitespace) after the number
    pub fn parse(text: &str, function: Option<ConsolidationFunction>) -> Result<Self> {
        let token = text.trim_start();
        let invalid = || Error::InvalidFormat(text.to_string());
        let value = token.parse::<f64>().map_err(|_| invalid())?;
        // Only the `inf`/`nan` spellings may produce a non-finite value.
        let digits = token.trim_start_matches(['+', '-']);
        if !value.is_finite() && digits.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
            return Err(invalid());
        }
        Ok(Self {
            function,
            ..Self::sample(value)
        })
    }

    /// Re-label the value with a consolidation function.
    pub fn with_function(self, function: Option<ConsolidationFunction>) -> Self {
        match function {
            Some(_) => Self { function, ..self },
            None => self,
        }
    }
}

impl fmt::Display for ConsolidatedData {
    /// `<value> (U:<undefined>/<count>)`, the value in `%g` notation.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (U:{}/{})",
            format_general(self.value),
            self.undefined_count,
            self.value_count
        )
    }
}

const GENERAL_PRECISION: i32 = 6;

/// C `%g`: six significant digits, scientific notation for very small or
/// large magnitudes, trailing zeros removed.
fn format_general(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value < 0.0 { "-inf" } else { "inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let scientific = format!("{:.*e}", (GENERAL_PRECISION - 1) as usize, value);
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= GENERAL_PRECISION {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{sign}{:02}",
            trim_fraction(mantissa),
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (GENERAL_PRECISION - 1 - exponent) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}
