//! Validated money amounts and their display format.

use std::{fmt::Display, str::FromStr, sync::OnceLock};

use numfmt::{Formatter, Precision};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Characters users type to group thousands, e.g. "1,000,000" or "1 000 000".
const THOUSANDS_SEPARATORS: [char; 5] = [',', '_', ' ', '\u{a0}', '\u{202f}'];

/// The largest amount that can be recorded, one trillion.
///
/// Report totals are sums of amounts, so the bound keeps them far from
/// overflowing to infinity.
pub const MAX_AMOUNT: f64 = 1_000_000_000_000.0;

/// An amount of money greater than zero and at most [MAX_AMOUNT], in whole
/// cents.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(f64);

impl Amount {
    /// Create an amount.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::InvalidAmount] if `value` is not
    /// greater than zero, is larger than [MAX_AMOUNT], or has more than two
    /// decimal places.
    pub fn new(value: f64) -> Result<Self, Error> {
        if is_valid_amount(value) {
            Ok(Self(value))
        } else {
            Err(Error::InvalidAmount(value.to_string()))
        }
    }

    /// Parse an amount typed by a user.
    ///
    /// Thousands separators are stripped before parsing, so "1,200,000" and
    /// "1 200 000" both parse to 1200000.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::InvalidAmount] if the text is not a
    /// number that [Amount::new] accepts.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let digits: String = text
            .trim()
            .chars()
            .filter(|c| !THOUSANDS_SEPARATORS.contains(c))
            .collect();

        match digits.parse::<f64>() {
            Ok(value) if is_valid_amount(value) => Ok(Self(value)),
            _ => Err(Error::InvalidAmount(text.trim().to_owned())),
        }
    }

    /// Create an amount without validation.
    ///
    /// The caller should ensure that the value is a valid amount, e.g. because
    /// it was read back from the database.
    pub(crate) fn new_unchecked(value: f64) -> Self {
        Self(value)
    }

    /// The amount as a float.
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl FromStr for Amount {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Amount::parse(s)
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", format_amount(self.0))
    }
}

fn is_valid_amount(value: f64) -> bool {
    value.is_finite() && value > 0.0 && value <= MAX_AMOUNT && is_whole_cents(value)
}

// Binary floats cannot hold most cents exactly, e.g. 0.1 * 100 is
// 10.000000000000002, so compare within a tolerance that grows with the value.
fn is_whole_cents(value: f64) -> bool {
    let cents = value * 100.0;
    let tolerance = (cents * f64::EPSILON * 8.0).max(1e-6);

    (cents - cents.round()).abs() <= tolerance
}

/// Format `number` with comma thousands separators.
///
/// Whole numbers are shown without decimals ("1,200,000"), anything else with
/// two decimal places ("12.50"). Negative numbers get a leading minus sign.
/// Values that are not finite are shown as they are, e.g. "NaN".
pub fn format_amount(number: f64) -> String {
    if !number.is_finite() {
        return number.to_string();
    }

    static WHOLE_FMT: OnceLock<Formatter> = OnceLock::new();

    let whole_fmt = WHOLE_FMT.get_or_init(|| {
        Formatter::currency("")
            .expect("an empty prefix fits in the formatter")
            .precision(Precision::Decimals(0))
    });

    static FRACTION_FMT: OnceLock<Formatter> = OnceLock::new();

    let fraction_fmt = FRACTION_FMT.get_or_init(|| {
        Formatter::currency("")
            .expect("an empty prefix fits in the formatter")
            .precision(Precision::Decimals(2))
    });

    let magnitude = (number.abs() * 100.0).round() / 100.0;

    // Zero is hardcoded as "0", so we must specify the formatted string for zero
    if magnitude == 0.0 {
        return "0".to_owned();
    }

    let formatted_string = if magnitude.fract() == 0.0 {
        whole_fmt.fmt_string(magnitude)
    } else {
        pad_decimals(fraction_fmt.fmt_string(magnitude))
    };

    if number < 0.0 {
        format!("-{formatted_string}")
    } else {
        formatted_string
    }
}

// numfmt omits trailing zeros, e.g. "12.50" is rendered as "12.5".
fn pad_decimals(mut formatted_string: String) -> String {
    match formatted_string.find('.') {
        Some(point) => {
            let decimals = formatted_string.len() - point - 1;
            for _ in decimals..2 {
                formatted_string.push('0');
            }
        }
        None => formatted_string.push_str(".00"),
    }

    formatted_string
}
