//! Short, typeable identifiers shown to users, e.g. `a001` and `D001`.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

/// The largest number that fits in the three digit suffix.
pub const MAX_SEQUENCE: u16 = 999;

/// The fixed prefix of every debtor ID.
pub const DEBTOR_PREFIX: char = 'D';

/// The external ID of a transaction: one lowercase letter and three digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionExternalId(String);

impl TransactionExternalId {
    /// Build an ID from its letter and sequence number.
    ///
    /// `letter` is lowercased, `sequence` is wrapped into `1..=999`.
    pub fn new(letter: char, sequence: u16) -> Self {
        Self(format!(
            "{}{:03}",
            letter.to_ascii_lowercase(),
            wrap_sequence(sequence)
        ))
    }

    /// Parse an ID typed by a user, ignoring surrounding whitespace and case.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::MalformedTransactionId] if the text
    /// is not exactly one ASCII letter followed by three digits.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let normalized = text.trim().to_ascii_lowercase();

        match split_id(&normalized) {
            Some((letter, _)) if letter.is_ascii_lowercase() => Ok(Self(normalized)),
            _ => Err(Error::MalformedTransactionId(text.trim().to_owned())),
        }
    }

    /// Create an ID without validation, e.g. when reading from the database.
    pub(crate) fn new_unchecked(id: String) -> Self {
        Self(id)
    }

    /// The three digit sequence number.
    pub fn sequence(&self) -> Option<u16> {
        split_id(&self.0).map(|(_, sequence)| sequence)
    }
}

/// The external ID of a debtor: `D` and three digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DebtorExternalId(String);

impl DebtorExternalId {
    /// Build an ID from its sequence number, wrapped into `1..=999`.
    pub fn new(sequence: u16) -> Self {
        Self(format!("{DEBTOR_PREFIX}{:03}", wrap_sequence(sequence)))
    }

    /// Parse an ID typed by a user, ignoring surrounding whitespace and case.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::MalformedDebtorId] if the text is
    /// not exactly `D` followed by three digits.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let normalized = text.trim().to_ascii_uppercase();

        match split_id(&normalized) {
            Some((DEBTOR_PREFIX, _)) => Ok(Self(normalized)),
            _ => Err(Error::MalformedDebtorId(text.trim().to_owned())),
        }
    }

    /// Create an ID without validation, e.g. when reading from the database.
    pub(crate) fn new_unchecked(id: String) -> Self {
        Self(id)
    }

    /// The three digit sequence number.
    pub fn sequence(&self) -> Option<u16> {
        split_id(&self.0).map(|(_, sequence)| sequence)
    }
}

macro_rules! impl_id_traits {
    ($id:ty) => {
        impl AsRef<str> for $id {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $id {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$id>::parse(s)
            }
        }

        impl Display for $id {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

impl_id_traits!(TransactionExternalId);
impl_id_traits!(DebtorExternalId);

/// Map any counter value onto `1..=999`, so 1000 becomes 1 again.
pub fn wrap_sequence(sequence: u16) -> u16 {
    (sequence.max(1) - 1) % MAX_SEQUENCE + 1
}

/// Split `id` into its letter and three digit number.
fn split_id(id: &str) -> Option<(char, u16)> {
    let mut chars = id.chars();
    let letter = chars.next().filter(char::is_ascii_alphabetic)?;
    let digits = chars.as_str();

    if digits.len() != 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    digits.parse().ok().map(|sequence| (letter, sequence))
}
