//! Core debtor domain types.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, amount::Amount, database_id::DatabaseId, external_id::DebtorExternalId};

/// A validated debtor name: non-empty, letters and spaces only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct DebtorName(String);

impl DebtorName {
    /// Create a debtor name.
    ///
    /// Letters from any alphabet are accepted, so "Ali", "Алишер" and
    /// "Anna Maria" are all valid.
    ///
    /// # Errors
    ///
    /// This function will return a:
    /// - [Error::EmptyDebtorName] if `name` is empty or just whitespace,
    /// - or [Error::InvalidDebtorName] if `name` contains anything other than
    ///   letters and spaces.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyDebtorName)
        } else if !name.chars().all(|c| c.is_alphabetic() || c == ' ') {
            Err(Error::InvalidDebtorName(name.to_owned()))
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create a debtor name without validation.
    ///
    /// The caller should ensure that the string is a valid name.
    ///
    /// This function has `_unchecked` in the name but is not `unsafe`, because
    /// a violated invariant causes incorrect behaviour, not memory unsafety.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for DebtorName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for DebtorName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DebtorName::new(s)
    }
}

impl Display for DebtorName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether the debt is still owed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebtorStatus {
    /// The debt is still owed.
    Active,
    /// The debt was paid back. Paid debtors are removed after a delay.
    Paid,
}

impl DebtorStatus {
    /// The value stored in the `status` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paid => "paid",
        }
    }

    /// Whether a debtor may move from `self` to `next`.
    ///
    /// Status only ever moves forward, from active to paid.
    pub fn can_become(self, next: DebtorStatus) -> bool {
        !matches!((self, next), (Self::Paid, Self::Active))
    }
}

impl Display for DebtorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "Active"),
            Self::Paid => write!(f, "Paid"),
        }
    }
}

impl ToSql for DebtorStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for DebtorStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "active" => Ok(Self::Active),
            "paid" => Ok(Self::Paid),
            other => Err(FromSqlError::Other(
                format!("unknown debtor status \"{other}\"").into(),
            )),
        }
    }
}

/// Someone who owes money.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debtor {
    /// The surrogate ID of the debtor.
    pub id: DatabaseId,
    /// The short ID users type to refer to the debtor, e.g. `D001`.
    pub external_id: DebtorExternalId,
    /// Who owes the money.
    pub name: DebtorName,
    /// How much is owed.
    pub amount: Amount,
    /// When the debt was registered.
    pub registered_at: OffsetDateTime,
    /// Whether the debt is still owed.
    pub status: DebtorStatus,
}

/// The fields needed to insert a debtor. New debtors are always active.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDebtor {
    /// The ID picked by the ID allocator.
    pub external_id: DebtorExternalId,
    /// Who owes the money.
    pub name: DebtorName,
    /// How much is owed.
    pub amount: Amount,
    /// When the debt was registered.
    pub registered_at: OffsetDateTime,
}

/// What changing a debtor's status did.
#[derive(Debug, Clone, PartialEq)]
pub struct DebtorStatusChange {
    /// The status before the change.
    pub previous: DebtorStatus,
    /// The debtor after the change.
    pub debtor: Debtor,
}

impl DebtorStatusChange {
    /// Whether this change moved the debtor from active to paid.
    pub fn became_paid(&self) -> bool {
        self.previous == DebtorStatus::Active && self.debtor.status == DebtorStatus::Paid
    }
}
