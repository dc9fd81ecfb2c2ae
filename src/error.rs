//! Defines the crate level error type and how each error is classified.

/// The errors that may occur in the ledger.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The amount was not a number, was not greater than zero, was larger than
    /// [MAX_AMOUNT](crate::MAX_AMOUNT), or had fractions of a cent.
    #[error("\"{0}\" is not a valid amount")]
    InvalidAmount(String),

    /// An empty string was used as a debtor name.
    #[error("debtor name cannot be empty")]
    EmptyDebtorName,

    /// The debtor name contained characters other than letters and spaces.
    #[error("\"{0}\" is not a valid debtor name, only letters and spaces are allowed")]
    InvalidDebtorName(String),

    /// The text does not have the shape of a transaction ID, e.g. `a001`.
    #[error("\"{0}\" is not a valid transaction ID")]
    MalformedTransactionId(String),

    /// The text does not have the shape of a debtor ID, e.g. `D001`.
    #[error("\"{0}\" is not a valid debtor ID")]
    MalformedDebtorId(String),

    /// Debtor status only moves from active to paid.
    #[error("a paid debtor cannot be made active again")]
    InvalidStatusTransition,

    /// No transaction has the given external ID.
    #[error("no transaction with the ID {0}")]
    TransactionNotFound(String),

    /// No debtor has the given external ID.
    #[error("no debtor with the ID {0}")]
    DebtorNotFound(String),

    /// The generated external ID is already in use.
    ///
    /// The ID allocator retries with a fresh ID when it sees this error, so it
    /// should never reach the user.
    #[error("the external ID {0} already exists in the database")]
    DuplicateExternalId(String),

    /// The ID allocator could not find a free external ID.
    #[error("could not allocate a free external ID after {0} attempts")]
    IdSpaceExhausted(usize),

    /// The configured timezone is not a canonical timezone name.
    #[error("invalid timezone {0}")]
    InvalidTimezone(String),

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

/// How an [Error] is recovered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad user input. The user is told what was wrong and asked again.
    Validation,
    /// The input was well formed but refers to a record that does not exist.
    NotFound,
    /// A uniqueness constraint failed.
    Conflict,
    /// The store could not complete the operation.
    Storage,
}

impl Error {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidAmount(_)
            | Error::EmptyDebtorName
            | Error::InvalidDebtorName(_)
            | Error::MalformedTransactionId(_)
            | Error::MalformedDebtorId(_)
            | Error::InvalidStatusTransition => ErrorKind::Validation,
            Error::TransactionNotFound(_) | Error::DebtorNotFound(_) => ErrorKind::NotFound,
            Error::DuplicateExternalId(_) => ErrorKind::Conflict,
            Error::IdSpaceExhausted(_)
            | Error::InvalidTimezone(_)
            | Error::DatabaseLockError
            | Error::SqlError(_) => ErrorKind::Storage,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    && desc.ends_with(".external_id") =>
            {
                Error::DuplicateExternalId(desc.clone())
            }
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}
