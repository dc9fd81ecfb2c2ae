//! Defines the core data models and database queries for transactions.

use std::{fmt::Display, ops::RangeInclusive};

use rusqlite::{
    Connection, OptionalExtension, Row, ToSql, params_from_iter,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, Value, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    amount::Amount,
    database_id::DatabaseId,
    db::{timestamp_from_unix, unix_from_timestamp},
    external_id::TransactionExternalId,
};

// ============================================================================
// MODELS
// ============================================================================

/// Whether money was earned or spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money earned.
    Income,
    /// Money spent.
    Expense,
}

impl TransactionKind {
    /// The value stored in the `kind` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Income => write!(f, "Income"),
            Self::Expense => write!(f, "Expense"),
        }
    }
}

impl ToSql for TransactionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(FromSqlError::Other(
                format!("unknown transaction kind \"{other}\"").into(),
            )),
        }
    }
}

/// An income or expense recorded in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The surrogate ID of the transaction, increasing in creation order.
    pub id: DatabaseId,
    /// The short ID users type to refer to the transaction, e.g. `a001`.
    pub external_id: TransactionExternalId,
    /// Whether this is income or an expense. Never changes after creation.
    pub kind: TransactionKind,
    /// How much money was earned or spent.
    pub amount: Amount,
    /// What the transaction was for.
    pub description: Option<String>,
    /// When the transaction was recorded.
    pub created_at: OffsetDateTime,
}

/// The fields needed to insert a transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// The ID picked by the ID allocator.
    pub external_id: TransactionExternalId,
    /// Income or expense.
    pub kind: TransactionKind,
    /// How much money was earned or spent.
    pub amount: Amount,
    /// What the transaction was for.
    pub description: Option<String>,
    /// When the transaction was recorded.
    pub created_at: OffsetDateTime,
}

/// A partial update to a transaction. Fields left as `None` are not touched.
///
/// # Examples
///
/// ```ignore
/// // Change the amount and clear the description.
/// let changes = TransactionChanges::default()
///     .amount(Amount::new(1_200_000.0)?)
///     .description(None);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionChanges {
    /// The new amount.
    pub amount: Option<Amount>,
    /// The new description, where `Some(None)` clears it.
    pub description: Option<Option<String>>,
}

impl TransactionChanges {
    /// Set the new amount.
    pub fn amount(mut self, amount: Amount) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Set the new description, `None` removes the description.
    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    fn is_empty(&self) -> bool {
        self.amount.is_none() && self.description.is_none()
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

const TRANSACTION_COLUMNS: &str = "id, external_id, kind, amount, description, created_at";

/// Insert a new transaction.
///
/// # Errors
/// This function will return a:
/// - [Error::DuplicateExternalId] if the external ID is already taken,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn insert_transaction(
    transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "INSERT INTO \"transaction\" (external_id, kind, amount, description, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            (
                transaction.external_id.as_ref(),
                transaction.kind,
                transaction.amount.value(),
                transaction.description,
                unix_from_timestamp(transaction.created_at),
            ),
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Retrieve a transaction by its external ID.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn get_transaction(
    external_id: &TransactionExternalId,
    connection: &Connection,
) -> Result<Option<Transaction>, Error> {
    let transaction = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE external_id = :external_id"
        ))?
        .query_row(
            &[(":external_id", external_id.as_ref())],
            map_transaction_row,
        )
        .optional()?;

    Ok(transaction)
}

/// Apply `changes` to the transaction with `external_id` and return the result.
///
/// # Errors
/// This function will return a:
/// - [Error::TransactionNotFound] if `external_id` does not refer to a transaction,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_transaction(
    external_id: &TransactionExternalId,
    changes: TransactionChanges,
    connection: &Connection,
) -> Result<Transaction, Error> {
    if changes.is_empty() {
        return get_transaction(external_id, connection)?
            .ok_or_else(|| Error::TransactionNotFound(external_id.to_string()));
    }

    let mut set_clause_parts = vec![];
    let mut query_parameters = vec![];

    if let Some(amount) = changes.amount {
        query_parameters.push(Value::Real(amount.value()));
        set_clause_parts.push(format!("amount = ?{}", query_parameters.len()));
    }

    if let Some(description) = changes.description {
        query_parameters.push(description.map_or(Value::Null, Value::Text));
        set_clause_parts.push(format!("description = ?{}", query_parameters.len()));
    }

    query_parameters.push(Value::Text(external_id.to_string()));
    let query_string = format!(
        "UPDATE \"transaction\" SET {} WHERE external_id = ?{} RETURNING {TRANSACTION_COLUMNS}",
        set_clause_parts.join(", "),
        query_parameters.len()
    );

    connection
        .prepare(&query_string)?
        .query_row(params_from_iter(query_parameters.iter()), map_transaction_row)
        .optional()?
        .ok_or_else(|| Error::TransactionNotFound(external_id.to_string()))
}

/// Retrieve transactions, newest first.
///
/// If `range` is given, only transactions created within it (inclusive) are
/// returned.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn list_transactions(
    range: Option<RangeInclusive<OffsetDateTime>>,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let mut query_string = format!("SELECT {TRANSACTION_COLUMNS} FROM \"transaction\"");
    let mut query_parameters = vec![];

    if let Some(range) = range {
        query_string.push_str(" WHERE created_at BETWEEN ?1 AND ?2");
        query_parameters.push(Value::Integer(unix_from_timestamp(*range.start())));
        query_parameters.push(Value::Integer(unix_from_timestamp(*range.end())));
    }

    query_string.push_str(" ORDER BY created_at DESC, id DESC");

    connection
        .prepare(&query_string)?
        .query_map(params_from_iter(query_parameters.iter()), map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}

/// The external ID of the most recently inserted transaction, by surrogate ID.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn latest_transaction_external_id(
    connection: &Connection,
) -> Result<Option<TransactionExternalId>, Error> {
    let external_id = connection
        .query_row(
            "SELECT external_id FROM \"transaction\" ORDER BY id DESC LIMIT 1",
            [],
            |row| row.get::<_, String>(0),
        )
        .optional()?;

    Ok(external_id.map(TransactionExternalId::new_unchecked))
}

/// Get the total number of transactions in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn count_transactions(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
            row.get(0)
        })
        .map_err(|error| error.into())
}

/// Delete every transaction and return how many were removed.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn delete_all_transactions(connection: &Connection) -> Result<usize, Error> {
    Ok(connection.execute("DELETE FROM \"transaction\"", [])?)
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                external_id TEXT NOT NULL UNIQUE,
                kind TEXT NOT NULL CHECK (kind IN ('income', 'expense')),
                amount REAL NOT NULL CHECK (amount > 0),
                description TEXT,
                created_at INTEGER NOT NULL
                )",
        (),
    )?;

    // Used by the report windows.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_created_at ON \"transaction\"(created_at);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let external_id: String = row.get(1)?;
    let kind = row.get(2)?;
    let amount: f64 = row.get(3)?;
    let description = row.get(4)?;
    let created_at = timestamp_from_unix(5, row.get(5)?)?;

    Ok(Transaction {
        id,
        external_id: TransactionExternalId::new_unchecked(external_id),
        kind,
        amount: Amount::new_unchecked(amount),
        description,
        created_at,
    })
}

// ============================================================================
// TESTS
// ============================================================================
