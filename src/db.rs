//! Sets up the ledger database and shared column conversions.

use rusqlite::{Connection, Transaction as SqlTransaction, types::Type};
use time::OffsetDateTime;

use crate::{Error, debtor::create_debtor_table, transaction::create_transaction_table};

/// Create the tables for the domain models if they do not exist yet.
///
/// All tables are created inside one exclusive SQL transaction, so a
/// half-initialized database is never left behind.
///
/// # Errors
/// Returns an [Error::SqlError] if a table cannot be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Exclusive)?;

    create_transaction_table(&transaction)?;
    create_debtor_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Convert a timestamp to the UNIX seconds stored in the database.
pub(crate) fn unix_from_timestamp(timestamp: OffsetDateTime) -> i64 {
    timestamp.unix_timestamp()
}

/// Convert UNIX seconds read from column `index` back into a UTC timestamp.
pub(crate) fn timestamp_from_unix(
    index: usize,
    seconds: i64,
) -> Result<OffsetDateTime, rusqlite::Error> {
    OffsetDateTime::from_unix_timestamp(seconds).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(index, Type::Integer, Box::new(error))
    })
}
