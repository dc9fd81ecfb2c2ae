//! Database operations for debtors.

use rusqlite::{Connection, OptionalExtension, Row};

use crate::{
    Error,
    amount::Amount,
    database_id::DatabaseId,
    db::{timestamp_from_unix, unix_from_timestamp},
    debtor::{Debtor, DebtorName, DebtorStatus, DebtorStatusChange, NewDebtor},
    external_id::DebtorExternalId,
};

const DEBTOR_COLUMNS: &str = "id, external_id, name, amount, registered_at, status";

/// Insert an active debtor and return it with its generated ID.
///
/// # Errors
/// This function will return a:
/// - [Error::DuplicateExternalId] if the external ID is already taken,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn insert_debtor(debtor: NewDebtor, connection: &Connection) -> Result<Debtor, Error> {
    connection
        .prepare(&format!(
            "INSERT INTO debtor (external_id, name, amount, registered_at, status)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING {DEBTOR_COLUMNS}"
        ))?
        .query_row(
            (
                debtor.external_id.as_ref(),
                debtor.name.as_ref(),
                debtor.amount.value(),
                unix_from_timestamp(debtor.registered_at),
                DebtorStatus::Active,
            ),
            map_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve a single debtor by external ID.
pub fn get_debtor(
    external_id: &DebtorExternalId,
    connection: &Connection,
) -> Result<Option<Debtor>, Error> {
    connection
        .prepare(&format!(
            "SELECT {DEBTOR_COLUMNS} FROM debtor WHERE external_id = :external_id;"
        ))?
        .query_row(&[(":external_id", external_id.as_ref())], map_row)
        .optional()
        .map_err(|error| error.into())
}

/// Retrieve all debtors, most recently registered first.
pub fn get_all_debtors(connection: &Connection) -> Result<Vec<Debtor>, Error> {
    connection
        .prepare(&format!(
            "SELECT {DEBTOR_COLUMNS} FROM debtor ORDER BY registered_at DESC, id DESC;"
        ))?
        .query_map([], map_row)?
        .map(|maybe_debtor| maybe_debtor.map_err(|error| error.into()))
        .collect()
}

/// Update a debtor's amount. Returns an error if the debtor doesn't exist.
pub fn update_debtor_amount(
    external_id: &DebtorExternalId,
    amount: Amount,
    connection: &Connection,
) -> Result<Debtor, Error> {
    connection
        .prepare(&format!(
            "UPDATE debtor SET amount = ?1 WHERE external_id = ?2 RETURNING {DEBTOR_COLUMNS}"
        ))?
        .query_row((amount.value(), external_id.as_ref()), map_row)
        .optional()?
        .ok_or_else(|| Error::DebtorNotFound(external_id.to_string()))
}

/// Update a debtor's status and report what it was before.
///
/// Returns an error if the debtor doesn't exist or if the change would move a
/// paid debtor back to active. Setting the current status again succeeds and
/// leaves the row as it was.
pub fn update_debtor_status(
    external_id: &DebtorExternalId,
    status: DebtorStatus,
    connection: &Connection,
) -> Result<DebtorStatusChange, Error> {
    let current = get_debtor(external_id, connection)?
        .ok_or_else(|| Error::DebtorNotFound(external_id.to_string()))?;

    if !current.status.can_become(status) {
        return Err(Error::InvalidStatusTransition);
    }

    let debtor = connection
        .prepare(&format!(
            "UPDATE debtor SET status = ?1 WHERE external_id = ?2 RETURNING {DEBTOR_COLUMNS}"
        ))?
        .query_row((status, external_id.as_ref()), map_row)
        .optional()?
        .ok_or_else(|| Error::DebtorNotFound(external_id.to_string()))?;

    Ok(DebtorStatusChange {
        previous: current.status,
        debtor,
    })
}

/// Delete a debtor by ID. Returns whether a debtor was removed.
pub fn delete_debtor(debtor_id: DatabaseId, connection: &Connection) -> Result<bool, Error> {
    let rows_affected = connection.execute("DELETE FROM debtor WHERE id = ?1", [debtor_id])?;

    Ok(rows_affected > 0)
}

/// Delete every debtor and return how many were removed.
pub fn delete_all_debtors(connection: &Connection) -> Result<usize, Error> {
    Ok(connection.execute("DELETE FROM debtor", [])?)
}

/// The external ID of the most recently inserted debtor, by surrogate ID.
pub fn latest_debtor_external_id(
    connection: &Connection,
) -> Result<Option<DebtorExternalId>, Error> {
    let external_id = connection
        .query_row(
            "SELECT external_id FROM debtor ORDER BY id DESC LIMIT 1",
            [],
            |row| row.get::<_, String>(0),
        )
        .optional()?;

    Ok(external_id.map(DebtorExternalId::new_unchecked))
}

/// Get the total number of debtors in the database.
pub fn count_debtors(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM debtor;", [], |row| row.get(0))
        .map_err(|error| error.into())
}

/// Initialize the debtor table and indexes.
pub fn create_debtor_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS debtor (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            external_id TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL CHECK (length(trim(name)) > 0),
            amount REAL NOT NULL CHECK (amount > 0),
            registered_at INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'paid'))
        );

        CREATE INDEX IF NOT EXISTS idx_debtor_registered_at ON debtor(registered_at);",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<Debtor, rusqlite::Error> {
    let id = row.get(0)?;
    let external_id: String = row.get(1)?;
    let raw_name: String = row.get(2)?;
    let amount: f64 = row.get(3)?;
    let registered_at = timestamp_from_unix(4, row.get(4)?)?;
    let status = row.get(5)?;

    Ok(Debtor {
        id,
        external_id: DebtorExternalId::new_unchecked(external_id),
        name: DebtorName::new_unchecked(&raw_name),
        amount: Amount::new_unchecked(amount),
        registered_at,
        status,
    })
}
