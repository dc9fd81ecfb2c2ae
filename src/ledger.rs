//! The ledger store: durable storage for transactions and debtors.
//!
//! Every operation locks the shared SQLite connection for its whole duration,
//! so picking an external ID and inserting the record can never interleave with
//! another session's writes.

use std::{
    ops::RangeInclusive,
    sync::{Arc, Mutex, MutexGuard},
};

use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    Error,
    amount::Amount,
    clock::Clock,
    database_id::DatabaseId,
    db::initialize,
    debtor::{self, Debtor, DebtorName, DebtorStatus, DebtorStatusChange, NewDebtor},
    external_id::{DebtorExternalId, TransactionExternalId},
    id_allocator::{allocate_debtor_id, allocate_transaction_id, preview_debtor_id},
    transaction::{self, NewTransaction, Transaction, TransactionChanges, TransactionKind},
};

/// Stores transactions and debtors in a SQLite database.
///
/// Cloning a `Ledger` is cheap and every clone shares the same connection.
#[derive(Clone)]
pub struct Ledger {
    connection: Arc<Mutex<Connection>>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("connection", &self.connection)
            .finish_non_exhaustive()
    }
}

impl Ledger {
    /// Create a ledger backed by `connection`.
    ///
    /// This function will initialize the database by adding the tables for the
    /// domain models.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(connection: Connection, clock: Arc<dyn Clock>) -> Result<Self, Error> {
        initialize(&connection)?;

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            clock,
        })
    }

    /// Create a ledger backed by a fresh in-memory database.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open_in_memory(clock: Arc<dyn Clock>) -> Result<Self, Error> {
        Self::new(Connection::open_in_memory()?, clock)
    }

    /// The current time according to the ledger's clock.
    pub fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    /// The clock used to timestamp new records.
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Record a new income or expense, timestamped now.
    ///
    /// A blank description is stored as no description.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::IdSpaceExhausted] if no free external ID could be found,
    /// - [Error::DatabaseLockError] if the database lock is poisoned,
    /// - or [Error::SqlError] if there is some other SQL error.
    pub fn create_transaction(
        &self,
        kind: TransactionKind,
        amount: Amount,
        description: Option<&str>,
    ) -> Result<Transaction, Error> {
        let connection = self.lock()?;
        let description = normalize_description(description);
        let created_at = self.now();
        let mut rng = rand::thread_rng();

        let transaction = allocate_transaction_id(&connection, &mut rng, |external_id| {
            transaction::insert_transaction(
                NewTransaction {
                    external_id,
                    kind,
                    amount,
                    description: description.clone(),
                    created_at,
                },
                &connection,
            )
        })?;

        tracing::info!(
            "created {} {} for {}",
            transaction.kind,
            transaction.external_id,
            transaction.amount
        );

        Ok(self.localize_transaction(transaction))
    }

    /// Change the amount and/or description of a transaction.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::TransactionNotFound] if no transaction has `external_id`,
    /// - [Error::DatabaseLockError] if the database lock is poisoned,
    /// - or [Error::SqlError] if there is some other SQL error.
    pub fn update_transaction(
        &self,
        external_id: &TransactionExternalId,
        changes: TransactionChanges,
    ) -> Result<Transaction, Error> {
        let connection = self.lock()?;
        let changes = TransactionChanges {
            description: changes
                .description
                .map(|description| normalize_description(description.as_deref())),
            ..changes
        };

        let transaction = transaction::update_transaction(external_id, changes, &connection)?;
        tracing::info!("updated transaction {external_id}");

        Ok(self.localize_transaction(transaction))
    }

    /// Look up a transaction by its external ID.
    pub fn find_transaction(
        &self,
        external_id: &TransactionExternalId,
    ) -> Result<Option<Transaction>, Error> {
        let connection = self.lock()?;

        Ok(transaction::get_transaction(external_id, &connection)?
            .map(|transaction| self.localize_transaction(transaction)))
    }

    /// List transactions newest first, optionally only those created within `range`.
    pub fn list_transactions(
        &self,
        range: Option<RangeInclusive<OffsetDateTime>>,
    ) -> Result<Vec<Transaction>, Error> {
        let connection = self.lock()?;

        Ok(transaction::list_transactions(range, &connection)?
            .into_iter()
            .map(|transaction| self.localize_transaction(transaction))
            .collect())
    }

    /// The number of stored transactions.
    pub fn count_transactions(&self) -> Result<u32, Error> {
        transaction::count_transactions(&*self.lock()?)
    }

    /// Register someone who owes `amount`, timestamped now.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::IdSpaceExhausted] if no free external ID could be found,
    /// - [Error::DatabaseLockError] if the database lock is poisoned,
    /// - or [Error::SqlError] if there is some other SQL error.
    pub fn create_debtor(&self, name: DebtorName, amount: Amount) -> Result<Debtor, Error> {
        let connection = self.lock()?;
        let registered_at = self.now();

        let debtor = allocate_debtor_id(&connection, |external_id| {
            debtor::insert_debtor(
                NewDebtor {
                    external_id,
                    name: name.clone(),
                    amount,
                    registered_at,
                },
                &connection,
            )
        })?;

        tracing::info!("registered debtor {} for {}", debtor.external_id, debtor.amount);

        Ok(self.localize_debtor(debtor))
    }

    /// The ID the next debtor will most likely receive.
    pub fn preview_debtor_id(&self) -> Result<DebtorExternalId, Error> {
        preview_debtor_id(&*self.lock()?)
    }

    /// Change how much a debtor owes.
    ///
    /// # Errors
    /// Returns [Error::DebtorNotFound] if no debtor has `external_id`, or a
    /// storage error.
    pub fn update_debtor_amount(
        &self,
        external_id: &DebtorExternalId,
        amount: Amount,
    ) -> Result<Debtor, Error> {
        let debtor = debtor::update_debtor_amount(external_id, amount, &*self.lock()?)?;
        tracing::info!("debtor {external_id} now owes {amount}");

        Ok(self.localize_debtor(debtor))
    }

    /// Change a debtor's status.
    ///
    /// The returned change carries the status the debtor had before, read in
    /// the same critical section as the update. Use it to tell whether this
    /// call is the one that marked the debtor as paid.
    ///
    /// # Errors
    /// Returns [Error::DebtorNotFound] if no debtor has `external_id`,
    /// [Error::InvalidStatusTransition] if a paid debtor would become active
    /// again, or a storage error.
    pub fn update_debtor_status(
        &self,
        external_id: &DebtorExternalId,
        status: DebtorStatus,
    ) -> Result<DebtorStatusChange, Error> {
        let change = debtor::update_debtor_status(external_id, status, &*self.lock()?)?;
        tracing::info!(
            "debtor {external_id} went from {} to {status}",
            change.previous
        );

        Ok(DebtorStatusChange {
            previous: change.previous,
            debtor: self.localize_debtor(change.debtor),
        })
    }

    /// Look up a debtor by its external ID.
    pub fn find_debtor(&self, external_id: &DebtorExternalId) -> Result<Option<Debtor>, Error> {
        Ok(debtor::get_debtor(external_id, &*self.lock()?)?
            .map(|debtor| self.localize_debtor(debtor)))
    }

    /// List all debtors, most recently registered first.
    pub fn list_debtors(&self) -> Result<Vec<Debtor>, Error> {
        Ok(debtor::get_all_debtors(&*self.lock()?)?
            .into_iter()
            .map(|debtor| self.localize_debtor(debtor))
            .collect())
    }

    /// The number of stored debtors.
    pub fn count_debtors(&self) -> Result<u32, Error> {
        debtor::count_debtors(&*self.lock()?)
    }

    /// Delete a debtor by surrogate ID.
    ///
    /// Deleting a debtor that does not exist is not an error; the return value
    /// says whether anything was removed.
    pub fn delete_debtor(&self, id: DatabaseId) -> Result<bool, Error> {
        let deleted = debtor::delete_debtor(id, &*self.lock()?)?;

        if deleted {
            tracing::info!("deleted debtor #{id}");
        }

        Ok(deleted)
    }

    /// Delete every transaction. Returns how many were removed.
    pub fn clear_all_transactions(&self) -> Result<usize, Error> {
        let removed = transaction::delete_all_transactions(&*self.lock()?)?;
        tracing::info!("cleared {removed} transactions");

        Ok(removed)
    }

    /// Delete every debtor. Returns how many were removed.
    pub fn clear_all_debtors(&self) -> Result<usize, Error> {
        let removed = debtor::delete_all_debtors(&*self.lock()?)?;
        tracing::info!("cleared {removed} debtors");

        Ok(removed)
    }

    /// Delete every transaction and debtor in one SQL transaction.
    ///
    /// Returns how many transactions and debtors were removed.
    pub fn clear_all(&self) -> Result<(usize, usize), Error> {
        let mut connection = self.lock()?;
        let sql_transaction = connection.transaction()?;

        let transactions = transaction::delete_all_transactions(&sql_transaction)?;
        let debtors = debtor::delete_all_debtors(&sql_transaction)?;

        sql_transaction.commit()?;
        tracing::info!("cleared {transactions} transactions and {debtors} debtors");

        Ok((transactions, debtors))
    }

    /// Run `f` with direct access to the database.
    #[cfg(test)]
    pub(crate) fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> T) -> T {
        f(&self.lock().unwrap())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)
    }

    fn localize_transaction(&self, transaction: Transaction) -> Transaction {
        Transaction {
            created_at: transaction.created_at.to_offset(self.now().offset()),
            ..transaction
        }
    }

    fn localize_debtor(&self, debtor: Debtor) -> Debtor {
        Debtor {
            registered_at: debtor.registered_at.to_offset(self.now().offset()),
            ..debtor
        }
    }
}

fn normalize_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|description| !description.is_empty())
        .map(str::to_owned)
}
