//! Picks the short external IDs given to new transactions and debtors.
//!
//! The number in an ID continues from the most recently created record of the
//! same kind. Transaction IDs get a random letter in front of the number,
//! debtor IDs always start with `D`. The database enforces uniqueness; when an
//! insert collides the allocator quietly tries another ID.

use rand::Rng;
use rusqlite::Connection;

use crate::{
    Error,
    debtor::latest_debtor_external_id,
    external_id::{DebtorExternalId, TransactionExternalId, wrap_sequence},
    transaction::latest_transaction_external_id,
};

/// How many IDs are tried before giving up.
pub const MAX_ALLOCATION_ATTEMPTS: usize = 26 * 4;

const LETTERS_IN_ALPHABET: usize = 26;

/// The sequence number the next transaction ID should use.
pub fn next_transaction_sequence(connection: &Connection) -> Result<u16, Error> {
    let latest = latest_transaction_external_id(connection)?;

    Ok(next_sequence(latest.and_then(|id| id.sequence())))
}

/// The sequence number the next debtor ID should use.
pub fn next_debtor_sequence(connection: &Connection) -> Result<u16, Error> {
    let latest = latest_debtor_external_id(connection)?;

    Ok(next_sequence(latest.and_then(|id| id.sequence())))
}

/// The ID the next debtor will most likely get.
///
/// This is only a preview: the ID is allocated for real when the debtor is
/// inserted, and may differ if another debtor was created in between.
pub fn preview_debtor_id(connection: &Connection) -> Result<DebtorExternalId, Error> {
    Ok(DebtorExternalId::new(next_debtor_sequence(connection)?))
}

/// Pick a random lowercase letter for a transaction ID.
pub fn random_letter<R: Rng>(rng: &mut R) -> char {
    rng.gen_range(b'a'..=b'z') as char
}

/// Insert a record under a fresh transaction ID.
///
/// `insert` is called with candidate IDs until it succeeds or fails with
/// something other than [Error::DuplicateExternalId]. Each collision draws a
/// new letter; every 26 collisions the number moves on by one.
///
/// # Errors
/// Returns the error from `insert`, or [Error::IdSpaceExhausted] if every
/// attempt collided.
pub fn allocate_transaction_id<T, R, F>(
    connection: &Connection,
    rng: &mut R,
    mut insert: F,
) -> Result<T, Error>
where
    R: Rng,
    F: FnMut(TransactionExternalId) -> Result<T, Error>,
{
    let mut sequence = next_transaction_sequence(connection)?;

    for attempt in 1..=MAX_ALLOCATION_ATTEMPTS {
        let external_id = TransactionExternalId::new(random_letter(rng), sequence);

        match insert(external_id.clone()) {
            Err(Error::DuplicateExternalId(_)) => {
                tracing::warn!("transaction ID {external_id} is taken, trying another");

                if attempt % LETTERS_IN_ALPHABET == 0 {
                    sequence = wrap_sequence(sequence + 1);
                }
            }
            result => return result,
        }
    }

    Err(Error::IdSpaceExhausted(MAX_ALLOCATION_ATTEMPTS))
}

/// Insert a record under a fresh debtor ID.
///
/// Works like [allocate_transaction_id], except that the prefix is always `D`
/// so each collision moves on to the next number.
///
/// # Errors
/// Returns the error from `insert`, or [Error::IdSpaceExhausted] if every
/// attempt collided.
pub fn allocate_debtor_id<T, F>(connection: &Connection, mut insert: F) -> Result<T, Error>
where
    F: FnMut(DebtorExternalId) -> Result<T, Error>,
{
    let mut sequence = next_debtor_sequence(connection)?;

    for _ in 0..MAX_ALLOCATION_ATTEMPTS {
        let external_id = DebtorExternalId::new(sequence);

        match insert(external_id.clone()) {
            Err(Error::DuplicateExternalId(_)) => {
                tracing::warn!("debtor ID {external_id} is taken, trying the next one");
                sequence = wrap_sequence(sequence + 1);
            }
            result => return result,
        }
    }

    Err(Error::IdSpaceExhausted(MAX_ALLOCATION_ATTEMPTS))
}

fn next_sequence(latest: Option<u16>) -> u16 {
    match latest {
        Some(sequence) => wrap_sequence(sequence + 1),
        None => 1,
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};
    use rusqlite::Connection;
    use time::macros::datetime;

    use crate::{
        Error,
        amount::Amount,
        db::initialize,
        debtor::{DebtorName, NewDebtor, insert_debtor},
        external_id::{DebtorExternalId, TransactionExternalId},
        id_allocator::{
            MAX_ALLOCATION_ATTEMPTS, allocate_debtor_id, allocate_transaction_id,
            next_transaction_sequence, preview_debtor_id, random_letter,
        },
        transaction::{NewTransaction, TransactionKind, insert_transaction},
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn insert_with_id(
        external_id: TransactionExternalId,
        conn: &Connection,
    ) -> Result<TransactionExternalId, Error> {
        insert_transaction(
            NewTransaction {
                external_id,
                kind: TransactionKind::Expense,
                amount: Amount::new(1.0).unwrap(),
                description: None,
                created_at: datetime!(2025-10-01 12:00 +5),
            },
            conn,
        )
        .map(|transaction| transaction.external_id)
    }

    fn insert_debtor_with_id(
        external_id: DebtorExternalId,
        conn: &Connection,
    ) -> Result<DebtorExternalId, Error> {
        insert_debtor(
            NewDebtor {
                external_id,
                name: DebtorName::new("Ali").unwrap(),
                amount: Amount::new(1.0).unwrap(),
                registered_at: datetime!(2025-10-01 12:00 +5),
            },
            conn,
        )
        .map(|debtor| debtor.external_id)
    }

    #[test]
    fn first_ids_start_at_one() {
        let conn = get_test_connection();
        let mut rng = StdRng::seed_from_u64(7);

        let transaction_id =
            allocate_transaction_id(&conn, &mut rng, |id| insert_with_id(id, &conn)).unwrap();
        let debtor_id = allocate_debtor_id(&conn, |id| insert_debtor_with_id(id, &conn)).unwrap();

        assert_eq!(transaction_id.sequence(), Some(1));
        assert_eq!(debtor_id.as_ref(), "D001");
    }

    #[test]
    fn number_follows_latest_record_not_lexical_order() {
        let conn = get_test_connection();
        insert_with_id(TransactionExternalId::new('z', 9), &conn).unwrap();
        insert_with_id(TransactionExternalId::new('a', 41), &conn).unwrap();

        assert_eq!(next_transaction_sequence(&conn), Ok(42));
    }

    #[test]
    fn ids_are_never_reused() {
        let conn = get_test_connection();
        let mut rng = StdRng::seed_from_u64(1);
        let mut seen = std::collections::HashSet::new();

        for _ in 0..50 {
            let id =
                allocate_transaction_id(&conn, &mut rng, |id| insert_with_id(id, &conn)).unwrap();
            assert!(TransactionExternalId::parse(id.as_ref()).is_ok());
            assert!(seen.insert(id), "ID was reused");
        }
    }

    #[test]
    fn collision_retries_with_new_letter() {
        let conn = get_test_connection();
        let mut rng = StdRng::seed_from_u64(3);
        let mut attempts = vec![];

        let id = allocate_transaction_id(&conn, &mut rng, |id| {
            attempts.push(id.clone());
            if attempts.len() == 1 {
                Err(Error::DuplicateExternalId(id.to_string()))
            } else {
                insert_with_id(id, &conn)
            }
        })
        .unwrap();

        assert_eq!(attempts.len(), 2);
        assert_eq!(id.sequence(), Some(1));
    }

    #[test]
    fn full_number_moves_on() {
        let conn = get_test_connection();
        for letter in 'a'..='z' {
            insert_with_id(TransactionExternalId::new(letter, 2), &conn).unwrap();
        }
        // The latest record decides the number, so the next candidates use 2.
        insert_with_id(TransactionExternalId::new('a', 1), &conn).unwrap();
        let mut rng = StdRng::seed_from_u64(11);

        let id = allocate_transaction_id(&conn, &mut rng, |id| insert_with_id(id, &conn)).unwrap();

        assert_eq!(id.sequence(), Some(3));
    }

    #[test]
    fn debtor_collision_moves_to_next_number() {
        let conn = get_test_connection();
        insert_debtor_with_id(DebtorExternalId::new(2), &conn).unwrap();
        insert_debtor_with_id(DebtorExternalId::new(1), &conn).unwrap();

        let id = allocate_debtor_id(&conn, |id| insert_debtor_with_id(id, &conn)).unwrap();

        assert_eq!(id.as_ref(), "D003");
    }

    #[test]
    fn debtor_numbers_wrap_after_999() {
        let conn = get_test_connection();
        insert_debtor_with_id(DebtorExternalId::new(999), &conn).unwrap();

        assert_eq!(preview_debtor_id(&conn).unwrap().as_ref(), "D001");
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let conn = get_test_connection();
        let mut calls = 0;

        let result: Result<(), Error> = allocate_debtor_id(&conn, |id| {
            calls += 1;
            Err(Error::DuplicateExternalId(id.to_string()))
        });

        assert_eq!(result, Err(Error::IdSpaceExhausted(MAX_ALLOCATION_ATTEMPTS)));
        assert_eq!(calls, MAX_ALLOCATION_ATTEMPTS);
    }

    #[test]
    fn other_errors_are_not_retried() {
        let conn = get_test_connection();
        let mut calls = 0;

        let result: Result<(), Error> = allocate_debtor_id(&conn, |_| {
            calls += 1;
            Err(Error::DatabaseLockError)
        });

        assert_eq!(result, Err(Error::DatabaseLockError));
        assert_eq!(calls, 1);
    }

    #[test]
    fn random_letters_are_lowercase() {
        let mut rng = StdRng::seed_from_u64(5);

        for _ in 0..200 {
            assert!(random_letter(&mut rng).is_ascii_lowercase());
        }
    }
}
