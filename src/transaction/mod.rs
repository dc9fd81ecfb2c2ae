//! Income and expense records.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and the `TransactionChanges` used to edit one
//! - Database functions for storing, querying, and clearing transactions

mod core;

pub use core::{
    NewTransaction, Transaction, TransactionChanges, TransactionKind, count_transactions,
    create_transaction_table, delete_all_transactions, get_transaction, insert_transaction,
    latest_transaction_external_id, list_transactions, update_transaction,
};
