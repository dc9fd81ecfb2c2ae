//! Debtors: people who owe money, tracked until they pay it back.

mod db;
mod domain;

pub use db::{
    count_debtors, create_debtor_table, delete_all_debtors, delete_debtor, get_all_debtors,
    get_debtor, insert_debtor, latest_debtor_external_id, update_debtor_amount,
    update_debtor_status,
};
pub use domain::{Debtor, DebtorName, DebtorStatus, DebtorStatusChange, NewDebtor};
