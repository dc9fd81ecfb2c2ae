//! Ledger Bot is a conversational assistant for keeping a small ledger.
//!
//! Users record income and expenses, ask for reports over a calendar period,
//! correct earlier entries, and keep track of people who owe them money. Every
//! record gets a short ID, such as `k001` for a transaction or `D001` for a
//! debtor, that users type to refer to it later.
//!
//! This library provides the [Assistant], which turns each incoming message
//! into replies, and the [Ledger] that stores records in SQLite. The transport
//! that delivers messages is left to the binaries.

#![warn(missing_docs)]

mod amount;
mod clock;
mod config;
mod conversation;
mod database_id;
mod db;
mod debtor;
mod error;
mod external_id;
mod id_allocator;
mod ledger;
mod logging;
mod report;
mod scheduler;
mod timezone;
mod transaction;

pub use amount::{Amount, MAX_AMOUNT, format_amount};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{BotConfig, DEFAULT_REMOVAL_DELAY, DEFAULT_TIMEZONE};
pub use conversation::{Assistant, ConversationState, OutgoingMessage};
pub use database_id::{DatabaseId, UserId};
pub use db::initialize as initialize_db;
pub use debtor::{Debtor, DebtorName, DebtorStatus, DebtorStatusChange};
pub use error::{Error, ErrorKind};
pub use external_id::{DebtorExternalId, TransactionExternalId};
pub use ledger::Ledger;
pub use logging::setup_logging;
pub use report::{Period, Summary, summarize};
pub use scheduler::{DebtorRemovalScheduler, Notifier, ScheduledRemoval};
pub use self_test::{SelfTestReport, SelfTestStep, run_self_test};
pub use transaction::{Transaction, TransactionChanges, TransactionKind};
