use std::error::Error;
use std::path::Path;
use std::process::exit;
use std::sync::Arc;

use clap::Parser;
use rusqlite::Connection;
use time::{Duration, OffsetDateTime};

use ledger_bot::{
    Amount, Clock, DEFAULT_TIMEZONE, DebtorName, DebtorStatus, FixedClock, Ledger, SystemClock,
    TransactionKind,
};

/// A utility for creating a test database for the ledger assistant.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// Canonical name of the timezone the records are created in.
    #[arg(long, default_value = DEFAULT_TIMEZONE)]
    timezone: String,
}

const TRANSACTIONS: [(TransactionKind, f64, Option<&str>, i64); 6] = [
    (TransactionKind::Income, 12_000_000.0, Some("salary"), 40),
    (TransactionKind::Expense, 3_500_000.0, Some("rent"), 35),
    (TransactionKind::Expense, 450_000.0, Some("groceries"), 6),
    (TransactionKind::Income, 1_500_000.0, Some("freelance"), 3),
    (TransactionKind::Expense, 30_000.0, None, 1),
    (TransactionKind::Expense, 85_500.5, Some("taxi"), 0),
];

const DEBTORS: [(&str, f64, bool); 3] = [
    ("Ali", 500_000.0, false),
    ("Dilnoza", 1_250_000.0, false),
    ("Anna Maria", 75_000.0, true),
];

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    let now: OffsetDateTime = SystemClock::new(&args.timezone)?.now();
    let clock = FixedClock::new(now);

    println!("Creating database at {output_path:#?}");
    let ledger = Ledger::new(Connection::open(output_path)?, Arc::new(clock.clone()))?;

    println!("Creating test transactions...");

    for (kind, amount, description, days_ago) in TRANSACTIONS {
        clock.set(now - Duration::days(days_ago));
        ledger.create_transaction(kind, Amount::new(amount)?, description)?;
    }

    println!("Creating test debtors...");

    for (name, amount, paid) in DEBTORS {
        let debtor = ledger.create_debtor(DebtorName::new(name)?, Amount::new(amount)?)?;

        if paid {
            ledger.update_debtor_status(&debtor.external_id, DebtorStatus::Paid)?;
        }
    }

    println!("Success!");

    Ok(())
}
