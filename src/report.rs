//! Income and expense totals over a calendar period.

use std::{fmt::Display, ops::RangeInclusive};

use time::{Date, Duration, OffsetDateTime, Time, macros::time};

use crate::{
    Error,
    ledger::Ledger,
    transaction::{Transaction, TransactionKind},
};

/// The calendar periods a report can cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    /// From midnight until the end of today.
    Today,
    /// From Monday of this week until the end of today.
    CurrentWeek,
    /// From the first of this month until the end of today.
    CurrentMonth,
    /// Every transaction ever recorded.
    AllTime,
}

impl Period {
    /// All periods in the order they are offered to the user.
    pub const ALL: [Period; 4] = [
        Period::Today,
        Period::CurrentWeek,
        Period::CurrentMonth,
        Period::AllTime,
    ];

    /// The reply option that selects this period.
    pub fn option(self) -> &'static str {
        match self {
            Period::Today => "Today",
            Period::CurrentWeek => "This week",
            Period::CurrentMonth => "This month",
            Period::AllTime => "All time",
        }
    }

    /// Find the period whose option is exactly `text`.
    pub fn from_option(text: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|period| period.option() == text.trim())
    }

    /// The inclusive time window this period covers when it is `now`.
    ///
    /// Windows start at midnight and end at 23:59:59 today, both in the offset
    /// of `now`. [Period::AllTime] has no window.
    pub fn window(self, now: OffsetDateTime) -> Option<RangeInclusive<OffsetDateTime>> {
        let today = now.date();
        let start_date = match self {
            Period::Today => today,
            Period::CurrentWeek => week_start(today),
            Period::CurrentMonth => month_start(today),
            Period::AllTime => return None,
        };

        let start = now.replace_date(start_date).replace_time(Time::MIDNIGHT);
        let end = now.replace_time(time!(23:59:59));

        Some(start..=end)
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Period::Today => write!(f, "today"),
            Period::CurrentWeek => write!(f, "this week"),
            Period::CurrentMonth => write!(f, "this month"),
            Period::AllTime => write!(f, "all time"),
        }
    }
}

fn week_start(date: Date) -> Date {
    date - Duration::days(date.weekday().number_days_from_monday() as i64)
}

fn month_start(date: Date) -> Date {
    date - Duration::days(date.day() as i64 - 1)
}

/// Totals for the transactions in a period.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    /// The period the totals cover.
    pub period: Period,
    /// The sum of all income in the period.
    pub total_income: f64,
    /// The sum of all expenses in the period.
    pub total_expense: f64,
    /// Income minus expenses.
    pub balance: f64,
    /// Newest first.
    pub income_entries: Vec<Transaction>,
    /// Newest first.
    pub expense_entries: Vec<Transaction>,
}

impl Summary {
    fn from_transactions(period: Period, transactions: Vec<Transaction>) -> Self {
        let (income_entries, expense_entries): (Vec<_>, Vec<_>) = transactions
            .into_iter()
            .partition(|transaction| transaction.kind == TransactionKind::Income);

        let total_income = total(&income_entries);
        let total_expense = total(&expense_entries);

        Self {
            period,
            total_income,
            total_expense,
            balance: total_income - total_expense,
            income_entries,
            expense_entries,
        }
    }
}

fn total(transactions: &[Transaction]) -> f64 {
    transactions
        .iter()
        .map(|transaction| transaction.amount.value())
        .sum()
}

/// Summarize the transactions created during `period`.
///
/// Returns `Ok(None)` when the period has no transactions at all, which is
/// different from a period whose income and expenses happen to cancel out.
///
/// # Errors
/// Returns an error if the transactions could not be read from the ledger.
pub fn summarize(ledger: &Ledger, period: Period) -> Result<Option<Summary>, Error> {
    let window = period.window(ledger.now());
    let transactions = ledger.list_transactions(window)?;

    tracing::debug!(
        "summarizing {} transactions for {period}",
        transactions.len()
    );

    if transactions.is_empty() {
        return Ok(None);
    }

    Ok(Some(Summary::from_transactions(period, transactions)))
}
