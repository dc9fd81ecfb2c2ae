//! Outgoing messages and how records are rendered in them.

use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    amount::format_amount,
    conversation::state::ConversationState,
    database_id::UserId,
    debtor::Debtor,
    report::Summary,
    transaction::Transaction,
};

const TIMESTAMP_FORMAT: &[BorrowedFormatItem] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

/// A message for the transport to deliver.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMessage {
    /// Who the message is for.
    pub user_id: UserId,
    /// The message body.
    pub text: String,
    /// Replies the transport may offer as buttons.
    pub suggested_replies: Option<Vec<String>>,
}

impl OutgoingMessage {
    /// A message offering the replies that fit `state`.
    pub fn for_state(user_id: UserId, text: impl Into<String>, state: &ConversationState) -> Self {
        Self {
            user_id,
            text: text.into(),
            suggested_replies: Some(state.suggested_replies()),
        }
    }
}

pub(crate) fn format_timestamp(timestamp: OffsetDateTime) -> String {
    timestamp
        .format(TIMESTAMP_FORMAT)
        .unwrap_or_else(|_| timestamp.to_string())
}

pub(crate) fn format_transaction(transaction: &Transaction) -> String {
    let description = transaction.description.as_deref().unwrap_or("-");

    format!(
        "{} | {} | {} | {} | {}",
        transaction.external_id,
        transaction.kind,
        transaction.amount,
        description,
        format_timestamp(transaction.created_at)
    )
}

pub(crate) fn format_debtor(debtor: &Debtor) -> String {
    format!(
        "{} | {} | {} | {} | {}",
        debtor.external_id,
        debtor.name,
        debtor.amount,
        debtor.status,
        format_timestamp(debtor.registered_at)
    )
}

pub(crate) fn format_debtor_list(debtors: &[Debtor]) -> String {
    if debtors.is_empty() {
        return "There are no debtors.".to_owned();
    }

    let lines: Vec<String> = debtors.iter().map(format_debtor).collect();

    format!("Debtors:\n{}", lines.join("\n"))
}

pub(crate) fn format_summary(summary: &Summary) -> String {
    let mut text = format!(
        "Report for {}\nIncome: {} ({} entries)\nExpenses: {} ({} entries)\nBalance: {}",
        summary.period,
        format_amount(summary.total_income),
        summary.income_entries.len(),
        format_amount(summary.total_expense),
        summary.expense_entries.len(),
        format_amount(summary.balance),
    );

    for (heading, entries) in [
        ("Income", &summary.income_entries),
        ("Expenses", &summary.expense_entries),
    ] {
        if entries.is_empty() {
            continue;
        }

        text.push_str(&format!("\n\n{heading}:"));
        for entry in entries {
            text.push_str(&format!("\n{}", format_transaction(entry)));
        }
    }

    text
}
