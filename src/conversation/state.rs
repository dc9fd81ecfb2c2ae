//! Where a user is in a conversation, and what they have entered so far.

use crate::{
    amount::Amount,
    conversation::command::{
        BACK_TO_MENU, CANCEL, CONFIRM, EDIT_AMOUNT, EDIT_DESCRIPTION, MARK_AS_PAID, MenuCommand,
        SKIP,
    },
    debtor::{Debtor, DebtorName, DebtorStatus},
    external_id::DebtorExternalId,
    report::Period,
    transaction::{Transaction, TransactionKind},
};

/// The step a conversation is at. Each variant carries exactly the input
/// collected so far.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ConversationState {
    /// Nothing in progress.
    #[default]
    Idle,
    /// Waiting for the amount of a new transaction.
    AwaitingAmount(TransactionKind),
    /// Waiting for the description of a new transaction.
    AwaitingDescription(TransactionKind, Amount),
    /// Waiting for the user to pick a report period.
    AwaitingReportPeriod,
    /// Waiting for the ID of the transaction to edit.
    AwaitingEditTransactionId,
    /// Waiting for the user to pick what to change about a transaction.
    AwaitingEditAction(Transaction),
    /// Waiting for a transaction's new amount.
    AwaitingEditAmount(Transaction),
    /// Waiting for a transaction's new description.
    AwaitingEditDescription(Transaction),
    /// Waiting for the name of a new debtor.
    AwaitingDebtorName,
    /// Waiting for how much a new debtor owes.
    AwaitingDebtorAmount(DebtorName),
    /// Waiting for the user to confirm a new debtor.
    AwaitingDebtorConfirmation {
        /// Who owes the money.
        name: DebtorName,
        /// How much is owed.
        amount: Amount,
        /// The ID the debtor will most likely get.
        preview_id: DebtorExternalId,
    },
    /// Waiting for the ID of the debtor to edit.
    AwaitingEditDebtorId,
    /// Waiting for the user to pick what to change about a debtor.
    AwaitingEditDebtorAction(Debtor),
    /// Waiting for a debtor's new amount.
    AwaitingEditDebtorAmount(Debtor),
    /// Waiting for the user to confirm a debtor's new amount.
    AwaitingEditDebtorAmountConfirmation {
        /// The debtor as it was when the edit started.
        debtor: Debtor,
        /// The amount to store.
        amount: Amount,
    },
    /// Waiting for the user to confirm a debtor's new status.
    AwaitingEditDebtorStatusConfirmation {
        /// The debtor as it was when the edit started.
        debtor: Debtor,
        /// The status to store.
        status: DebtorStatus,
    },
}

impl ConversationState {
    /// The replies offered to the user at this step.
    pub fn suggested_replies(&self) -> Vec<String> {
        let options: Vec<&str> = match self {
            ConversationState::Idle => MenuCommand::MAIN_MENU
                .iter()
                .map(|command| command.label())
                .collect(),
            ConversationState::AwaitingDescription(..)
            | ConversationState::AwaitingEditDescription(_) => vec![SKIP, BACK_TO_MENU],
            ConversationState::AwaitingReportPeriod => Period::ALL
                .iter()
                .map(|period| period.option())
                .chain([BACK_TO_MENU])
                .collect(),
            ConversationState::AwaitingEditAction(_) => {
                vec![EDIT_AMOUNT, EDIT_DESCRIPTION, BACK_TO_MENU]
            }
            ConversationState::AwaitingEditDebtorAction(_) => {
                vec![EDIT_AMOUNT, MARK_AS_PAID, BACK_TO_MENU]
            }
            ConversationState::AwaitingDebtorConfirmation { .. }
            | ConversationState::AwaitingEditDebtorAmountConfirmation { .. }
            | ConversationState::AwaitingEditDebtorStatusConfirmation { .. } => {
                vec![CONFIRM, CANCEL]
            }
            ConversationState::AwaitingAmount(_)
            | ConversationState::AwaitingEditTransactionId
            | ConversationState::AwaitingEditAmount(_)
            | ConversationState::AwaitingDebtorName
            | ConversationState::AwaitingDebtorAmount(_)
            | ConversationState::AwaitingEditDebtorId
            | ConversationState::AwaitingEditDebtorAmount(_) => vec![BACK_TO_MENU],
        };

        options.into_iter().map(str::to_owned).collect()
    }

    /// Whether the conversation is at rest.
    pub fn is_idle(&self) -> bool {
        matches!(self, ConversationState::Idle)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        amount::Amount,
        conversation::state::ConversationState,
        debtor::DebtorName,
        external_id::DebtorExternalId,
        transaction::TransactionKind,
    };

    #[test]
    fn idle_offers_main_menu() {
        let options = ConversationState::Idle.suggested_replies();

        assert!(options.contains(&"Income".to_owned()));
        assert!(options.contains(&"Edit debtor".to_owned()));
        assert!(!options.contains(&"Back to menu".to_owned()));
    }

    #[test]
    fn confirmations_offer_confirm_and_cancel() {
        let state = ConversationState::AwaitingDebtorConfirmation {
            name: DebtorName::new("Ali").unwrap(),
            amount: Amount::new(1.0).unwrap(),
            preview_id: DebtorExternalId::new(1),
        };

        assert_eq!(state.suggested_replies(), ["Confirm", "Cancel"]);
    }

    #[test]
    fn amount_prompt_offers_way_back() {
        let state = ConversationState::AwaitingAmount(TransactionKind::Income);

        assert_eq!(state.suggested_replies(), ["Back to menu"]);
        assert!(!state.is_idle());
    }
}
