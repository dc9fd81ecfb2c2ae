//! Drives each user's conversation from one message to the next.

use std::sync::Arc;

use crate::{
    Error, ErrorKind,
    amount::Amount,
    config::BotConfig,
    conversation::{
        command::{
            CANCEL, CONFIRM, EDIT_AMOUNT, EDIT_DESCRIPTION, MARK_AS_PAID, MenuCommand, SKIP,
            SlashCommand,
        },
        replies::{
            OutgoingMessage, format_debtor, format_debtor_list, format_summary, format_transaction,
        },
        session::Sessions,
        state::ConversationState,
    },
    database_id::UserId,
    debtor::{Debtor, DebtorName, DebtorStatus},
    external_id::{DebtorExternalId, TransactionExternalId},
    ledger::Ledger,
    report::{Period, summarize},
    scheduler::{DebtorRemovalScheduler, Notifier, ScheduledRemoval},
    self_test::{SelfTestReport, run_self_test},
    transaction::{Transaction, TransactionChanges, TransactionKind},
};

const STORAGE_FAILURE: &str = "Something went wrong while accessing the ledger. Please try again.";

/// Where a message leaves the conversation, and what to say.
struct Step {
    next: ConversationState,
    text: String,
}

impl Step {
    fn to(next: ConversationState, text: impl Into<String>) -> Self {
        Self {
            next,
            text: text.into(),
        }
    }

    fn idle(text: impl Into<String>) -> Self {
        Self::to(ConversationState::Idle, text)
    }
}

/// The conversational ledger assistant.
///
/// Messages must be handled one at a time, from within a tokio runtime.
pub struct Assistant {
    ledger: Ledger,
    sessions: Sessions,
    scheduler: DebtorRemovalScheduler,
    removals: Vec<ScheduledRemoval>,
}

impl Assistant {
    /// Create an assistant that stores records in `ledger` and sends
    /// out-of-band messages through `notifier`.
    pub fn new(ledger: Ledger, notifier: Arc<dyn Notifier>, config: &BotConfig) -> Self {
        let scheduler = DebtorRemovalScheduler::new(
            ledger.clone(),
            notifier,
            config.paid_debtor_removal_delay,
        );

        Self {
            ledger,
            sessions: Sessions::new(),
            scheduler,
            removals: Vec::new(),
        }
    }

    /// Schedule the removal of debtors that were already paid when the
    /// assistant started, e.g. before a restart.
    ///
    /// No one is notified when these debtors are removed, since the user who
    /// marked them paid is not stored. Returns how many removals were scheduled.
    ///
    /// Must be called from within a tokio runtime.
    pub fn resume_removals(&mut self) -> Result<usize, Error> {
        let paid: Vec<Debtor> = self
            .ledger
            .list_debtors()?
            .into_iter()
            .filter(|debtor| debtor.status == DebtorStatus::Paid)
            .collect();

        for debtor in &paid {
            self.removals.push(self.scheduler.schedule(debtor, None));
        }

        if !paid.is_empty() {
            tracing::info!("resumed removal of {} paid debtors", paid.len());
        }

        Ok(paid.len())
    }

    /// Handle one message from `user_id` and return the replies.
    ///
    /// If the ledger cannot be reached, the conversation stays where it was so
    /// the user can send the same message again.
    pub fn handle(&mut self, user_id: UserId, text: &str) -> Vec<OutgoingMessage> {
        let text = text.trim();
        let state = self.sessions.get(user_id);
        tracing::debug!("user {user_id} sent {text:?} while {state:?}");

        match self.step(user_id, state.clone(), text) {
            Ok(step) => {
                let reply = OutgoingMessage::for_state(user_id, step.text, &step.next);
                self.sessions.set(user_id, step.next);
                vec![reply]
            }
            Err(error) => {
                tracing::error!("could not handle message from user {user_id}: {error}");
                vec![OutgoingMessage::for_state(user_id, STORAGE_FAILURE, &state)]
            }
        }
    }

    /// The state of `user_id`'s conversation.
    pub fn session_state(&self, user_id: UserId) -> ConversationState {
        self.sessions.get(user_id)
    }

    /// Abandon whatever `user_id` was doing.
    pub fn reset_session(&mut self, user_id: UserId) {
        self.sessions.reset(user_id);
        tracing::info!(
            "reset session of user {user_id}, {} sessions still active",
            self.sessions.active()
        );
    }

    /// Delete every transaction and debtor.
    ///
    /// Returns how many transactions and debtors were removed.
    pub fn clear_all_data(&self) -> Result<(usize, usize), Error> {
        self.ledger.clear_all()
    }

    /// Delete every transaction. Returns how many were removed.
    pub fn clear_transactions(&self) -> Result<usize, Error> {
        self.ledger.clear_all_transactions()
    }

    /// Delete every debtor. Returns how many were removed.
    pub fn clear_debtors(&self) -> Result<usize, Error> {
        self.ledger.clear_all_debtors()
    }

    /// Check storage and reports on a scratch database.
    pub fn run_self_test(&self) -> SelfTestReport {
        run_self_test(self.ledger.clock())
    }

    /// The number of paid debtors waiting to be removed.
    pub fn pending_removals(&mut self) -> usize {
        self.removals.retain(|removal| !removal.is_finished());
        self.removals.len()
    }

    fn step(
        &mut self,
        user_id: UserId,
        state: ConversationState,
        text: &str,
    ) -> Result<Step, Error> {
        if let Some(command) = SlashCommand::parse(text) {
            return self.slash_command(user_id, command);
        }

        if let Some(command) = MenuCommand::parse(text) {
            return self.menu_command(command);
        }

        match state {
            ConversationState::Idle => Ok(Step::idle("Choose an option from the menu.")),
            ConversationState::AwaitingAmount(kind) => Ok(self.receive_amount(kind, text)),
            ConversationState::AwaitingDescription(kind, amount) => {
                self.receive_description(kind, amount, text)
            }
            ConversationState::AwaitingReportPeriod => self.receive_report_period(text),
            ConversationState::AwaitingEditTransactionId => self.receive_transaction_id(text),
            ConversationState::AwaitingEditAction(transaction) => {
                Ok(self.receive_edit_action(transaction, text))
            }
            ConversationState::AwaitingEditAmount(transaction) => {
                self.receive_edit_amount(transaction, text)
            }
            ConversationState::AwaitingEditDescription(transaction) => {
                self.receive_edit_description(transaction, text)
            }
            ConversationState::AwaitingDebtorName => Ok(self.receive_debtor_name(text)),
            ConversationState::AwaitingDebtorAmount(name) => self.receive_debtor_amount(name, text),
            ConversationState::AwaitingDebtorConfirmation {
                name,
                amount,
                preview_id,
            } => self.confirm_new_debtor(name, amount, preview_id, text),
            ConversationState::AwaitingEditDebtorId => self.receive_debtor_id(text),
            ConversationState::AwaitingEditDebtorAction(debtor) => {
                Ok(self.receive_debtor_action(debtor, text))
            }
            ConversationState::AwaitingEditDebtorAmount(debtor) => {
                Ok(self.receive_debtor_new_amount(debtor, text))
            }
            ConversationState::AwaitingEditDebtorAmountConfirmation { debtor, amount } => {
                self.confirm_debtor_amount(debtor, amount, text)
            }
            ConversationState::AwaitingEditDebtorStatusConfirmation { debtor, status } => {
                self.confirm_debtor_status(user_id, debtor, status, text)
            }
        }
    }

    fn slash_command(&mut self, user_id: UserId, command: SlashCommand) -> Result<Step, Error> {
        let text = match command {
            SlashCommand::Start => {
                "Welcome! I keep track of your income, expenses and debtors.\n\
                 Choose an option from the menu, or send /help to see the commands."
                    .to_owned()
            }
            SlashCommand::Menu => "Main menu.".to_owned(),
            SlashCommand::Help => format!("Commands:\n{}", SlashCommand::help_lines()),
            SlashCommand::Reset => {
                self.reset_session(user_id);
                "Session reset.".to_owned()
            }
            SlashCommand::Clear => {
                let (transactions, debtors) = self.clear_all_data()?;
                format!("Deleted {transactions} transactions and {debtors} debtors.")
            }
            SlashCommand::ClearTransactions => {
                format!("Deleted {} transactions.", self.clear_transactions()?)
            }
            SlashCommand::ClearDebtors => {
                format!("Deleted {} debtors.", self.clear_debtors()?)
            }
            SlashCommand::Test => self.run_self_test().to_string(),
        };

        Ok(Step::idle(text))
    }

    fn menu_command(&self, command: MenuCommand) -> Result<Step, Error> {
        let step = match command {
            MenuCommand::Income => Step::to(
                ConversationState::AwaitingAmount(TransactionKind::Income),
                "Enter the income amount:",
            ),
            MenuCommand::Expense => Step::to(
                ConversationState::AwaitingAmount(TransactionKind::Expense),
                "Enter the expense amount:",
            ),
            MenuCommand::Report => Step::to(
                ConversationState::AwaitingReportPeriod,
                "Which period should the report cover?",
            ),
            MenuCommand::EditTransaction => Step::to(
                ConversationState::AwaitingEditTransactionId,
                "Enter the ID of the transaction to edit, e.g. a001:",
            ),
            MenuCommand::AddDebtor => Step::to(
                ConversationState::AwaitingDebtorName,
                "Enter the debtor's name:",
            ),
            MenuCommand::Debtors => Step::idle(format_debtor_list(&self.ledger.list_debtors()?)),
            MenuCommand::EditDebtor => Step::to(
                ConversationState::AwaitingEditDebtorId,
                "Enter the ID of the debtor to edit, e.g. D001:",
            ),
            MenuCommand::BackToMenu => Step::idle("Main menu."),
        };

        Ok(step)
    }

    fn receive_amount(&self, kind: TransactionKind, text: &str) -> Step {
        match Amount::parse(text) {
            Ok(amount) => Step::to(
                ConversationState::AwaitingDescription(kind, amount),
                "Enter a description, or press Skip:",
            ),
            Err(_) => invalid_amount(ConversationState::AwaitingAmount(kind)),
        }
    }

    fn receive_description(
        &self,
        kind: TransactionKind,
        amount: Amount,
        text: &str,
    ) -> Result<Step, Error> {
        if text.is_empty() {
            return Ok(Step::to(
                ConversationState::AwaitingDescription(kind, amount),
                "Enter a description, or press Skip:",
            ));
        }

        let description = (text != SKIP).then_some(text);
        let transaction = self.ledger.create_transaction(kind, amount, description)?;

        Ok(Step::idle(format!(
            "{} {} recorded.\n{}",
            transaction.kind,
            transaction.external_id,
            format_transaction(&transaction)
        )))
    }

    fn receive_report_period(&self, text: &str) -> Result<Step, Error> {
        let Some(period) = Period::from_option(text) else {
            return Ok(Step::to(
                ConversationState::AwaitingReportPeriod,
                "Please pick one of the periods.",
            ));
        };

        let text = match summarize(&self.ledger, period)? {
            Some(summary) => format_summary(&summary),
            None => format!("There are no transactions for {period}."),
        };

        Ok(Step::idle(text))
    }

    fn receive_transaction_id(&self, text: &str) -> Result<Step, Error> {
        let external_id = match TransactionExternalId::parse(text) {
            Ok(external_id) => external_id,
            Err(error) => return end_flow(error),
        };

        match self.ledger.find_transaction(&external_id)? {
            Some(transaction) => {
                let text = format!(
                    "{}\nWhat would you like to change?",
                    format_transaction(&transaction)
                );
                Ok(Step::to(
                    ConversationState::AwaitingEditAction(transaction),
                    text,
                ))
            }
            None => end_flow(Error::TransactionNotFound(external_id.to_string())),
        }
    }

    fn receive_edit_action(&self, transaction: Transaction, text: &str) -> Step {
        match text {
            EDIT_AMOUNT => Step::to(
                ConversationState::AwaitingEditAmount(transaction),
                "Enter the new amount:",
            ),
            EDIT_DESCRIPTION => Step::to(
                ConversationState::AwaitingEditDescription(transaction),
                "Enter the new description, or press Skip to remove it:",
            ),
            _ => Step::to(
                ConversationState::AwaitingEditAction(transaction),
                "Please pick one of the options.",
            ),
        }
    }

    fn receive_edit_amount(&self, transaction: Transaction, text: &str) -> Result<Step, Error> {
        let Ok(amount) = Amount::parse(text) else {
            return Ok(invalid_amount(ConversationState::AwaitingEditAmount(
                transaction,
            )));
        };

        self.commit_transaction_changes(
            &transaction,
            TransactionChanges::default().amount(amount),
        )
    }

    fn receive_edit_description(
        &self,
        transaction: Transaction,
        text: &str,
    ) -> Result<Step, Error> {
        if text.is_empty() {
            return Ok(Step::to(
                ConversationState::AwaitingEditDescription(transaction),
                "Enter the new description, or press Skip to remove it:",
            ));
        }

        let description = (text != SKIP).then(|| text.to_owned());

        self.commit_transaction_changes(
            &transaction,
            TransactionChanges::default().description(description),
        )
    }

    fn commit_transaction_changes(
        &self,
        transaction: &Transaction,
        changes: TransactionChanges,
    ) -> Result<Step, Error> {
        match self.ledger.update_transaction(&transaction.external_id, changes) {
            Ok(updated) => Ok(Step::idle(format!(
                "Transaction {} updated.\n{}",
                updated.external_id,
                format_transaction(&updated)
            ))),
            Err(error) => end_flow(error),
        }
    }

    fn receive_debtor_name(&self, text: &str) -> Step {
        match DebtorName::new(text) {
            Ok(name) => Step::to(
                ConversationState::AwaitingDebtorAmount(name),
                "How much do they owe?",
            ),
            Err(error) => Step::to(
                ConversationState::AwaitingDebtorName,
                format!("{}. Enter the debtor's name:", sentence_case(&error.to_string())),
            ),
        }
    }

    fn receive_debtor_amount(&self, name: DebtorName, text: &str) -> Result<Step, Error> {
        let Ok(amount) = Amount::parse(text) else {
            return Ok(invalid_amount(ConversationState::AwaitingDebtorAmount(name)));
        };

        let preview_id = self.ledger.preview_debtor_id()?;
        let text = format!("Register {preview_id}: {name} owes {amount}?");

        Ok(Step::to(
            ConversationState::AwaitingDebtorConfirmation {
                name,
                amount,
                preview_id,
            },
            text,
        ))
    }

    fn confirm_new_debtor(
        &self,
        name: DebtorName,
        amount: Amount,
        preview_id: DebtorExternalId,
        text: &str,
    ) -> Result<Step, Error> {
        match text {
            CONFIRM => {
                let debtor = self.ledger.create_debtor(name, amount)?;
                Ok(Step::idle(format!(
                    "Debtor {} registered.\n{}",
                    debtor.external_id,
                    format_debtor(&debtor)
                )))
            }
            CANCEL => Ok(cancelled()),
            _ => Ok(Step::to(
                ConversationState::AwaitingDebtorConfirmation {
                    name,
                    amount,
                    preview_id,
                },
                "Please confirm or cancel.",
            )),
        }
    }

    fn receive_debtor_id(&self, text: &str) -> Result<Step, Error> {
        let external_id = match DebtorExternalId::parse(text) {
            Ok(external_id) => external_id,
            Err(error) => return end_flow(error),
        };

        match self.ledger.find_debtor(&external_id)? {
            Some(debtor) => {
                let text = format!("{}\nWhat would you like to change?", format_debtor(&debtor));
                Ok(Step::to(
                    ConversationState::AwaitingEditDebtorAction(debtor),
                    text,
                ))
            }
            None => end_flow(Error::DebtorNotFound(external_id.to_string())),
        }
    }

    fn receive_debtor_action(&self, debtor: Debtor, text: &str) -> Step {
        match text {
            EDIT_AMOUNT => Step::to(
                ConversationState::AwaitingEditDebtorAmount(debtor),
                "Enter the new amount:",
            ),
            MARK_AS_PAID if debtor.status == DebtorStatus::Paid => Step::idle(format!(
                "Debtor {} is already paid. A paid debtor cannot become active again.",
                debtor.external_id
            )),
            MARK_AS_PAID => {
                let text = format!("Mark {} ({}) as paid?", debtor.external_id, debtor.name);
                Step::to(
                    ConversationState::AwaitingEditDebtorStatusConfirmation {
                        debtor,
                        status: DebtorStatus::Paid,
                    },
                    text,
                )
            }
            _ => Step::to(
                ConversationState::AwaitingEditDebtorAction(debtor),
                "Please pick one of the options.",
            ),
        }
    }

    fn receive_debtor_new_amount(&self, debtor: Debtor, text: &str) -> Step {
        let Ok(amount) = Amount::parse(text) else {
            return invalid_amount(ConversationState::AwaitingEditDebtorAmount(debtor));
        };

        let text = format!(
            "Change what {} owes from {} to {amount}?",
            debtor.external_id, debtor.amount
        );

        Step::to(
            ConversationState::AwaitingEditDebtorAmountConfirmation { debtor, amount },
            text,
        )
    }

    fn confirm_debtor_amount(
        &self,
        debtor: Debtor,
        amount: Amount,
        text: &str,
    ) -> Result<Step, Error> {
        match text {
            CONFIRM => match self.ledger.update_debtor_amount(&debtor.external_id, amount) {
                Ok(updated) => Ok(Step::idle(format!(
                    "Debtor {} updated.\n{}",
                    updated.external_id,
                    format_debtor(&updated)
                ))),
                Err(error) => end_flow(error),
            },
            CANCEL => Ok(cancelled()),
            _ => Ok(Step::to(
                ConversationState::AwaitingEditDebtorAmountConfirmation { debtor, amount },
                "Please confirm or cancel.",
            )),
        }
    }

    fn confirm_debtor_status(
        &mut self,
        user_id: UserId,
        debtor: Debtor,
        status: DebtorStatus,
        text: &str,
    ) -> Result<Step, Error> {
        match text {
            CONFIRM => {
                let result = self.ledger.update_debtor_status(&debtor.external_id, status);
                let change = match result {
                    Ok(change) => change,
                    Err(error) => return end_flow(error),
                };
                let updated = &change.debtor;

                let mut text = format!("Debtor {} is now {}.", updated.external_id, updated.status);

                // Only the call that actually moved the debtor to paid arms a timer.
                if change.became_paid() {
                    self.removals.retain(|removal| !removal.is_finished());
                    self.removals.push(self.scheduler.schedule(updated, Some(user_id)));
                    text.push_str(&format!(
                        " It will be removed in {} seconds.",
                        self.scheduler.delay().as_secs()
                    ));
                }

                Ok(Step::idle(text))
            }
            CANCEL => Ok(cancelled()),
            _ => Ok(Step::to(
                ConversationState::AwaitingEditDebtorStatusConfirmation { debtor, status },
                "Please confirm or cancel.",
            )),
        }
    }
}

fn invalid_amount(state: ConversationState) -> Step {
    Step::to(
        state,
        "Please enter a positive number with at most two decimals, e.g. 150000 or 1,200,000.",
    )
}

fn cancelled() -> Step {
    Step::idle("Cancelled.")
}

/// Report a user-facing error and return to the menu. Storage errors are
/// passed on so the conversation stays where it was.
fn end_flow(error: Error) -> Result<Step, Error> {
    match error.kind() {
        ErrorKind::Storage => Err(error),
        ErrorKind::Validation | ErrorKind::NotFound | ErrorKind::Conflict => {
            tracing::debug!("ending flow: {error}");
            Ok(Step::idle(format!("{}.", sentence_case(&error.to_string()))))
        }
    }
}

fn sentence_case(text: &str) -> String {
    let mut chars = text.chars();

    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use time::macros::datetime;

    use crate::{
        amount::Amount,
        config::BotConfig,
        clock::FixedClock,
        conversation::{
            engine::{Assistant, STORAGE_FAILURE},
            replies::OutgoingMessage,
            state::ConversationState,
        },
        db::initialize,
        debtor::{DebtorName, DebtorStatus},
        external_id::DebtorExternalId,
        ledger::Ledger,
        report::{Period, summarize},
        scheduler::test_notifier::RecordingNotifier,
        transaction::TransactionKind,
    };

    const USER: i64 = 42;

    fn setup() -> (Assistant, Ledger, Arc<RecordingNotifier>) {
        let clock = FixedClock::new(datetime!(2025-10-17 14:30 +5));
        let ledger = Ledger::open_in_memory(Arc::new(clock)).unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let assistant = Assistant::new(ledger.clone(), notifier.clone(), &BotConfig::default());

        (assistant, ledger, notifier)
    }

    fn send(assistant: &mut Assistant, text: &str) -> OutgoingMessage {
        let mut replies = assistant.handle(USER, text);
        assert_eq!(replies.len(), 1, "expected exactly one reply to {text:?}");
        replies.remove(0)
    }

    fn send_all(assistant: &mut Assistant, texts: &[&str]) -> OutgoingMessage {
        let (last, rest) = texts.split_last().unwrap();

        for text in rest {
            send(assistant, text);
        }

        send(assistant, last)
    }

    fn debtor_amount(ledger: &Ledger, external_id: &DebtorExternalId) -> Option<f64> {
        ledger
            .find_debtor(external_id)
            .unwrap()
            .map(|debtor| debtor.amount.value())
    }

    #[test]
    fn negative_amount_keeps_state() {
        let (mut assistant, ledger, _) = setup();
        send(&mut assistant, "Income");

        let reply = send(&mut assistant, "-5");

        assert!(reply.text.contains("positive number"));
        assert_eq!(
            assistant.session_state(USER),
            ConversationState::AwaitingAmount(TransactionKind::Income)
        );
        assert_eq!(ledger.count_transactions(), Ok(0));
    }

    #[test]
    fn non_positive_edited_amount_keeps_state() {
        let (mut assistant, ledger, _) = setup();
        let transaction = ledger
            .create_transaction(TransactionKind::Income, Amount::new(100.0).unwrap(), None)
            .unwrap();
        send_all(
            &mut assistant,
            &["Edit transaction", transaction.external_id.as_ref(), "Edit amount"],
        );
        let before = assistant.session_state(USER);
        assert!(matches!(before, ConversationState::AwaitingEditAmount(_)));

        for text in ["-5", "0"] {
            let reply = send(&mut assistant, text);

            assert!(reply.text.contains("positive number"), "{}", reply.text);
            assert_eq!(assistant.session_state(USER), before);
        }

        let found = ledger.find_transaction(&transaction.external_id).unwrap().unwrap();
        assert_eq!(found.amount.value(), 100.0);
    }

    #[test]
    fn non_positive_debtor_amount_keeps_state() {
        let (mut assistant, ledger, _) = setup();
        send_all(&mut assistant, &["Add debtor", "Ali"]);
        let before = assistant.session_state(USER);

        for text in ["-5", "0"] {
            let reply = send(&mut assistant, text);

            assert!(reply.text.contains("positive number"), "{}", reply.text);
            assert_eq!(assistant.session_state(USER), before);
        }

        assert_eq!(ledger.count_debtors(), Ok(0));
    }

    #[test]
    fn non_positive_edited_debtor_amount_keeps_state() {
        let (mut assistant, ledger, _) = setup();
        let debtor = ledger
            .create_debtor(DebtorName::new("Vali").unwrap(), Amount::new(100.0).unwrap())
            .unwrap();
        send_all(&mut assistant, &["Edit debtor", "D001", "Edit amount"]);
        let before = assistant.session_state(USER);
        assert!(matches!(before, ConversationState::AwaitingEditDebtorAmount(_)));

        for text in ["-5", "0"] {
            let reply = send(&mut assistant, text);

            assert!(reply.text.contains("positive number"), "{}", reply.text);
            assert_eq!(assistant.session_state(USER), before);
        }

        assert_eq!(debtor_amount(&ledger, &debtor.external_id), Some(100.0));
    }

    #[test]
    fn oversized_amount_keeps_state() {
        let (mut assistant, ledger, _) = setup();
        send(&mut assistant, "Income");

        let reply = send(&mut assistant, "1e308");

        assert!(reply.text.contains("positive number"), "{}", reply.text);
        assert_eq!(
            assistant.session_state(USER),
            ConversationState::AwaitingAmount(TransactionKind::Income)
        );
        assert_eq!(ledger.count_transactions(), Ok(0));
    }

    #[test]
    fn non_numeric_amount_keeps_state() {
        let (mut assistant, _, _) = setup();
        send(&mut assistant, "Expense");

        send(&mut assistant, "a lot");

        assert_eq!(
            assistant.session_state(USER),
            ConversationState::AwaitingAmount(TransactionKind::Expense)
        );
    }

    #[test]
    fn record_and_edit_salary() {
        let (mut assistant, ledger, _) = setup();

        let reply = send_all(&mut assistant, &["Income", "1,000,000", "salary"]);

        assert!(reply.text.contains("1,000,000"), "{}", reply.text);
        assert_eq!(assistant.session_state(USER), ConversationState::Idle);
        let transactions = ledger.list_transactions(None).unwrap();
        assert_eq!(transactions.len(), 1);
        let salary = &transactions[0];
        assert_eq!(salary.amount.value(), 1_000_000.0);
        assert_eq!(salary.description.as_deref(), Some("salary"));

        let reply = send_all(
            &mut assistant,
            &[
                "Edit transaction",
                &salary.external_id.to_string().to_uppercase(),
                "Edit amount",
                "1 200 000",
            ],
        );

        assert!(reply.text.contains("updated"), "{}", reply.text);
        let found = ledger.find_transaction(&salary.external_id).unwrap().unwrap();
        assert_eq!(found.amount.value(), 1_200_000.0);
        assert_eq!(found.description.as_deref(), Some("salary"));
        assert_eq!(assistant.session_state(USER), ConversationState::Idle);
    }

    #[test]
    fn skip_leaves_description_empty() {
        let (mut assistant, ledger, _) = setup();

        send_all(&mut assistant, &["Expense", "30000", "Skip"]);

        let transactions = ledger.list_transactions(None).unwrap();
        assert_eq!(transactions[0].description, None);
        assert_eq!(transactions[0].kind, TransactionKind::Expense);
    }

    #[test]
    fn skip_removes_description_when_editing() {
        let (mut assistant, ledger, _) = setup();
        let transaction = ledger
            .create_transaction(TransactionKind::Expense, Amount::new(5.0).unwrap(), Some("taxi"))
            .unwrap();

        send_all(
            &mut assistant,
            &["Edit transaction", transaction.external_id.as_ref(), "Edit description", "Skip"],
        );

        let found = ledger.find_transaction(&transaction.external_id).unwrap().unwrap();
        assert_eq!(found.description, None);
        assert_eq!(found.amount, transaction.amount);
    }

    #[test]
    fn malformed_transaction_id_returns_to_idle() {
        let (mut assistant, _, _) = setup();
        send(&mut assistant, "Edit transaction");

        let reply = send(&mut assistant, "z9");

        assert!(reply.text.contains("not a valid transaction ID"), "{}", reply.text);
        assert_eq!(assistant.session_state(USER), ConversationState::Idle);
    }

    #[test]
    fn unknown_transaction_id_returns_to_idle() {
        let (mut assistant, _, _) = setup();
        send(&mut assistant, "Edit transaction");

        let reply = send(&mut assistant, "k404");

        assert_eq!(reply.text, "No transaction with the ID k404.");
        assert_eq!(assistant.session_state(USER), ConversationState::Idle);
    }

    #[test]
    fn menu_command_restarts_flow() {
        let (mut assistant, ledger, _) = setup();
        send_all(&mut assistant, &["Income", "500"]);

        let reply = send(&mut assistant, "Report");

        assert_eq!(assistant.session_state(USER), ConversationState::AwaitingReportPeriod);
        assert_eq!(
            reply.suggested_replies,
            Some(vec![
                "Today".to_owned(),
                "This week".to_owned(),
                "This month".to_owned(),
                "All time".to_owned(),
                "Back to menu".to_owned(),
            ])
        );
        assert_eq!(ledger.count_transactions(), Ok(0));
    }

    #[test]
    fn back_to_menu_clears_session() {
        let (mut assistant, _, _) = setup();
        send_all(&mut assistant, &["Add debtor", "Ali"]);

        let reply = send(&mut assistant, "Back to menu");

        assert_eq!(assistant.session_state(USER), ConversationState::Idle);
        assert!(reply.suggested_replies.unwrap().contains(&"Income".to_owned()));
    }

    #[test]
    fn free_text_when_idle_shows_menu() {
        let (mut assistant, _, _) = setup();

        let reply = send(&mut assistant, "hello");

        assert_eq!(assistant.session_state(USER), ConversationState::Idle);
        assert_eq!(
            reply.suggested_replies.map(|options| options.len()),
            Some(7)
        );
    }

    #[test]
    fn report_for_period_without_transactions() {
        let (mut assistant, _, _) = setup();

        let reply = send_all(&mut assistant, &["Report", "Today"]);

        assert_eq!(reply.text, "There are no transactions for today.");
        assert_eq!(assistant.session_state(USER), ConversationState::Idle);
    }

    #[test]
    fn report_shows_totals() {
        let (mut assistant, _, _) = setup();
        send_all(&mut assistant, &["Income", "1000000", "salary"]);
        send_all(&mut assistant, &["Expense", "250000", "rent"]);

        let reply = send_all(&mut assistant, &["Report", "This month"]);

        assert!(reply.text.contains("Income: 1,000,000 (1 entries)"), "{}", reply.text);
        assert!(reply.text.contains("Expenses: 250,000 (1 entries)"), "{}", reply.text);
        assert!(reply.text.contains("Balance: 750,000"), "{}", reply.text);
    }

    #[test]
    fn unknown_report_period_reprompts() {
        let (mut assistant, _, _) = setup();

        send_all(&mut assistant, &["Report", "Yesterday"]);

        assert_eq!(assistant.session_state(USER), ConversationState::AwaitingReportPeriod);
    }

    #[test]
    fn invalid_debtor_name_reprompts() {
        let (mut assistant, _, _) = setup();
        send(&mut assistant, "Add debtor");

        let reply = send(&mut assistant, "R2D2");

        assert!(reply.text.contains("only letters and spaces"), "{}", reply.text);
        assert_eq!(assistant.session_state(USER), ConversationState::AwaitingDebtorName);
    }

    #[test]
    fn debtor_registration_shows_preview_then_commits() {
        let (mut assistant, ledger, _) = setup();

        let reply = send_all(&mut assistant, &["Add debtor", "Ali", "500,000"]);

        assert_eq!(reply.text, "Register D001: Ali owes 500,000?");
        assert_eq!(
            assistant.session_state(USER),
            ConversationState::AwaitingDebtorConfirmation {
                name: DebtorName::new("Ali").unwrap(),
                amount: Amount::new(500_000.0).unwrap(),
                preview_id: DebtorExternalId::new(1),
            }
        );
        assert_eq!(ledger.count_debtors(), Ok(0));

        let reply = send(&mut assistant, "Confirm");

        assert!(reply.text.starts_with("Debtor D001 registered."), "{}", reply.text);
        let debtors = ledger.list_debtors().unwrap();
        assert_eq!(debtors.len(), 1);
        assert_eq!(debtors[0].status, DebtorStatus::Active);
        assert_eq!(summarize(&ledger, Period::AllTime), Ok(None));
    }

    #[test]
    fn cancelled_registration_stores_nothing() {
        let (mut assistant, ledger, _) = setup();

        let reply = send_all(&mut assistant, &["Add debtor", "Ali", "500000", "Cancel"]);

        assert_eq!(reply.text, "Cancelled.");
        assert_eq!(ledger.count_debtors(), Ok(0));
        assert_eq!(assistant.session_state(USER), ConversationState::Idle);
    }

    #[test]
    fn debtor_amount_edit_requires_confirmation() {
        let (mut assistant, ledger, _) = setup();
        let debtor = ledger
            .create_debtor(DebtorName::new("Vali").unwrap(), Amount::new(100.0).unwrap())
            .unwrap();

        send_all(&mut assistant, &["Edit debtor", "d001", "Edit amount", "80"]);
        assert_eq!(debtor_amount(&ledger, &debtor.external_id), Some(100.0));

        send(&mut assistant, "Confirm");

        assert_eq!(debtor_amount(&ledger, &debtor.external_id), Some(80.0));
        assert_eq!(assistant.session_state(USER), ConversationState::Idle);
    }

    #[test]
    fn cancelled_amount_edit_keeps_amount() {
        let (mut assistant, ledger, _) = setup();
        let debtor = ledger
            .create_debtor(DebtorName::new("Vali").unwrap(), Amount::new(100.0).unwrap())
            .unwrap();

        send_all(&mut assistant, &["Edit debtor", "D001", "Edit amount", "80", "Cancel"]);

        assert_eq!(debtor_amount(&ledger, &debtor.external_id), Some(100.0));
    }

    #[test]
    fn malformed_debtor_id_returns_to_idle() {
        let (mut assistant, _, _) = setup();

        let reply = send_all(&mut assistant, &["Edit debtor", "D1"]);

        assert!(reply.text.contains("not a valid debtor ID"), "{}", reply.text);
        assert_eq!(assistant.session_state(USER), ConversationState::Idle);
    }

    #[test]
    fn paid_debtor_cannot_be_marked_again() {
        let (mut assistant, ledger, _) = setup();
        let debtor = ledger
            .create_debtor(DebtorName::new("Ali").unwrap(), Amount::new(100.0).unwrap())
            .unwrap();
        ledger
            .update_debtor_status(&debtor.external_id, DebtorStatus::Paid)
            .unwrap();

        let reply = send_all(&mut assistant, &["Edit debtor", "D001", "Mark as paid"]);

        assert!(reply.text.contains("already paid"), "{}", reply.text);
        assert_eq!(assistant.session_state(USER), ConversationState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn paid_debtor_is_removed_and_user_notified_once() {
        let (mut assistant, ledger, notifier) = setup();
        send_all(&mut assistant, &["Add debtor", "Ali", "500000", "Confirm"]);

        let reply = send_all(&mut assistant, &["Edit debtor", "D001", "Mark as paid", "Confirm"]);

        assert!(reply.text.contains("will be removed in 60 seconds"), "{}", reply.text);
        let id = DebtorExternalId::new(1);
        assert_eq!(
            ledger.find_debtor(&id).unwrap().map(|debtor| debtor.status),
            Some(DebtorStatus::Paid)
        );
        assert_eq!(assistant.pending_removals(), 1);

        tokio::time::sleep(Duration::from_secs(61)).await;

        assert_eq!(ledger.find_debtor(&id), Ok(None));
        assert!(ledger.list_debtors().unwrap().is_empty());
        assert_eq!(notifier.messages().len(), 1);
        assert_eq!(notifier.messages()[0].0, USER);
        assert_eq!(assistant.pending_removals(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_mark_as_paid_arms_one_timer() {
        let (mut assistant, ledger, notifier) = setup();
        ledger
            .create_debtor(DebtorName::new("Ali").unwrap(), Amount::new(100.0).unwrap())
            .unwrap();
        for user in [1, 2] {
            for text in ["Edit debtor", "D001", "Mark as paid"] {
                assistant.handle(user, text);
            }
        }

        let first = assistant.handle(1, "Confirm").remove(0);
        let second = assistant.handle(2, "Confirm").remove(0);

        assert!(first.text.contains("will be removed"), "{}", first.text);
        assert_eq!(second.text, "Debtor D001 is now Paid.");
        assert_eq!(assistant.pending_removals(), 1);

        tokio::time::sleep(Duration::from_secs(61)).await;

        assert_eq!(notifier.messages().len(), 1);
        assert_eq!(notifier.messages()[0].0, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn paid_debtors_from_before_start_are_removed() {
        let (_, ledger, notifier) = setup();
        let paid = ledger
            .create_debtor(DebtorName::new("Ali").unwrap(), Amount::new(100.0).unwrap())
            .unwrap();
        ledger
            .update_debtor_status(&paid.external_id, DebtorStatus::Paid)
            .unwrap();
        let active = ledger
            .create_debtor(DebtorName::new("Vali").unwrap(), Amount::new(50.0).unwrap())
            .unwrap();

        let mut assistant = Assistant::new(ledger.clone(), notifier.clone(), &BotConfig::default());

        assert_eq!(assistant.resume_removals(), Ok(1));
        assert_eq!(assistant.pending_removals(), 1);

        tokio::time::sleep(Duration::from_secs(61)).await;

        assert_eq!(ledger.find_debtor(&paid.external_id), Ok(None));
        assert_eq!(ledger.list_debtors().unwrap(), vec![active]);
        assert!(notifier.messages().is_empty());
        assert_eq!(assistant.pending_removals(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelling_mark_as_paid_keeps_debtor_active() {
        let (mut assistant, ledger, notifier) = setup();
        ledger
            .create_debtor(DebtorName::new("Ali").unwrap(), Amount::new(100.0).unwrap())
            .unwrap();

        send_all(&mut assistant, &["Edit debtor", "D001", "Mark as paid", "Cancel"]);
        tokio::time::sleep(Duration::from_secs(120)).await;

        let debtor = ledger.find_debtor(&DebtorExternalId::new(1)).unwrap().unwrap();
        assert_eq!(debtor.status, DebtorStatus::Active);
        assert!(notifier.messages().is_empty());
    }

    #[test]
    fn storage_failure_keeps_state_for_retry() {
        let (mut assistant, ledger, _) = setup();
        send_all(&mut assistant, &["Add debtor", "Ali", "500000"]);
        let staged = assistant.session_state(USER);
        ledger.with_connection(|connection| connection.execute_batch("DROP TABLE debtor").unwrap());

        let reply = send(&mut assistant, "Confirm");

        assert_eq!(reply.text, STORAGE_FAILURE);
        assert_eq!(assistant.session_state(USER), staged);

        ledger.with_connection(|connection| initialize(connection).unwrap());
        let reply = send(&mut assistant, "Confirm");

        assert!(reply.text.starts_with("Debtor D001 registered."), "{}", reply.text);
        assert_eq!(assistant.session_state(USER), ConversationState::Idle);
    }

    #[test]
    fn sessions_do_not_interfere() {
        let (mut assistant, _, _) = setup();

        assistant.handle(1, "Income");
        assistant.handle(2, "Add debtor");

        assert_eq!(
            assistant.session_state(1),
            ConversationState::AwaitingAmount(TransactionKind::Income)
        );
        assert_eq!(assistant.session_state(2), ConversationState::AwaitingDebtorName);
    }

    #[test]
    fn reset_command_abandons_flow() {
        let (mut assistant, _, _) = setup();
        send(&mut assistant, "Income");

        let reply = send(&mut assistant, "/reset");

        assert_eq!(reply.text, "Session reset.");
        assert_eq!(assistant.session_state(USER), ConversationState::Idle);
    }

    #[test]
    fn clear_commands_delete_records() {
        let (mut assistant, ledger, _) = setup();
        send_all(&mut assistant, &["Income", "10", "Skip"]);
        send_all(&mut assistant, &["Add debtor", "Ali", "5", "Confirm"]);

        let reply = send(&mut assistant, "/clear_transactions");
        assert_eq!(reply.text, "Deleted 1 transactions.");
        assert_eq!(ledger.count_debtors(), Ok(1));

        let reply = send(&mut assistant, "/clear");
        assert_eq!(reply.text, "Deleted 0 transactions and 1 debtors.");

        let reply = send(&mut assistant, "/clear_debtors");
        assert_eq!(reply.text, "Deleted 0 debtors.");
    }

    #[test]
    fn self_test_command_leaves_data_alone() {
        let (mut assistant, ledger, _) = setup();
        send_all(&mut assistant, &["Income", "10", "Skip"]);

        let reply = send(&mut assistant, "/test");

        assert!(reply.text.starts_with("Self test PASSED"), "{}", reply.text);
        assert_eq!(ledger.count_transactions(), Ok(1));
    }

    #[test]
    fn debtors_command_lists_debtors() {
        let (mut assistant, ledger, _) = setup();
        ledger
            .create_debtor(DebtorName::new("Ali").unwrap(), Amount::new(500_000.0).unwrap())
            .unwrap();

        let reply = send(&mut assistant, "Debtors");

        assert_eq!(
            reply.text,
            "Debtors:\nD001 | Ali | 500,000 | Active | 2025-10-17 14:30"
        );
        assert_eq!(assistant.session_state(USER), ConversationState::Idle);
    }
}
