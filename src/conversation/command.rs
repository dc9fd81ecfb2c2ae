//! The fixed texts the assistant recognizes.
//!
//! Commands are matched exactly after trimming surrounding whitespace, so
//! ordinary descriptions such as "income from rent" never trigger a command.

/// Skips an optional input.
pub const SKIP: &str = "Skip";
/// Commits a staged change.
pub const CONFIRM: &str = "Confirm";
/// Discards a staged change.
pub const CANCEL: &str = "Cancel";
/// Starts editing an amount.
pub const EDIT_AMOUNT: &str = "Edit amount";
/// Starts editing a transaction's description.
pub const EDIT_DESCRIPTION: &str = "Edit description";
/// Starts marking a debtor as paid.
pub const MARK_AS_PAID: &str = "Mark as paid";
/// Leaves the current flow.
pub const BACK_TO_MENU: &str = "Back to menu";

/// Menu commands. These are accepted in any state and start a new flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    Income,
    Expense,
    Report,
    EditTransaction,
    AddDebtor,
    Debtors,
    EditDebtor,
    BackToMenu,
}

impl MenuCommand {
    /// The commands shown in the main menu.
    pub const MAIN_MENU: [MenuCommand; 7] = [
        MenuCommand::Income,
        MenuCommand::Expense,
        MenuCommand::Report,
        MenuCommand::EditTransaction,
        MenuCommand::AddDebtor,
        MenuCommand::Debtors,
        MenuCommand::EditDebtor,
    ];

    /// The text that triggers the command.
    pub fn label(self) -> &'static str {
        match self {
            MenuCommand::Income => "Income",
            MenuCommand::Expense => "Expense",
            MenuCommand::Report => "Report",
            MenuCommand::EditTransaction => "Edit transaction",
            MenuCommand::AddDebtor => "Add debtor",
            MenuCommand::Debtors => "Debtors",
            MenuCommand::EditDebtor => "Edit debtor",
            MenuCommand::BackToMenu => BACK_TO_MENU,
        }
    }

    /// Match `text` against the menu.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();

        Self::MAIN_MENU
            .into_iter()
            .chain([MenuCommand::BackToMenu])
            .find(|command| command.label() == text)
    }
}

/// Slash commands. Like menu commands they are accepted in any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlashCommand {
    Start,
    Menu,
    Help,
    Reset,
    Clear,
    ClearTransactions,
    ClearDebtors,
    Test,
}

impl SlashCommand {
    const ALL: [SlashCommand; 8] = [
        SlashCommand::Start,
        SlashCommand::Menu,
        SlashCommand::Help,
        SlashCommand::Reset,
        SlashCommand::Clear,
        SlashCommand::ClearTransactions,
        SlashCommand::ClearDebtors,
        SlashCommand::Test,
    ];

    /// The command as the user types it.
    pub fn command(self) -> &'static str {
        match self {
            SlashCommand::Start => "/start",
            SlashCommand::Menu => "/menu",
            SlashCommand::Help => "/help",
            SlashCommand::Reset => "/reset",
            SlashCommand::Clear => "/clear",
            SlashCommand::ClearTransactions => "/clear_transactions",
            SlashCommand::ClearDebtors => "/clear_debtors",
            SlashCommand::Test => "/test",
        }
    }

    /// What the command does, for the help text.
    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::Start => "show the welcome message",
            SlashCommand::Menu => "show the main menu",
            SlashCommand::Help => "list the commands",
            SlashCommand::Reset => "abandon whatever you are doing",
            SlashCommand::Clear => "delete all transactions and debtors",
            SlashCommand::ClearTransactions => "delete all transactions",
            SlashCommand::ClearDebtors => "delete all debtors",
            SlashCommand::Test => "check that storage and reports work",
        }
    }

    /// Match `text` against the slash commands.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();

        Self::ALL.into_iter().find(|command| command.command() == text)
    }

    /// One line per command, for the help text.
    pub fn help_lines() -> String {
        Self::ALL
            .iter()
            .map(|command| format!("{} - {}", command.command(), command.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
