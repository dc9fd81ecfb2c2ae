use std::time::Duration;

/// The timezone used when none is configured.
pub const DEFAULT_TIMEZONE: &str = "Asia/Tashkent";

/// How long paid debtors are kept when no delay is configured.
pub const DEFAULT_REMOVAL_DELAY: Duration = Duration::from_secs(60);

/// Settings for the assistant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotConfig {
    /// The canonical timezone name used for timestamps and report periods,
    /// e.g. "Asia/Tashkent".
    pub timezone: String,
    /// How long a debtor marked as paid is kept before it is deleted.
    pub paid_debtor_removal_delay: Duration,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE.to_owned(),
            paid_debtor_removal_delay: DEFAULT_REMOVAL_DELAY,
        }
    }
}
