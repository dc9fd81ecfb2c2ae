//! Removes paid debtors after a delay and tells the user who marked them paid.

use std::{sync::Arc, time::Duration};

use tokio::task::JoinHandle;

use crate::{database_id::UserId, debtor::Debtor, ledger::Ledger};

/// Delivers messages that are not replies to an incoming message.
pub trait Notifier: Send + Sync {
    /// Send `text` to `user_id`.
    fn notify(&self, user_id: UserId, text: String);
}

/// Arms one-shot timers that delete paid debtors.
#[derive(Clone)]
pub struct DebtorRemovalScheduler {
    ledger: Ledger,
    notifier: Arc<dyn Notifier>,
    delay: Duration,
}

impl DebtorRemovalScheduler {
    /// Create a scheduler that deletes debtors `delay` after they are scheduled.
    pub fn new(ledger: Ledger, notifier: Arc<dyn Notifier>, delay: Duration) -> Self {
        Self {
            ledger,
            notifier,
            delay,
        }
    }

    /// How long a paid debtor is kept before it is deleted.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Delete `debtor` once the delay has passed, then notify `user_id` if
    /// one is given.
    ///
    /// Must be called from within a tokio runtime. If the debtor is already gone
    /// when the timer fires, nothing is deleted and no one is notified.
    pub fn schedule(&self, debtor: &Debtor, user_id: Option<UserId>) -> ScheduledRemoval {
        let ledger = self.ledger.clone();
        let notifier = Arc::clone(&self.notifier);
        let delay = self.delay;
        let debtor_id = debtor.id;
        let message = format!(
            "Debtor {} ({}) was paid and has been removed.",
            debtor.external_id, debtor.name
        );

        tracing::info!(
            "debtor {} will be removed in {}s",
            debtor.external_id,
            delay.as_secs()
        );

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            match ledger.delete_debtor(debtor_id) {
                Ok(true) => match user_id {
                    Some(user_id) => notifier.notify(user_id, message),
                    None => tracing::info!("{message}"),
                },
                Ok(false) => {
                    tracing::debug!("debtor #{debtor_id} was already removed");
                }
                Err(error) => {
                    tracing::error!("could not remove paid debtor #{debtor_id}: {error}");
                }
            }
        });

        ScheduledRemoval { handle }
    }
}

/// A pending debtor removal.
///
/// Dropping the handle does not cancel the removal.
#[derive(Debug)]
pub struct ScheduledRemoval {
    handle: JoinHandle<()>,
}

impl ScheduledRemoval {
    /// Stop the removal if it has not happened yet.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Whether the timer has fired or was cancelled.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
