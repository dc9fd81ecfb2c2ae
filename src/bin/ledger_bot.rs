use std::{error::Error, path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use rusqlite::Connection;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc::{self, UnboundedSender},
};

use ledger_bot::{
    Assistant, BotConfig, DEFAULT_TIMEZONE, Ledger, Notifier, OutgoingMessage, SystemClock,
    UserId, setup_logging,
};

/// Chat with the ledger assistant from the terminal.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the ledger SQLite database.
    #[arg(long)]
    db_path: String,

    /// Canonical name of the timezone used for timestamps and reports.
    #[arg(long, default_value = DEFAULT_TIMEZONE)]
    timezone: String,

    /// Seconds a paid debtor is kept before it is deleted.
    #[arg(long, default_value_t = 60)]
    removal_delay_secs: u64,

    /// The user ID to chat as.
    #[arg(long, default_value_t = 1)]
    user_id: UserId,

    /// File path to append debug logs to.
    #[arg(long, default_value = "debug.log")]
    log_path: PathBuf,
}

/// Forwards notifications to the task that prints them.
struct ChannelNotifier {
    sender: UnboundedSender<(UserId, String)>,
}

impl Notifier for ChannelNotifier {
    fn notify(&self, user_id: UserId, text: String) {
        if self.sender.send((user_id, text)).is_err() {
            tracing::warn!("notification for user {user_id} dropped, printer has stopped");
        }
    }
}

fn print_message(message: &OutgoingMessage) {
    println!("{}", message.text);

    if let Some(options) = &message.suggested_replies {
        let buttons: Vec<String> = options.iter().map(|option| format!("[{option}]")).collect();
        println!("{}", buttons.join(" "));
    }

    println!();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    setup_logging(&args.log_path)?;

    let config = BotConfig {
        timezone: args.timezone,
        paid_debtor_removal_delay: Duration::from_secs(args.removal_delay_secs),
    };

    let clock = SystemClock::new(&config.timezone)?;
    let ledger = Ledger::new(Connection::open(&args.db_path)?, Arc::new(clock))?;

    let (sender, mut receiver) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some((user_id, text)) = receiver.recv().await {
            println!("(to user {user_id}) {text}\n");
        }
    });

    let mut assistant = Assistant::new(ledger, Arc::new(ChannelNotifier { sender }), &config);
    assistant.resume_removals()?;
    tracing::info!(
        "ledger bot ready, database {} in timezone {}",
        args.db_path,
        config.timezone
    );

    for message in assistant.handle(args.user_id, "/start") {
        print_message(&message);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        for message in assistant.handle(args.user_id, &line) {
            print_message(&message);
        }
    }

    tracing::info!("stdin closed, shutting down");

    Ok(())
}
