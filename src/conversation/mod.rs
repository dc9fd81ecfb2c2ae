//! The conversation state machine.
//!
//! This module contains everything related to talking to users:
//! - The `Assistant` that turns incoming messages into replies
//! - The per-user `ConversationState` and the `Sessions` that hold it
//! - The commands the assistant recognizes and how replies are rendered

mod command;
mod engine;
mod replies;
mod session;
mod state;

pub use engine::Assistant;
pub use replies::OutgoingMessage;
pub use state::ConversationState;
