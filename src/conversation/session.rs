use std::collections::HashMap;

use crate::{conversation::state::ConversationState, database_id::UserId};

/// The conversation state of every user with a flow in progress.
///
/// Users without an entry are idle, so finished flows take up no space.
#[derive(Debug, Default)]
pub struct Sessions {
    states: HashMap<UserId, ConversationState>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// The state of `user_id`'s conversation.
    pub fn get(&self, user_id: UserId) -> ConversationState {
        self.states.get(&user_id).cloned().unwrap_or_default()
    }

    /// Move `user_id`'s conversation to `state`.
    pub fn set(&mut self, user_id: UserId, state: ConversationState) {
        if state.is_idle() {
            self.states.remove(&user_id);
        } else {
            self.states.insert(user_id, state);
        }
    }

    pub fn reset(&mut self, user_id: UserId) {
        self.states.remove(&user_id);
    }

    /// The number of conversations that are not idle.
    pub fn active(&self) -> usize {
        self.states.len()
    }
}
