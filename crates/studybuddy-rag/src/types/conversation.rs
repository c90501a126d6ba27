//! Conversation turns

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single user/assistant exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// What the user asked
    #[serde(rename = "prompt")]
    pub user_message: String,
    /// What the assistant answered
    #[serde(rename = "response")]
    pub assistant_message: String,
    /// Creation time; orders turns within an owner
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    /// Create a turn stamped with the current time
    pub fn new(user_message: impl Into<String>, assistant_message: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            assistant_message: assistant_message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Render the turn as transcript lines
    pub fn render(&self) -> String {
        format!(
            "User: {}\nAssistant: {}",
            self.user_message, self.assistant_message
        )
    }
}
