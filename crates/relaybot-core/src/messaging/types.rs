use std::time::Duration;

use crate::domain::{ChatId, UpdateId, UserId};

/// One inbound update as seen by the poll loop.
///
/// `message` is `None` for update kinds the bot does not handle (edits,
/// channel posts, callback queries). Those still move the cursor.
#[derive(Clone, Debug)]
pub struct IncomingUpdate {
    pub id: UpdateId,
    pub message: Option<IncomingMessage>,
}

#[derive(Clone, Debug)]
pub struct IncomingMessage {
    pub chat_id: ChatId,
    pub user_id: Option<UserId>,
    pub username: Option<String>,
    pub text: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchParams {
    pub offset: i64,
    pub limit: u8,
    pub timeout: Duration,
}

/// Reply keyboard rendered under the input field (rows of button labels).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplyKeyboard {
    pub rows: Vec<Vec<String>>,
}

impl ReplyKeyboard {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flatten().map(String::as_str)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingReply {
    pub chat_id: ChatId,
    pub text: String,
    pub keyboard: Option<ReplyKeyboard>,
}

impl OutgoingReply {
    pub fn text(chat_id: ChatId, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: ReplyKeyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}
