//! Telegram adapter (teloxide).
//!
//! This crate implements the `relaybot-core` MessagingPort over the Bot API:
//! `getUpdates` long polling in, `sendMessage` with a reply keyboard out.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{KeyboardButton, KeyboardMarkup, Update, UpdateKind},
};

pub mod router;

use relaybot_core::{
    domain::{ChatId, MessageId, MessageRef, UpdateId, UserId},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{FetchParams, IncomingMessage, IncomingUpdate, OutgoingReply, ReplyKeyboard},
    },
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Transport(format!("telegram error: {e}"))
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    async fn fetch_updates(&self, params: &FetchParams) -> Result<Vec<IncomingUpdate>> {
        let offset = i32::try_from(params.offset)
            .map_err(|_| Error::Transport(format!("offset out of range: {}", params.offset)))?;
        let timeout = u32::try_from(params.timeout.as_secs()).unwrap_or(u32::MAX);

        let updates = self
            .bot
            .get_updates()
            .offset(offset)
            .limit(params.limit)
            .timeout(timeout)
            .await
            .map_err(Self::map_err)?;

        Ok(updates.into_iter().map(to_incoming).collect())
    }

    async fn send_reply(&self, reply: &OutgoingReply) -> Result<MessageRef> {
        let mut req = self
            .bot
            .send_message(Self::tg_chat(reply.chat_id), reply.text.clone());
        if let Some(kb) = &reply.keyboard {
            req = req.reply_markup(keyboard_markup(kb));
        }

        let msg = req.await.map_err(Self::map_err)?;

        Ok(MessageRef {
            chat_id: reply.chat_id,
            message_id: MessageId(msg.id.0),
        })
    }
}

/// Keep the update id for every kind; only plain messages carry a payload.
fn to_incoming(update: Update) -> IncomingUpdate {
    let id = UpdateId(i64::from(update.id));
    let message = match update.kind {
        UpdateKind::Message(msg) => Some(IncomingMessage {
            chat_id: ChatId(msg.chat.id.0),
            // Ids beyond i64 become "no sender" and fail authorization.
            user_id: msg
                .from()
                .and_then(|u| i64::try_from(u.id.0).ok())
                .map(UserId),
            username: msg.from().and_then(|u| u.username.clone()),
            text: msg.text().unwrap_or_default().to_string(),
        }),
        _ => None,
    };
    IncomingUpdate { id, message }
}

fn keyboard_markup(kb: &ReplyKeyboard) -> KeyboardMarkup {
    let rows: Vec<Vec<KeyboardButton>> = kb
        .rows
        .iter()
        .map(|row| row.iter().map(KeyboardButton::new).collect())
        .collect();
    KeyboardMarkup::new(rows)
}
