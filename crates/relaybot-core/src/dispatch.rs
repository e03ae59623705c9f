use std::sync::Arc;

use crate::{
    commands::CommandTable,
    device::{DeviceError, DeviceTransport},
    domain::UserId,
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{IncomingMessage, OutgoingReply},
    },
    observer::{RelayEvent, RelayObserver},
    retry::{with_retry, RetryPolicy},
    security::is_authorized,
};

pub const PING_COMMAND: &str = "/ping";
pub const START_COMMAND: &str = "/start";
pub const HELP_COMMAND: &str = "/help";

pub const PONG_REPLY: &str = "pong";
pub const MENU_PROMPT: &str = "What do you want?";
pub const COMMAND_OK_REPLY: &str = "Sounds good!";

pub fn command_failed_reply(err: &DeviceError) -> String {
    format!("Oops! {err}")
}

/// Why a message produced no reply (or the reply could not be delivered).
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("invalid user: {}", display_user(.0))]
    Unauthorized(Option<UserId>),

    #[error("unknown message: {0}")]
    UnknownCommand(String),

    #[error("could not send message: {0}")]
    Reply(#[source] Error),
}

fn display_user(user: &Option<UserId>) -> String {
    match user {
        Some(u) => u.0.to_string(),
        None => "unknown".to_string(),
    }
}

/// What a message asks for, decided before any I/O happens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Pong,
    Menu,
    Command { label: String, byte: u8 },
}

/// What happened for a message that got a reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Pong,
    Menu,
    CommandSent { label: String, byte: u8 },
    CommandFailed { label: String, byte: u8, error: String },
}

impl DispatchOutcome {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pong => "pong",
            Self::Menu => "menu",
            Self::CommandSent { .. } => "command_sent",
            Self::CommandFailed { .. } => "command_failed",
        }
    }
}

/// Turns one incoming message into at most one device write and one reply.
pub struct Dispatcher {
    commands: CommandTable,
    allowed_users: Vec<i64>,
    device: DeviceTransport,
    messenger: Arc<dyn MessagingPort>,
    retry: RetryPolicy,
    observer: Arc<dyn RelayObserver>,
}

impl Dispatcher {
    pub fn new(
        commands: CommandTable,
        allowed_users: Vec<i64>,
        device: DeviceTransport,
        messenger: Arc<dyn MessagingPort>,
        retry: RetryPolicy,
        observer: Arc<dyn RelayObserver>,
    ) -> Self {
        Self {
            commands,
            allowed_users,
            device,
            messenger,
            retry,
            observer,
        }
    }

    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    pub fn device_connected(&self) -> bool {
        self.device.is_connected()
    }

    /// Pure decision step: authorization first, then the first matching rule.
    pub fn decide(&self, msg: &IncomingMessage) -> Result<Action, DispatchError> {
        if !is_authorized(msg.user_id, &self.allowed_users) {
            return Err(DispatchError::Unauthorized(msg.user_id));
        }

        match msg.text.as_str() {
            PING_COMMAND => return Ok(Action::Pong),
            START_COMMAND | HELP_COMMAND => return Ok(Action::Menu),
            _ => {}
        }

        match self.commands.lookup(&msg.text) {
            Some(byte) => Ok(Action::Command {
                label: msg.text.clone(),
                byte,
            }),
            None => Err(DispatchError::UnknownCommand(msg.text.clone())),
        }
    }

    /// Decide, perform the device write if any, then send exactly one reply.
    ///
    /// Device failures become the reply text. Only a reply that could not be
    /// sent after retries is returned as an error alongside the rejections.
    pub async fn dispatch(
        &mut self,
        msg: &IncomingMessage,
    ) -> Result<DispatchOutcome, DispatchError> {
        let (reply, outcome) = match self.decide(msg)? {
            Action::Pong => (
                OutgoingReply::text(msg.chat_id, PONG_REPLY),
                DispatchOutcome::Pong,
            ),
            Action::Menu => (
                OutgoingReply::text(msg.chat_id, MENU_PROMPT)
                    .with_keyboard(self.commands.keyboard().clone()),
                DispatchOutcome::Menu,
            ),
            Action::Command { label, byte } => {
                self.observer.on_event(&RelayEvent::CommandSending {
                    label: &label,
                    byte,
                });
                match self.device.send_command(&[byte]) {
                    Ok(()) => (
                        OutgoingReply::text(msg.chat_id, COMMAND_OK_REPLY),
                        DispatchOutcome::CommandSent { label, byte },
                    ),
                    Err(e) => (
                        OutgoingReply::text(msg.chat_id, command_failed_reply(&e)),
                        DispatchOutcome::CommandFailed {
                            label,
                            byte,
                            error: e.to_string(),
                        },
                    ),
                }
            }
        };

        self.send_reply(&reply).await?;
        Ok(outcome)
    }

    async fn send_reply(&self, reply: &OutgoingReply) -> Result<(), DispatchError> {
        let messenger = &self.messenger;
        let observer = &self.observer;
        let retry = &self.retry;

        with_retry(
            retry,
            move || messenger.send_reply(reply),
            |attempt, err: &Error| {
                observer.on_event(&RelayEvent::RetryScheduled {
                    operation: "send_reply",
                    attempt,
                    delay: retry.delay_for(attempt),
                    error: &err.to_string(),
                })
            },
        )
        .await
        .map(|_| ())
        .map_err(DispatchError::Reply)
    }
}
