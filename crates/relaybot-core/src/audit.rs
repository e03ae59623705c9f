use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Utc;
use serde::Serialize;

use crate::{
    dispatch::{DispatchError, DispatchOutcome},
    errors::Error,
    messaging::types::IncomingMessage,
    observer::{RelayEvent, RelayObserver},
    Result,
};

const AUDIT_MAX_TEXT: usize = 500;

/// RFC3339 timestamp in UTC.
pub fn iso_timestamp_utc() -> String {
    Utc::now().to_rfc3339()
}

#[derive(Clone, Debug, Serialize)]
pub struct AuditEvent {
    pub timestamp: String,
    pub event: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub chat_id: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorized: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditEvent {
    fn base(event: &str, msg: &IncomingMessage) -> Self {
        Self {
            timestamp: iso_timestamp_utc(),
            event: event.to_string(),
            user_id: msg.user_id.map(|u| u.0),
            username: msg.username.clone(),
            chat_id: msg.chat_id.0,
            content: Some(msg.text.clone()),
            outcome: None,
            command: None,
            authorized: None,
            error: None,
        }
    }

    pub fn handled(msg: &IncomingMessage, outcome: &DispatchOutcome) -> Self {
        let mut ev = Self::base("message", msg);
        ev.authorized = Some(true);
        ev.outcome = Some(outcome.name().to_string());
        match outcome {
            DispatchOutcome::CommandSent { byte, .. } => {
                ev.command = Some((*byte as char).to_string());
            }
            DispatchOutcome::CommandFailed { byte, error, .. } => {
                ev.command = Some((*byte as char).to_string());
                ev.error = Some(error.clone());
            }
            DispatchOutcome::Pong | DispatchOutcome::Menu => {}
        }
        ev
    }

    pub fn rejected(msg: &IncomingMessage, error: &DispatchError) -> Self {
        match error {
            DispatchError::Unauthorized(_) => {
                let mut ev = Self::base("auth", msg);
                ev.authorized = Some(false);
                ev
            }
            other => {
                let mut ev = Self::base("error", msg);
                ev.error = Some(other.to_string());
                ev
            }
        }
    }
}

/// Append-only audit trail of every message the bot looked at.
#[derive(Clone, Debug)]
pub struct AuditLogger {
    path: PathBuf,
    json: bool,
}

impl AuditLogger {
    pub fn new(path: impl Into<PathBuf>, json: bool) -> Self {
        Self {
            path: path.into(),
            json,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, mut event: AuditEvent) -> Result<()> {
        if let Some(s) = &event.content {
            event.content = Some(truncate_text(s, AUDIT_MAX_TEXT));
        }
        if let Some(s) = &event.error {
            event.error = Some(truncate_text(s, AUDIT_MAX_TEXT));
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        if self.json {
            let line = serde_json::to_string(&event)?;
            writeln!(file, "{line}")?;
            return Ok(());
        }

        // Plain text format for readability.
        let mut out = String::new();
        out.push('\n');
        out.push_str(&"=".repeat(60));

        let value = serde_json::to_value(&event)?;
        let Some(obj) = value.as_object() else {
            return Err(Error::Config(
                "audit event is not a JSON object".to_string(),
            ));
        };
        for (k, v) in obj {
            out.push('\n');
            out.push_str(k);
            out.push_str(": ");
            out.push_str(&json_value_to_display(v));
        }
        out.push('\n');

        file.write_all(out.as_bytes())?;
        Ok(())
    }
}

impl RelayObserver for AuditLogger {
    fn on_event(&self, event: &RelayEvent<'_>) {
        let audit = match event {
            RelayEvent::Handled { message, outcome } => AuditEvent::handled(message, outcome),
            RelayEvent::Rejected { message, error } => AuditEvent::rejected(message, error),
            _ => return,
        };

        if let Err(e) = self.write(audit) {
            tracing::warn!(path = %self.path.display(), "audit write failed: {e}");
        }
    }
}

pub fn truncate_text(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let mut out = s.chars().take(max_len).collect::<String>();
    out.push_str("...");
    out
}

fn json_value_to_display(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.to_string(),
        other => serde_json::to_string(other).unwrap_or_else(|_| "<unprintable>".to_string()),
    }
}
