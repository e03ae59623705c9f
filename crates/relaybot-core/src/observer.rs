//! Diagnostic sink for the poll loop and dispatcher.
//!
//! The core never logs directly; it reports `RelayEvent`s to whatever observer
//! it was built with. `TracingObserver` is the default, `AuditLogger` adds a
//! file trail, and `Observers` fans out to several.

use std::{sync::Arc, time::Duration};

use crate::{
    dispatch::{DispatchError, DispatchOutcome},
    domain::UpdateId,
    messaging::types::IncomingMessage,
};

#[derive(Debug)]
pub enum RelayEvent<'a> {
    Started {
        offset: i64,
        limit: u8,
        device_connected: bool,
    },
    RetryScheduled {
        operation: &'a str,
        attempt: u32,
        delay: Duration,
        error: &'a str,
    },
    UpdateSkipped {
        update_id: UpdateId,
    },
    CommandSending {
        label: &'a str,
        byte: u8,
    },
    Handled {
        message: &'a IncomingMessage,
        outcome: &'a DispatchOutcome,
    },
    Rejected {
        message: &'a IncomingMessage,
        error: &'a DispatchError,
    },
    CursorAdvanced {
        from: i64,
        to: i64,
    },
    Stopped,
}

impl RelayEvent<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::RetryScheduled { .. } => "retry_scheduled",
            Self::UpdateSkipped { .. } => "update_skipped",
            Self::CommandSending { .. } => "command_sending",
            Self::Handled { .. } => "handled",
            Self::Rejected { .. } => "rejected",
            Self::CursorAdvanced { .. } => "cursor_advanced",
            Self::Stopped => "stopped",
        }
    }
}

pub trait RelayObserver: Send + Sync {
    fn on_event(&self, event: &RelayEvent<'_>);
}

/// Default observer: one `tracing` event per relay event.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl RelayObserver for TracingObserver {
    fn on_event(&self, event: &RelayEvent<'_>) {
        match event {
            RelayEvent::Started {
                offset,
                limit,
                device_connected,
            } => {
                tracing::info!(offset, limit, device_connected, "polling for updates");
            }
            RelayEvent::RetryScheduled {
                operation,
                attempt,
                delay,
                error,
            } => {
                tracing::warn!(operation, attempt, ?delay, "retry {attempt}: {error}");
            }
            RelayEvent::UpdateSkipped { update_id } => {
                tracing::debug!(update_id = update_id.0, "skipping update without text message");
            }
            RelayEvent::CommandSending { label, byte } => {
                tracing::info!(label, "sending command: {}", *byte as char);
            }
            RelayEvent::Handled { message, outcome } => {
                tracing::info!(
                    user_id = message.user_id.map(|u| u.0),
                    chat_id = message.chat_id.0,
                    outcome = outcome.name(),
                    "handled message"
                );
            }
            RelayEvent::Rejected { message, error } => {
                tracing::warn!(
                    user_id = message.user_id.map(|u| u.0),
                    chat_id = message.chat_id.0,
                    "could not handle message: {error}"
                );
            }
            RelayEvent::CursorAdvanced { from, to } => {
                tracing::debug!(from, to, "offset advanced");
            }
            RelayEvent::Stopped => {
                tracing::info!("polling stopped");
            }
        }
    }
}

/// Fan-out to several observers, in order.
#[derive(Clone, Default)]
pub struct Observers(Vec<Arc<dyn RelayObserver>>);

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn RelayObserver>) -> Self {
        self.0.push(observer);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl RelayObserver for Observers {
    fn on_event(&self, event: &RelayEvent<'_>) {
        for o in &self.0 {
            o.on_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingObserver;

    #[test]
    fn fan_out_reaches_every_observer() {
        let a = Arc::new(RecordingObserver::default());
        let b = Arc::new(RecordingObserver::default());
        let all = Observers::new().with(a.clone()).with(b.clone());
        assert_eq!(all.len(), 2);

        all.on_event(&RelayEvent::CursorAdvanced { from: 0, to: 5 });
        all.on_event(&RelayEvent::Stopped);

        assert_eq!(a.names(), vec!["cursor_advanced", "stopped"]);
        assert_eq!(b.names(), vec!["cursor_advanced", "stopped"]);
    }

    #[test]
    fn tracing_observer_handles_every_event() {
        let msg = crate::testing::message(1, "/ping");
        let outcome = DispatchOutcome::Pong;
        let error = DispatchError::UnknownCommand("x".to_string());
        let obs = TracingObserver;

        obs.on_event(&RelayEvent::Started {
            offset: 0,
            limit: 10,
            device_connected: false,
        });
        obs.on_event(&RelayEvent::RetryScheduled {
            operation: "fetch_updates",
            attempt: 0,
            delay: Duration::from_millis(100),
            error: "boom",
        });
        obs.on_event(&RelayEvent::UpdateSkipped {
            update_id: UpdateId(3),
        });
        obs.on_event(&RelayEvent::CommandSending {
            label: "Big On",
            byte: b'b',
        });
        obs.on_event(&RelayEvent::Handled {
            message: &msg,
            outcome: &outcome,
        });
        obs.on_event(&RelayEvent::Rejected {
            message: &msg,
            error: &error,
        });
        obs.on_event(&RelayEvent::CursorAdvanced { from: 0, to: 4 });
        obs.on_event(&RelayEvent::Stopped);
    }
}
