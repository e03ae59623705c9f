use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;

use crate::{
    dispatch::Dispatcher,
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{FetchParams, IncomingUpdate},
    },
    observer::{RelayEvent, RelayObserver},
    retry::{with_retry, RetryPolicy},
    Result,
};

pub const DEFAULT_LIMIT: u8 = 10;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Exclusive lower bound of update ids still to fetch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cursor(i64);

impl Cursor {
    pub fn new(offset: i64) -> Self {
        Self(offset)
    }

    pub fn offset(&self) -> i64 {
        self.0
    }

    /// Move past the highest id in `batch`. Empty batches leave the cursor as is
    /// and the cursor never moves backwards.
    pub fn advance_past(&mut self, batch: &[IncomingUpdate]) -> bool {
        let Some(max_id) = batch.iter().map(|u| u.id.0).max() else {
            return false;
        };
        let next = max_id.saturating_add(1);
        if next <= self.0 {
            return false;
        }
        self.0 = next;
        true
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollSettings {
    pub limit: u8,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

/// Sequential long-poll loop: fetch a batch, dispatch in order, move the cursor.
pub struct PollLoop {
    messenger: Arc<dyn MessagingPort>,
    dispatcher: Dispatcher,
    observer: Arc<dyn RelayObserver>,
    settings: PollSettings,
    cursor: Cursor,
    cancel: CancellationToken,
}

impl PollLoop {
    pub fn new(
        messenger: Arc<dyn MessagingPort>,
        dispatcher: Dispatcher,
        observer: Arc<dyn RelayObserver>,
        settings: PollSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            messenger,
            dispatcher,
            observer,
            settings,
            cursor: Cursor::default(),
            cancel,
        }
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Run until cancelled (`Ok`) or until a fetch fails after all retries (`Err`).
    pub async fn run(&mut self) -> Result<()> {
        self.observer.on_event(&RelayEvent::Started {
            offset: self.cursor.offset(),
            limit: self.settings.limit,
            device_connected: self.dispatcher.device_connected(),
        });

        while !self.cancel.is_cancelled() {
            if let Err(e) = self.poll_once().await {
                return Err(Error::Transport(format!("could not get updates: {e}")));
            }
        }

        self.observer.on_event(&RelayEvent::Stopped);
        Ok(())
    }

    /// One fetch + dispatch cycle. Returns the number of updates in the batch.
    ///
    /// Cancellation only interrupts the fetch. A fetched batch is always
    /// dispatched in full and the cursor moved past it.
    pub async fn poll_once(&mut self) -> Result<usize> {
        let cancel = self.cancel.clone();
        let updates = tokio::select! {
            _ = cancel.cancelled() => return Ok(0),
            res = self.fetch() => res?,
        };

        for update in &updates {
            let Some(msg) = &update.message else {
                self.observer
                    .on_event(&RelayEvent::UpdateSkipped { update_id: update.id });
                continue;
            };

            match self.dispatcher.dispatch(msg).await {
                Ok(outcome) => self.observer.on_event(&RelayEvent::Handled {
                    message: msg,
                    outcome: &outcome,
                }),
                Err(error) => self.observer.on_event(&RelayEvent::Rejected {
                    message: msg,
                    error: &error,
                }),
            }
        }

        let from = self.cursor.offset();
        if self.cursor.advance_past(&updates) {
            self.observer.on_event(&RelayEvent::CursorAdvanced {
                from,
                to: self.cursor.offset(),
            });
        }

        Ok(updates.len())
    }

    async fn fetch(&self) -> Result<Vec<IncomingUpdate>> {
        let params = FetchParams {
            offset: self.cursor.offset(),
            limit: self.settings.limit,
            timeout: self.settings.timeout,
        };
        let messenger = &self.messenger;
        let observer = &self.observer;
        let retry = &self.settings.retry;
        let params = &params;

        with_retry(
            retry,
            move || messenger.fetch_updates(params),
            |attempt, err: &Error| {
                observer.on_event(&RelayEvent::RetryScheduled {
                    operation: "fetch_updates",
                    attempt,
                    delay: retry.delay_for(attempt),
                    error: &err.to_string(),
                })
            },
        )
        .await
    }
}
