//! Test doubles shared by the unit tests in this crate.

use std::{
    collections::VecDeque,
    io::{self, Write},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageId, MessageRef, UpdateId, UserId},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{FetchParams, IncomingMessage, IncomingUpdate, OutgoingReply},
    },
    observer::{RelayEvent, RelayObserver},
    Result,
};

pub fn message(user_id: i64, text: &str) -> IncomingMessage {
    IncomingMessage {
        chat_id: ChatId(user_id),
        user_id: Some(UserId(user_id)),
        username: Some(format!("user{user_id}")),
        text: text.to_string(),
    }
}

pub fn update(id: i64, message: IncomingMessage) -> IncomingUpdate {
    IncomingUpdate {
        id: UpdateId(id),
        message: Some(message),
    }
}

pub fn non_message(id: i64) -> IncomingUpdate {
    IncomingUpdate {
        id: UpdateId(id),
        message: None,
    }
}

// ============== Messenger ==============

#[derive(Default)]
struct MessengerState {
    batches: VecDeque<Vec<IncomingUpdate>>,
    fetch_failures: usize,
    send_failures: usize,
    fetches: Vec<FetchParams>,
    send_attempts: usize,
    sent: Vec<OutgoingReply>,
}

/// Scripted messenger. With no batch queued, `fetch_updates` never resolves,
/// like a long poll on an idle chat.
#[derive(Default)]
pub struct FakeMessenger {
    state: Mutex<MessengerState>,
}

impl FakeMessenger {
    pub fn push_batch(&self, batch: Vec<IncomingUpdate>) {
        self.state.lock().unwrap().batches.push_back(batch);
    }

    pub fn fail_next_fetches(&self, n: usize) {
        self.state.lock().unwrap().fetch_failures = n;
    }

    pub fn fail_next_sends(&self, n: usize) {
        self.state.lock().unwrap().send_failures = n;
    }

    pub fn fetches(&self) -> Vec<FetchParams> {
        self.state.lock().unwrap().fetches.clone()
    }

    pub fn sent(&self) -> Vec<OutgoingReply> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn send_attempts(&self) -> usize {
        self.state.lock().unwrap().send_attempts
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    async fn fetch_updates(&self, params: &FetchParams) -> Result<Vec<IncomingUpdate>> {
        let next = {
            let mut st = self.state.lock().unwrap();
            st.fetches.push(*params);
            if st.fetch_failures > 0 {
                st.fetch_failures -= 1;
                return Err(Error::Transport("getUpdates failed".to_string()));
            }
            st.batches.pop_front()
        };

        match next {
            Some(batch) => Ok(batch),
            None => std::future::pending().await,
        }
    }

    async fn send_reply(&self, reply: &OutgoingReply) -> Result<MessageRef> {
        let mut st = self.state.lock().unwrap();
        st.send_attempts += 1;
        if st.send_failures > 0 {
            st.send_failures -= 1;
            return Err(Error::Transport("sendMessage failed".to_string()));
        }
        st.sent.push(reply.clone());
        Ok(MessageRef {
            chat_id: reply.chat_id,
            message_id: MessageId(st.sent.len() as i32),
        })
    }
}

// ============== Device link ==============

#[derive(Default)]
struct LinkState {
    written: Vec<u8>,
    flushes: usize,
    fail_write: bool,
    fail_flush: bool,
}

/// In-memory serial link that records what the device would have received.
#[derive(Clone, Default)]
pub struct RecordingLink {
    state: Arc<Mutex<LinkState>>,
}

impl RecordingLink {
    pub fn failing_writes() -> Self {
        let link = Self::default();
        link.state.lock().unwrap().fail_write = true;
        link
    }

    pub fn failing_flush() -> Self {
        let link = Self::default();
        link.state.lock().unwrap().fail_flush = true;
        link
    }

    pub fn written(&self) -> Vec<u8> {
        self.state.lock().unwrap().written.clone()
    }

    pub fn flushes(&self) -> usize {
        self.state.lock().unwrap().flushes
    }
}

impl Write for RecordingLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut st = self.state.lock().unwrap();
        if st.fail_write {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged"));
        }
        st.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut st = self.state.lock().unwrap();
        if st.fail_flush {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "flush timed out"));
        }
        st.flushes += 1;
        Ok(())
    }
}

// ============== Observer ==============

#[derive(Default)]
pub struct RecordingObserver {
    names: Mutex<Vec<&'static str>>,
}

impl RecordingObserver {
    pub fn names(&self) -> Vec<&'static str> {
        self.names.lock().unwrap().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.names
            .lock()
            .unwrap()
            .iter()
            .filter(|n| **n == name)
            .count()
    }
}

impl RelayObserver for RecordingObserver {
    fn on_event(&self, event: &RelayEvent<'_>) {
        self.names.lock().unwrap().push(event.name());
    }
}
