use async_trait::async_trait;

use crate::{
    domain::MessageRef,
    messaging::types::{FetchParams, IncomingUpdate, OutgoingReply},
    Result,
};

/// Messenger port consumed by the poll loop and dispatcher.
///
/// Any failure surfaces as an `Error` and is retried by the caller; adapters
/// should not retry on their own.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    /// Long-poll for updates with `id >= params.offset`.
    async fn fetch_updates(&self, params: &FetchParams) -> Result<Vec<IncomingUpdate>>;

    async fn send_reply(&self, reply: &OutgoingReply) -> Result<MessageRef>;
}
