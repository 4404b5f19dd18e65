use async_trait::async_trait;

use crate::{domain::ChatId, domain::Offset, messaging::types::Update, Result};

/// The two Bot API calls the dispatcher needs.
///
/// Telegram over HTTP is the production implementation; tests substitute an
/// in-memory fake.
#[async_trait]
pub trait BotApi: Send + Sync {
    /// Long-poll for updates with id >= `offset`, held open for up to
    /// `timeout_secs`, restricted to the given update kinds.
    async fn get_updates(
        &self,
        offset: Offset,
        timeout_secs: u64,
        allowed_updates: &[String],
    ) -> Result<Vec<Update>>;

    /// Post a plain text message to `chat_id`.
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()>;
}
