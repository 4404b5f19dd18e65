//! Telegram Bot API transport (reqwest).
//!
//! Implements the `plantbot-core` `BotApi` port with two raw HTTP calls:
//! `getUpdates` (long poll) and `sendMessage`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use plantbot_core::{
    config::Config,
    domain::{ChatId, Offset},
    errors::Error,
    messaging::{port::BotApi, types::Update},
    Result,
};

/// Extra time allowed on top of the long-poll timeout before the HTTP client
/// gives up on a request.
const REQUEST_GRACE: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    /// `{api_base_url}/bot{token}`; never logged.
    bot_url: String,
}

impl TelegramClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(cfg.poll_timeout + REQUEST_GRACE)
            .build()
            .map_err(map_err)?;
        Ok(Self {
            http,
            bot_url: format!("{}/bot{}", cfg.api_base_url, cfg.telegram_bot_token),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{method}", self.bot_url)
    }
}

#[async_trait]
impl BotApi for TelegramClient {
    async fn get_updates(
        &self,
        offset: Offset,
        timeout_secs: u64,
        allowed_updates: &[String],
    ) -> Result<Vec<Update>> {
        let query = updates_query(offset, timeout_secs, allowed_updates)?;
        let resp = self
            .http
            .get(self.method_url("getUpdates"))
            .query(&query)
            .send()
            .await
            .map_err(map_err)?;

        let body = resp.bytes().await.map_err(map_err)?;
        decode_updates(&body)
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        let resp = self
            .http
            .post(self.method_url("sendMessage"))
            .json(&SendMessage { chat_id, text })
            .send()
            .await
            .map_err(map_err)?;

        let status = resp.status();
        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            tracing::debug!(
                status = status.as_u16(),
                body = %body.chars().take(200).collect::<String>(),
                "sendMessage rejected"
            );
            return Err(Error::HttpStatus {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: ChatId,
    text: &'a str,
}

/// The Bot API response envelope.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

fn updates_query(
    offset: Offset,
    timeout_secs: u64,
    allowed_updates: &[String],
) -> Result<Vec<(&'static str, String)>> {
    Ok(vec![
        ("offset", offset.0.to_string()),
        ("timeout", timeout_secs.to_string()),
        ("allowed_updates", serde_json::to_string(allowed_updates)?),
    ])
}

/// Decode a `getUpdates` body into the batch, in the order the server sent it.
pub fn decode_updates(body: &[u8]) -> Result<Vec<Update>> {
    let resp: ApiResponse<Vec<Update>> = serde_json::from_slice(body)?;
    if !resp.ok {
        return Err(Error::Api {
            description: resp
                .description
                .unwrap_or_else(|| "request was not ok".to_string()),
        });
    }
    resp.result
        .ok_or_else(|| Error::Transport("getUpdates response has no result".to_string()))
}

/// The token is part of every request URL, so strip URLs from reqwest errors.
fn map_err(e: reqwest::Error) -> Error {
    Error::Transport(format!("telegram request failed: {}", e.without_url()))
}
