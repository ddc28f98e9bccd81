use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::alerts::Notifier;
use crate::config::TelegramConfig;

/// Timeout for ordinary Bot API calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Extra time allowed on top of the long-poll window before the HTTP request gives up.
const LONG_POLL_SLACK: Duration = Duration::from_secs(10);

/// Envelope every Bot API method returns.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub from: Option<User>,
}

impl Message {
    /// Sender's `@username`, or `unknown` for anonymous admins and channel posts.
    pub fn sender_name(&self) -> &str {
        self.from
            .as_ref()
            .and_then(|u| u.username.as_deref())
            .unwrap_or("unknown")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: Option<String>,
}

impl Chat {
    pub fn is_private(&self) -> bool {
        self.kind == "private"
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    #[serde(default)]
    pub username: Option<String>,
}

/// Minimal Bot API client: `sendMessage` and `getUpdates`.
#[derive(Debug, Clone)]
pub struct TelegramClient {
    http: Client,
    base: String,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build Telegram HTTP client")?;
        Ok(Self {
            http,
            base: format!(
                "{}/bot{}",
                config.api_base.trim_end_matches('/'),
                config.bot_token.trim()
            ),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{method}", self.base)
    }

    /// Send a Markdown message. The caller escapes free text.
    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<()> {
        let resp = self
            .http
            .post(self.method_url("sendMessage"))
            .form(&[
                ("chat_id", chat_id),
                ("text", text),
                ("parse_mode", "Markdown"),
            ])
            .send()
            .await
            .context("sendMessage request failed")?;
        let _: serde_json::Value = read_result(resp, "sendMessage").await?;
        Ok(())
    }

    /// Long-poll for updates with id >= `offset`, waiting up to `timeout` server-side.
    pub async fn get_updates(&self, offset: i64, timeout: Duration) -> Result<Vec<Update>> {
        let resp = self
            .http
            .get(self.method_url("getUpdates"))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", timeout.as_secs().to_string()),
            ])
            .timeout(timeout + LONG_POLL_SLACK)
            .send()
            .await
            .context("getUpdates request failed")?;
        read_result(resp, "getUpdates").await
    }
}

async fn read_result<T: DeserializeOwned>(resp: reqwest::Response, method: &str) -> Result<T> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .with_context(|| format!("{method}: failed to read body"))?;
    let parsed: ApiResponse<T> = serde_json::from_str(&body)
        .with_context(|| format!("{method}: unexpected response ({status})"))?;
    if !parsed.ok {
        bail!(
            "{method} rejected ({status}): {}",
            parsed.description.unwrap_or_else(|| "no description".into())
        );
    }
    parsed
        .result
        .with_context(|| format!("{method}: response missing result"))
}

impl Notifier for TelegramClient {
    fn send(&self, destination: &str, text: &str) -> impl Future<Output = Result<()>> + Send {
        self.send_message(destination, text)
    }
}
