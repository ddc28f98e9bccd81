use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::alerts::escape_markdown;
use crate::state::SharedState;
use crate::telegram::{Chat, TelegramClient, Update};

/// Server-side long-poll window for `getUpdates`.
pub const LONG_POLL_TIMEOUT: Duration = Duration::from_secs(30);

/// Pause after a failed poll before trying again.
pub const RETRY_BACKOFF: Duration = Duration::from_secs(5);

const HELP_TEXT: &str = "🔍 *Pump.fun Hackathon Scanner*\n\n\
*Commands:*\n\
/chatid - Get this chat's ID\n\
/setalert - Set alerts to this chat\n\
/status - Scanner status\n\
/help - Show this message\n\n\
When a hackathon winner is detected, you'll get an instant alert! 🚨";

/// Operator commands understood by the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ChatId,
    SetAlert,
    Status,
    Help,
}

impl Command {
    /// Parse the leading `/command` of a message. Handles `/cmd@botname` and trailing
    /// arguments; anything else is `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let token = text.split_whitespace().next()?;
        let name = token.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name);
        match name.to_ascii_lowercase().as_str() {
            "chatid" => Some(Command::ChatId),
            "setalert" => Some(Command::SetAlert),
            "status" => Some(Command::Status),
            "help" | "start" => Some(Command::Help),
            _ => None,
        }
    }
}

/// Apply `command` from `chat` and build the reply for that chat.
///
/// `/setalert` is the only command with an effect: it points alerts at `chat`.
pub async fn respond(command: Command, chat: &Chat, state: &SharedState) -> String {
    match command {
        Command::ChatId => {
            if chat.is_private() {
                format!(
                    "🆔 Your Chat ID: `{}`\n\nUse this ID for private alerts.",
                    chat.id
                )
            } else {
                format!(
                    "🆔 Group Chat ID: `{}`\n📛 Group: {}\n\nUse this ID for group alerts.",
                    chat.id,
                    escape_markdown(chat.title.as_deref().unwrap_or(""))
                )
            }
        }
        Command::SetAlert => {
            let destination = chat.id.to_string();
            let previous = state.set_alert_destination(destination.clone()).await;
            info!("Alert destination changed: {previous:?} -> {destination:?}");
            format!(
                "✅ Alerts will now be sent to this chat!\n🆔 Chat ID: `{}`",
                chat.id
            )
        }
        Command::Status => format!(
            "📊 *Scanner Status*\n\n\
             🔄 Scans completed: {}\n\
             🏆 Known hackathon coins: {}\n\
             🌐 Proxies loaded: {}\n\
             📍 Alert destination: `{}`",
            state.counters.cycles(),
            state.known.len().await,
            state.proxy_count(),
            state.alert_destination().await,
        ),
        Command::Help => HELP_TEXT.to_string(),
    }
}

/// Long-polls the bot for operator commands. Runs until the process exits.
pub struct CommandListener {
    client: TelegramClient,
    state: Arc<SharedState>,
    /// Next update id to request; everything below it is acknowledged.
    offset: i64,
    poll_timeout: Duration,
    backoff: Duration,
}

impl CommandListener {
    pub fn new(client: TelegramClient, state: Arc<SharedState>) -> Self {
        Self {
            client,
            state,
            offset: 0,
            poll_timeout: LONG_POLL_TIMEOUT,
            backoff: RETRY_BACKOFF,
        }
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub async fn run(mut self) {
        info!("Command listener started");
        loop {
            if let Err(e) = self.poll_once().await {
                warn!("Command poll failed: {e:#}");
                tokio::time::sleep(self.backoff).await;
            }
        }
    }

    /// One long-poll round. Returns how many updates were consumed.
    pub async fn poll_once(&mut self) -> Result<usize> {
        let updates = self.client.get_updates(self.offset, self.poll_timeout).await?;
        let count = updates.len();
        for update in updates {
            self.offset = self.offset.max(update.update_id + 1);
            self.handle(update).await;
        }
        Ok(count)
    }

    async fn handle(&self, update: Update) {
        let Some(message) = update.message else {
            return;
        };
        let Some(command) = message.text.as_deref().and_then(Command::parse) else {
            return;
        };
        debug!(
            "Command {command:?} from @{} in chat {}",
            message.sender_name(),
            message.chat.id
        );

        let reply = respond(command, &message.chat, &self.state).await;
        if let Err(e) = self
            .client
            .send_message(&message.chat.id.to_string(), &reply)
            .await
        {
            warn!("Failed to reply to chat {}: {e:#}", message.chat.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Item;

    fn chat(id: i64, kind: &str, title: Option<&str>) -> Chat {
        Chat {
            id,
            kind: kind.to_string(),
            title: title.map(str::to_string),
        }
    }

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("/chatid"), Some(Command::ChatId));
        assert_eq!(Command::parse("  /setalert now"), Some(Command::SetAlert));
        assert_eq!(Command::parse("/status@hack_scanner_bot"), Some(Command::Status));
        assert_eq!(Command::parse("/START"), Some(Command::Help));
        assert_eq!(Command::parse("/help"), Some(Command::Help));
    }

    #[test]
    fn ignores_other_text() {
        assert_eq!(Command::parse("hello"), None);
        assert_eq!(Command::parse(""), None);
        assert_eq!(Command::parse("/unknown"), None);
        assert_eq!(Command::parse("status"), None);
    }

    #[tokio::test]
    async fn chatid_private_and_group() {
        let state = SharedState::new("1", 0);
        let private = respond(Command::ChatId, &chat(55, "private", None), &state).await;
        assert!(private.contains("Your Chat ID: `55`"));

        let group = respond(
            Command::ChatId,
            &chat(-100, "group", Some("the_group")),
            &state,
        )
        .await;
        assert!(group.contains("Group Chat ID: `-100`"));
        assert!(group.contains("Group: the\\_group"));
    }

    #[tokio::test]
    async fn setalert_redirects() {
        let state = SharedState::new("1", 0);
        let reply = respond(Command::SetAlert, &chat(-42, "group", None), &state).await;
        assert!(reply.contains("`-42`"));
        assert_eq!(state.alert_destination().await, "-42");
    }

    #[tokio::test]
    async fn status_reports_counters() {
        let state = SharedState::new("999", 4);
        state.counters.begin_cycle();
        state.counters.begin_cycle();
        let item = Item {
            mint: "m".into(),
            name: String::new(),
            symbol: String::new(),
            flagged: true,
            market_cap_usd: 0.0,
            twitter: None,
            website: None,
        };
        state.known.diff_and_record(&[item], true).await;

        let reply = respond(Command::Status, &chat(1, "private", None), &state).await;
        assert!(reply.contains("Scans completed: 2"));
        assert!(reply.contains("Known hackathon coins: 1"));
        assert!(reply.contains("Proxies loaded: 4"));
        assert!(reply.contains("Alert destination: `999`"));
    }

    #[tokio::test]
    async fn help_lists_commands() {
        let state = SharedState::new("1", 0);
        let reply = respond(Command::Help, &chat(1, "private", None), &state).await;
        for cmd in ["/chatid", "/setalert", "/status", "/help"] {
            assert!(reply.contains(cmd));
        }
    }
}
