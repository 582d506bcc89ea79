//! Command line and environment configuration.

use std::time::Duration;

use clap::builder::BoolishValueParser;
use clap::Parser;
use joingate::ChatId;
use tracing::warn;

/// Group join gate: approves join requests once the user shares their own
/// phone number.
#[derive(Parser)]
#[command(name = "joingate", version, about)]
pub struct Cli {
    /// Bot API token.
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub bot_token: String,

    /// Chat that receives an audit message per verified user. Optional.
    #[arg(long, env = "ADMIN_CHAT_ID")]
    pub admin_chat_id: Option<String>,

    /// Public hostname on Render. When set, the webhook URL is derived from
    /// it and registered on startup.
    #[arg(long, env = "RENDER_EXTERNAL_HOSTNAME")]
    pub external_hostname: Option<String>,

    /// Externally reachable webhook URL, used when no hostname is given.
    #[arg(long, env = "WEBHOOK_URL", default_value = "http://127.0.0.1:5000/webhook")]
    pub webhook_url: String,

    /// Register the webhook URL on startup even without a hostname. Accepts
    /// `1`, `yes`, `on` and friends.
    #[arg(long, env = "REGISTER_WEBHOOK", value_parser = BoolishValueParser::new())]
    pub register_webhook: bool,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Upper bound for each outbound call, in seconds.
    #[arg(long, env = "SEND_TIMEOUT_SECS", default_value_t = 10)]
    pub send_timeout_secs: u64,

    /// Bot API base URL.
    #[arg(long, env = "TELEGRAM_API_URL", default_value = "https://api.telegram.org")]
    pub api_url: String,
}

pub struct Settings {
    pub bot_token: String,
    pub admin_chat: Option<ChatId>,
    pub webhook_url: String,
    pub register_webhook: bool,
    pub port: u16,
    pub send_timeout: Duration,
    pub api_url: String,
}

impl Cli {
    pub fn into_settings(self) -> Settings {
        let (webhook_url, register_webhook) = match self.external_hostname.as_deref() {
            Some(host) if !host.is_empty() => (format!("https://{host}/webhook"), true),
            _ => {
                warn!(
                    webhook_url = %self.webhook_url,
                    "RENDER_EXTERNAL_HOSTNAME not set, using WEBHOOK_URL"
                );
                (self.webhook_url, self.register_webhook)
            }
        };

        Settings {
            admin_chat: parse_admin_chat(self.admin_chat_id.as_deref()),
            bot_token: self.bot_token,
            webhook_url,
            register_webhook,
            port: self.port,
            send_timeout: Duration::from_secs(self.send_timeout_secs.max(1)),
            api_url: self.api_url.trim_end_matches('/').to_string(),
        }
    }
}

/// An absent or unusable admin chat disables audit messages; it never stops
/// the server.
fn parse_admin_chat(raw: Option<&str>) -> Option<ChatId> {
    match raw.map(str::trim) {
        None | Some("") => {
            warn!("ADMIN_CHAT_ID not set, admin notifications will be skipped");
            None
        }
        Some(value) => match value.parse::<i64>() {
            Ok(id) => Some(ChatId(id)),
            Err(_) => {
                warn!(
                    admin_chat_id = value,
                    "ADMIN_CHAT_ID is not a valid integer, admin notifications will be skipped"
                );
                None
            }
        },
    }
}
