//! Bot API client. Plain reqwest + serde, one POST per method.

use std::time::Duration;

use async_trait::async_trait;
use joingate::{ChatId, DeliveryFailure, Outbound, ParseMode, ReplyMarkup, RequestHandle, SendOptions, UserId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

pub struct BotApi {
    client: reqwest::Client,
    /// `{api_url}/bot{token}`. Never logged.
    endpoint: String,
}

impl BotApi {
    pub fn new(api_url: &str, token: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            endpoint: format!("{api_url}/bot{token}"),
        })
    }

    /// Point the platform at our webhook, asking only for the update kinds
    /// the gate routes.
    pub async fn set_webhook(&self, url: &str) -> Result<(), DeliveryFailure> {
        self.call("setWebhook", &webhook_payload(url)).await
    }

    async fn call<P: Serialize + ?Sized>(&self, method: &str, payload: &P) -> Result<(), DeliveryFailure> {
        let response = self
            .client
            .post(format!("{}/{method}", self.endpoint))
            .json(payload)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let body: ApiResponse = response.json().await.map_err(transport)?;
        if body.ok {
            debug!(method, "Bot API call succeeded");
            Ok(())
        } else {
            Err(DeliveryFailure::rejected(
                body.error_code.or(Some(i64::from(status.as_u16()))),
                body.description.unwrap_or_else(|| status.to_string()),
            ))
        }
    }
}

/// reqwest errors carry the request URL, which contains the token.
fn transport(err: reqwest::Error) -> DeliveryFailure {
    DeliveryFailure::Transport(err.without_url().to_string())
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: ChatId,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<Value>,
}

#[derive(Debug, Serialize)]
struct JoinRequestAction {
    chat_id: ChatId,
    user_id: UserId,
}

impl From<&RequestHandle> for JoinRequestAction {
    fn from(handle: &RequestHandle) -> Self {
        Self {
            chat_id: handle.chat_id,
            user_id: handle.user_id,
        }
    }
}

/// An empty `allowed_updates` means the platform default, which omits some
/// kinds; list ours explicitly.
const ALLOWED_UPDATES: &[&str] = &["message", "chat_join_request"];

fn webhook_payload(url: &str) -> Value {
    json!({ "url": url, "allowed_updates": ALLOWED_UPDATES })
}

fn parse_mode_name(mode: ParseMode) -> &'static str {
    match mode {
        ParseMode::Html => "HTML",
        ParseMode::MarkdownV2 => "MarkdownV2",
    }
}

fn markup_json(markup: &ReplyMarkup) -> Value {
    match markup {
        ReplyMarkup::RequestContact { label } => json!({
            "keyboard": [[{ "text": label, "request_contact": true }]],
            "one_time_keyboard": true,
            "resize_keyboard": true
        }),
        ReplyMarkup::Remove => json!({ "remove_keyboard": true }),
    }
}

#[async_trait]
impl Outbound for BotApi {
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        options: &SendOptions,
    ) -> Result<(), DeliveryFailure> {
        let payload = SendMessage {
            chat_id,
            text,
            parse_mode: options.parse_mode.map(parse_mode_name),
            reply_markup: options.reply_markup.as_ref().map(markup_json),
        };
        self.call("sendMessage", &payload).await
    }

    async fn approve_join_request(&self, handle: &RequestHandle) -> Result<(), DeliveryFailure> {
        self.call("approveChatJoinRequest", &JoinRequestAction::from(handle))
            .await
    }

    async fn decline_join_request(&self, handle: &RequestHandle) -> Result<(), DeliveryFailure> {
        self.call("declineChatJoinRequest", &JoinRequestAction::from(handle))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_keyboard_shape() {
        let value = markup_json(&ReplyMarkup::verify_button());
        assert_eq!(value["keyboard"][0][0]["text"], "I am not a bot");
        assert_eq!(value["keyboard"][0][0]["request_contact"], true);
        assert_eq!(value["one_time_keyboard"], true);
    }

    #[test]
    fn send_message_payload_omits_unset_options() {
        let payload = SendMessage {
            chat_id: ChatId(42),
            text: "hi",
            parse_mode: None,
            reply_markup: None,
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"chat_id": 42, "text": "hi"})
        );
    }

    #[test]
    fn send_message_payload_with_options() {
        let payload = SendMessage {
            chat_id: ChatId(42),
            text: "hi",
            parse_mode: Some(parse_mode_name(ParseMode::MarkdownV2)),
            reply_markup: Some(markup_json(&ReplyMarkup::Remove)),
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["parse_mode"], "MarkdownV2");
        assert_eq!(value["reply_markup"]["remove_keyboard"], true);
    }

    #[test]
    fn join_request_action_payload() {
        let handle = RequestHandle {
            chat_id: ChatId(-1001),
            user_id: UserId(42),
        };
        assert_eq!(
            serde_json::to_value(JoinRequestAction::from(&handle)).unwrap(),
            json!({"chat_id": -1001, "user_id": 42})
        );
    }

    #[test]
    fn webhook_subscribes_to_routed_update_kinds() {
        assert_eq!(
            webhook_payload("https://gate.example/webhook"),
            json!({
                "url": "https://gate.example/webhook",
                "allowed_updates": ["message", "chat_join_request"]
            })
        );
    }

    #[test]
    fn error_responses_parse() {
        let body: ApiResponse = serde_json::from_value(json!({
            "ok": false,
            "error_code": 403,
            "description": "Forbidden: bot was blocked by the user"
        }))
        .unwrap();
        assert!(!body.ok);
        assert_eq!(body.error_code, Some(403));
    }
}
