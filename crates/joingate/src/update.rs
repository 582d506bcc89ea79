//! Wire shapes of the Bot API update feed.
//!
//! Only the fields the gate reads are modelled; everything else in a payload
//! is ignored, except that the names of unmodelled top-level fields are kept
//! so dropped updates can be logged by kind.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::{Applicant, ChatId, UserId};

/// One inbound notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_join_request: Option<ChatJoinRequest>,
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_json::Value>,
}

impl Update {
    /// Name of the first payload field, used to describe updates that are not
    /// routed anywhere.
    pub fn kind(&self) -> &str {
        if self.message.is_some() {
            "message"
        } else if self.chat_join_request.is_some() {
            "chat_join_request"
        } else {
            self.other.keys().next().map(String::as_str).unwrap_or("empty")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl From<User> for Applicant {
    fn from(user: User) -> Self {
        Applicant {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            username: user.username,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    #[serde(rename = "type")]
    pub kind: ChatKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub date: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
}

/// A phone contact attached to a message.
///
/// `user_id` is only present when the contact is a platform user; a contact
/// card typed in by hand has none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub phone_number: String,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatJoinRequest {
    pub chat: Chat,
    pub from: User,
    /// Private chat with the applicant that the bot may write to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_chat_id: Option<ChatId>,
    #[serde(default)]
    pub date: i64,
}
