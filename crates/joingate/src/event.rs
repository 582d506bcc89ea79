//! Inbound events after classification.
//!
//! The router turns raw updates into this closed set and matches on it
//! exhaustively; nothing downstream inspects update shapes.

use crate::core::{Applicant, ChatId, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// A user asked to join a managed group.
    JoinRequest(JoinRequest),
    /// A user shared a contact in a private chat.
    ContactShared(ContactShare),
    /// A `/command` in a private chat.
    Command(CommandMessage),
    /// Any other text in a private chat.
    PlainText(TextMessage),
    /// A private message that is neither text nor a contact (sticker, photo...).
    Other(OtherMessage),
}

impl InboundEvent {
    /// The user the event is about. Events for the same user are applied in
    /// the order they were emitted.
    pub fn user_id(&self) -> UserId {
        match self {
            InboundEvent::JoinRequest(e) => e.applicant.id,
            InboundEvent::ContactShared(e) => e.sender.id,
            InboundEvent::Command(e) => e.sender.id,
            InboundEvent::PlainText(e) => e.sender.id,
            InboundEvent::Other(e) => e.sender.id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::JoinRequest(_) => "join_request",
            InboundEvent::ContactShared(_) => "contact_shared",
            InboundEvent::Command(_) => "command",
            InboundEvent::PlainText(_) => "plain_text",
            InboundEvent::Other(_) => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    pub applicant: Applicant,
    pub group_id: ChatId,
    pub group_title: String,
    /// Where the verification prompt goes.
    pub private_chat: ChatId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactShare {
    pub sender: Applicant,
    pub chat_id: ChatId,
    pub phone_number: String,
    /// The user the contact card belongs to, if it belongs to one at all.
    pub subject: Option<UserId>,
}

/// Commands the gate understands. Anything else is treated like plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Cancel,
    Unknown,
}

impl BotCommand {
    /// Parses the first word of a message, e.g. `/start` or `/start@gatebot`.
    pub fn parse(word: &str) -> Self {
        let name = word.trim_start_matches('/');
        let name = name.split('@').next().unwrap_or(name);
        match name.to_ascii_lowercase().as_str() {
            "start" => BotCommand::Start,
            "cancel" => BotCommand::Cancel,
            _ => BotCommand::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMessage {
    pub sender: Applicant,
    pub chat_id: ChatId,
    pub command: BotCommand,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMessage {
    pub sender: Applicant,
    pub chat_id: ChatId,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtherMessage {
    pub sender: Applicant,
    pub chat_id: ChatId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_with_and_without_bot_suffix() {
        assert_eq!(BotCommand::parse("/start"), BotCommand::Start);
        assert_eq!(BotCommand::parse("/START@GateBot"), BotCommand::Start);
        assert_eq!(BotCommand::parse("/cancel"), BotCommand::Cancel);
        assert_eq!(BotCommand::parse("/help"), BotCommand::Unknown);
    }
}
