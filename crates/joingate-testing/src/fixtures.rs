//! Update and event builders.

use joingate::update::Update;
use joingate::{Applicant, ChatId, ContactShare, InboundEvent, JoinRequest, TextMessage, UserId};
use serde_json::{json, Value};

pub fn applicant(user_id: i64) -> Applicant {
    Applicant::new(UserId(user_id), format!("User{user_id}"))
}

pub fn join_request(user_id: i64, group_id: i64, group_title: &str) -> InboundEvent {
    InboundEvent::JoinRequest(JoinRequest {
        applicant: applicant(user_id),
        group_id: ChatId(group_id),
        group_title: group_title.to_string(),
        private_chat: ChatId(user_id),
    })
}

pub fn contact_share(user_id: i64, subject: Option<i64>, phone_number: &str) -> InboundEvent {
    InboundEvent::ContactShared(ContactShare {
        sender: applicant(user_id),
        chat_id: ChatId(user_id),
        phone_number: phone_number.to_string(),
        subject: subject.map(UserId),
    })
}

pub fn plain_text(user_id: i64, text: &str) -> InboundEvent {
    InboundEvent::PlainText(TextMessage {
        sender: applicant(user_id),
        chat_id: ChatId(user_id),
        text: text.to_string(),
    })
}

fn parse(value: Value) -> Update {
    serde_json::from_value(value).expect("fixture is a valid update")
}

fn user_json(user_id: i64) -> Value {
    json!({"id": user_id, "is_bot": false, "first_name": format!("User{user_id}")})
}

/// A `chat_join_request` update.
pub fn join_request_update(update_id: i64, user_id: i64, group_id: i64, group_title: &str) -> Update {
    parse(json!({
        "update_id": update_id,
        "chat_join_request": {
            "chat": {"id": group_id, "type": "supergroup", "title": group_title},
            "from": user_json(user_id),
            "user_chat_id": user_id,
            "date": 1_700_000_000
        }
    }))
}

/// A private message carrying a contact card for `subject`.
pub fn contact_update(update_id: i64, user_id: i64, subject: Option<i64>, phone_number: &str) -> Update {
    let mut contact = json!({"phone_number": phone_number, "first_name": format!("User{user_id}")});
    if let Some(subject) = subject {
        contact["user_id"] = json!(subject);
    }
    parse(json!({
        "update_id": update_id,
        "message": {
            "message_id": update_id,
            "from": user_json(user_id),
            "chat": {"id": user_id, "type": "private"},
            "date": 1_700_000_000,
            "contact": contact
        }
    }))
}

/// A private text message (commands included).
pub fn text_update(update_id: i64, user_id: i64, text: &str) -> Update {
    parse(json!({
        "update_id": update_id,
        "message": {
            "message_id": update_id,
            "from": user_json(user_id),
            "chat": {"id": user_id, "type": "private"},
            "date": 1_700_000_000,
            "text": text
        }
    }))
}
