//! Domain identifiers and the pending verification record.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a user on the messaging platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a chat (private chat, group or channel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user's private chat shares the user's identifier.
impl From<UserId> for ChatId {
    fn from(user: UserId) -> Self {
        ChatId(user.0)
    }
}

/// Everything needed to approve or decline a join request later on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestHandle {
    pub chat_id: ChatId,
    pub user_id: UserId,
}

/// Identity fields of the person behind an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Applicant {
    pub id: UserId,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

impl Applicant {
    pub fn new(id: UserId, first_name: impl Into<String>) -> Self {
        Self {
            id,
            first_name: first_name.into(),
            last_name: None,
            username: None,
        }
    }

    pub fn with_last_name(mut self, last_name: impl Into<String>) -> Self {
        self.last_name = Some(last_name.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// First and last name joined by a space, the way clients display it.
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }
}

/// An unresolved join request awaiting proof of contact.
///
/// Records are never mutated in place: they are created on a join request and
/// consumed (removed from the store) on a terminal outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingVerification {
    /// Fresh per join request. Compensating removals match on it so they never
    /// discard a newer record that overwrote the one they were issued for.
    pub request_id: Uuid,
    pub user_id: UserId,
    pub group_id: ChatId,
    pub group_title: String,
    pub created_at: DateTime<Utc>,
    pub request_handle: RequestHandle,
    pub applicant: Applicant,
}

impl PendingVerification {
    pub fn new(applicant: Applicant, group_id: ChatId, group_title: impl Into<String>) -> Self {
        let user_id = applicant.id;
        Self {
            request_id: Uuid::new_v4(),
            user_id,
            group_id,
            group_title: group_title.into(),
            created_at: Utc::now(),
            request_handle: RequestHandle {
                chat_id: group_id,
                user_id,
            },
            applicant,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_skips_missing_or_empty_last_name() {
        let ada = Applicant::new(UserId(1), "Ada");
        assert_eq!(ada.full_name(), "Ada");
        assert_eq!(ada.clone().with_last_name("").full_name(), "Ada");
        assert_eq!(ada.with_last_name("Lovelace").full_name(), "Ada Lovelace");
    }

    #[test]
    fn new_record_points_its_handle_at_the_group() {
        let record = PendingVerification::new(Applicant::new(UserId(42), "Ada"), ChatId(-100), "Acme");
        assert_eq!(record.user_id, UserId(42));
        assert_eq!(
            record.request_handle,
            RequestHandle {
                chat_id: ChatId(-100),
                user_id: UserId(42)
            }
        );
    }

    #[test]
    fn every_record_gets_its_own_request_id() {
        let a = PendingVerification::new(Applicant::new(UserId(42), "Ada"), ChatId(-100), "Acme");
        let b = PendingVerification::new(Applicant::new(UserId(42), "Ada"), ChatId(-100), "Acme");
        assert_ne!(a.request_id, b.request_id);
    }
}
