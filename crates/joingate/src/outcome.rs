//! What the verification machine concluded for one event.

use uuid::Uuid;

use crate::core::{Applicant, ChatId, UserId};
use crate::error::{ConfigurationMissing, DeliveryFailure};

/// Payload for the admin audit channel after a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditNotice {
    pub admin_chat: ChatId,
    pub group_title: String,
    pub user: Applicant,
    pub phone_number: String,
}

/// Ephemeral result of one transition. Never stored; the dispatcher turns it
/// into outbound messages straight away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// A record was created (or replaced); the prompt must go out.
    Prompted {
        chat_id: ChatId,
        user_id: UserId,
        request_id: Uuid,
        group_title: String,
    },
    /// The join request was approved and its record consumed.
    Approved {
        chat_id: ChatId,
        user_id: UserId,
        group_title: String,
        audit: Result<AuditNotice, ConfigurationMissing>,
    },
    /// The record was consumed but approving failed. The user has to send a
    /// fresh join request.
    ApprovalFailed {
        chat_id: ChatId,
        user_id: UserId,
        group_title: String,
        failure: DeliveryFailure,
    },
    /// A contact arrived for a user with nothing pending.
    NoPendingRequest { chat_id: ChatId, user_id: UserId },
    /// The contact does not belong to its sender. Nothing changed.
    InvalidContact { chat_id: ChatId, user_id: UserId },
    /// Something other than a contact arrived while a request is pending.
    Reminder {
        chat_id: ChatId,
        user_id: UserId,
        group_title: String,
    },
    /// Something other than a contact arrived and nothing is pending.
    Help { chat_id: ChatId, user_id: UserId },
    /// `/start` with nothing pending.
    Welcome { chat_id: ChatId, user: Applicant },
    /// The pending request was withdrawn and declined.
    Declined {
        chat_id: ChatId,
        user_id: UserId,
        group_title: String,
    },
    /// The pending request was withdrawn but declining it failed.
    DeclineFailed {
        chat_id: ChatId,
        user_id: UserId,
        group_title: String,
        failure: DeliveryFailure,
    },
}

impl VerificationOutcome {
    pub fn user_id(&self) -> UserId {
        match self {
            VerificationOutcome::Prompted { user_id, .. }
            | VerificationOutcome::Approved { user_id, .. }
            | VerificationOutcome::ApprovalFailed { user_id, .. }
            | VerificationOutcome::NoPendingRequest { user_id, .. }
            | VerificationOutcome::InvalidContact { user_id, .. }
            | VerificationOutcome::Reminder { user_id, .. }
            | VerificationOutcome::Help { user_id, .. }
            | VerificationOutcome::Declined { user_id, .. }
            | VerificationOutcome::DeclineFailed { user_id, .. } => *user_id,
            VerificationOutcome::Welcome { user, .. } => user.id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            VerificationOutcome::Prompted { .. } => "prompted",
            VerificationOutcome::Approved { .. } => "approved",
            VerificationOutcome::ApprovalFailed { .. } => "approval_failed",
            VerificationOutcome::NoPendingRequest { .. } => "no_pending_request",
            VerificationOutcome::InvalidContact { .. } => "invalid_contact",
            VerificationOutcome::Reminder { .. } => "reminder",
            VerificationOutcome::Help { .. } => "help",
            VerificationOutcome::Welcome { .. } => "welcome",
            VerificationOutcome::Declined { .. } => "declined",
            VerificationOutcome::DeclineFailed { .. } => "decline_failed",
        }
    }
}
