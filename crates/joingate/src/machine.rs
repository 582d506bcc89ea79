//! Verification state machine.
//!
//! Per user the state is implied by the store: no record means `NoRequest`,
//! a record means `AwaitingContact`. Terminal outcomes (approved, declined,
//! prompt failed) consume the record, returning the user to `NoRequest`.
//!
//! The machine does no IO. Where a transition depends on the platform
//! (approving or declining the original request) it consumes the record and
//! hands back a [`JoinCommand`]; the caller executes it and feeds the result
//! into [`VerificationMachine::resolve`].

use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::core::{Applicant, ChatId, PendingVerification, RequestHandle, UserId};
use crate::error::{ConfigurationMissing, DeliveryFailure, IdentityMismatch};
use crate::event::{BotCommand, CommandMessage, ContactShare, JoinRequest};
use crate::outcome::{AuditNotice, VerificationOutcome};
use crate::store::PendingStore;

/// Result of feeding one event to the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The transition is complete.
    Outcome(VerificationOutcome),
    /// The record has been consumed; the command must run before the outcome
    /// is known.
    Execute(JoinCommand),
}

/// Intent to act on an original join request.
///
/// Carries the consumed record, so executing it needs nothing from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinCommand {
    Approve {
        record: PendingVerification,
        chat_id: ChatId,
        sender: Applicant,
        phone_number: String,
    },
    Decline {
        record: PendingVerification,
        chat_id: ChatId,
    },
}

impl JoinCommand {
    pub fn handle(&self) -> &RequestHandle {
        match self {
            JoinCommand::Approve { record, .. } | JoinCommand::Decline { record, .. } => {
                &record.request_handle
            }
        }
    }
}

pub struct VerificationMachine {
    store: Arc<PendingStore>,
    admin_chat: Option<ChatId>,
}

impl VerificationMachine {
    pub fn new(store: Arc<PendingStore>, admin_chat: Option<ChatId>) -> Self {
        Self { store, admin_chat }
    }

    pub fn store(&self) -> &Arc<PendingStore> {
        &self.store
    }

    /// Open (or replace) the user's verification and ask for the prompt.
    pub fn on_join_request(&self, request: &JoinRequest) -> VerificationOutcome {
        let user_id = request.applicant.id;
        let record = PendingVerification::new(
            request.applicant.clone(),
            request.group_id,
            request.group_title.clone(),
        );
        let request_id = record.request_id;

        info!(
            user_id = %user_id,
            group_id = %request.group_id,
            group_title = %request.group_title,
            name = %request.applicant.full_name(),
            "Received join request, storing for verification"
        );

        if let Some(previous) = self.store.put(user_id, record) {
            info!(
                user_id = %user_id,
                previous_group_id = %previous.group_id,
                previous_request_id = %previous.request_id,
                "Replaced an earlier pending verification"
            );
        }

        VerificationOutcome::Prompted {
            chat_id: request.private_chat,
            user_id,
            request_id,
            group_title: request.group_title.clone(),
        }
    }

    /// Correlate a shared contact with the sender's pending request.
    pub fn on_contact_shared(&self, share: &ContactShare) -> Decision {
        let user_id = share.sender.id;

        if let Err(mismatch) = verify_identity(share) {
            warn!(
                user_id = %user_id,
                error = %mismatch,
                "Rejected shared contact that is not the sender's own"
            );
            return Decision::Outcome(VerificationOutcome::InvalidContact {
                chat_id: share.chat_id,
                user_id,
            });
        }

        info!(
            user_id = %user_id,
            name = %share.sender.full_name(),
            username = share.sender.username.as_deref().unwrap_or("N/A"),
            "User shared their own phone number"
        );

        match self.store.take(user_id) {
            Some(record) => Decision::Execute(JoinCommand::Approve {
                record,
                chat_id: share.chat_id,
                sender: share.sender.clone(),
                phone_number: share.phone_number.clone(),
            }),
            None => {
                warn!(user_id = %user_id, "Contact shared but no pending join request found");
                Decision::Outcome(VerificationOutcome::NoPendingRequest {
                    chat_id: share.chat_id,
                    user_id,
                })
            }
        }
    }

    pub fn on_command(&self, command: &CommandMessage) -> Decision {
        let sender = &command.sender;
        match command.command {
            BotCommand::Start if !self.store.contains(sender.id) => {
                info!(user_id = %sender.id, "User started the bot");
                Decision::Outcome(VerificationOutcome::Welcome {
                    chat_id: command.chat_id,
                    user: sender.clone(),
                })
            }
            BotCommand::Cancel => self.decline(sender.id, command.chat_id),
            BotCommand::Start | BotCommand::Unknown => {
                Decision::Outcome(self.on_message(sender, command.chat_id))
            }
        }
    }

    /// Text or any other message: no transition, only a nudge.
    pub fn on_message(&self, sender: &Applicant, chat_id: ChatId) -> VerificationOutcome {
        match self.store.peek(sender.id) {
            Some(record) => VerificationOutcome::Reminder {
                chat_id,
                user_id: sender.id,
                group_title: record.group_title,
            },
            None => VerificationOutcome::Help {
                chat_id,
                user_id: sender.id,
            },
        }
    }

    /// Withdraw the user's pending request, if any.
    pub fn decline(&self, user_id: UserId, chat_id: ChatId) -> Decision {
        match self.store.take(user_id) {
            Some(record) => {
                info!(
                    user_id = %user_id,
                    group_id = %record.group_id,
                    "Withdrawing pending join request"
                );
                Decision::Execute(JoinCommand::Decline { record, chat_id })
            }
            None => Decision::Outcome(VerificationOutcome::Help { chat_id, user_id }),
        }
    }

    /// The prompt for `request_id` could not be delivered: discard its record
    /// so a retried join request starts clean.
    ///
    /// Returns whether a record was discarded. A record that has since been
    /// replaced by a newer join request is left alone.
    pub fn on_prompt_failed(&self, user_id: UserId, request_id: Uuid) -> bool {
        let discarded = self.store.take_if_request(user_id, request_id).is_some();
        if discarded {
            info!(
                user_id = %user_id,
                request_id = %request_id,
                "Discarded pending verification after prompt delivery failed"
            );
        }
        discarded
    }

    /// Turn the result of an executed command into the final outcome.
    ///
    /// The record stays consumed whatever the result: a failed approval is
    /// not retried and the user has to send a new join request.
    pub fn resolve(
        &self,
        command: JoinCommand,
        result: Result<(), DeliveryFailure>,
    ) -> VerificationOutcome {
        match (command, result) {
            (
                JoinCommand::Approve {
                    record,
                    chat_id,
                    sender,
                    phone_number,
                },
                Ok(()),
            ) => {
                info!(
                    user_id = %record.user_id,
                    group_id = %record.group_id,
                    group_title = %record.group_title,
                    "Approved join request after phone verification"
                );
                let audit = self
                    .admin_chat
                    .ok_or(ConfigurationMissing("admin chat"))
                    .map(|admin_chat| AuditNotice {
                        admin_chat,
                        group_title: record.group_title.clone(),
                        user: sender,
                        phone_number,
                    });
                VerificationOutcome::Approved {
                    chat_id,
                    user_id: record.user_id,
                    group_title: record.group_title,
                    audit,
                }
            }
            (JoinCommand::Approve { record, chat_id, .. }, Err(failure)) => {
                error!(
                    user_id = %record.user_id,
                    group_id = %record.group_id,
                    group_title = %record.group_title,
                    error = %failure,
                    "Failed to approve join request after verification"
                );
                VerificationOutcome::ApprovalFailed {
                    chat_id,
                    user_id: record.user_id,
                    group_title: record.group_title,
                    failure,
                }
            }
            (JoinCommand::Decline { record, chat_id }, Ok(())) => {
                info!(user_id = %record.user_id, group_id = %record.group_id, "Declined join request");
                VerificationOutcome::Declined {
                    chat_id,
                    user_id: record.user_id,
                    group_title: record.group_title,
                }
            }
            (JoinCommand::Decline { record, chat_id }, Err(failure)) => {
                warn!(
                    user_id = %record.user_id,
                    group_id = %record.group_id,
                    error = %failure,
                    "Failed to decline join request"
                );
                VerificationOutcome::DeclineFailed {
                    chat_id,
                    user_id: record.user_id,
                    group_title: record.group_title,
                    failure,
                }
            }
        }
    }
}

/// A contact proves nothing unless it is the sender's own.
fn verify_identity(share: &ContactShare) -> Result<(), IdentityMismatch> {
    if share.subject == Some(share.sender.id) {
        Ok(())
    } else {
        Err(IdentityMismatch {
            sender: share.sender.id,
            subject: share.subject,
        })
    }
}
