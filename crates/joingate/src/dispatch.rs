//! Notification dispatcher.
//!
//! Maps outcomes to outbound calls and executes the machine's join commands.
//! Every call is bounded by the send timeout; a timeout counts as a delivery
//! failure like any other. The dispatcher never touches the store: failures
//! that need compensation are reported back in the [`DispatchReport`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::core::ChatId;
use crate::effect::{Outbound, ParseMode, ReplyMarkup, SendOptions};
use crate::error::DeliveryFailure;
use crate::format;
use crate::machine::JoinCommand;
use crate::outcome::VerificationOutcome;

/// Default upper bound for a single outbound call.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Prompt,
    Reply,
    Audit,
    Approve,
    Decline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDelivery {
    pub delivery: Delivery,
    pub failure: DeliveryFailure,
}

/// What happened to the outbound calls made for one outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: Vec<Delivery>,
    pub failed: Vec<FailedDelivery>,
}

impl DispatchReport {
    pub(crate) fn record(&mut self, delivery: Delivery, result: Result<(), DeliveryFailure>) {
        match result {
            Ok(()) => self.delivered.push(delivery),
            Err(failure) => self.failed.push(FailedDelivery { delivery, failure }),
        }
    }

    /// The verification prompt did not reach the user.
    pub fn prompt_failed(&self) -> bool {
        self.failed.iter().any(|f| f.delivery == Delivery::Prompt)
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    outbound: Arc<dyn Outbound>,
    send_timeout: Duration,
}

impl Dispatcher {
    pub fn new(outbound: Arc<dyn Outbound>, send_timeout: Duration) -> Self {
        Self {
            outbound,
            send_timeout,
        }
    }

    /// Run a join command against the original request.
    pub async fn execute(&self, command: &JoinCommand) -> Result<(), DeliveryFailure> {
        let handle = command.handle();
        match command {
            JoinCommand::Approve { .. } => {
                self.bounded(self.outbound.approve_join_request(handle)).await
            }
            JoinCommand::Decline { .. } => {
                self.bounded(self.outbound.decline_join_request(handle)).await
            }
        }
    }

    /// Send everything an outcome calls for.
    pub async fn dispatch(&self, outcome: &VerificationOutcome) -> DispatchReport {
        let mut report = DispatchReport::default();
        let user_id = outcome.user_id();

        match outcome {
            VerificationOutcome::Prompted {
                chat_id,
                group_title,
                request_id,
                ..
            } => {
                let options = SendOptions::plain()
                    .with_parse_mode(ParseMode::Html)
                    .with_markup(ReplyMarkup::verify_button());
                let result = self
                    .send(*chat_id, &format::prompt_text(group_title), &options)
                    .await;
                if let Err(failure) = &result {
                    error!(
                        user_id = %user_id,
                        request_id = %request_id,
                        error = %failure,
                        "Failed to send verification prompt"
                    );
                } else {
                    debug!(user_id = %user_id, group_title = %group_title, "Sent verification prompt");
                }
                report.record(Delivery::Prompt, result);
            }
            VerificationOutcome::Approved {
                chat_id,
                group_title,
                audit,
                ..
            } => {
                let reply = self
                    .reply(*chat_id, &format::approved_text(group_title), ReplyMarkup::Remove)
                    .await;
                report.record(Delivery::Reply, reply);

                match audit {
                    Ok(notice) => {
                        let options = SendOptions::plain().with_parse_mode(ParseMode::MarkdownV2);
                        let result = self
                            .send(notice.admin_chat, &format::audit_markdown(notice), &options)
                            .await;
                        match &result {
                            Ok(()) => debug!(
                                user_id = %user_id,
                                admin_chat = %notice.admin_chat,
                                "Sent verification notice to admin chat"
                            ),
                            Err(failure) => error!(
                                user_id = %user_id,
                                admin_chat = %notice.admin_chat,
                                error = %failure,
                                "Failed to send admin notification"
                            ),
                        }
                        report.record(Delivery::Audit, result);
                    }
                    Err(missing) => {
                        warn!(user_id = %user_id, "{missing}, skipping admin notification");
                    }
                }
            }
            VerificationOutcome::ApprovalFailed {
                chat_id,
                group_title,
                ..
            } => {
                let reply = self
                    .reply(
                        *chat_id,
                        &format::approval_failed_text(group_title),
                        ReplyMarkup::Remove,
                    )
                    .await;
                report.record(Delivery::Reply, reply);
            }
            VerificationOutcome::NoPendingRequest { chat_id, .. } => {
                let reply = self
                    .reply(*chat_id, format::no_pending_text(), ReplyMarkup::Remove)
                    .await;
                report.record(Delivery::Reply, reply);
            }
            VerificationOutcome::InvalidContact { chat_id, .. } => {
                let reply = self
                    .reply(
                        *chat_id,
                        &format::invalid_contact_text(),
                        ReplyMarkup::verify_button(),
                    )
                    .await;
                report.record(Delivery::Reply, reply);
            }
            VerificationOutcome::Reminder { chat_id, .. } => {
                let reply = self
                    .reply(*chat_id, &format::reminder_text(), ReplyMarkup::verify_button())
                    .await;
                report.record(Delivery::Reply, reply);
            }
            VerificationOutcome::Help { chat_id, .. } => {
                let reply = self
                    .send(*chat_id, format::help_text(), &SendOptions::plain())
                    .await;
                report.record(Delivery::Reply, reply);
            }
            VerificationOutcome::Welcome { chat_id, user } => {
                let options = SendOptions::plain().with_parse_mode(ParseMode::Html);
                let reply = self
                    .send(*chat_id, &format::welcome_html(user), &options)
                    .await;
                report.record(Delivery::Reply, reply);
            }
            VerificationOutcome::Declined {
                chat_id,
                group_title,
                ..
            } => {
                let reply = self
                    .reply(*chat_id, &format::declined_text(group_title), ReplyMarkup::Remove)
                    .await;
                report.record(Delivery::Reply, reply);
            }
            VerificationOutcome::DeclineFailed {
                chat_id,
                group_title,
                ..
            } => {
                let reply = self
                    .reply(
                        *chat_id,
                        &format::decline_failed_text(group_title),
                        ReplyMarkup::Remove,
                    )
                    .await;
                report.record(Delivery::Reply, reply);
            }
        }

        for failed in report.failed.iter().filter(|f| f.delivery == Delivery::Reply) {
            warn!(
                user_id = %user_id,
                outcome = outcome.kind(),
                error = %failed.failure,
                "Failed to deliver reply"
            );
        }

        report
    }

    async fn reply(
        &self,
        chat_id: ChatId,
        text: &str,
        markup: ReplyMarkup,
    ) -> Result<(), DeliveryFailure> {
        self.send(chat_id, text, &SendOptions::plain().with_markup(markup))
            .await
    }

    async fn send(
        &self,
        chat_id: ChatId,
        text: &str,
        options: &SendOptions,
    ) -> Result<(), DeliveryFailure> {
        self.bounded(self.outbound.send_message(chat_id, text, options))
            .await
    }

    async fn bounded<F>(&self, call: F) -> Result<(), DeliveryFailure>
    where
        F: Future<Output = Result<(), DeliveryFailure>>,
    {
        match tokio::time::timeout(self.send_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(DeliveryFailure::Timeout(self.send_timeout)),
        }
    }
}
