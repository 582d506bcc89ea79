//! Ingestion router.
//!
//! Classifies raw updates into [`InboundEvent`]s, then drives one event
//! through the machine and the dispatcher. Events for the same user pass
//! through a per-user lane in the order they were queued; different users
//! never wait on each other.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::core::{Applicant, ChatId, UserId};
use crate::dispatch::{Delivery, DispatchReport, Dispatcher};
use crate::event::{
    BotCommand, CommandMessage, ContactShare, InboundEvent, JoinRequest, OtherMessage, TextMessage,
};
use crate::machine::{Decision, JoinCommand, VerificationMachine};
use crate::outcome::VerificationOutcome;
use crate::update::{ChatKind, Update};

/// An update the gate has no use for.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("update {update_id} ({kind}) dropped: {reason}")]
pub struct Unroutable {
    pub update_id: i64,
    pub kind: String,
    pub reason: &'static str,
}

impl Unroutable {
    fn new(update: &Update, reason: &'static str) -> Self {
        Self {
            update_id: update.update_id,
            kind: update.kind().to_string(),
            reason,
        }
    }
}

/// Turn a raw update into an event, or say why it cannot be routed.
///
/// Contacts, commands and text are only accepted in private chats.
pub fn classify(mut update: Update) -> Result<InboundEvent, Unroutable> {
    if let Some(request) = update.chat_join_request.take() {
        let applicant = Applicant::from(request.from);
        let group_title = request
            .chat
            .title
            .unwrap_or_else(|| request.chat.id.to_string());
        return Ok(InboundEvent::JoinRequest(JoinRequest {
            private_chat: request
                .user_chat_id
                .unwrap_or_else(|| ChatId::from(applicant.id)),
            applicant,
            group_id: request.chat.id,
            group_title,
        }));
    }

    let Some(message) = &update.message else {
        return Err(Unroutable::new(&update, "unsupported update kind"));
    };
    if message.chat.kind != ChatKind::Private {
        return Err(Unroutable::new(&update, "message outside a private chat"));
    }
    let Some(from) = &message.from else {
        return Err(Unroutable::new(&update, "message without a sender"));
    };

    let sender = Applicant::from(from.clone());
    let chat_id = message.chat.id;

    if let Some(contact) = &message.contact {
        return Ok(InboundEvent::ContactShared(ContactShare {
            sender,
            chat_id,
            phone_number: contact.phone_number.clone(),
            subject: contact.user_id,
        }));
    }

    match message.text.as_deref() {
        Some(text) if text.starts_with('/') => {
            let word = text.split_whitespace().next().unwrap_or(text);
            Ok(InboundEvent::Command(CommandMessage {
                sender,
                chat_id,
                command: BotCommand::parse(word),
            }))
        }
        Some(text) => Ok(InboundEvent::PlainText(TextMessage {
            sender,
            chat_id,
            text: text.to_string(),
        })),
        None => Ok(InboundEvent::Other(OtherMessage { sender, chat_id })),
    }
}

/// The outcome of one event and what became of its outbound calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routed {
    pub outcome: VerificationOutcome,
    pub report: DispatchReport,
}

/// An event that has taken its place in its user's lane but not run yet.
pub struct Queued {
    job: Job,
    ticket: LaneTicket,
}

enum Job {
    Event(InboundEvent),
    Decline(UserId),
}

pub struct Router {
    machine: VerificationMachine,
    dispatcher: Dispatcher,
    lanes: UserLanes,
}

impl Router {
    pub fn new(machine: VerificationMachine, dispatcher: Dispatcher) -> Self {
        Self {
            machine,
            dispatcher,
            lanes: UserLanes::default(),
        }
    }

    /// Classify a raw update and queue it. Unroutable updates are logged and
    /// dropped.
    pub fn admit(&self, update: Update) -> Option<Queued> {
        match classify(update) {
            Ok(event) => Some(self.enqueue(event)),
            Err(dropped) => {
                warn!(
                    update_id = dropped.update_id,
                    kind = %dropped.kind,
                    reason = dropped.reason,
                    "Dropping unroutable update"
                );
                None
            }
        }
    }

    /// Take the event's place in its user's lane. Queued events of one user
    /// run one at a time, in the order they were queued.
    pub fn enqueue(&self, event: InboundEvent) -> Queued {
        Queued {
            ticket: self.lanes.claim(event.user_id()),
            job: Job::Event(event),
        }
    }

    /// Queue the withdrawal of a user's pending request on an operator's
    /// behalf. The user is told in their private chat.
    pub fn enqueue_decline(&self, user_id: UserId) -> Queued {
        Queued {
            ticket: self.lanes.claim(user_id),
            job: Job::Decline(user_id),
        }
    }

    /// Wait for the lane, then drive the queued work through machine and
    /// dispatcher.
    pub async fn run(&self, queued: Queued) -> Routed {
        let Queued { job, ticket } = queued;
        let _lane = self.lanes.enter(ticket).await;

        let decision = match &job {
            Job::Event(event) => {
                debug!(user_id = %event.user_id(), kind = event.kind(), "Routing event");
                self.decide(event)
            }
            Job::Decline(user_id) => self.machine.decline(*user_id, ChatId::from(*user_id)),
        };

        self.settle(decision).await
    }

    fn decide(&self, event: &InboundEvent) -> Decision {
        match event {
            InboundEvent::JoinRequest(request) => {
                Decision::Outcome(self.machine.on_join_request(request))
            }
            InboundEvent::ContactShared(share) => self.machine.on_contact_shared(share),
            InboundEvent::Command(command) => self.machine.on_command(command),
            InboundEvent::PlainText(TextMessage {
                sender, chat_id, ..
            })
            | InboundEvent::Other(OtherMessage { sender, chat_id }) => {
                Decision::Outcome(self.machine.on_message(sender, *chat_id))
            }
        }
    }

    async fn settle(&self, decision: Decision) -> Routed {
        let (outcome, executed) = match decision {
            Decision::Outcome(outcome) => (outcome, None),
            Decision::Execute(command) => {
                let delivery = match command {
                    JoinCommand::Approve { .. } => Delivery::Approve,
                    JoinCommand::Decline { .. } => Delivery::Decline,
                };
                let result = self.dispatcher.execute(&command).await;
                let executed = (delivery, result.clone());
                (self.machine.resolve(command, result), Some(executed))
            }
        };

        let mut report = self.dispatcher.dispatch(&outcome).await;
        if let Some((delivery, result)) = executed {
            report.record(delivery, result);
        }

        if let VerificationOutcome::Prompted {
            user_id,
            request_id,
            ..
        } = &outcome
        {
            if report.prompt_failed() {
                self.machine.on_prompt_failed(*user_id, *request_id);
            }
        }

        Routed { outcome, report }
    }
}

/// Per-user FIFO lanes. Each entrant swaps itself in as the lane's tail and
/// waits for the previous tail to finish. A lane exists only while it has
/// entrants.
#[derive(Default)]
struct UserLanes {
    tails: DashMap<UserId, Tail>,
    next_ticket: AtomicU64,
}

struct Tail {
    ticket: u64,
    /// Resolves once the tail's holder is done.
    done: oneshot::Receiver<()>,
}

struct LaneTicket {
    user_id: UserId,
    ticket: u64,
    previous: Option<oneshot::Receiver<()>>,
    done: oneshot::Sender<()>,
}

impl UserLanes {
    fn claim(&self, user_id: UserId) -> LaneTicket {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let (done, done_rx) = oneshot::channel();
        let previous = self.tails.insert(
            user_id,
            Tail {
                ticket,
                done: done_rx,
            },
        );
        LaneTicket {
            user_id,
            ticket,
            previous: previous.map(|tail| tail.done),
            done,
        }
    }

    async fn enter(&self, ticket: LaneTicket) -> LaneGuard<'_> {
        if let Some(previous) = ticket.previous {
            // A dropped sender (panicked or abandoned predecessor) also frees the lane.
            let _ = previous.await;
        }
        LaneGuard {
            lanes: self,
            user_id: ticket.user_id,
            ticket: ticket.ticket,
            done: Some(ticket.done),
        }
    }
}

struct LaneGuard<'a> {
    lanes: &'a UserLanes,
    user_id: UserId,
    ticket: u64,
    done: Option<oneshot::Sender<()>>,
}

impl Drop for LaneGuard<'_> {
    fn drop(&mut self) {
        if let Some(done) = self.done.take() {
            let _ = done.send(());
        }
        // Still the tail: nobody queued behind us.
        let ticket = self.ticket;
        self.lanes
            .tails
            .remove_if(&self.user_id, |_, tail| tail.ticket == ticket);
    }
}
