//! Testing utilities for joingate.
//!
//! - [`RecordingOutbound`]: an in-memory [`Outbound`] that records every call
//!   and can be scripted to fail or stall per call kind.
//! - [`fixtures`]: builders for updates and events in the shape the platform
//!   delivers them.

pub mod fixtures;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use joingate::{ChatId, DeliveryFailure, Outbound, RequestHandle, SendOptions};

/// One recorded outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Send {
        chat_id: ChatId,
        text: String,
        options: SendOptions,
    },
    Approve(RequestHandle),
    Decline(RequestHandle),
}

#[derive(Debug, Default)]
struct Script {
    failing_chats: HashSet<ChatId>,
    stalled_chats: HashSet<ChatId>,
    fail_approvals: bool,
    fail_declines: bool,
    latency: Option<Duration>,
}

/// Outbound double. Calls are recorded before the scripted result is applied,
/// so failed attempts show up too.
#[derive(Clone, Default)]
pub struct RecordingOutbound {
    calls: Arc<Mutex<Vec<Call>>>,
    script: Arc<Mutex<Script>>,
}

impl RecordingOutbound {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `send_message` to `chat_id` fails as if the user blocked the bot.
    pub fn fail_sends_to(&self, chat_id: ChatId) -> &Self {
        self.script.lock().unwrap().failing_chats.insert(chat_id);
        self
    }

    /// Every `send_message` to `chat_id` never completes.
    pub fn stall_sends_to(&self, chat_id: ChatId) -> &Self {
        self.script.lock().unwrap().stalled_chats.insert(chat_id);
        self
    }

    pub fn fail_approvals(&self) -> &Self {
        self.script.lock().unwrap().fail_approvals = true;
        self
    }

    pub fn fail_declines(&self) -> &Self {
        self.script.lock().unwrap().fail_declines = true;
        self
    }

    /// Delay every call, to widen interleavings in concurrency tests.
    pub fn with_latency(&self, latency: Duration) -> &Self {
        self.script.lock().unwrap().latency = Some(latency);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Texts sent to `chat_id`, in order.
    pub fn sent_to(&self, chat_id: ChatId) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Send { chat_id: to, text, .. } if to == chat_id => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Options of the messages sent to `chat_id`, in order.
    pub fn options_sent_to(&self, chat_id: ChatId) -> Vec<SendOptions> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Send {
                    chat_id: to,
                    options,
                    ..
                } if to == chat_id => Some(options),
                _ => None,
            })
            .collect()
    }

    pub fn approvals(&self) -> Vec<RequestHandle> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Approve(handle) => Some(handle),
                _ => None,
            })
            .collect()
    }

    pub fn declines(&self) -> Vec<RequestHandle> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Decline(handle) => Some(handle),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    async fn delay(&self) {
        let latency = self.script.lock().unwrap().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl Outbound for RecordingOutbound {
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        options: &SendOptions,
    ) -> Result<(), DeliveryFailure> {
        self.record(Call::Send {
            chat_id,
            text: text.to_string(),
            options: options.clone(),
        });
        self.delay().await;

        let (stalled, failing) = {
            let script = self.script.lock().unwrap();
            (
                script.stalled_chats.contains(&chat_id),
                script.failing_chats.contains(&chat_id),
            )
        };
        if stalled {
            std::future::pending::<()>().await;
        }
        if failing {
            return Err(DeliveryFailure::rejected(
                Some(403),
                "Forbidden: bot was blocked by the user",
            ));
        }
        Ok(())
    }

    async fn approve_join_request(&self, handle: &RequestHandle) -> Result<(), DeliveryFailure> {
        self.record(Call::Approve(*handle));
        self.delay().await;
        if self.script.lock().unwrap().fail_approvals {
            return Err(DeliveryFailure::rejected(Some(400), "Bad Request: USER_ALREADY_PARTICIPANT"));
        }
        Ok(())
    }

    async fn decline_join_request(&self, handle: &RequestHandle) -> Result<(), DeliveryFailure> {
        self.record(Call::Decline(*handle));
        self.delay().await;
        if self.script.lock().unwrap().fail_declines {
            return Err(DeliveryFailure::rejected(Some(400), "Bad Request: HIDE_REQUESTER_MISSING"));
        }
        Ok(())
    }
}
