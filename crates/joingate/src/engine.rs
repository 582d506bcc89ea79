//! Engine: wires store, machine, dispatcher and router together and runs one
//! task per event.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::info;

use crate::core::{ChatId, UserId};
use crate::dispatch::{Dispatcher, DEFAULT_SEND_TIMEOUT};
use crate::effect::Outbound;
use crate::error::EngineError;
use crate::event::InboundEvent;
use crate::machine::VerificationMachine;
use crate::router::{Routed, Router};
use crate::store::PendingStore;
use crate::update::Update;

pub struct EngineBuilder {
    outbound: Arc<dyn Outbound>,
    admin_chat: Option<ChatId>,
    send_timeout: Duration,
}

impl EngineBuilder {
    pub fn new<O: Outbound>(outbound: O) -> Self {
        Self::from_shared(Arc::new(outbound))
    }

    pub fn from_shared(outbound: Arc<dyn Outbound>) -> Self {
        Self {
            outbound,
            admin_chat: None,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    /// Chat that receives an audit message per approval. Without one, audit
    /// messages are skipped and approvals proceed as usual.
    pub fn with_admin_chat(mut self, admin_chat: Option<ChatId>) -> Self {
        self.admin_chat = admin_chat;
        self
    }

    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    pub fn build(self) -> Engine {
        let store = Arc::new(PendingStore::new());
        let machine = VerificationMachine::new(Arc::clone(&store), self.admin_chat);
        let dispatcher = Dispatcher::new(self.outbound, self.send_timeout);
        Engine {
            router: Arc::new(Router::new(machine, dispatcher)),
            store,
            admin_chat: self.admin_chat,
        }
    }
}

pub struct Engine {
    router: Arc<Router>,
    store: Arc<PendingStore>,
    admin_chat: Option<ChatId>,
}

impl Engine {
    /// Start accepting events.
    pub fn start(self) -> EngineHandle {
        info!(
            admin_audit = self.admin_chat.is_some(),
            "Verification engine started"
        );
        EngineHandle {
            router: self.router,
            store: self.store,
        }
    }
}

/// Cheap, cloneable entry point for the edge.
#[derive(Clone)]
pub struct EngineHandle {
    router: Arc<Router>,
    store: Arc<PendingStore>,
}

impl EngineHandle {
    pub fn store(&self) -> &Arc<PendingStore> {
        &self.store
    }

    /// Handle an update on its own task. `None` from the task means the
    /// update was dropped as unroutable.
    ///
    /// The update takes its place in its user's lane before the task is
    /// spawned, so one user's updates apply in the order they were emitted.
    pub fn emit(&self, update: Update) -> JoinHandle<Option<Routed>> {
        let router = Arc::clone(&self.router);
        let queued = router.admit(update);
        tokio::spawn(async move {
            match queued {
                Some(queued) => Some(router.run(queued).await),
                None => None,
            }
        })
    }

    /// Handle an update on its own task and wait for it to finish.
    pub async fn emit_and_await(&self, update: Update) -> Result<Option<Routed>, EngineError> {
        Ok(self.emit(update).await?)
    }

    /// Handle many updates concurrently, one task each.
    pub async fn emit_all(
        &self,
        updates: impl IntoIterator<Item = Update>,
    ) -> Vec<Result<Option<Routed>, EngineError>> {
        let tasks: Vec<_> = updates.into_iter().map(|update| self.emit(update)).collect();
        join_all(tasks)
            .await
            .into_iter()
            .map(|joined| joined.map_err(EngineError::from))
            .collect()
    }

    /// Handle an already classified event on its own task and wait for it.
    pub async fn process(&self, event: InboundEvent) -> Result<Routed, EngineError> {
        let router = Arc::clone(&self.router);
        let queued = router.enqueue(event);
        Ok(tokio::spawn(async move { router.run(queued).await }).await?)
    }

    /// Withdraw and decline a user's pending request.
    pub async fn decline(&self, user_id: UserId) -> Result<Routed, EngineError> {
        let router = Arc::clone(&self.router);
        let queued = router.enqueue_decline(user_id);
        Ok(tokio::spawn(async move { router.run(queued).await }).await?)
    }
}
