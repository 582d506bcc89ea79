//! # Joingate
//!
//! Gates membership in a managed group behind proof of contact: a user who
//! asks to join must share their own phone number with the bot before the
//! request is approved.
//!
//! ## Core Concepts
//!
//! Joingate separates **deciding** from **doing**:
//! - [`VerificationMachine`] = decisions (no IO, owns every invariant)
//! - [`Dispatcher`] = effects (outbound calls, bounded by a timeout)
//!
//! The key principle: **one record per user, consumed exactly once**. A
//! record is created by a join request and removed by the first terminal
//! transition that `take`s it; nothing ever puts it back.
//!
//! ## Architecture
//!
//! ```text
//! Edge (webhook)
//!     │
//!     ▼ emit()
//! EngineHandle ── classify(), claim lane slot, then one task per update
//!     │
//!     ▼ run()
//! Router ── per-user lane ───────────────────────────┐
//!     │                                              │
//!     ├─► Machine.on_join_request() ─► Prompted      │
//!     │                                              │
//!     ├─► Machine.on_contact_shared() ─► Approve cmd │
//!     │                       │                      │
//!     │                       ▼                      │
//!     │            Dispatcher.execute()              │
//!     │                       │                      │
//!     │                       ▼                      │
//!     │            Machine.resolve() ─► Approved     │
//!     │                                              │
//!     ▼                                              │
//! Dispatcher.dispatch(outcome) ─► Outbound           │
//!     │                                              │
//!     └─► prompt failed? ─► Machine.on_prompt_failed ┘
//! ```
//!
//! ## Key Invariants
//!
//! 1. **At most one pending record per user** - a newer join request replaces the older one
//! 2. **No double approval** - approval needs a successful `take`, which only one caller gets
//! 3. **Foreign contacts change nothing** - the contact must belong to its sender
//! 4. **No orphaned records** - an undeliverable prompt discards its record
//! 5. **Nothing is fatal** - failures are rolled back locally or told to the user
//!
//! ## Guarantees
//!
//! - **In-memory only**: pending records are lost on restart
//! - **Per-user ordering**: one user's events apply one at a time, in the order they were emitted
//! - **No cross-user ordering**: different users proceed independently
//! - **No expiry**: a record waits until a terminal transition consumes it
//!
//! ## Example
//!
//! ```ignore
//! use joingate::EngineBuilder;
//!
//! let handle = EngineBuilder::new(bot_api)
//!     .with_admin_chat(Some(ChatId(-100123)))
//!     .with_send_timeout(Duration::from_secs(10))
//!     .build()
//!     .start();
//!
//! // From the webhook:
//! let routed = handle.emit_and_await(update).await?;
//! ```

// Core modules
mod core;
mod dispatch;
mod effect;
mod engine;
mod error;
mod event;
mod machine;
mod outcome;
mod router;
mod store;

pub mod format;
pub mod update;

// Re-export domain types
pub use crate::core::{Applicant, ChatId, PendingVerification, RequestHandle, UserId};

// Re-export event types
pub use event::{
    BotCommand, CommandMessage, ContactShare, InboundEvent, JoinRequest, OtherMessage, TextMessage,
};

// Re-export error types
pub use error::{ConfigurationMissing, DeliveryFailure, EngineError, IdentityMismatch, TransportError};

// Re-export store
pub use store::PendingStore;

// Re-export machine types
pub use machine::{Decision, JoinCommand, VerificationMachine};
pub use outcome::{AuditNotice, VerificationOutcome};

// Re-export effect types
pub use effect::{Outbound, ParseMode, ReplyMarkup, SendOptions};

// Re-export dispatcher types
pub use dispatch::{Delivery, DispatchReport, Dispatcher, FailedDelivery, DEFAULT_SEND_TIMEOUT};

// Re-export router types
pub use router::{classify, Queued, Routed, Router, Unroutable};

// Re-export engine types (primary entry point)
pub use engine::{Engine, EngineBuilder, EngineHandle};

// Re-export commonly used external types
pub use async_trait::async_trait;
