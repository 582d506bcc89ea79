//! The outbound seam: everything the gate does to the outside world goes
//! through an [`Outbound`] implementation.

use async_trait::async_trait;

use crate::core::{ChatId, RequestHandle};
use crate::error::DeliveryFailure;
use crate::format::VERIFY_BUTTON;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Html,
    MarkdownV2,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyMarkup {
    /// One-time keyboard with a single button that shares the user's contact.
    RequestContact { label: String },
    /// Remove any custom keyboard.
    Remove,
}

impl ReplyMarkup {
    pub fn verify_button() -> Self {
        ReplyMarkup::RequestContact {
            label: VERIFY_BUTTON.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    pub parse_mode: Option<ParseMode>,
    pub reply_markup: Option<ReplyMarkup>,
}

impl SendOptions {
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn with_parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = Some(mode);
        self
    }

    pub fn with_markup(mut self, markup: ReplyMarkup) -> Self {
        self.reply_markup = Some(markup);
        self
    }
}

/// Outbound capability of the messaging platform.
///
/// Each call reports failure distinctly from success; timeouts are applied by
/// the caller, so implementations may simply await their transport.
#[async_trait]
pub trait Outbound: Send + Sync + 'static {
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        options: &SendOptions,
    ) -> Result<(), DeliveryFailure>;

    async fn approve_join_request(&self, handle: &RequestHandle) -> Result<(), DeliveryFailure>;

    async fn decline_join_request(&self, handle: &RequestHandle) -> Result<(), DeliveryFailure>;
}
