//! Messaging-platform channels.
//!
//! Platform payloads stop at the adapter boundary: every inbound webhook is
//! normalized into an [`InboundEvent`] before any business logic runs, and
//! outbound replies are rendered back into platform payloads by the adapter.

pub mod viber;

#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Subscribed {
        user_id: String,
        name: Option<String>,
        language: Option<String>,
    },
    ConversationStarted {
        user_id: String,
        name: Option<String>,
        language: Option<String>,
    },
    Unsubscribed {
        user_id: String,
    },
    Message {
        user_id: String,
        name: Option<String>,
        text: String,
    },
    /// Webhook validation pings and delivery receipts: acknowledged, not processed.
    Ignored,
}
