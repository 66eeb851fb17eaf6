use crate::message::MessageId;

/// Errors that can occur in broker operations.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// The subscription could not be opened.
    #[error("failed to subscribe to {topic}: {reason}")]
    Subscribe { topic: String, reason: String },

    /// The subscription configuration is unusable.
    #[error("invalid subscription config: {0}")]
    InvalidConfig(String),

    /// An exclusive subscription already holds the topic.
    #[error("subscription {subscription} on {topic} is held by another consumer")]
    SubscriptionBusy { topic: String, subscription: String },

    /// The message could not be acknowledged.
    #[error("failed to acknowledge {message_id}: {reason}")]
    Acknowledge {
        message_id: MessageId,
        reason: String,
    },

    /// No subscription exists to receive a published message.
    #[error("no subscribers on topic {0}")]
    NoSubscribers(String),

    /// The consumer has been closed.
    #[error("consumer closed")]
    ConsumerClosed,
}

pub type Result<T> = std::result::Result<T, BrokerError>;
