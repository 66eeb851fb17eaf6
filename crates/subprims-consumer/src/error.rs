/// Errors that can occur while building or running a subscriber.
#[derive(Debug, thiserror::Error)]
pub enum ConsumerError {
    /// Broker-level error.
    #[error("broker error: {0}")]
    Broker(#[from] subprims_broker::BrokerError),

    /// Schema catalog error.
    #[error("schema error: {0}")]
    Schema(#[from] subprims_schema::SchemaError),

    /// Schemas and handlers do not line up.
    #[error("invalid consumer configuration: {0}")]
    Config(String),

    /// `initialize` was called on an active subscriber.
    #[error("already subscribed to {topic} as {subscription}")]
    AlreadySubscribed { topic: String, subscription: String },

    /// The subscriber has been closed and cannot be reused.
    #[error("subscriber closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, ConsumerError>;
