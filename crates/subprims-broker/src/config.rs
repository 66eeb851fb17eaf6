/// How a subscription shares a topic with other consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubscriptionType {
    /// Only one consumer may attach to the subscription.
    #[default]
    Exclusive,
    /// Messages are spread across all attached consumers.
    Shared,
    /// The earliest attached consumer receives everything; the rest take
    /// over in attach order when it closes.
    Failover,
}

/// Parameters handed to [`BrokerClient::subscribe`](crate::BrokerClient::subscribe).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionConfig {
    /// Topic to consume from.
    pub topic: String,
    /// Subscription name on the topic.
    pub subscription: String,
    /// Sharing mode.
    pub subscription_type: SubscriptionType,
}

impl SubscriptionConfig {
    /// Exclusive subscription on `topic`.
    pub fn new(topic: impl Into<String>, subscription: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            subscription: subscription.into(),
            subscription_type: SubscriptionType::default(),
        }
    }

    /// Override the sharing mode.
    pub fn with_type(mut self, subscription_type: SubscriptionType) -> Self {
        self.subscription_type = subscription_type;
        self
    }
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self::new("", "")
    }
}
