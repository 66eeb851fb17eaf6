use std::sync::Arc;

use async_trait::async_trait;

use crate::config::SubscriptionConfig;
use crate::error::Result;
use crate::message::RawMessage;

/// Opens subscriptions on a broker.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Consumer handle returned by a successful subscribe.
    type Consumer: Consumer + 'static;

    /// Subscribe and register `listener` for every delivered message.
    ///
    /// Configuration problems (unknown topic, busy exclusive subscription,
    /// unreachable broker) surface here.
    async fn subscribe(
        &self,
        config: &SubscriptionConfig,
        listener: Arc<dyn MessageListener>,
    ) -> Result<Self::Consumer>;
}

/// Handle to one open subscription.
#[async_trait]
pub trait Consumer: Send + Sync {
    /// Mark the message as consumed.
    async fn acknowledge(&self, message: &RawMessage) -> Result<()>;

    /// Ask the broker to redeliver the message according to its own policy.
    async fn negative_acknowledge(&self, message: &RawMessage);

    /// Detach from the subscription. Later acknowledgements fail.
    async fn close(&self) -> Result<()>;
}

/// Callback invoked by the broker for each delivered message.
///
/// The broker does not inspect the result; the listener decides on its own
/// whether to acknowledge through `consumer`.
#[async_trait]
pub trait MessageListener: Send + Sync {
    async fn on_message(&self, message: RawMessage, consumer: &dyn Consumer);
}
