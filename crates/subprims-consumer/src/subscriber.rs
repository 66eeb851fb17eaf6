use std::sync::Arc;

use subprims_broker::{BrokerClient, Consumer, SubscriptionConfig};
use subprims_envelope::EnvelopeConfig;

use crate::ack::AckController;
use crate::dispatcher::Dispatcher;
use crate::error::{ConsumerError, Result};
use crate::router::Router;

/// Observable lifecycle stage of a [`Subscriber`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberState {
    Uninitialized,
    Subscribed,
    Closed,
}

enum Lifecycle<C> {
    Uninitialized,
    Subscribed(C),
    Closed,
}

/// Typed consumer bound to one broker subscription.
///
/// `Uninitialized -> Subscribed -> Closed`, with no way back from `Closed`.
/// The broker consumer handle lives only while subscribed.
pub struct Subscriber<B: BrokerClient> {
    broker: B,
    config: SubscriptionConfig,
    dispatcher: Dispatcher,
    lifecycle: Lifecycle<B::Consumer>,
}

impl<B: BrokerClient> Subscriber<B> {
    pub fn new(broker: B, config: SubscriptionConfig, router: Router) -> Self {
        Self {
            broker,
            config,
            dispatcher: Dispatcher::new(router),
            lifecycle: Lifecycle::Uninitialized,
        }
    }

    /// Override envelope decoding limits. Takes effect on the next `initialize`.
    pub fn with_envelope_config(mut self, envelope_config: EnvelopeConfig) -> Self {
        self.dispatcher = self.dispatcher.with_envelope_config(envelope_config);
        self
    }

    /// Subscribe with the broker and start receiving messages.
    ///
    /// A broker failure leaves the subscriber uninitialized so the call can
    /// be retried.
    pub async fn initialize(&mut self) -> Result<()> {
        match self.lifecycle {
            Lifecycle::Uninitialized => {}
            Lifecycle::Subscribed(_) => {
                return Err(ConsumerError::AlreadySubscribed {
                    topic: self.config.topic.clone(),
                    subscription: self.config.subscription.clone(),
                });
            }
            Lifecycle::Closed => return Err(ConsumerError::Closed),
        }

        let listener = Arc::new(AckController::new(self.dispatcher.clone()));
        match self.broker.subscribe(&self.config, listener).await {
            Ok(consumer) => {
                tracing::info!(
                    topic = %self.config.topic,
                    subscription = %self.config.subscription,
                    subscription_type = ?self.config.subscription_type,
                    types = ?self.dispatcher.router().type_names(),
                    "subscribed"
                );
                self.lifecycle = Lifecycle::Subscribed(consumer);
                Ok(())
            }
            Err(err) => {
                tracing::error!(
                    topic = %self.config.topic,
                    subscription = %self.config.subscription,
                    error = %err,
                    "subscribe failed"
                );
                Err(err.into())
            }
        }
    }

    /// Close the broker subscription. A no-op unless subscribed.
    ///
    /// The subscriber ends up closed even when the broker reports an error.
    pub async fn close(&mut self) -> Result<()> {
        let consumer = match std::mem::replace(&mut self.lifecycle, Lifecycle::Closed) {
            Lifecycle::Subscribed(consumer) => consumer,
            other => {
                self.lifecycle = other;
                return Ok(());
            }
        };

        match consumer.close().await {
            Ok(()) => {
                tracing::info!(topic = %self.config.topic, "subscription closed");
                Ok(())
            }
            Err(err) => {
                tracing::error!(topic = %self.config.topic, error = %err, "close failed");
                Err(err.into())
            }
        }
    }

    pub fn state(&self) -> SubscriberState {
        match self.lifecycle {
            Lifecycle::Uninitialized => SubscriberState::Uninitialized,
            Lifecycle::Subscribed(_) => SubscriberState::Subscribed,
            Lifecycle::Closed => SubscriberState::Closed,
        }
    }

    /// Broker consumer handle while subscribed.
    pub fn consumer(&self) -> Option<&B::Consumer> {
        match &self.lifecycle {
            Lifecycle::Subscribed(consumer) => Some(consumer),
            _ => None,
        }
    }

    pub fn config(&self) -> &SubscriptionConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

impl<B: BrokerClient> std::fmt::Debug for Subscriber<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::Value;
    use subprims_broker::{
        BrokerError, MemoryBroker, MessageListener, RawMessage, Result as BrokerResult,
    };
    use subprims_envelope::PropertyMap;
    use subprims_schema::SchemaCatalog;

    use super::*;
    use crate::handler::{handler_fn, HandlerError};

    fn router() -> Router {
        let catalog =
            SchemaCatalog::from_embedded(&[("ping", r#"{"type":"object"}"#, None)]).unwrap();
        Router::builder(catalog)
            .handler(
                "ping",
                handler_fn(|_: String, _: Value, _: PropertyMap| async {
                    Ok::<bool, HandlerError>(true)
                }),
            )
            .build()
            .unwrap()
    }

    fn subscriber(broker: &MemoryBroker) -> Subscriber<MemoryBroker> {
        Subscriber::new(
            broker.clone(),
            SubscriptionConfig::new("events", "svc"),
            router(),
        )
    }

    /// Broker whose consumers always fail to close.
    struct StuckBroker;

    struct StuckConsumer;

    #[async_trait]
    impl BrokerClient for StuckBroker {
        type Consumer = StuckConsumer;

        async fn subscribe(
            &self,
            _config: &SubscriptionConfig,
            _listener: Arc<dyn MessageListener>,
        ) -> BrokerResult<StuckConsumer> {
            Ok(StuckConsumer)
        }
    }

    #[async_trait]
    impl Consumer for StuckConsumer {
        async fn acknowledge(&self, _message: &RawMessage) -> BrokerResult<()> {
            Ok(())
        }

        async fn negative_acknowledge(&self, _message: &RawMessage) {}

        async fn close(&self) -> BrokerResult<()> {
            Err(BrokerError::ConsumerClosed)
        }
    }

    #[tokio::test]
    async fn walks_the_lifecycle() {
        let broker = MemoryBroker::new();
        let mut subscriber = subscriber(&broker);
        assert_eq!(subscriber.state(), SubscriberState::Uninitialized);
        assert!(subscriber.consumer().is_none());

        subscriber.initialize().await.unwrap();
        assert_eq!(subscriber.state(), SubscriberState::Subscribed);
        assert_eq!(subscriber.consumer().unwrap().topic(), "events");
        assert_eq!(broker.consumer_count("events"), 1);

        subscriber.close().await.unwrap();
        assert_eq!(subscriber.state(), SubscriberState::Closed);
        assert!(subscriber.consumer().is_none());
        assert_eq!(broker.consumer_count("events"), 0);
    }

    #[tokio::test]
    async fn close_before_initialize_is_a_noop() {
        let broker = MemoryBroker::new();
        let mut subscriber = subscriber(&broker);

        subscriber.close().await.unwrap();
        assert_eq!(subscriber.state(), SubscriberState::Uninitialized);

        subscriber.initialize().await.unwrap();
        assert_eq!(subscriber.state(), SubscriberState::Subscribed);
    }

    #[tokio::test]
    async fn second_initialize_is_rejected() {
        let broker = MemoryBroker::new();
        let mut subscriber = subscriber(&broker);
        subscriber.initialize().await.unwrap();

        let err = subscriber.initialize().await.unwrap_err();
        assert!(matches!(
            err,
            ConsumerError::AlreadySubscribed { ref topic, ref subscription }
                if topic == "events" && subscription == "svc"
        ));
        assert_eq!(subscriber.state(), SubscriberState::Subscribed);
        assert_eq!(broker.consumer_count("events"), 1);
    }

    #[tokio::test]
    async fn closed_subscriber_cannot_resubscribe() {
        let broker = MemoryBroker::new();
        let mut subscriber = subscriber(&broker);
        subscriber.initialize().await.unwrap();
        subscriber.close().await.unwrap();

        assert!(matches!(
            subscriber.initialize().await,
            Err(ConsumerError::Closed)
        ));
        subscriber.close().await.unwrap();
        assert_eq!(subscriber.state(), SubscriberState::Closed);
    }

    #[tokio::test]
    async fn failed_subscribe_can_be_retried() {
        let broker = MemoryBroker::new();
        broker.reject_subscriptions("broker unreachable");
        let mut subscriber = subscriber(&broker);

        let err = subscriber.initialize().await.unwrap_err();
        assert!(matches!(err, ConsumerError::Broker(_)));
        assert_eq!(subscriber.state(), SubscriberState::Uninitialized);

        broker.accept_subscriptions();
        subscriber.initialize().await.unwrap();
        assert_eq!(subscriber.state(), SubscriberState::Subscribed);
    }

    #[tokio::test]
    async fn empty_topic_surfaces_as_broker_error() {
        let broker = MemoryBroker::new();
        let mut subscriber =
            Subscriber::new(broker, SubscriptionConfig::new("", "svc"), router());

        let err = subscriber.initialize().await.unwrap_err();
        assert!(matches!(
            err,
            ConsumerError::Broker(BrokerError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn failed_broker_close_still_closes_subscriber() {
        let mut subscriber =
            Subscriber::new(StuckBroker, SubscriptionConfig::new("events", "svc"), router());
        subscriber.initialize().await.unwrap();

        let err = subscriber.close().await.unwrap_err();
        assert!(matches!(err, ConsumerError::Broker(BrokerError::ConsumerClosed)));
        assert_eq!(subscriber.state(), SubscriberState::Closed);
        assert!(subscriber.consumer().is_none());
        assert!(matches!(
            subscriber.initialize().await,
            Err(ConsumerError::Closed)
        ));
    }
}
