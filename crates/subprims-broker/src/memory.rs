use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;

use crate::config::{SubscriptionConfig, SubscriptionType};
use crate::error::{BrokerError, Result};
use crate::message::{MessageId, RawMessage, RawProperties};
use crate::traits::{BrokerClient, Consumer, MessageListener};

/// Last acknowledgement state the broker recorded for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Delivered, neither acknowledged nor negatively acknowledged.
    Pending,
    Acknowledged,
    NegativelyAcknowledged,
}

/// In-process broker implementing the subscribe/acknowledge/close contract.
///
/// Delivery is synchronous from the publisher's point of view: `publish`
/// returns after every listener callback for the message has completed.
/// Acknowledgement counters are kept per message for inspection.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

#[derive(Default)]
struct BrokerState {
    slots: Vec<SubscriptionSlot>,
    ledger: Vec<LedgerEntry>,
    index: HashMap<MessageId, usize>,
    next_consumer_id: u64,
    rejection: Option<String>,
}

struct SubscriptionSlot {
    consumer_id: u64,
    config: SubscriptionConfig,
    listener: Arc<dyn MessageListener>,
}

struct LedgerEntry {
    message: RawMessage,
    acks: u32,
    nacks: u32,
    deliveries: u32,
    disposition: Disposition,
}

type Delivery = (MemoryConsumer, Arc<dyn MessageListener>);

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later `subscribe` call fail with `reason`.
    pub fn reject_subscriptions(&self, reason: impl Into<String>) {
        self.lock().rejection = Some(reason.into());
    }

    /// Undo [`reject_subscriptions`](Self::reject_subscriptions).
    pub fn accept_subscriptions(&self) {
        self.lock().rejection = None;
    }

    /// Publish a message and deliver it to each subscription on `topic`.
    pub async fn publish(
        &self,
        topic: &str,
        data: impl Into<Bytes>,
        properties: Option<RawProperties>,
    ) -> Result<MessageId> {
        let (message, deliveries) = {
            let mut state = self.lock();
            let sequence = state.ledger.len();
            let deliveries = state.deliveries_for(self, topic, sequence);
            if deliveries.is_empty() {
                return Err(BrokerError::NoSubscribers(topic.to_string()));
            }

            let id = MessageId::new(format!("{topic}:{}", sequence + 1));
            let message = RawMessage::new(id.clone(), topic, data, properties);
            state.index.insert(id, sequence);
            state.ledger.push(LedgerEntry {
                message: message.clone(),
                acks: 0,
                nacks: 0,
                deliveries: 0,
                disposition: Disposition::Pending,
            });
            (message, deliveries)
        };

        tracing::debug!(
            topic,
            message_id = %message.id(),
            size = message.data().len(),
            subscriptions = deliveries.len(),
            "publishing message"
        );

        let id = message.id().clone();
        self.deliver(message, deliveries).await;
        Ok(id)
    }

    /// Redeliver every negatively acknowledged message on `topic`.
    ///
    /// Returns the number of messages redelivered.
    pub async fn redeliver_negatively_acknowledged(&self, topic: &str) -> Result<usize> {
        let batch = {
            let mut state = self.lock();
            let mut batch = Vec::new();
            for position in 0..state.ledger.len() {
                let entry = &state.ledger[position];
                if entry.message.topic() != topic
                    || entry.disposition != Disposition::NegativelyAcknowledged
                {
                    continue;
                }
                let deliveries = state.deliveries_for(self, topic, position);
                if deliveries.is_empty() {
                    return Err(BrokerError::NoSubscribers(topic.to_string()));
                }
                let entry = &mut state.ledger[position];
                entry.message = entry.message.redelivered();
                entry.disposition = Disposition::Pending;
                batch.push((entry.message.clone(), deliveries));
            }
            batch
        };

        let count = batch.len();
        for (message, deliveries) in batch {
            tracing::debug!(
                topic,
                message_id = %message.id(),
                redelivery_count = message.redelivery_count(),
                "redelivering message"
            );
            self.deliver(message, deliveries).await;
        }
        Ok(count)
    }

    /// Number of acknowledge calls recorded for `id`.
    pub fn ack_count(&self, id: &MessageId) -> u32 {
        self.with_entry(id, |entry| entry.acks).unwrap_or(0)
    }

    /// Number of negative-acknowledge calls recorded for `id`.
    pub fn nack_count(&self, id: &MessageId) -> u32 {
        self.with_entry(id, |entry| entry.nacks).unwrap_or(0)
    }

    /// Number of times `id` was handed to a listener.
    pub fn delivery_count(&self, id: &MessageId) -> u32 {
        self.with_entry(id, |entry| entry.deliveries).unwrap_or(0)
    }

    /// Last recorded disposition, `None` for unknown ids.
    pub fn disposition(&self, id: &MessageId) -> Option<Disposition> {
        self.with_entry(id, |entry| entry.disposition)
    }

    /// All published messages in publish order with their disposition.
    pub fn dispositions(&self) -> Vec<(MessageId, Disposition)> {
        self.lock()
            .ledger
            .iter()
            .map(|entry| (entry.message.id().clone(), entry.disposition))
            .collect()
    }

    /// Number of consumers currently attached to `topic`.
    pub fn consumer_count(&self, topic: &str) -> usize {
        self.lock()
            .slots
            .iter()
            .filter(|slot| slot.config.topic == topic)
            .count()
    }

    async fn deliver(&self, message: RawMessage, deliveries: Vec<Delivery>) {
        for (consumer, listener) in deliveries {
            self.record(message.id(), |entry| {
                entry.deliveries = entry.deliveries.saturating_add(1);
            });
            listener.on_message(message.clone(), &consumer).await;
        }
    }

    fn record(&self, id: &MessageId, update: impl FnOnce(&mut LedgerEntry)) -> bool {
        let mut state = self.lock();
        match state.index.get(id).copied() {
            Some(position) => {
                update(&mut state.ledger[position]);
                true
            }
            None => false,
        }
    }

    fn with_entry<T>(&self, id: &MessageId, read: impl FnOnce(&LedgerEntry) -> T) -> Option<T> {
        let state = self.lock();
        state
            .index
            .get(id)
            .and_then(|position| state.ledger.get(*position))
            .map(read)
    }

    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BrokerState {
    /// One consumer per subscription name. Shared subscriptions rotate by
    /// sequence, failover subscriptions stick to the earliest attached member.
    fn deliveries_for(
        &self,
        broker: &MemoryBroker,
        topic: &str,
        sequence: usize,
    ) -> Vec<Delivery> {
        let mut groups: Vec<(&str, Vec<&SubscriptionSlot>)> = Vec::new();
        for slot in self.slots.iter().filter(|slot| slot.config.topic == topic) {
            let name = slot.config.subscription.as_str();
            match groups.iter().position(|(existing, _)| *existing == name) {
                Some(position) => groups[position].1.push(slot),
                None => groups.push((name, vec![slot])),
            }
        }

        groups
            .into_iter()
            .map(|(_, members)| {
                let slot = match members[0].config.subscription_type {
                    SubscriptionType::Shared => members[sequence % members.len()],
                    SubscriptionType::Exclusive | SubscriptionType::Failover => members[0],
                };
                let consumer = MemoryConsumer {
                    consumer_id: slot.consumer_id,
                    topic: slot.config.topic.clone(),
                    subscription: slot.config.subscription.clone(),
                    broker: broker.clone(),
                };
                (consumer, Arc::clone(&slot.listener))
            })
            .collect()
    }
}

/// Consumer handle returned by [`MemoryBroker`].
#[derive(Clone)]
pub struct MemoryConsumer {
    consumer_id: u64,
    topic: String,
    subscription: String,
    broker: MemoryBroker,
}

impl MemoryConsumer {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn subscription(&self) -> &str {
        &self.subscription
    }

    fn is_attached(&self) -> bool {
        self.broker
            .lock()
            .slots
            .iter()
            .any(|slot| slot.consumer_id == self.consumer_id)
    }
}

impl std::fmt::Debug for MemoryConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryConsumer")
            .field("consumer_id", &self.consumer_id)
            .field("topic", &self.topic)
            .field("subscription", &self.subscription)
            .finish()
    }
}

#[async_trait]
impl BrokerClient for MemoryBroker {
    type Consumer = MemoryConsumer;

    async fn subscribe(
        &self,
        config: &SubscriptionConfig,
        listener: Arc<dyn MessageListener>,
    ) -> Result<MemoryConsumer> {
        if config.topic.trim().is_empty() {
            return Err(BrokerError::InvalidConfig("topic must not be empty".to_string()));
        }
        if config.subscription.trim().is_empty() {
            return Err(BrokerError::InvalidConfig(
                "subscription name must not be empty".to_string(),
            ));
        }

        let mut state = self.lock();
        if let Some(reason) = &state.rejection {
            return Err(BrokerError::Subscribe {
                topic: config.topic.clone(),
                reason: reason.clone(),
            });
        }

        let busy = state.slots.iter().any(|slot| {
            slot.config.topic == config.topic
                && slot.config.subscription == config.subscription
                && (slot.config.subscription_type == SubscriptionType::Exclusive
                    || config.subscription_type == SubscriptionType::Exclusive)
        });
        if busy {
            return Err(BrokerError::SubscriptionBusy {
                topic: config.topic.clone(),
                subscription: config.subscription.clone(),
            });
        }

        state.next_consumer_id = state.next_consumer_id.saturating_add(1);
        let consumer_id = state.next_consumer_id;
        state.slots.push(SubscriptionSlot {
            consumer_id,
            config: config.clone(),
            listener,
        });

        tracing::debug!(
            topic = %config.topic,
            subscription = %config.subscription,
            subscription_type = ?config.subscription_type,
            consumer_id,
            "subscription opened"
        );

        Ok(MemoryConsumer {
            consumer_id,
            topic: config.topic.clone(),
            subscription: config.subscription.clone(),
            broker: self.clone(),
        })
    }
}

#[async_trait]
impl Consumer for MemoryConsumer {
    async fn acknowledge(&self, message: &RawMessage) -> Result<()> {
        if !self.is_attached() {
            return Err(BrokerError::ConsumerClosed);
        }
        let known = self.broker.record(message.id(), |entry| {
            entry.acks = entry.acks.saturating_add(1);
            entry.disposition = Disposition::Acknowledged;
        });
        if !known {
            return Err(BrokerError::Acknowledge {
                message_id: message.id().clone(),
                reason: "unknown message".to_string(),
            });
        }
        Ok(())
    }

    async fn negative_acknowledge(&self, message: &RawMessage) {
        if !self.is_attached() {
            tracing::warn!(
                message_id = %message.id(),
                "negative acknowledge on closed consumer ignored"
            );
            return;
        }
        self.broker.record(message.id(), |entry| {
            entry.nacks = entry.nacks.saturating_add(1);
            entry.disposition = Disposition::NegativelyAcknowledged;
        });
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.broker.lock();
        state.slots.retain(|slot| slot.consumer_id != self.consumer_id);
        tracing::debug!(
            topic = %self.topic,
            subscription = %self.subscription,
            consumer_id = self.consumer_id,
            "subscription closed"
        );
        Ok(())
    }
}
