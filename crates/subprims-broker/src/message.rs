use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;

/// Broker-assigned message identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Message metadata as the broker client hands it over.
///
/// Some clients expose properties as a map, others as a list of key/value
/// pairs. Consumers normalize either form before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawProperties {
    Map(HashMap<String, String>),
    Pairs(Vec<(String, String)>),
}

impl RawProperties {
    /// Number of entries in the raw representation (duplicates included).
    pub fn len(&self) -> usize {
        match self {
            RawProperties::Map(map) => map.len(),
            RawProperties::Pairs(pairs) => pairs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A message as delivered by the broker, before any decoding.
#[derive(Debug, Clone)]
pub struct RawMessage {
    id: MessageId,
    topic: String,
    data: Bytes,
    properties: Option<RawProperties>,
    redelivery_count: u32,
}

impl RawMessage {
    /// Create a first-delivery message.
    pub fn new(
        id: MessageId,
        topic: impl Into<String>,
        data: impl Into<Bytes>,
        properties: Option<RawProperties>,
    ) -> Self {
        Self {
            id,
            topic: topic.into(),
            data: data.into(),
            properties,
            redelivery_count: 0,
        }
    }

    /// Copy of this message marked as one more redelivery.
    pub fn redelivered(&self) -> Self {
        Self {
            redelivery_count: self.redelivery_count.saturating_add(1),
            ..self.clone()
        }
    }

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Raw payload bytes.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Raw properties, `None` when the broker attached none.
    pub fn properties(&self) -> Option<&RawProperties> {
        self.properties.as_ref()
    }

    /// How many times the broker has redelivered this message.
    pub fn redelivery_count(&self) -> u32 {
        self.redelivery_count
    }
}
