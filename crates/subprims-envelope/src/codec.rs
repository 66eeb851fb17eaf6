use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DecodeError, Result};

/// Default maximum envelope size: 4 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 4 * 1024 * 1024;

const KNOWN_FIELDS: [&str; 4] = ["id", "type", "data", "timestamp"];

/// Producer timestamp carried by the envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    /// Milliseconds since the Unix epoch.
    Millis(i64),
    /// Free-form text, usually RFC 3339.
    Text(String),
}

/// A decoded message envelope.
///
/// Only the outer shape has been checked at this point; `data` is still
/// untyped until the dispatcher validates it against the type's schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageEnvelope {
    id: String,
    #[serde(rename = "type")]
    message_type: String,
    data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<Timestamp>,
}

impl MessageEnvelope {
    /// Create an envelope without timestamp.
    pub fn new(id: impl Into<String>, message_type: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            message_type: message_type.into(),
            data,
            timestamp: None,
        }
    }

    /// Attach a producer timestamp.
    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn timestamp(&self) -> Option<&Timestamp> {
        self.timestamp.as_ref()
    }

    /// Split into `(id, message_type, data)`.
    pub fn into_parts(self) -> (String, String, Value) {
        (self.id, self.message_type, self.data)
    }
}

/// Configuration for envelope decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeConfig {
    /// Maximum payload size in bytes. Default: 4 MiB.
    pub max_payload_size: usize,
    /// When false, top-level keys besides `id`, `type`, `data` and
    /// `timestamp` are rejected.
    pub allow_unknown_fields: bool,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            allow_unknown_fields: true,
        }
    }
}

/// Decode raw broker bytes into an envelope.
///
/// The payload must be UTF-8 JSON shaped as
/// `{"id": string, "type": string, "data": any, "timestamp"?: string | integer}`.
pub fn decode_envelope(payload: &[u8], config: &EnvelopeConfig) -> Result<MessageEnvelope> {
    let decoded = decode_fields(payload, config);
    if let Err(err) = &decoded {
        tracing::debug!(size = payload.len(), error = %err, "envelope decode failed");
    }
    decoded
}

fn decode_fields(payload: &[u8], config: &EnvelopeConfig) -> Result<MessageEnvelope> {
    if payload.len() > config.max_payload_size {
        return Err(DecodeError::PayloadTooLarge {
            size: payload.len(),
            max: config.max_payload_size,
        });
    }

    let text = std::str::from_utf8(payload)?;
    let value: Value = serde_json::from_str(text)?;

    let mut fields = match value {
        Value::Object(fields) => fields,
        other => {
            return Err(DecodeError::InvalidShape {
                field: "envelope",
                reason: format!("expected object, found {}", json_kind(&other)),
            })
        }
    };

    let id = take_non_empty_string(&mut fields, "id")?;
    let message_type = take_non_empty_string(&mut fields, "type")?;
    let data = fields
        .remove("data")
        .ok_or_else(|| DecodeError::InvalidShape {
            field: "data",
            reason: "missing".to_string(),
        })?;
    let timestamp = take_timestamp(&mut fields)?;

    if !config.allow_unknown_fields {
        if let Some(unknown) = fields.keys().find(|key| !KNOWN_FIELDS.contains(&key.as_str())) {
            return Err(DecodeError::InvalidShape {
                field: "envelope",
                reason: format!("unknown field `{unknown}`"),
            });
        }
    }

    Ok(MessageEnvelope {
        id,
        message_type,
        data,
        timestamp,
    })
}

/// Encode an envelope into its JSON wire form.
pub fn encode_envelope(envelope: &MessageEnvelope) -> Result<Bytes> {
    let encoded = serde_json::to_vec(envelope)?;
    Ok(Bytes::from(encoded))
}

fn take_non_empty_string(fields: &mut Map<String, Value>, field: &'static str) -> Result<String> {
    match fields.remove(field) {
        Some(Value::String(text)) if !text.is_empty() => Ok(text),
        Some(Value::String(_)) => Err(DecodeError::InvalidShape {
            field,
            reason: "must not be empty".to_string(),
        }),
        Some(other) => Err(DecodeError::InvalidShape {
            field,
            reason: format!("expected string, found {}", json_kind(&other)),
        }),
        None => Err(DecodeError::InvalidShape {
            field,
            reason: "missing".to_string(),
        }),
    }
}

fn take_timestamp(fields: &mut Map<String, Value>) -> Result<Option<Timestamp>> {
    match fields.remove("timestamp") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(Timestamp::Text(text))),
        Some(Value::Number(number)) => match number.as_i64() {
            Some(millis) => Ok(Some(Timestamp::Millis(millis))),
            None => Err(DecodeError::InvalidShape {
                field: "timestamp",
                reason: format!("expected integer milliseconds, found {number}"),
            }),
        },
        Some(other) => Err(DecodeError::InvalidShape {
            field: "timestamp",
            reason: format!("expected string or integer, found {}", json_kind(&other)),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
