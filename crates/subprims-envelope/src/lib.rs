//! Envelope decoding for typed message consumption.
//!
//! Every message on the wire is a JSON envelope:
//! - `id`: producer-assigned message id (non-empty string)
//! - `type`: message type name used to pick a schema and handler
//! - `data`: opaque payload, validated later against the type's schema
//! - `timestamp`: optional, string or epoch milliseconds
//!
//! Broker properties are normalized here into a plain [`PropertyMap`].

pub mod codec;
pub mod error;
pub mod properties;

pub use codec::{
    decode_envelope, encode_envelope, EnvelopeConfig, MessageEnvelope, Timestamp,
    DEFAULT_MAX_PAYLOAD,
};
pub use error::{DecodeError, Result};
pub use properties::{normalize_properties, properties_to_value, PropertyMap};
