//! Typed, schema-validated message consumption over pub/sub brokers.
//!
//! Messages arrive as JSON envelopes carrying a `type` tag. Each type has a
//! JSON Schema for its data and one for its broker properties, plus exactly
//! one handler. A subscriber decodes, validates and dispatches every
//! delivery, then acknowledges it, negatively acknowledges it or leaves it
//! for the broker to redeliver.
//!
//! # Crate Structure
//!
//! - [`broker`]: broker client contract and an in-memory broker
//! - [`envelope`]: envelope decoding and property normalization
//! - [`schema`]: per-type schema catalog and validation diagnostics
//! - [`consumer`]: router, dispatcher, acknowledgment and subscriber lifecycle
//!   (behind the `consumer` feature)

/// Re-export broker types.
pub mod broker {
    pub use subprims_broker::*;
}

/// Re-export envelope types.
pub mod envelope {
    pub use subprims_envelope::*;
}

/// Re-export schema types.
pub mod schema {
    pub use subprims_schema::*;
}

/// Re-export consumer types (requires `consumer` feature).
#[cfg(feature = "consumer")]
pub mod consumer {
    pub use subprims_consumer::*;
}
