//! Broker collaborator contract for typed message consumption.
//!
//! The consumption core never speaks a broker wire protocol itself. It talks to
//! whatever broker client sits underneath through three small traits:
//! - [`BrokerClient`] opens subscriptions
//! - [`Consumer`] acknowledges, negatively acknowledges and closes
//! - [`MessageListener`] receives each delivered [`RawMessage`]
//!
//! This is the lowest layer of subprims. [`MemoryBroker`] is an in-process
//! implementation of the contract for tests and local replay.

pub mod config;
pub mod error;
pub mod memory;
pub mod message;
pub mod traits;

pub use config::{SubscriptionConfig, SubscriptionType};
pub use error::{BrokerError, Result};
pub use memory::{Disposition, MemoryBroker, MemoryConsumer};
pub use message::{MessageId, RawMessage, RawProperties};
pub use traits::{BrokerClient, Consumer, MessageListener};
