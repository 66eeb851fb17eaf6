//! Validated dispatch and acknowledgment for typed broker consumers.
//!
//! This is the layer applications use. Register one handler per schema'd
//! message type, subscribe, and every delivered message is decoded,
//! validated, handed to its handler and then acknowledged, negatively
//! acknowledged or left pending depending on the outcome.

pub mod ack;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod outcome;
pub mod router;
pub mod subscriber;

pub use ack::AckController;
pub use dispatcher::Dispatcher;
pub use error::{ConsumerError, Result};
pub use handler::{handler_fn, FnHandler, HandlerError, MessageHandler};
pub use outcome::{AckAction, DispatchOutcome, HandlerFailure};
pub use router::{Route, Router, RouterBuilder};
pub use subscriber::{Subscriber, SubscriberState};
