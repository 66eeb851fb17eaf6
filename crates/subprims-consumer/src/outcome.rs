use subprims_envelope::DecodeError;
use subprims_schema::ValidationFailure;

use crate::handler::HandlerError;

/// What the consumer does with a message after dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckAction {
    Acknowledge,
    NegativeAcknowledge,
    /// Neither; the broker redelivers according to its own policy.
    Leave,
}

/// A handler that did not return a verdict.
#[derive(Debug, thiserror::Error)]
pub enum HandlerFailure {
    /// The handler returned an error.
    #[error("handler failed: {0}")]
    Error(#[source] HandlerError),

    /// The handler panicked.
    #[error("handler panicked: {0}")]
    Panicked(String),
}

/// Result of dispatching one message.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The handler ran; `acknowledge` is its verdict.
    Handled { acknowledge: bool },
    /// The raw payload is not a valid envelope.
    DecodeFailed(DecodeError),
    /// No route for the envelope's type.
    UnknownType(String),
    /// Data or properties were rejected by the type's schema.
    ValidationFailed(ValidationFailure),
    /// The handler errored or panicked.
    HandlerFailed(HandlerFailure),
}

impl DispatchOutcome {
    /// Acknowledgement decision for this outcome.
    pub fn ack_action(&self) -> AckAction {
        match self {
            DispatchOutcome::Handled { acknowledge: true } => AckAction::Acknowledge,
            DispatchOutcome::Handled { acknowledge: false } => AckAction::Leave,
            DispatchOutcome::DecodeFailed(_)
            | DispatchOutcome::UnknownType(_)
            | DispatchOutcome::ValidationFailed(_)
            | DispatchOutcome::HandlerFailed(_) => AckAction::NegativeAcknowledge,
        }
    }

    /// Short stable name, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchOutcome::Handled { .. } => "handled",
            DispatchOutcome::DecodeFailed(_) => "decode_failed",
            DispatchOutcome::UnknownType(_) => "unknown_type",
            DispatchOutcome::ValidationFailed(_) => "validation_failed",
            DispatchOutcome::HandlerFailed(_) => "handler_failed",
        }
    }
}
