use async_trait::async_trait;
use subprims_broker::{Consumer, MessageListener, RawMessage};

use crate::dispatcher::Dispatcher;
use crate::outcome::{AckAction, DispatchOutcome};

const PREVIEW_LIMIT: usize = 512;

/// Broker listener that dispatches each message and settles it.
///
/// At most one of acknowledge and negative-acknowledge is issued per
/// delivery. A failed acknowledge is logged and not followed by a nack.
#[derive(Debug, Clone)]
pub struct AckController {
    dispatcher: Dispatcher,
}

impl AckController {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Dispatch `message` and settle it through `consumer`.
    pub async fn process(&self, message: &RawMessage, consumer: &dyn Consumer) -> AckAction {
        let outcome = self
            .dispatcher
            .dispatch_raw(message.data(), message.properties())
            .await;
        settle(message, consumer, &outcome).await
    }
}

#[async_trait]
impl MessageListener for AckController {
    async fn on_message(&self, message: RawMessage, consumer: &dyn Consumer) {
        self.process(&message, consumer).await;
    }
}

/// Log `outcome` and issue the matching broker call.
pub async fn settle(
    message: &RawMessage,
    consumer: &dyn Consumer,
    outcome: &DispatchOutcome,
) -> AckAction {
    let message_id = message.id().as_str();
    match outcome {
        DispatchOutcome::Handled { acknowledge: true } => {
            tracing::info!(message_id, "message handled, acknowledging");
        }
        DispatchOutcome::Handled { acknowledge: false } => {
            tracing::info!(
                message_id,
                redelivery_count = message.redelivery_count(),
                "handler declined message, leaving it for redelivery"
            );
        }
        DispatchOutcome::ValidationFailed(failure) => {
            let issues = serde_json::to_string(&failure.issues).unwrap_or_default();
            tracing::error!(
                message_id,
                message_type = %failure.type_name,
                target = %failure.target,
                issues = %issues,
                omitted = failure.omitted,
                raw_message = %preview(message.data()),
                raw_properties = ?message.properties(),
                "message failed validation: {failure}"
            );
        }
        DispatchOutcome::UnknownType(type_name) => {
            tracing::error!(
                message_id,
                message_type = %type_name,
                "no schema registered for message type"
            );
        }
        DispatchOutcome::HandlerFailed(failure) => {
            tracing::error!(message_id, error = %failure, "message handler failed");
        }
        DispatchOutcome::DecodeFailed(err) => {
            tracing::error!(
                message_id,
                error = %err,
                raw_message = %preview(message.data()),
                "message could not be decoded"
            );
        }
    }

    let action = outcome.ack_action();
    match action {
        AckAction::Acknowledge => {
            if let Err(err) = consumer.acknowledge(message).await {
                tracing::warn!(message_id, error = %err, "acknowledge failed");
            }
        }
        AckAction::NegativeAcknowledge => consumer.negative_acknowledge(message).await,
        AckAction::Leave => {}
    }
    tracing::debug!(message_id, outcome = outcome.kind(), ?action, "message settled");
    action
}

/// Lossy UTF-8 rendering of a payload, truncated for logging.
fn preview(data: &[u8]) -> String {
    let text = String::from_utf8_lossy(data);
    if text.chars().count() <= PREVIEW_LIMIT {
        return text.into_owned();
    }
    let mut truncated: String = text.chars().take(PREVIEW_LIMIT).collect();
    truncated.push_str("...");
    truncated
}
