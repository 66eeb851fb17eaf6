use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use subprims_broker::RawProperties;
use subprims_envelope::{
    decode_envelope, normalize_properties, properties_to_value, EnvelopeConfig, MessageEnvelope,
    PropertyMap,
};

use crate::outcome::{DispatchOutcome, HandlerFailure};
use crate::router::Router;

/// Decodes, validates and routes messages to their handlers.
///
/// Holds no mutable state; clones share the same router.
#[derive(Clone)]
pub struct Dispatcher {
    router: Arc<Router>,
    envelope_config: EnvelopeConfig,
}

impl Dispatcher {
    pub fn new(router: Router) -> Self {
        Self {
            router: Arc::new(router),
            envelope_config: EnvelopeConfig::default(),
        }
    }

    /// Override envelope decoding limits.
    pub fn with_envelope_config(mut self, config: EnvelopeConfig) -> Self {
        self.envelope_config = config;
        self
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn envelope_config(&self) -> &EnvelopeConfig {
        &self.envelope_config
    }

    /// Dispatch raw broker bytes and properties.
    ///
    /// Every failure, decoding included, resolves to an outcome.
    pub async fn dispatch_raw(
        &self,
        payload: &[u8],
        properties: Option<&RawProperties>,
    ) -> DispatchOutcome {
        let envelope = match decode_envelope(payload, &self.envelope_config) {
            Ok(envelope) => envelope,
            Err(err) => return DispatchOutcome::DecodeFailed(err),
        };
        self.dispatch(envelope, normalize_properties(properties))
            .await
    }

    /// Dispatch a decoded envelope with normalized properties.
    pub async fn dispatch(
        &self,
        envelope: MessageEnvelope,
        properties: PropertyMap,
    ) -> DispatchOutcome {
        tracing::info!(
            message_type = envelope.message_type(),
            message_id = envelope.id(),
            payload = %envelope.data(),
            "validating message"
        );

        let Some(route) = self.router.get(envelope.message_type()) else {
            return DispatchOutcome::UnknownType(envelope.message_type().to_string());
        };

        if let Err(failure) = route
            .schema()
            .validate_message(envelope.data(), &properties_to_value(&properties))
        {
            return DispatchOutcome::ValidationFailed(failure);
        }

        let (id, _, data) = envelope.into_parts();
        let invocation = route.handler().handle(&id, data, properties);
        match AssertUnwindSafe(invocation).catch_unwind().await {
            Ok(Ok(acknowledge)) => DispatchOutcome::Handled { acknowledge },
            Ok(Err(err)) => DispatchOutcome::HandlerFailed(HandlerFailure::Error(err)),
            Err(panic) => {
                DispatchOutcome::HandlerFailed(HandlerFailure::Panicked(panic_message(&*panic)))
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("router", &self.router)
            .field("envelope_config", &self.envelope_config)
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
