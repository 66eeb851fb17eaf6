use std::future::Future;

use async_trait::async_trait;
use serde_json::Value;
use subprims_envelope::PropertyMap;

/// Error type returned by message handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Business logic for one message type.
///
/// Called only with data and properties that passed the type's schemas.
/// Return `Ok(true)` to acknowledge, `Ok(false)` to leave the message
/// unacknowledged, or an error to have it negatively acknowledged.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(
        &self,
        id: &str,
        data: Value,
        properties: PropertyMap,
    ) -> Result<bool, HandlerError>;
}

/// [`MessageHandler`] backed by an async closure. See [`handler_fn`].
#[derive(Clone)]
pub struct FnHandler<F> {
    f: F,
}

/// Wrap an async closure `(id, data, properties) -> Result<bool, HandlerError>`.
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(String, Value, PropertyMap) -> Fut + Send + Sync,
    Fut: Future<Output = Result<bool, HandlerError>> + Send,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> MessageHandler for FnHandler<F>
where
    F: Fn(String, Value, PropertyMap) -> Fut + Send + Sync,
    Fut: Future<Output = Result<bool, HandlerError>> + Send,
{
    async fn handle(
        &self,
        id: &str,
        data: Value,
        properties: PropertyMap,
    ) -> Result<bool, HandlerError> {
        (self.f)(id.to_string(), data, properties).await
    }
}
