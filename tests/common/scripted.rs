//! A scripted Action Runtime for integration tests.
//!
//! Binds action names to async closures; the dispatcher's opaque `code`
//! text is ignored and the handler is selected by the invoked action's
//! name, which is what rule code would have dispatched on anyway.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use serde_json::Value;

use boardflow::runtime::{ActionApi, ActionRuntime, RuntimeError};

type Handler =
    Arc<dyn Fn(ActionApi, Value) -> BoxFuture<'static, Result<Value, RuntimeError>> + Send + Sync>;

/// Action Runtime that routes each invocation to a registered handler.
#[derive(Clone, Default)]
pub struct ScriptedRuntime {
    handlers: HashMap<String, Handler>,
}

impl ScriptedRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for an action name.
    #[must_use]
    pub fn on<F, Fut>(mut self, action: &str, handler: F) -> Self
    where
        F: Fn(ActionApi, Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Value, RuntimeError>> + Send + 'static,
    {
        self.handlers.insert(
            action.to_string(),
            Arc::new(move |api, params| Box::pin(handler(api, params))),
        );
        self
    }
}

#[async_trait]
impl ActionRuntime for ScriptedRuntime {
    async fn execute(
        &self,
        _code: &str,
        api: ActionApi,
        params: Value,
    ) -> Result<Value, RuntimeError> {
        let handler = self
            .handlers
            .get(api.action())
            .cloned()
            .ok_or_else(|| RuntimeError::Failed(format!("no handler for action {}", api.action())))?;
        handler(api, params).await
    }
}
