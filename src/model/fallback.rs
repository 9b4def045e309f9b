// Ordered model fallback
// Tries each configured model in turn, each behind the retry middleware.
// Author: kelexine (https://github.com/kelexine)

use super::{ChatModel, ModelCallError, ModelCallRetryMiddleware, ModelError, ModelRequest, ModelResponse};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Runs a request against a primary model and falls back to the next
/// model once the current one has exhausted its retries.
pub struct ModelFallback {
    models: Vec<Arc<dyn ChatModel>>,
    middleware: ModelCallRetryMiddleware,
    // Model name -> reason of its last exhaustion
    last_failures: RwLock<HashMap<String, String>>,
}

impl ModelFallback {
    pub fn new(primary: Arc<dyn ChatModel>, middleware: ModelCallRetryMiddleware) -> Self {
        Self {
            models: vec![primary],
            middleware,
            last_failures: RwLock::new(HashMap::new()),
        }
    }

    /// Append a model to the fallback chain.
    pub fn with_fallback(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.models.push(model);
        self
    }

    pub fn model_names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name()).collect()
    }

    /// Reason the named model last failed, if it has not recovered since.
    pub fn last_failure(&self, model: &str) -> Option<String> {
        self.last_failures.read().get(model).cloned()
    }

    /// Invoke the chain. The error of the last model tried is returned
    /// when every model fails.
    pub async fn invoke(
        &self,
        request: ModelRequest,
    ) -> Result<ModelResponse, ModelCallError<ModelError>> {
        let mut last_error = None;

        for (index, model) in self.models.iter().enumerate() {
            if index > 0 {
                info!("Falling back to model {}", model.name());
            }

            let result = self
                .middleware
                .call(request.clone(), |req| {
                    let model = Arc::clone(model);
                    async move { model.invoke(req).await }
                })
                .await;

            match result {
                Ok(response) => {
                    if self.last_failures.write().remove(model.name()).is_some() {
                        debug!("Model {} recovered", model.name());
                    }
                    return Ok(response);
                }
                Err(e) => {
                    warn!("Model {} exhausted retries: {}", model.name(), e);
                    self.last_failures
                        .write()
                        .insert(model.name().to_string(), e.to_string());
                    last_error = Some(e);
                }
            }
        }

        // models is never empty
        Err(last_error.unwrap_or_else(|| {
            ModelCallError::Handler(ModelError::Provider("no models configured".to_string()))
        }))
    }
}
