use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;

use crate::runtime::Runtime;

use super::arguments::Arguments;
use super::function::RuntimeFunction;
use super::metadata::{FunctionMetadata, ParameterMetadata};
use super::result::FunctionResult;
use super::types::FunctionError;

// ハンドラの型
pub type NativeHandler =
    Arc<dyn Fn(Arguments) -> BoxFuture<'static, Result<Value, FunctionError>> + Send + Sync>;

/// A function implemented as a Rust closure.
///
/// The handler receives its own copy of the arguments and returns a JSON
/// value, which the runtime wraps into a [`FunctionResult`].
#[derive(Clone)]
pub struct NativeFunction {
    metadata: FunctionMetadata,
    handler: NativeHandler,
}

impl NativeFunction {
    pub fn new<F, Fut>(
        plugin_name: impl Into<String>,
        name: impl Into<String>,
        handler: F,
    ) -> Self
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, FunctionError>> + Send + 'static,
    {
        Self {
            metadata: FunctionMetadata::new(plugin_name, name),
            handler: Arc::new(move |arguments| handler(arguments).boxed()),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.metadata.description = Some(description.into());
        self
    }

    pub fn with_parameters(mut self, parameters: Vec<ParameterMetadata>) -> Self {
        self.metadata.parameters = parameters;
        self
    }
}

#[async_trait]
impl RuntimeFunction for NativeFunction {
    fn metadata(&self) -> &FunctionMetadata {
        &self.metadata
    }

    async fn invoke(
        &self,
        _runtime: &Runtime,
        arguments: &Arguments,
    ) -> Result<FunctionResult, FunctionError> {
        let value = (self.handler)(arguments.clone()).await?;
        Ok(FunctionResult::new(self.metadata.clone(), value))
    }
}
