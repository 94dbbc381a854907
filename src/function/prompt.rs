use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::StreamExt;
use serde_json::Value;

use crate::config::{ExecutionSettings, PromptConfig};
use crate::runtime::Runtime;

use super::arguments::Arguments;
use super::function::{FunctionChunkStream, RuntimeFunction};
use super::metadata::{FunctionMetadata, ParameterMetadata};
use super::result::FunctionResult;
use super::types::FunctionError;

/// Prompt rendering boundary. Template engines live behind this trait; the
/// runtime only ever sees the rendered text.
#[mockall::automock]
pub trait PromptTemplate: Send + Sync {
    fn render(&self, arguments: &Arguments) -> Result<String, FunctionError>;
}

/// Passes the prompt text through verbatim.
#[derive(Debug, Clone)]
pub struct RawPromptTemplate {
    text: String,
}

impl RawPromptTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl PromptTemplate for RawPromptTemplate {
    fn render(&self, _arguments: &Arguments) -> Result<String, FunctionError> {
        Ok(self.text.clone())
    }
}

/// A function that renders a prompt and sends it to a resolved AI service.
///
/// Settings are looked up in order: the invocation's arguments, then the
/// settings this function was configured with, then whatever the resolved
/// service materializes for itself.
#[derive(Clone)]
pub struct PromptFunction {
    metadata: FunctionMetadata,
    template: Arc<dyn PromptTemplate>,
    settings: Option<ExecutionSettings>,
}

impl PromptFunction {
    pub fn new(
        plugin_name: impl Into<String>,
        name: impl Into<String>,
        template: Arc<dyn PromptTemplate>,
    ) -> Self {
        let mut metadata = FunctionMetadata::new(plugin_name, name);
        metadata.is_prompt = true;
        Self {
            metadata,
            template,
            settings: None,
        }
    }

    /// Wraps raw prompt text in a pass-through template.
    pub fn from_prompt(
        plugin_name: impl Into<String>,
        name: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self::new(plugin_name, name, Arc::new(RawPromptTemplate::new(prompt)))
    }

    /// Builds a function from a plugin directory's prompt text and its
    /// `config.json`.
    pub fn from_config(
        plugin_name: impl Into<String>,
        name: impl Into<String>,
        prompt: impl Into<String>,
        config: &PromptConfig,
    ) -> Self {
        let mut function = Self::from_prompt(plugin_name, name, prompt);
        function.metadata.description = config.description.clone();
        function.metadata.parameters = config
            .input_variables
            .iter()
            .cloned()
            .map(ParameterMetadata::from)
            .collect();
        function.settings = config.execution_settings.clone();
        function
    }

    pub fn with_settings(mut self, settings: ExecutionSettings) -> Self {
        self.settings = Some(settings);
        self
    }
}

#[async_trait]
impl RuntimeFunction for PromptFunction {
    fn metadata(&self) -> &FunctionMetadata {
        &self.metadata
    }

    async fn invoke(
        &self,
        runtime: &Runtime,
        arguments: &Arguments,
    ) -> Result<FunctionResult, FunctionError> {
        let prompt = self.template.render(arguments)?;
        let (service, settings) =
            runtime.select_service(arguments.settings().or(self.settings.as_ref()))?;
        let response = service.send_message(&prompt, &settings).await?;

        // 単一choiceは文字列、複数choiceは配列として返す
        let value = match response.contents.len() {
            1 => Value::String(response.contents.into_iter().next().unwrap_or_default()),
            _ => Value::Array(response.contents.into_iter().map(Value::String).collect()),
        };
        Ok(FunctionResult::new(self.metadata.clone(), value)
            .with_metadata("model", Value::String(response.metadata.model)))
    }

    async fn invoke_stream(
        &self,
        runtime: &Runtime,
        arguments: &Arguments,
    ) -> Result<FunctionChunkStream, FunctionError> {
        let prompt = self.template.render(arguments)?;
        let (service, settings) =
            runtime.select_service(arguments.settings().or(self.settings.as_ref()))?;
        let stream = service.send_message_stream(&prompt, &settings).await?;
        Ok(stream.map(|chunk| chunk.map_err(FunctionError::from)).boxed())
    }
}
