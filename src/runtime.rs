use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use futures::stream::StreamExt;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::{ExecutionSettings, RuntimeConfig};
use crate::function::arguments::Arguments;
use crate::function::function::RuntimeFunction;
use crate::function::loader;
use crate::function::plugin::Plugin;
use crate::function::prompt::{PromptFunction, PromptTemplate};
use crate::function::registry::PluginCollection;
use crate::function::result::FunctionResult;
use crate::function::types::{FunctionError, PluginError, PluginResult};
use crate::hooks::dispatcher::{HookDispatcher, HookHandle};
use crate::hooks::events::{InvokedEvent, InvokingEvent};
use crate::service::capability::CapabilityType;
use crate::service::registry::ServiceRegistry;
use crate::service::service::AiService;
use crate::service::types::{ServiceError, ServiceResult};
use crate::streaming::{ChunkAggregator, StreamingChunk};
use crate::timestamp::Timestamp;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Pipeline execution errors.
///
/// # Error Categories
/// - Invocation errors: a function fault survived the invoked hook phase
/// - Flow errors: repeat bounds and empty pipelines
/// - Registry errors: plugin, function and service lookups made on behalf
///   of a run
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A fault was still attached after the invoked hook phase ran.
    #[error("Error occurred while invoking function: '{plugin_name}.{function_name}'")]
    InvocationFailed {
        plugin_name: String,
        function_name: String,
        #[source]
        source: FunctionError,
    },

    /// A step asked to repeat more often than the configured bound allows.
    #[error("Repeat limit of {limit} exceeded by function '{plugin_name}.{function_name}'")]
    RepeatLimitExceeded {
        plugin_name: String,
        function_name: String,
        limit: u32,
    },

    /// Streaming invocation needs at least one function.
    #[error("No functions passed to run")]
    EmptyPipeline,

    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),

    #[error("Function error: {0}")]
    Function(#[from] FunctionError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),
}

/// Items yielded by [`Runtime::invoke_stream`].
#[derive(Debug)]
pub enum StreamMessage {
    /// One streamed fragment, forwarded as it arrived.
    Chunk(StreamingChunk),
    /// Final results of the whole run, sent once after normal completion
    /// when the caller asked for them.
    Results(Vec<FunctionResult>),
}

// パイプラインの終了状態
enum PipelineExit {
    Completed,
    Cancelled,
}

/// # Runtime
///
/// Central coordinator binding the plugin collection, the service registry,
/// the hook dispatcher and the invocation configuration.
///
/// Cloning is cheap and clones share all registries, so a `Runtime` handed
/// to a spawned task observes registrations made later through any other
/// clone.
#[derive(Clone, Default)]
pub struct Runtime {
    plugins: PluginCollection,
    services: ServiceRegistry,
    hooks: HookDispatcher,
    config: Arc<RuntimeConfig>,
}

impl Runtime {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config: Arc::new(config),
            ..Default::default()
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn plugins(&self) -> &PluginCollection {
        &self.plugins
    }

    pub fn services(&self) -> &ServiceRegistry {
        &self.services
    }

    pub fn hooks(&self) -> &HookDispatcher {
        &self.hooks
    }

    pub fn register_service(
        &self,
        service: Arc<dyn AiService>,
        overwrite: bool,
    ) -> ServiceResult<()> {
        self.services.register(service, overwrite)
    }

    pub fn unregister_service(&self, service_id: &str) -> ServiceResult<()> {
        self.services.unregister(service_id)
    }

    pub fn clear_services(&self) {
        self.services.clear()
    }

    pub fn get_service(
        &self,
        service_id: Option<&str>,
        capability: Option<CapabilityType>,
    ) -> ServiceResult<Arc<dyn AiService>> {
        self.services.resolve(service_id, capability)
    }

    pub fn services_by_capability(
        &self,
        capability: &CapabilityType,
    ) -> HashMap<String, Arc<dyn AiService>> {
        self.services.list_by_capability(capability)
    }

    /// Looks up a service and asks it to materialize execution settings
    /// carrying its identity.
    pub fn execution_settings_from_service(
        &self,
        service_id: &str,
    ) -> ServiceResult<ExecutionSettings> {
        let service = self.services.resolve(Some(service_id), None)?;
        Ok(service.execution_settings())
    }

    /// Resolves the service a prompt function should talk to.
    ///
    /// A `service_id` pinned in the settings wins; otherwise chat-capable
    /// services are preferred over text-completion ones, with any registered
    /// service as the last resort. The returned settings are the provided
    /// ones when given, else whatever the resolved service materializes for
    /// itself.
    pub fn select_service(
        &self,
        settings: Option<&ExecutionSettings>,
    ) -> ServiceResult<(Arc<dyn AiService>, ExecutionSettings)> {
        let service = match settings.and_then(|s| s.service_id.as_deref()) {
            Some(service_id) => self.services.resolve(Some(service_id), None)?,
            None => self
                .services
                .resolve(None, Some(CapabilityType::ChatCompletion))
                .or_else(|_| {
                    self.services
                        .resolve(None, Some(CapabilityType::TextCompletion))
                })
                .or_else(|_| self.services.resolve(None, None))?,
        };
        let settings = match settings {
            Some(settings) => settings.clone(),
            None => service.execution_settings(),
        };
        Ok((service, settings))
    }

    pub fn register_plugin(&self, plugin: Plugin) -> PluginResult<()> {
        self.plugins.add_plugin(plugin)
    }

    pub fn register_function(&self, function: Arc<dyn RuntimeFunction>) -> PluginResult<()> {
        self.plugins.add_function(function)
    }

    /// Loads `<parent_directory>/<plugin_name>` as prompt functions and
    /// registers the resulting plugin.
    pub fn register_plugin_from_directory(
        &self,
        parent_directory: &Path,
        plugin_name: &str,
    ) -> PluginResult<Plugin> {
        let plugin = loader::plugin_from_directory(parent_directory, plugin_name)?;
        self.plugins.add_plugin(plugin.clone())?;
        Ok(plugin)
    }

    pub fn get_function(
        &self,
        plugin_name: &str,
        function_name: &str,
    ) -> PluginResult<Arc<dyn RuntimeFunction>> {
        self.plugins.get(plugin_name, function_name)
    }

    pub fn register_invoking_handler<F>(&self, handler: F) -> HookHandle
    where
        F: Fn(&mut InvokingEvent) + Send + Sync + 'static,
    {
        self.hooks.register_invoking(handler)
    }

    pub fn register_invoked_handler<F>(&self, handler: F) -> HookHandle
    where
        F: Fn(&mut InvokedEvent) + Send + Sync + 'static,
    {
        self.hooks.register_invoked(handler)
    }

    pub fn unregister_handler(&self, handle: HookHandle) {
        self.hooks.unregister(handle)
    }

    /// Runs a single function through the full hook protocol.
    ///
    /// `None` when the run produced no result: cancelled before the step,
    /// skipped, or completed by a handler without one.
    #[tracing::instrument(level = "debug", skip(self, function, arguments))]
    pub async fn invoke(
        &self,
        function: Arc<dyn RuntimeFunction>,
        arguments: Arguments,
    ) -> RuntimeResult<Option<FunctionResult>> {
        let mut results = Vec::new();
        let mut working = arguments;
        self.run_pipeline(std::slice::from_ref(&function), &mut working, &mut results)
            .await?;
        Ok(results.pop())
    }

    /// Runs functions in order, returning one result per completed step.
    ///
    /// Skipped steps contribute nothing; a cancellation returns whatever
    /// completed before it; an empty input yields an empty list.
    #[tracing::instrument(level = "debug", skip(self, functions, arguments))]
    pub async fn invoke_pipeline(
        &self,
        functions: Vec<Arc<dyn RuntimeFunction>>,
        arguments: Arguments,
    ) -> RuntimeResult<Vec<FunctionResult>> {
        let mut results = Vec::new();
        let mut working = arguments;
        self.run_pipeline(&functions, &mut working, &mut results)
            .await?;
        Ok(results)
    }

    // フック付き逐次実行の本体。通常系とストリーミング系で共有する
    async fn run_pipeline(
        &self,
        functions: &[Arc<dyn RuntimeFunction>],
        working: &mut Arguments,
        results: &mut Vec<FunctionResult>,
    ) -> RuntimeResult<PipelineExit> {
        let started = Timestamp::now();
        for (step, function) in functions.iter().enumerate() {
            let metadata = function.metadata().clone();
            let mut repeats: u32 = 0;
            loop {
                // 実行前フック
                let event = self
                    .hooks
                    .fire_invoking(&metadata, std::mem::take(working));
                let cancel = event.cancel_requested();
                let skip = event.skip_requested();
                let updated = event.arguments_updated();
                *working = event.into_arguments();

                if cancel {
                    info!(
                        "Execution was cancelled on function invoking event of pipeline step {}: {}",
                        step,
                        metadata.qualified_name()
                    );
                    return Ok(PipelineExit::Cancelled);
                }
                if updated {
                    info!(
                        "Arguments updated by invoking handler in pipeline step {}",
                        step
                    );
                }
                if skip {
                    info!(
                        "Execution was skipped on function invoking event of pipeline step {}: {}",
                        step,
                        metadata.qualified_name()
                    );
                    break;
                }

                // 関数本体の実行。失敗は invoked フェーズへデータとして渡す
                let (result, error) = match function.invoke(self, working).await {
                    Ok(result) => (Some(result), None),
                    Err(e) => {
                        error!(
                            "Something went wrong in function invocation. During function invocation: '{}'. Error description: '{}'",
                            metadata.qualified_name(),
                            e
                        );
                        (None, Some(e))
                    }
                };

                // 実行後フック
                let event = self.hooks.fire_invoked(
                    &metadata,
                    std::mem::take(working),
                    result,
                    error,
                );
                let cancel = event.cancel_requested();
                let repeat = event.repeat_requested();
                let updated = event.arguments_updated();
                let (arguments, result, error) = event.into_parts();
                *working = arguments;

                if let Some(source) = error {
                    return Err(RuntimeError::InvocationFailed {
                        plugin_name: metadata.plugin_name.clone(),
                        function_name: metadata.name.clone(),
                        source,
                    });
                }
                if updated {
                    info!(
                        "Arguments updated by invoked handler in pipeline step {}",
                        step
                    );
                }
                if cancel {
                    info!(
                        "Execution was cancelled on function invoked event of pipeline step {}: {}",
                        step,
                        metadata.qualified_name()
                    );
                    return Ok(PipelineExit::Cancelled);
                }
                if repeat {
                    if let Some(limit) = self.config.invocation.max_repeats {
                        if repeats >= limit {
                            return Err(RuntimeError::RepeatLimitExceeded {
                                plugin_name: metadata.plugin_name.clone(),
                                function_name: metadata.name.clone(),
                                limit,
                            });
                        }
                    }
                    repeats += 1;
                    info!(
                        "Execution was repeated on function invoked event of pipeline step {}: {}",
                        step,
                        metadata.qualified_name()
                    );
                    continue;
                }
                if let Some(result) = result {
                    results.push(result);
                }
                break;
            }
        }
        debug!("pipeline finished in {:?}", started.elapsed());
        Ok(PipelineExit::Completed)
    }

    /// Runs the pipeline with the last function streamed.
    ///
    /// Preceding functions execute through the plain pipeline first; the
    /// final function's chunks are forwarded as they arrive while being
    /// aggregated per choice index. When `return_function_results` is set,
    /// one [`StreamMessage::Results`] follows normal completion; cancelled
    /// or skipped runs end the stream without it.
    #[tracing::instrument(level = "debug", skip(self, functions, arguments))]
    pub fn invoke_stream(
        &self,
        functions: Vec<Arc<dyn RuntimeFunction>>,
        arguments: Arguments,
        return_function_results: bool,
    ) -> ReceiverStream<RuntimeResult<StreamMessage>> {
        let (tx, rx) = mpsc::channel(self.config.invocation.stream_buffer.max(1));
        let runtime = self.clone();
        tokio::spawn(async move {
            if let Err(e) = runtime
                .drive_stream(functions, arguments, return_function_results, &tx)
                .await
            {
                let _ = tx.send(Err(e)).await;
            }
        });
        ReceiverStream::new(rx)
    }

    // チャンク転送の本体。受信側が離れたら黙って終了する
    async fn drive_stream(
        &self,
        functions: Vec<Arc<dyn RuntimeFunction>>,
        arguments: Arguments,
        return_function_results: bool,
        tx: &mpsc::Sender<RuntimeResult<StreamMessage>>,
    ) -> RuntimeResult<()> {
        let (stream_function, pipeline_functions) = match functions.split_last() {
            Some(split) => split,
            None => return Err(RuntimeError::EmptyPipeline),
        };

        let mut results = Vec::new();
        let mut working = arguments;
        if let PipelineExit::Cancelled = self
            .run_pipeline(pipeline_functions, &mut working, &mut results)
            .await?
        {
            // 先行ステップが中断されたらストリームは開始しない
            return Ok(());
        }

        let metadata = stream_function.metadata().clone();
        let step = functions.len() - 1;
        let mut repeats: u32 = 0;
        loop {
            let event = self.hooks.fire_invoking(&metadata, working);
            let cancel = event.cancel_requested();
            let skip = event.skip_requested();
            working = event.into_arguments();

            if cancel {
                info!(
                    "Execution was cancelled on function invoking event of pipeline step {}: {}",
                    step,
                    metadata.qualified_name()
                );
                return Ok(());
            }
            if skip {
                info!(
                    "Execution was skipped on function invoking event of pipeline step {}: {}",
                    step,
                    metadata.qualified_name()
                );
                return Ok(());
            }

            let mut aggregator = ChunkAggregator::new();
            let mut error: Option<FunctionError> = None;
            match stream_function.invoke_stream(self, &working).await {
                Ok(mut stream) => {
                    while let Some(item) = stream.next().await {
                        match item {
                            Ok(chunk) => {
                                aggregator.push(chunk.clone());
                                if tx.send(Ok(StreamMessage::Chunk(chunk))).await.is_err() {
                                    return Ok(());
                                }
                            }
                            Err(e) => {
                                // エラーはストリームの終端マーカー
                                error = Some(e);
                                break;
                            }
                        }
                    }
                }
                Err(e) => error = Some(e),
            }

            // choice indexごとの集約から1つの結果を合成する
            let contents: Vec<String> = aggregator
                .into_chunks()
                .into_iter()
                .map(|chunk| chunk.content)
                .collect();
            let value = match contents.len() {
                1 => Value::String(contents.into_iter().next().unwrap_or_default()),
                _ => Value::Array(contents.into_iter().map(Value::String).collect()),
            };
            let synthesized = FunctionResult::new(metadata.clone(), value);

            let event = self
                .hooks
                .fire_invoked(&metadata, working, Some(synthesized), error);
            let cancel = event.cancel_requested();
            let repeat = event.repeat_requested();
            let (arguments, result, error) = event.into_parts();
            working = arguments;

            if let Some(source) = error {
                error!(
                    "Something went wrong in stream function. During function invocation: '{}'. Error description: '{}'",
                    metadata.qualified_name(),
                    source
                );
                return Err(RuntimeError::InvocationFailed {
                    plugin_name: metadata.plugin_name.clone(),
                    function_name: metadata.name.clone(),
                    source,
                });
            }
            if cancel {
                info!(
                    "Execution was cancelled on function invoked event of pipeline step {}: {}",
                    step,
                    metadata.qualified_name()
                );
                return Ok(());
            }
            if repeat {
                if let Some(limit) = self.config.invocation.max_repeats {
                    if repeats >= limit {
                        return Err(RuntimeError::RepeatLimitExceeded {
                            plugin_name: metadata.plugin_name.clone(),
                            function_name: metadata.name.clone(),
                            limit,
                        });
                    }
                }
                repeats += 1;
                info!(
                    "Execution was repeated on function invoked event of pipeline step {}: {}",
                    step,
                    metadata.qualified_name()
                );
                continue;
            }
            if let Some(result) = result {
                results.push(result);
            }
            break;
        }

        if return_function_results {
            let _ = tx.send(Ok(StreamMessage::Results(results))).await;
        }
        Ok(())
    }

    /// Builds a one-off prompt function and runs it through the pipeline.
    ///
    /// The function is registered under a synthesized plugin name so hooks
    /// observe a normal (plugin, function) identity. Custom rendering goes
    /// through [`invoke_prompt_with_template`](Self::invoke_prompt_with_template).
    pub async fn invoke_prompt(
        &self,
        prompt: &str,
        arguments: Arguments,
    ) -> RuntimeResult<Option<FunctionResult>> {
        if prompt.is_empty() {
            return Err(FunctionError::EmptyPrompt.into());
        }
        let plugin_name = format!("p_{}", Uuid::new_v4().simple());
        let function = Arc::new(PromptFunction::from_prompt(plugin_name, "prompt", prompt));
        self.register_function(function.clone())?;
        self.invoke(function, arguments).await
    }

    /// Variant of [`invoke_prompt`](Self::invoke_prompt) rendering through a
    /// caller-supplied template.
    pub async fn invoke_prompt_with_template(
        &self,
        template: Arc<dyn PromptTemplate>,
        arguments: Arguments,
    ) -> RuntimeResult<Option<FunctionResult>> {
        let plugin_name = format!("p_{}", Uuid::new_v4().simple());
        let function = Arc::new(PromptFunction::new(plugin_name, "prompt", template));
        self.register_function(function.clone())?;
        self.invoke(function, arguments).await
    }
}
