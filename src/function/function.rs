use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

use crate::runtime::Runtime;
use crate::streaming::StreamingChunk;

use super::arguments::Arguments;
use super::metadata::FunctionMetadata;
use super::result::FunctionResult;
use super::types::FunctionError;

/// Chunk stream produced by [`RuntimeFunction::invoke_stream`].
pub type FunctionChunkStream = BoxStream<'static, Result<StreamingChunk, FunctionError>>;

/// # Runtime Function Interface
///
/// The `RuntimeFunction` trait is the unit of execution for the runtime.
/// Native Rust closures and prompt functions backed by an AI service both
/// implement it, so pipelines, hooks, and plugins treat them uniformly.
///
/// ## Invocation
///
/// `invoke` runs the function to completion against the current arguments.
/// Functions read their inputs from [`Arguments`] and may resolve services
/// through the passed [`Runtime`].
///
/// ## Streaming
///
/// `invoke_stream` yields incremental [`StreamingChunk`]s as they arrive.
/// Functions without a native streaming path inherit the default adapter,
/// which invokes once and emits the rendered result as a single chunk at
/// choice index 0.
#[async_trait]
pub trait RuntimeFunction: Send + Sync {
    /// Identity and signature of this function.
    fn metadata(&self) -> &FunctionMetadata;

    /// Function name within its plugin.
    fn name(&self) -> &str {
        &self.metadata().name
    }

    /// Name of the plugin this function belongs to.
    fn plugin_name(&self) -> &str {
        &self.metadata().plugin_name
    }

    async fn invoke(
        &self,
        runtime: &Runtime,
        arguments: &Arguments,
    ) -> Result<FunctionResult, FunctionError>;

    async fn invoke_stream(
        &self,
        runtime: &Runtime,
        arguments: &Arguments,
    ) -> Result<FunctionChunkStream, FunctionError> {
        let result = self.invoke(runtime, arguments).await?;
        let chunk = StreamingChunk::new(0, result.to_string());
        let stream: FunctionChunkStream = stream::iter(vec![Ok(chunk)]).boxed();
        Ok(stream)
    }
}
