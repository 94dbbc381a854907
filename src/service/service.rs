use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::config::ExecutionSettings;
use crate::streaming::StreamingChunk;
use crate::timestamp::Timestamp;

use super::capability::{Capabilities, CapabilityType};
use super::types::{ServiceError, ServiceResult};

/// Chunk stream returned by [`AiService::send_message_stream`].
pub type ServiceChunkStream = BoxStream<'static, ServiceResult<StreamingChunk>>;

/// A backing AI service instance, registered by id and resolved by id or
/// capability.
///
/// Entry points default to a capability mismatch so implementations override
/// only what they actually support.
#[async_trait]
pub trait AiService: Send + Sync {
    /// Identifier this service registers under; empty means the default slot.
    fn service_id(&self) -> &str;

    /// Backing model identifier, when one applies.
    fn model_id(&self) -> Option<&str> {
        None
    }

    fn capabilities(&self) -> Capabilities;

    /// Materializes execution settings carrying this service's identity,
    /// ready to attach to arguments before invocation.
    fn execution_settings(&self) -> ExecutionSettings {
        ExecutionSettings {
            service_id: Some(self.service_id().to_string()),
            model: self.model_id().map(str::to_string),
            ..ExecutionSettings::default()
        }
    }

    /// Sends a rendered prompt and returns the completion choices.
    async fn send_message(
        &self,
        _prompt: &str,
        _settings: &ExecutionSettings,
    ) -> ServiceResult<ServiceResponse> {
        Err(ServiceError::ServiceTypeMismatch {
            id: self.service_id().to_string(),
            capability: CapabilityType::TextCompletion,
        })
    }

    /// Streams a completion as incremental chunks.
    async fn send_message_stream(
        &self,
        _prompt: &str,
        _settings: &ExecutionSettings,
    ) -> ServiceResult<ServiceChunkStream> {
        Err(ServiceError::ServiceTypeMismatch {
            id: self.service_id().to_string(),
            capability: CapabilityType::TextCompletion,
        })
    }

    /// Embeds the given texts into vectors.
    async fn generate_embeddings(
        &self,
        _texts: &[String],
        _settings: &ExecutionSettings,
    ) -> ServiceResult<Vec<Vec<f32>>> {
        Err(ServiceError::ServiceTypeMismatch {
            id: self.service_id().to_string(),
            capability: CapabilityType::EmbeddingGeneration,
        })
    }
}

#[derive(Debug, Default, Clone)]
pub struct ServiceResponse {
    /// One completion per choice, ordered by choice index.
    pub contents: Vec<String>,
    pub metadata: ResponseMetadata,
}

#[derive(Debug, Default, Clone)]
pub struct ResponseMetadata {
    pub model: String,
    pub created_at: Timestamp,
    pub token_usage: Option<TokenUsage>,
    pub finish_reason: Option<String>,
}

/// (prompt tokens, completion tokens)
pub type TokenUsage = (usize, usize);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::simple::SimpleCompletionService;

    struct EmbeddingOnlyService;

    #[async_trait]
    impl AiService for EmbeddingOnlyService {
        fn service_id(&self) -> &str {
            "embedding"
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities::from(CapabilityType::EmbeddingGeneration)
        }

        async fn generate_embeddings(
            &self,
            texts: &[String],
            _settings: &ExecutionSettings,
        ) -> ServiceResult<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| vec![t.len() as f32]).collect())
        }
    }

    #[tokio::test]
    async fn test_send_message() {
        let service = SimpleCompletionService::new("test").with_response("Hello", "World");
        let response = service
            .send_message("Hello", &ExecutionSettings::default())
            .await
            .unwrap();
        assert_eq!(response.contents, vec!["World".to_string()]);
    }

    #[tokio::test]
    async fn test_default_send_message_is_mismatch() {
        let service = EmbeddingOnlyService;
        let result = service
            .send_message("Hello", &ExecutionSettings::default())
            .await;
        assert!(matches!(
            result,
            Err(ServiceError::ServiceTypeMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_embeddings_override() {
        let service = EmbeddingOnlyService;
        let vectors = service
            .generate_embeddings(&["abc".to_string()], &ExecutionSettings::default())
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![3.0]]);
    }

    #[test]
    fn test_execution_settings_carry_identity() {
        let service = SimpleCompletionService::new("expert");
        let settings = service.execution_settings();
        assert_eq!(settings.service_id.as_deref(), Some("expert"));
        assert_eq!(settings.model.as_deref(), Some("expert"));
    }
}
