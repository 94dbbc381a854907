use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use tracing::debug;

use crate::config::ExecutionSettings;
use crate::streaming::StreamingChunk;
use crate::timestamp::Timestamp;

use super::capability::{Capabilities, CapabilityType};
use super::service::{AiService, ResponseMetadata, ServiceChunkStream, ServiceResponse};
use super::types::{ServiceError, ServiceResult};

type Pattern = String;

type Answer = String;

type KnowledgeBase = DashMap<Pattern, Answer>;

/// Canned-response completion service: answers with the first configured
/// response whose pattern occurs in the prompt. Streams by splitting the
/// answer into fixed-size fragments.
#[derive(Clone)]
pub struct SimpleCompletionService {
    service_id: String,
    knowledge_base: Arc<KnowledgeBase>,
    chunk_size: usize,
}

impl SimpleCompletionService {
    pub fn new(service_id: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            knowledge_base: Arc::new(DashMap::new()),
            chunk_size: 4,
        }
    }

    pub fn with_response(self, pattern: impl Into<String>, answer: impl Into<String>) -> Self {
        self.knowledge_base.insert(pattern.into(), answer.into());
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    // find content include pattern
    fn answer(&self, prompt: &str) -> ServiceResult<String> {
        let responses: Vec<String> = self
            .knowledge_base
            .iter()
            .filter(|entry| prompt.contains(entry.key()))
            .map(|entry| entry.value().clone())
            .collect::<Vec<String>>();
        if responses.is_empty() {
            return Err(ServiceError::ApiError("No response found".to_string()));
        }
        debug!("response: {:?}", responses);
        Ok(responses[0].clone())
    }
}

#[async_trait]
impl AiService for SimpleCompletionService {
    fn service_id(&self) -> &str {
        &self.service_id
    }

    fn model_id(&self) -> Option<&str> {
        Some(&self.service_id)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::from(vec![
            CapabilityType::TextCompletion,
            CapabilityType::ChatCompletion,
        ])
    }

    async fn send_message(
        &self,
        prompt: &str,
        _settings: &ExecutionSettings,
    ) -> ServiceResult<ServiceResponse> {
        let answer = self.answer(prompt)?;
        Ok(ServiceResponse {
            contents: vec![answer],
            metadata: ResponseMetadata {
                model: self.service_id.clone(),
                created_at: Timestamp::now(),
                token_usage: None,
                finish_reason: None,
            },
        })
    }

    async fn send_message_stream(
        &self,
        prompt: &str,
        _settings: &ExecutionSettings,
    ) -> ServiceResult<ServiceChunkStream> {
        let answer = self.answer(prompt)?;
        let fragments: Vec<ServiceResult<StreamingChunk>> = answer
            .chars()
            .collect::<Vec<char>>()
            .chunks(self.chunk_size)
            .map(|piece| Ok(StreamingChunk::new(0, piece.iter().collect::<String>())))
            .collect();
        Ok(stream::iter(fragments).boxed())
    }
}
