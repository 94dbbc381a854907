//! Streamed content fragments and their aggregation.
//!
//! While a function streams, every fragment is forwarded to the caller as it
//! arrives and simultaneously folded into a [`ChunkAggregator`], which keeps
//! one accumulated fragment per choice index. After the stream ends the
//! aggregator yields the final contents ordered by choice index.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

/// A partial content fragment produced while streaming a completion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamingChunk {
    /// Which completion choice this fragment belongs to.
    pub choice_index: usize,
    pub content: String,
    pub metadata: HashMap<String, Value>,
}

impl StreamingChunk {
    pub fn new(choice_index: usize, content: impl Into<String>) -> Self {
        Self {
            choice_index,
            content: content.into(),
            metadata: HashMap::new(),
        }
    }

    /// Concatenates a later fragment of the same choice onto this one.
    /// Metadata keys from the later fragment win.
    pub fn append(&mut self, other: &StreamingChunk) {
        self.content.push_str(&other.content);
        self.metadata
            .extend(other.metadata.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

/// Accumulates streamed fragments into one final fragment per choice index.
#[derive(Debug, Default)]
pub struct ChunkAggregator {
    slots: BTreeMap<usize, StreamingChunk>,
}

impl ChunkAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds a fragment into its choice slot, preserving arrival order.
    pub fn push(&mut self, chunk: StreamingChunk) {
        match self.slots.get_mut(&chunk.choice_index) {
            Some(slot) => slot.append(&chunk),
            None => {
                self.slots.insert(chunk.choice_index, chunk);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Final fragments ordered by choice index.
    pub fn into_chunks(self) -> Vec<StreamingChunk> {
        self.slots.into_values().collect()
    }
}
