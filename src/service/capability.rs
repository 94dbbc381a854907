use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// AI service capability classes used for registry resolution.
#[derive(
    Debug,
    Clone,
    Serialize,
    Deserialize,
    Eq,
    PartialEq,
    Hash,
    strum::Display,
    strum::EnumString,
)]
pub enum CapabilityType {
    /// Plain text completion from a rendered prompt
    TextCompletion,
    /// Chat-style completion
    ChatCompletion,
    /// Vector embedding generation
    EmbeddingGeneration,
}

/// Capability管理構造体
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Capabilities {
    capabilities: HashSet<CapabilityType>,
}

impl From<CapabilityType> for Capabilities {
    fn from(capability: CapabilityType) -> Self {
        let mut capabilities = HashSet::new();
        capabilities.insert(capability);
        Self { capabilities }
    }
}

impl From<Vec<CapabilityType>> for Capabilities {
    fn from(capabilities: Vec<CapabilityType>) -> Self {
        Self {
            capabilities: HashSet::from_iter(capabilities),
        }
    }
}

/// Set operations over a service's declared capabilities. Internally a
/// HashSet, so no duplicates and no ordering guarantees on [`list`](Self::list).
impl Capabilities {
    pub fn new(capabilities: HashSet<CapabilityType>) -> Self {
        Self { capabilities }
    }

    pub fn push(&mut self, capability: CapabilityType) {
        self.capabilities.insert(capability);
    }

    pub fn supports(&self, capability: &CapabilityType) -> bool {
        self.capabilities.contains(capability)
    }

    pub fn supports_all(&self, capabilities: &[CapabilityType]) -> bool {
        capabilities.iter().all(|c| self.capabilities.contains(c))
    }

    pub fn supports_any(&self, capabilities: &[CapabilityType]) -> bool {
        capabilities.iter().any(|c| self.capabilities.contains(c))
    }

    pub fn list(&self) -> Vec<&CapabilityType> {
        self.capabilities.iter().collect()
    }

    /// Union of two capability sets.
    pub fn or(&self, other: Capabilities) -> Capabilities {
        let mut merged = self.capabilities.clone();
        merged.extend(other.capabilities.iter().cloned());
        Capabilities::new(merged)
    }
}
