use serde_json::Value;

use crate::config::ExecutionSettings;

use super::types::FunctionError;

/// Named values threaded through a pipeline run, plus an optional
/// execution-settings override.
///
/// Entries keep first-insertion order; `set` on an existing name replaces the
/// value in place. Hook handlers may mutate entries or swap the whole value
/// through the event's update mechanism.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    entries: Vec<(String, Value)>,
    settings: Option<ExecutionSettings>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn with_settings(mut self, settings: ExecutionSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.as_str() == name.as_str())
        {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.as_str() == name)
            .map(|(_, value)| value)
    }

    /// Fails with [`FunctionError::MissingArgument`] when the name is absent.
    pub fn require(&self, name: &str) -> Result<&Value, FunctionError> {
        self.get(name)
            .ok_or_else(|| FunctionError::MissingArgument(name.to_string()))
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let position = self
            .entries
            .iter()
            .position(|(existing, _)| existing.as_str() == name)?;
        Some(self.entries.remove(position).1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries
            .iter()
            .any(|(existing, _)| existing.as_str() == name)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn settings(&self) -> Option<&ExecutionSettings> {
        self.settings.as_ref()
    }

    pub fn set_settings(&mut self, settings: ExecutionSettings) {
        self.settings = Some(settings);
    }
}
