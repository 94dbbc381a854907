use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::metadata::FunctionMetadata;
use super::types::FunctionError;

/// Outcome of a single function invocation.
#[derive(Debug, Clone)]
pub struct FunctionResult {
    pub function: FunctionMetadata,
    pub value: Value,
    pub metadata: HashMap<String, Value>,
}

impl FunctionResult {
    pub fn new(function: FunctionMetadata, value: Value) -> Self {
        Self {
            function,
            value,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Deserializes the value into a concrete type.
    pub fn value_as<T: DeserializeOwned>(&self) -> Result<T, FunctionError> {
        serde_json::from_value(self.value.clone())
            .map_err(|e| FunctionError::Execution(format!("Failed to convert result value: {}", e)))
    }
}

impl fmt::Display for FunctionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Value::String(s) => write!(f, "{}", s),
            other => write!(f, "{}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn metadata() -> FunctionMetadata {
        FunctionMetadata::new("math", "add")
    }

    #[test]
    fn test_display_string_value() {
        let result = FunctionResult::new(metadata(), json!("hello"));
        assert_eq!(result.to_string(), "hello");
    }

    #[test]
    fn test_display_non_string_value() {
        let result = FunctionResult::new(metadata(), json!({"total": 5}));
        assert_eq!(result.to_string(), r#"{"total":5}"#);
    }

    #[test]
    fn test_value_as() {
        let result = FunctionResult::new(metadata(), json!(5));
        let value: i64 = result.value_as().unwrap();
        assert_eq!(value, 5);
    }

    #[test]
    fn test_value_as_mismatch() {
        let result = FunctionResult::new(metadata(), json!("not a number"));
        let value: Result<i64, _> = result.value_as();
        assert!(matches!(value, Err(FunctionError::Execution(_))));
    }

    #[test]
    fn test_with_metadata() {
        let result =
            FunctionResult::new(metadata(), json!(1)).with_metadata("model", json!("test-model"));
        assert_eq!(result.metadata.get("model"), Some(&json!("test-model")));
    }
}
