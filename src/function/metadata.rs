use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::InputVariable;

/// Identity and signature of a registered function. The
/// `(plugin_name, name)` pair is the identity the pipeline and hooks observe.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FunctionMetadata {
    pub plugin_name: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Vec<ParameterMetadata>,
    /// True when the function renders a prompt against a service.
    #[serde(default)]
    pub is_prompt: bool,
}

impl FunctionMetadata {
    pub fn new(plugin_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// `plugin.function` form used in logs and errors.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.plugin_name, self.name)
    }
}

/// Declared parameter of a function.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParameterMetadata {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default_value: Option<Value>,
    #[serde(default = "default_required")]
    pub is_required: bool,
}

impl ParameterMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            default_value: None,
            is_required: default_required(),
        }
    }
}

impl From<InputVariable> for ParameterMetadata {
    fn from(variable: InputVariable) -> Self {
        Self {
            name: variable.name,
            description: variable.description,
            default_value: variable.default,
            is_required: variable.is_required,
        }
    }
}

fn default_required() -> bool {
    true
}
