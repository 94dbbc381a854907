//! Configuration types for the runtime and its collaborators.
//!
//! Everything here deserializes from JSON with per-field defaults, so partial
//! configs stay valid as new knobs are added.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, InternalResult};

/// Top-level configuration for a [`Runtime`](crate::runtime::Runtime).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub invocation: InvocationConfig,
}

impl RuntimeConfig {
    // JSONファイルから設定を読み込む
    pub fn from_file<P: AsRef<Path>>(path: P) -> InternalResult<Self> {
        from_file(path)
    }
}

/// Knobs for the invocation pipelines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvocationConfig {
    /// Maximum number of `repeat` requests honored per pipeline step.
    /// `None` leaves repeats unbounded.
    #[serde(default = "default_max_repeats")]
    pub max_repeats: Option<u32>,
    /// Capacity of the channel carrying stream messages to the caller.
    #[serde(default = "default_stream_buffer")]
    pub stream_buffer: usize,
}

impl Default for InvocationConfig {
    fn default() -> Self {
        Self {
            max_repeats: default_max_repeats(),
            stream_buffer: default_stream_buffer(),
        }
    }
}

/// Generation settings attached to [`Arguments`](crate::function::Arguments)
/// or materialized by a service for its own identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionSettings {
    /// Pins resolution to a specific registered service.
    #[serde(default)]
    pub service_id: Option<String>,
    /// Model identifier forwarded to the service.
    #[serde(default)]
    pub model: Option<String>,
    /// 温度パラメータ (0.0-1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// 最大トークン数
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    /// Service-specific knobs passed through untouched.
    #[serde(default)]
    pub extensions: HashMap<String, Value>,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            service_id: None,
            model: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            extensions: HashMap::new(),
        }
    }
}

/// Per-function prompt configuration, the `config.json` of a plugin directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PromptConfig {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub input_variables: Vec<InputVariable>,
    #[serde(default)]
    pub execution_settings: Option<ExecutionSettings>,
}

/// Declared input of a prompt function.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputVariable {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default = "default_true")]
    pub is_required: bool,
}

// デフォルト値の定義
fn default_max_repeats() -> Option<u32> {
    None
}
fn default_stream_buffer() -> usize {
    1
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> usize {
    1000
}
fn default_true() -> bool {
    true
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> InternalResult<T> {
    let file = File::open(path)
        .map_err(|e| Error::Internal(format!("Failed to open config file: {}", e)))?;
    let reader = BufReader::new(file);
    let config = serde_json::from_reader(reader)
        .map_err(|e| Error::Internal(format!("Failed to parse config file: {}", e)))?;
    Ok(config)
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> InternalResult<T> {
    let config = serde_json::from_str(s)
        .map_err(|e| Error::Internal(format!("Failed to parse config: {}", e)))?;
    Ok(config)
}
