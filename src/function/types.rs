use thiserror::Error;

use crate::service::types::ServiceError;

/// プラグイン登録・検索のエラー
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("Plugin '{0}' not found")]
    PluginNotFound(String),

    #[error("Function '{function_name}' not found in plugin '{plugin_name}'")]
    FunctionNotFound {
        plugin_name: String,
        function_name: String,
    },

    #[error("Function '{function_name}' is already registered in plugin '{plugin_name}'")]
    DuplicateFunctionName {
        plugin_name: String,
        function_name: String,
    },

    #[error("Plugin directory does not exist: {0}")]
    PluginDirectoryNotFound(String),

    #[error("Failed to load plugin from {path}: {message}")]
    PluginLoad { path: String, message: String },
}

pub type PluginResult<T> = Result<T, PluginError>;

/// Faults raised while executing a single function. The pipeline catches
/// these and hands them to the invoked hook phase as data.
#[derive(Debug, Error)]
pub enum FunctionError {
    #[error("The prompt is either null or empty")]
    EmptyPrompt,

    #[error("Missing required argument '{0}'")]
    MissingArgument(String),

    #[error("Failed to render prompt template: {0}")]
    TemplateRender(String),

    #[error("Function execution failed: {0}")]
    Execution(String),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),
}
