use thiserror::Error;

use crate::function::types::{FunctionError, PluginError};
use crate::runtime::RuntimeError;
use crate::service::types::ServiceError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),
    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),
    #[error("Function error: {0}")]
    Function(#[from] FunctionError),
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type InternalResult<T> = Result<T, Error>;

// エラー作成用のヘルパー関数
impl Error {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Error::Internal(message.into())
    }
}
