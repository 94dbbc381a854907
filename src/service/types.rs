use thiserror::Error;

use super::capability::CapabilityType;

/// AIサービスのエラー
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Service with service_id '{0}' does not exist")]
    ServiceNotFound(String),

    #[error("Service with service_id '{0}' is already registered")]
    DuplicateService(String),

    #[error("Service with service_id '{id}' does not support {capability}")]
    ServiceTypeMismatch {
        id: String,
        capability: CapabilityType,
    },

    #[error("No service found of type {0}")]
    NoServiceOfType(CapabilityType),

    #[error("API error: {0}")]
    ApiError(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
