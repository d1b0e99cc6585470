use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid tenant id: {0:?}")]
    InvalidTenantId(String),
    #[error("invalid mapping configuration id: {0:?}")]
    InvalidMappingConfigId(String),
    #[error("invalid rule id: {0:?}")]
    InvalidRuleId(String),
    #[error("invalid file import id: {0:?}")]
    InvalidFileImportId(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
