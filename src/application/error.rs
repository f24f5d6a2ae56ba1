use crate::domain::error::DomainError;

/// 呼び出し側に見せるエラー分類。HTTP/MCPの応答コードはここから決まる。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    Conflict,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Domain(DomainError::InvalidArgument(_)) => ErrorKind::InvalidArgument,
            AppError::Domain(DomainError::NotFound(_)) => ErrorKind::NotFound,
            AppError::Domain(DomainError::Conflict { .. }) => ErrorKind::Conflict,
            AppError::Storage(_) => ErrorKind::Internal,
        }
    }
}
