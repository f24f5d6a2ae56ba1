use super::model::id::BookId;

#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("book not found: {0}")]
    NotFound(BookId),

    #[error("duplicate book: '{title}' by '{author}' already exists")]
    Conflict { title: String, author: String },
}

impl DomainError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
