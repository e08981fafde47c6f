use apireg_types::TypeError;

/// Errors from building or updating models.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// A request field or mask is unacceptable.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A name, identifier or payload failed validation.
    #[error(transparent)]
    Invalid(#[from] TypeError),
}

pub type ModelResult<T> = Result<T, ModelError>;
