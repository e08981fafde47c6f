use apireg_filter::FilterError;
use apireg_models::ModelError;
use apireg_store::StoreError;
use apireg_types::TypeError;

/// Transport-neutral status code of a [`RegistryError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Code {
    NotFound,
    AlreadyExists,
    InvalidArgument,
    Internal,
}

/// Errors returned by registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The entity or one of its parents does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// A create collided with an existing entity.
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// Malformed name, filter, page token, field mask, page size or tag.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Storage or serialization failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RegistryError {
    /// Status code for transports.
    pub fn code(&self) -> Code {
        match self {
            Self::NotFound(_) => Code::NotFound,
            Self::AlreadyExists(_) => Code::AlreadyExists,
            Self::InvalidArgument(_) => Code::InvalidArgument,
            Self::Internal(_) => Code::Internal,
        }
    }
}

impl From<StoreError> for RegistryError {
    fn from(e: StoreError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<FilterError> for RegistryError {
    fn from(e: FilterError) -> Self {
        Self::InvalidArgument(e.to_string())
    }
}

impl From<ModelError> for RegistryError {
    fn from(e: ModelError) -> Self {
        Self::InvalidArgument(e.to_string())
    }
}

impl From<TypeError> for RegistryError {
    fn from(e: TypeError) -> Self {
        Self::InvalidArgument(e.to_string())
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_pick_codes() {
        let store: RegistryError = StoreError::Serialization("bad".into()).into();
        assert_eq!(store.code(), Code::Internal);

        let filter: RegistryError = FilterError::UnknownField("x".into()).into();
        assert_eq!(filter.code(), Code::InvalidArgument);

        let model: RegistryError = ModelError::InvalidArgument("mask".into()).into();
        assert_eq!(model.code(), Code::InvalidArgument);
    }
}
