/// Errors from parsing and validating core registry values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    /// A resource name does not match the expected pattern.
    #[error("invalid resource name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    /// A single name segment failed identifier validation.
    #[error("invalid identifier {id:?}: {reason}")]
    InvalidIdentifier { id: String, reason: String },

    /// A revision tag failed validation.
    #[error("invalid tag {tag:?}: {reason}")]
    InvalidTag { tag: String, reason: String },

    /// Resource contents could not be decoded for their declared MIME type.
    #[error("invalid contents: {0}")]
    InvalidContents(String),
}

/// Result alias for core type operations.
pub type Result<T> = std::result::Result<T, TypeError>;
