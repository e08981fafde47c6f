/// Errors from compiling or evaluating a filter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    /// The expression could not be parsed.
    #[error("syntax error at offset {position}: {message}")]
    Syntax { position: usize, message: String },

    /// The expression names a field the schema does not declare.
    #[error("undeclared reference to '{0}'")]
    UnknownField(String),

    /// The expression calls a function that does not exist.
    #[error("found no matching overload for '{0}'")]
    UnknownFunction(String),

    /// Operand types do not fit the operator or function.
    #[error("type error: {0}")]
    Type(String),

    /// The expression is well-typed but not a predicate.
    #[error("expression must evaluate to a bool, got {0}")]
    NotBoolean(String),

    /// Evaluation failed for one particular set of values.
    #[error("evaluation error: {0}")]
    Evaluation(String),
}

pub type FilterResult<T> = Result<T, FilterError>;
