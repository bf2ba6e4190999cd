use apollo_compiler::Name;

/// Create an internal error.
///
/// # Example
/// ```rust
/// use graphql_query_pagination::internal_error;
/// use graphql_query_pagination::error::PaginationError;
/// # fn may_be_none() -> Option<()> { None }
///
/// const NAME: &str = "the thing";
/// let result: Result<(), PaginationError> = may_be_none()
///     .ok_or_else(|| internal_error!("Expected {NAME} to be Some"));
/// ```
#[macro_export]
macro_rules! internal_error {
    ( $( $arg:tt )+ ) => {
        $crate::error::PaginationError::internal(format!( $( $arg )+ ))
    }
}

/// Break out of the current function, returning an internal error.
///
/// # Example
/// ```rust
/// use graphql_query_pagination::bail;
/// use graphql_query_pagination::error::PaginationError;
///
/// fn example() -> Result<(), PaginationError> {
///     bail!("Something went horribly wrong");
///     unreachable!()
/// }
/// #
/// # _ = example();
/// ```
#[macro_export]
macro_rules! bail {
    ( $( $arg:tt )+ ) => {
        return Err($crate::internal_error!( $( $arg )+ ))
    }
}

/// Fatal failures of the pagination core.
///
/// Advisories (the non-fatal "cannot paginate" diagnostics) are deliberately
/// not represented here: they are first-class return values of the planner,
/// not errors. See `planning::PaginationAdvisory`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaginationError {
    #[error("invalid GraphQL query: {message}")]
    InvalidQuery { message: String },
    #[error("pagination field \"{field}\" does not exist on vertex type \"{vertex_type}\"")]
    SchemaMismatch { vertex_type: Name, field: Name },
    #[error("query shape not supported for pagination: {message}")]
    AstShapeUnsupported { message: String },
    #[error("internal invariant violated: {message}")]
    InternalInvariantViolated { message: String },
}

impl PaginationError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalInvariantViolated {
            message: message.into(),
        }
    }
}
