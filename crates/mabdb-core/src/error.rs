//! Error taxonomy shared by the query engine and its front ends

/// Error from validating or executing a single request.
///
/// Numeric edge cases in the relative-risk statistic are not represented
/// here; they degrade to null fields (see [`crate::RelativeRisk`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Unknown table, attribute outside the allow-list, malformed payload.
    /// Always raised before the store is touched.
    Validation(String),
    /// Filters matched nothing where an empty result is not an answer.
    NotFound(String),
    /// The backing store is missing or cannot be opened.
    StoreUnavailable(String),
    /// A statement failed while executing against the store.
    Store(String),
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "invalid request: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::StoreUnavailable(msg) => write!(f, "store unavailable: {msg}"),
            Self::Store(msg) => write!(f, "query failed: {msg}"),
        }
    }
}

impl std::error::Error for QueryError {}

impl QueryError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Wrap a store-level failure, prefixed with the operation that failed.
    pub fn store(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Store(format!("{context}: {err}"))
    }

    /// Stable machine-readable reason.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::Store(_) => "store",
        }
    }

    /// Rejected input, as opposed to a service-side failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(QueryError::validation("x").code(), "validation");
        assert_eq!(QueryError::NotFound("x".into()).code(), "not_found");
        assert_eq!(
            QueryError::StoreUnavailable("x".into()).code(),
            "store_unavailable"
        );
        assert_eq!(QueryError::store("count", "boom").code(), "store");
    }

    #[test]
    fn store_error_carries_context() {
        let err = QueryError::store("distribution", "Catalog Error: no table");
        assert_eq!(
            err.to_string(),
            "query failed: distribution: Catalog Error: no table"
        );
    }

    #[test]
    fn client_errors() {
        assert!(QueryError::validation("bad").is_client_error());
        assert!(QueryError::NotFound("none".into()).is_client_error());
        assert!(!QueryError::StoreUnavailable("gone".into()).is_client_error());
        assert!(!QueryError::store("q", "e").is_client_error());
    }
}
