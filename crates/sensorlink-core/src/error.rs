use thiserror::Error;

/// Shared lightweight error type for core primitive operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Link reported a connection-state code outside the known set.
    #[error("unknown link state code: {0}")]
    UnknownLinkState(u8),
    /// Dialect name could not be parsed.
    #[error("unknown dialect: {0}")]
    UnknownDialect(String),
}
