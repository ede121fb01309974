use thiserror::Error;

/// Reasons a capability cannot be minted
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MintError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Resource path must start with '/': {0:?}")]
    InvalidResourcePath(String),

    #[error("TTL must be positive, got {0} seconds")]
    InvalidTtl(i64),

    /// The token is hyphen-delimited without escaping, so a hyphen inside a
    /// field would make the token ambiguous to parse.
    #[error("{field} must not contain '-'")]
    DelimiterInField { field: &'static str },

    #[error("Client IP must not be empty")]
    MissingClientIp,
}
