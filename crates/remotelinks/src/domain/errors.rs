//! Domain-specific errors.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("unsupported protocol `{0}`, expected http or https")]
    UnsupportedProtocol(String),
    #[error("invalid provider domain `{0}`")]
    InvalidDomain(String),
    #[error("invalid line range `{0}`")]
    InvalidLineRange(String),
    #[error("invalid auto-pick mode `{0}`, expected default, single or never")]
    InvalidAutoPick(String),
    #[error("unknown remote `{0}`")]
    UnknownRemote(String),
    #[error("unknown provider type `{0}`")]
    UnknownProviderType(String),
    #[error("{provider} cannot build a URL for a {resource}")]
    UnsupportedResource {
        provider: String,
        resource: &'static str,
    },
}
