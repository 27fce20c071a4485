//! Reelcraft core error helpers
//!
//! Re-exports reelcraft-error and adds constructors for the failures the
//! core produces.

pub use reelcraft_error::{Error, ErrorKind, ErrorStatus, Result};

use crate::provider::ProviderError;

/// Create a ConfigInvalid error for a missing API key
pub fn missing_api_key(env_var: &'static str) -> Error {
    Error::config_invalid(format!("{} environment variable not set.", env_var))
        .with_context("env", env_var)
        .permanent()
}

/// Create an InputMissing error for an absent or empty slot
pub fn input_missing(slot: impl Into<String>) -> Error {
    Error::input_missing(slot)
}

/// Create a ParseFailed error
pub fn parse_error(message: impl Into<String>) -> Error {
    Error::parse_failed(message)
}

/// Create an IoFailed error
pub fn io_error(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::IoFailed, message)
}

/// Create an ImageDecodeFailed error
pub fn image_decode_failed(message: impl Into<String>) -> Error {
    Error::image_decode_failed(message)
}

/// Create a StateKeyMismatch error
pub fn state_key_mismatch(slot: impl Into<String>, expected: &'static str) -> Error {
    Error::state_key_mismatch(slot, expected)
}

/// Create an EmptyResponse error
pub fn empty_response(message: impl Into<String>) -> Error {
    Error::empty_response(message)
}

/// Convert a provider failure into a reelcraft Error.
///
/// The kind follows the provider failure; the provider error itself is kept
/// as the source.
pub fn provider_failed(err: ProviderError, operation: &'static str) -> Error {
    let kind = match &err {
        ProviderError::Network(_) => ErrorKind::NetworkFailed,
        ProviderError::RateLimited { .. } => ErrorKind::RateLimited,
        ProviderError::AuthenticationFailed => ErrorKind::AuthenticationFailed,
        ProviderError::ModelNotFound(_) => ErrorKind::ConfigInvalid,
        ProviderError::InvalidRequest(_) => ErrorKind::InvalidArgument,
        ProviderError::Parse(_) => ErrorKind::ParseFailed,
        ProviderError::Api { status, .. } if *status >= 500 => ErrorKind::ProviderUnavailable,
        ProviderError::Api { .. } | ProviderError::Other(_) => ErrorKind::InferenceFailed,
    };

    let mut error = Error::new(kind, err.to_string()).with_operation(operation);
    if let ProviderError::RateLimited { retry_after: Some(secs) } = &err {
        error = error.with_context("retry_after", secs.to_string());
    }
    error.set_source(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_is_permanent_config_error() {
        let err = missing_api_key("GOOGLE_API_KEY");
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert_eq!(err.message(), "GOOGLE_API_KEY environment variable not set.");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_provider_failed_mapping() {
        let err = provider_failed(ProviderError::Network("reset".into()), "provider::complete");
        assert_eq!(err.kind(), ErrorKind::NetworkFailed);
        assert!(err.is_retryable());
        assert!(err.source_ref().is_some());

        let err = provider_failed(
            ProviderError::RateLimited { retry_after: Some(7) },
            "provider::generate_images",
        );
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert!(err.context().contains(&("retry_after", "7".to_string())));

        let err = provider_failed(
            ProviderError::Api { status: 503, message: "overloaded".into() },
            "provider::complete",
        );
        assert_eq!(err.kind(), ErrorKind::ProviderUnavailable);

        let err = provider_failed(ProviderError::AuthenticationFailed, "provider::complete");
        assert_eq!(err.kind(), ErrorKind::AuthenticationFailed);
        assert!(!err.is_retryable());
    }
}
