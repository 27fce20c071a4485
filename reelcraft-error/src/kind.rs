//! What went wrong, grouped by the part of the pipeline that failed

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // =========================================================================
    // Configuration
    // =========================================================================
    /// Missing API key, unknown model, unusable client settings
    ConfigInvalid,

    /// The backend rejected a request as malformed, or a caller passed an
    /// unknown name
    InvalidArgument,

    // =========================================================================
    // Pipeline state
    // =========================================================================
    /// A stage found nothing usable in the slot it reads
    InputMissing,

    /// A value was written to a slot that cannot hold it
    StateKeyMismatch,

    /// Slot content (or a backend payload) could not be parsed
    ParseFailed,

    // =========================================================================
    // Backend
    // =========================================================================
    /// The backend failed to produce a completion
    InferenceFailed,

    /// The backend answered without any content
    EmptyResponse,

    /// 5xx from the backend
    ProviderUnavailable,

    RateLimited,

    AuthenticationFailed,

    NetworkFailed,

    // =========================================================================
    // Images on disk
    // =========================================================================
    /// Returned bytes are not a decodable image
    ImageDecodeFailed,

    /// Creating directories or writing image files failed
    IoFailed,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ConfigInvalid => "ConfigInvalid",
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::InputMissing => "InputMissing",
            ErrorKind::StateKeyMismatch => "StateKeyMismatch",
            ErrorKind::ParseFailed => "ParseFailed",
            ErrorKind::InferenceFailed => "InferenceFailed",
            ErrorKind::EmptyResponse => "EmptyResponse",
            ErrorKind::ProviderUnavailable => "ProviderUnavailable",
            ErrorKind::RateLimited => "RateLimited",
            ErrorKind::AuthenticationFailed => "AuthenticationFailed",
            ErrorKind::NetworkFailed => "NetworkFailed",
            ErrorKind::ImageDecodeFailed => "ImageDecodeFailed",
            ErrorKind::IoFailed => "IoFailed",
        }
    }

    /// Transport-level backend failures; a later attempt may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::InferenceFailed
                | ErrorKind::NetworkFailed
                | ErrorKind::RateLimited
                | ErrorKind::ProviderUnavailable
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
