//! The reelcraft Error

use crate::{ErrorKind, ErrorStatus};
use std::fmt;

/// A failure anywhere in the content pipeline.
///
/// Carries the [`ErrorKind`], a message fit for an event line, the operation
/// that failed (`stage::image::generate_one`, `client::resolve_api_key`, ...),
/// key/value context such as the slot, model or prompt index, and the wrapped
/// foreign error if there is one.
///
/// ```rust
/// use reelcraft_error::{Error, ErrorKind};
///
/// let err = Error::input_missing("image_prompts")
///     .with_operation("stage::image::fetch_prompts");
///
/// assert_eq!(err.kind(), ErrorKind::InputMissing);
/// assert_eq!(err.context()[0], ("slot", "image_prompts".to_string()));
/// assert!(!err.is_retryable());
/// ```
pub struct Error {
    kind: ErrorKind,
    message: String,
    status: ErrorStatus,
    operation: &'static str,
    context: Vec<(&'static str, String)>,
    source: Option<anyhow::Error>,
}

impl Error {
    /// Status follows the kind: backend transport failures are temporary.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: if kind.is_retryable() {
                ErrorStatus::Temporary
            } else {
                ErrorStatus::Permanent
            },
            operation: "",
            context: Vec::new(),
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> ErrorStatus {
        self.status
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn context(&self) -> &[(&'static str, String)] {
        &self.context
    }

    pub fn source_ref(&self) -> Option<&anyhow::Error> {
        self.source.as_ref()
    }

    pub fn is_retryable(&self) -> bool {
        self.status.is_retryable()
    }

    // =========================================================================
    // Builders
    // =========================================================================

    /// Never worth retrying, whatever the kind says
    pub fn permanent(mut self) -> Self {
        self.status = ErrorStatus::Permanent;
        self
    }

    /// Record the failing operation. An earlier operation is kept in context
    /// under "called", so the chain from helper to stage survives.
    pub fn with_operation(mut self, operation: &'static str) -> Self {
        if !self.operation.is_empty() {
            self.context.push(("called", self.operation.to_string()));
        }
        self.operation = operation;
        self
    }

    pub fn with_context(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.context.push((key, value.into()));
        self
    }

    /// Wrap the foreign error this one was built from. Set at most once.
    pub fn set_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        debug_assert!(self.source.is_none(), "source error already set");
        self.source = Some(source.into());
        self
    }
}

// =============================================================================
// Constructors for the failures the pipeline produces
// =============================================================================

impl Error {
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    /// `slot` is the wire name of the state slot that was absent or empty
    pub fn input_missing(slot: impl Into<String>) -> Self {
        let slot = slot.into();
        Self::new(ErrorKind::InputMissing, format!("slot '{}' is absent or empty", slot))
            .with_context("slot", slot)
    }

    pub fn state_key_mismatch(slot: impl Into<String>, expected: &'static str) -> Self {
        let slot = slot.into();
        Self::new(ErrorKind::StateKeyMismatch, format!("slot '{}' holds {}", slot, expected))
            .with_context("slot", slot)
    }

    pub fn parse_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseFailed, message)
    }

    pub fn empty_response(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::EmptyResponse, message)
    }

    pub fn image_decode_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ImageDecodeFailed, message)
    }
}

// =============================================================================
// Formatting: one line for logs and events, several for `{:?}`
// =============================================================================

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind, self.status)?;
        if !self.operation.is_empty() {
            write!(f, " in {}", self.operation)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if !self.context.is_empty() {
            let pairs: Vec<String> = self.context.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            write!(f, " [{}]", pairs.join(", "))?;
        }
        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({}) in {}", self.kind, self.status, self.operation)?;
        if !self.message.is_empty() {
            writeln!(f, "    Message: {}", self.message)?;
        }
        for (key, value) in &self.context {
            writeln!(f, "    {}: {}", key, value)?;
        }
        if let Some(source) = &self.source {
            writeln!(f, "    Source: {:?}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Filesystem failures while preparing output directories or writing images
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::new(ErrorKind::IoFailed, err.to_string())
            .with_operation("io")
            .set_source(err)
    }
}
