//! # reelcraft-error
//!
//! Unified error handling for every reelcraft crate.
//!
//! ## Design Philosophy
//!
//! - **ErrorKind**: Know what error occurred (e.g., ConfigInvalid, ImageDecodeFailed)
//! - **ErrorStatus**: Decide how to handle it (Permanent or Temporary)
//! - **Error Context**: Assist in locating the cause with rich context
//! - **Error Source**: Wrap underlying errors without leaking raw types
//!
//! ## Usage
//!
//! ```rust
//! use reelcraft_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::InputMissing, "no image prompts in state")
//!         .with_operation("stage::image::run")
//!         .with_context("slot", "image_prompts"))
//! }
//! ```
//!
//! ## Principles
//!
//! - All functions return `Result<T, reelcraft_error::Error>`
//! - External errors are wrapped with `set_source(err)`
//! - Same error handled once, subsequent ops only append context
//! - Don't abuse `From<OtherError>` to prevent raw error leakage

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

/// Result type alias using reelcraft Error
pub type Result<T> = std::result::Result<T, Error>;
