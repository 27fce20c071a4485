//! Instruction template loading
//!
//! A missing or unreadable template is never fatal: the caller's default is
//! returned and the problem is logged.

use std::path::Path;

/// Fallback used when no better default is available
pub const DEFAULT_INSTRUCTION: &str = "Default instruction.";

/// Read `base_dir/filename`, or return `default` if that fails.
pub fn load_instruction_from_file(base_dir: impl AsRef<Path>, filename: &str, default: &str) -> String {
    let path = base_dir.as_ref().join(filename);

    match std::fs::read_to_string(&path) {
        Ok(content) => {
            tracing::info!(file = filename, "Successfully loaded instruction from {}.", filename);
            content
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(
                path = %path.display(),
                "Instruction file not found {}. Using default instruction.",
                filename
            );
            default.to_string()
        }
        Err(e) => {
            tracing::error!(
                path = %path.display(),
                error = %e,
                "Failed loading {}. Using default instruction.",
                filename
            );
            default.to_string()
        }
    }
}
