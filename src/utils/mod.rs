//! Utility modules.

pub mod file;
pub mod retry;
pub mod text;

pub use file::{file_extension, is_valid_component, sanitize_filename};
pub use retry::{FallbackResult, RetryConfig, RetryResult, Retryable, with_fallback, with_retry};
pub use text::join_nonempty_lines;
