//! Operational error context propagation with `anyhow`.
//!
//! Most failures in the player are absorbed where they happen and surface
//! only as an absent result. `ErrorReporter::absorb` is that single point:
//! it logs the failure with its context and hands back `None`.

use std::{error::Error as StdError, fmt::Display};

use {
    anyhow::{Context, Result as AnyhowResult},
    tracing::{debug, warn},
};

/// Extension trait for enhanced error context at the binary edge.
pub trait ResultExt<T, E> {
    /// Adds context to an error with a static string.
    fn add_context(self, context: &'static str) -> AnyhowResult<T>
    where
        E: StdError + Send + Sync + 'static;

    /// Adds context to an error with a formatted string.
    fn add_contextf(self, format: impl Display) -> AnyhowResult<T>
    where
        E: StdError + Send + Sync + 'static;
}

impl<T, E> ResultExt<T, E> for Result<T, E> {
    fn add_context(self, context: &'static str) -> AnyhowResult<T>
    where
        E: StdError + Send + Sync + 'static,
    {
        self.context(context)
    }

    fn add_contextf(self, format: impl Display) -> AnyhowResult<T>
    where
        E: StdError + Send + Sync + 'static,
    {
        self.context(format.to_string())
    }
}

/// Centralized logging for failures that are treated as "no data".
pub struct ErrorReporter;

impl ErrorReporter {
    /// Logs a failure at warning level and converts the result to an option.
    ///
    /// # Arguments
    ///
    /// * `result` - The fallible result to absorb.
    /// * `context` - Short description of the operation that failed.
    ///
    /// # Returns
    ///
    /// `Some(value)` on success, `None` after logging on failure.
    pub fn absorb<T, E: Display>(result: Result<T, E>, context: &str) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(context = context, error = %error, "Operation failed, treating as absent");
                None
            }
        }
    }

    /// Same as [`ErrorReporter::absorb`] but logs at debug level.
    ///
    /// Used for expected absences such as a missing sidecar file.
    pub fn absorb_quietly<T, E: Display>(result: Result<T, E>, context: &str) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                debug!(context = context, error = %error, "Operation failed, treating as absent");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        error::Error,
        fmt::{Display, Formatter, Result as FmtResult},
    };

    use crate::error::operational::{ErrorReporter, ResultExt};

    #[derive(Debug)]
    struct TestError;

    impl Display for TestError {
        fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
            write!(f, "Test error")
        }
    }

    impl Error for TestError {}

    #[test]
    fn test_result_ext_with_context() {
        let result: Result<i32, TestError> = Err(TestError);
        let error = result.add_context("Opening library").unwrap_err();
        assert!(error.to_string().contains("Opening library"));
    }

    #[test]
    fn test_result_ext_with_contextf() {
        let result: Result<i32, TestError> = Err(TestError);
        let error = result
            .add_contextf(format_args!("Scanning {}", "/music"))
            .unwrap_err();
        assert!(error.to_string().contains("Scanning /music"));
    }

    #[test]
    fn test_absorb_passes_values_through() {
        let ok: Result<u8, TestError> = Ok(7);
        assert_eq!(ErrorReporter::absorb(ok, "ok"), Some(7));
    }

    #[test]
    fn test_absorb_turns_failures_into_none() {
        let failed: Result<u8, TestError> = Err(TestError);
        assert_eq!(ErrorReporter::absorb(failed, "lyrics fetch"), None);

        let failed: Result<u8, TestError> = Err(TestError);
        assert_eq!(ErrorReporter::absorb_quietly(failed, "sidecar read"), None);
    }
}
