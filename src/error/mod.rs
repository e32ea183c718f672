//! Error handling built on `thiserror` and `anyhow`.
//!
//! Domain error enums describe what went wrong in the library, playback and
//! enrichment layers. The operational helpers decide where a failure is
//! absorbed and logged instead of propagated.

pub mod domain;
pub mod operational;

pub use {
    domain::{EnrichmentError, LibraryError, PlaybackError},
    operational::{ErrorReporter, ResultExt},
};
