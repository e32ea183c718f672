//! Domain-specific error types using `thiserror`.
//!
//! This module defines the main error enums for the catalog store,
//! the playback coordinator and the online metadata enrichment.

use std::io::Error as IoError;

use {reqwest::Error as HttpError, sqlx::Error as SqlxError, thiserror::Error};

use crate::{
    audio::{engine::EngineError, equalizer::EqualizerError},
    config::preferences::PreferenceError,
    library::schema::SchemaError,
};

/// Catalog store and filesystem errors.
#[derive(Error, Debug)]
pub enum LibraryError {
    /// Database connection or query error.
    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),
    /// Schema initialization error.
    #[error("Schema error: {0}")]
    SchemaError(#[from] SchemaError),
    /// Filesystem error while scanning or removing files.
    #[error("IO error: {0}")]
    IoError(#[from] IoError),
    /// Invalid file path or metadata.
    #[error("Invalid data: {reason}")]
    InvalidData { reason: String },
    /// Record not found.
    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },
}

impl LibraryError {
    /// Builds an `InvalidData` error from any displayable reason.
    pub fn invalid_data(reason: impl Into<String>) -> Self {
        Self::InvalidData {
            reason: reason.into(),
        }
    }
}

/// Playback coordinator errors.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// The decoder collaborator rejected an operation.
    #[error("Engine error: {0}")]
    EngineError(#[from] EngineError),
    /// Persisting session state failed.
    #[error("Preference error: {0}")]
    PreferenceError(#[from] PreferenceError),
    /// An equalizer change was rejected.
    #[error("Equalizer error: {0}")]
    EqualizerError(#[from] EqualizerError),
    /// The requested track is not part of the active list.
    #[error("Track {id} is not in the active list")]
    NotInPlaylist { id: String },
    /// The active list is empty.
    #[error("Active list is empty")]
    EmptyPlaylist,
}

/// Online metadata enrichment errors.
#[derive(Error, Debug)]
pub enum EnrichmentError {
    /// Transport or body decoding failure.
    #[error("HTTP error: {0}")]
    HttpError(#[from] HttpError),
    /// The server answered with a non-success status.
    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },
    /// The response carried no usable payload.
    #[error("Empty response from {url}")]
    EmptyBody { url: String },
    /// The search produced no candidates.
    #[error("No candidates for \"{keywords}\"")]
    NoCandidates { keywords: String },
    /// Writing the sidecar file failed.
    #[error("IO error: {0}")]
    IoError(#[from] IoError),
    /// Recording the result in the catalog failed.
    #[error("Library error: {0}")]
    LibraryError(#[from] LibraryError),
}
