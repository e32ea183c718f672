//! Observable state shared between the playback task and its consumers.
//!
//! `AppState` carries the latest session, position and equalizer values;
//! `CatalogView` carries the ordered track list.

pub mod app_state;
pub mod catalog_view;

pub use {
    app_state::{AppState, AppStateEvent, PositionState},
    catalog_view::{CatalogView, build_view},
};
