//! Filtered and sorted view of the catalog.
//!
//! `build_view` is the pure function; `CatalogView` recomputes it whenever
//! one of its three inputs changes and publishes the result through a
//! `watch` channel, so consumers always see the latest list.

use std::{cmp::Ordering, sync::Arc};

use tokio::sync::watch::{Receiver, Sender, channel};

use crate::library::models::{SortOrder, Track};

/// Builds the ordered list for `catalog` under `sort` and `filter`.
///
/// The filter is a case-insensitive substring match against title, artist
/// or file name; a blank filter keeps every track. Ties within the sort key
/// are ordered by path.
///
/// # Arguments
///
/// * `catalog` - Every known track.
/// * `sort` - Sort order to apply.
/// * `filter` - Substring filter.
///
/// # Returns
///
/// The filtered, sorted tracks.
#[must_use]
pub fn build_view(catalog: &[Track], sort: SortOrder, filter: &str) -> Vec<Track> {
    let needle = filter.to_lowercase();
    let mut view: Vec<Track> = catalog
        .iter()
        .filter(|track| needle.trim().is_empty() || matches_filter(track, &needle))
        .cloned()
        .collect();
    view.sort_by(|a, b| compare(a, b, sort).then_with(|| a.path.cmp(&b.path)));
    view
}

fn matches_filter(track: &Track, needle: &str) -> bool {
    [track.title.as_str(), track.artist.as_str(), track.file_name()]
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
}

fn compare(a: &Track, b: &Track, sort: SortOrder) -> Ordering {
    match sort {
        SortOrder::DateAdded => b.date_added.cmp(&a.date_added),
        SortOrder::Title => a.title.cmp(&b.title),
        SortOrder::Artist => a.artist.cmp(&b.artist),
        SortOrder::Duration => b.duration_ms.cmp(&a.duration_ms),
    }
}

/// Reactive holder of the catalog view inputs.
#[derive(Debug)]
pub struct CatalogView {
    catalog: Vec<Track>,
    sort: SortOrder,
    filter: String,
    view_tx: Sender<Arc<Vec<Track>>>,
}

impl CatalogView {
    /// Creates a view over `catalog` with the given sort order and no filter.
    #[must_use]
    pub fn new(catalog: Vec<Track>, sort: SortOrder) -> Self {
        let (view_tx, _) = channel(Arc::new(build_view(&catalog, sort, "")));
        Self {
            catalog,
            sort,
            filter: String::new(),
            view_tx,
        }
    }

    /// Replaces the catalog.
    pub fn set_catalog(&mut self, catalog: Vec<Track>) {
        self.catalog = catalog;
        self.publish();
    }

    /// Changes the sort order.
    pub fn set_sort_order(&mut self, sort: SortOrder) {
        self.sort = sort;
        self.publish();
    }

    /// Changes the filter.
    pub fn set_filter(&mut self, filter: impl Into<String>) {
        self.filter = filter.into();
        self.publish();
    }

    /// Current sort order.
    pub fn sort_order(&self) -> SortOrder {
        self.sort
    }

    /// Current filter.
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Number of tracks in the unfiltered catalog.
    pub fn catalog_len(&self) -> usize {
        self.catalog.len()
    }

    /// Latest computed view.
    pub fn current(&self) -> Arc<Vec<Track>> {
        self.view_tx.borrow().clone()
    }

    /// Subscribes to view updates. The receiver starts at the latest view.
    pub fn subscribe(&self) -> Receiver<Arc<Vec<Track>>> {
        self.view_tx.subscribe()
    }

    fn publish(&self) {
        let view = Arc::new(build_view(&self.catalog, self.sort, &self.filter));
        self.view_tx.send_replace(view);
    }
}
