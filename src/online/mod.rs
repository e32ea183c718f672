//! Online lyrics and artwork enrichment.
//!
//! `MetadataClient` talks to the metadata service, `MetadataEnricher`
//! decides when to call it and writes results into the sidecar cache.

pub mod client;
pub mod enrichment;
pub mod inflight;
pub mod models;


pub use {
    client::MetadataClient,
    enrichment::{Candidate, MetadataEnricher, MetadataSource},
    inflight::InFlight,
};
