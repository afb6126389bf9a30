//! Tag and description suggestions for scanned barcodes.
//!
//! A barcode payload is classified locally, turned into a prompt, and sent to
//! a generative model whose free-form reply is pulled back into at most three
//! tags and a short description. See [`pipeline::Enricher`] for the entry
//! point and [`model::GenerativeModel`] for plugging in a model runtime.
pub mod classify;
pub mod config;
pub mod enrich_log;
pub mod error;
pub mod language;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod prompt;
pub mod response;
pub mod types;

pub use error::{EnrichError, FailureKind};
pub use pipeline::Enricher;
pub use types::{BarcodePayload, EnrichRequest, EnrichmentResult, SuggestedTag};
