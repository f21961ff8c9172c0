//! Core library: article extraction, taxonomy tagging, embedding index,
//! semantic retrieval, and tiered answer routing over a fixed rules text.

pub mod classifier;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod index;
pub mod retriever;
pub mod router;
pub mod taxonomy;
