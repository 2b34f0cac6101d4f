//! Synchronous analytics over survey data.
//!
//! Aggregation, corpus extraction and theme correlation never suspend and
//! are safe to re-run on every input change.

pub mod aggregator;
pub mod correlator;
pub mod corpus;

pub use aggregator::*;
pub use correlator::{label_mismatches, ThemeDetail, ThemeSelection};
pub use corpus::{extract_corpus, TextCorpus};
