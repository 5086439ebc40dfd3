//! Reading and writing property documents.
//!
//! Datasets and request results are stored as JSON documents (see [`json`]); datasets can
//! additionally be flattened into a CSV table for inspection (see [`table`]).

pub mod json;
pub mod table;
