//! # Core Module
//!
//! The data foundation of propest: what a physical property is, how properties are grouped
//! into datasets, which property types are known, and how datasets are curated and exported.
//!
//! ## Architecture
//!
//! - **Data Model** ([`models`]) - Properties, thermodynamic states, substances and datasets
//! - **Property Types** ([`registry`]) - Explicit registry of property types with default units
//!   and supported phases
//! - **Curation** ([`curation`]) - Filters producing smaller datasets from larger ones
//! - **File I/O** ([`io`]) - JSON documents and CSV export
//!
//! Nothing in this module holds process-wide state; every registry or filter is a value the
//! caller constructs and passes in.

pub mod curation;
pub mod io;
pub mod models;
pub mod registry;
