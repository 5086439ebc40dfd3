//! # propest Core Library
//!
//! Orchestration layer for simulation-based physical property estimation: experimental
//! datasets are curated, submitted to an evaluator server that fans the work out over a
//! resource-bound worker pool, polled until complete, and the per-worker result shards are
//! merged back into one dataset for comparison against experiment.
//!
//! ## Architectural Philosophy
//!
//! The library follows the same three-layer split used across our tooling:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`PhysicalProperty`,
//!   `PhysicalPropertyDataSet`), the explicit `PropertyTypeRegistry`, curation filters and
//!   tabular export.
//!
//! - **[`engine`]: The Logic Core.** The stateful orchestration machinery: `ComputeResources`,
//!   `RequestOptions`, the `ComputeBackend` worker pool, the `EvaluatorServer`, its wire
//!   protocol and the `EvaluatorClient`/`Request` polling handles.
//!
//! - **[`workflows`]: The Public API.** End-to-end procedures built on the two lower layers:
//!   running an estimation, merging result shards and comparing estimates with experiment.

pub mod core;
pub mod engine;
pub mod workflows;
