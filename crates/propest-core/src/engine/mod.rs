//! # Engine Module
//!
//! The stateful orchestration layer of propest: it turns a curated dataset plus calculation
//! options into simulation tasks, runs them on a pool of resource-bound workers, and keeps
//! per-request state that clients poll until the request is finished.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Builders for backend, server and estimation settings
//! - **Resources** ([`resources`]) - Threads, GPUs and GPU toolkit assigned to each worker
//! - **Request Options** ([`options`]) - Ordered calculation layers and per-type schemas
//! - **Calculation Layers** ([`layers`], [`command`]) - Estimation strategies and the
//!   simulation engines behind them, including one that drives an external program
//! - **Worker Pool** ([`backend`]) - The `ComputeBackend` task queue and its workers
//! - **Server** ([`server`], [`protocol`]) - Request dispatch, aggregation and the TCP framing
//! - **Client** ([`client`]) - Submission and the polling `Request` handle
//! - **Results** ([`results`]) - Request status, per-property failures and result documents
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress reporting
//! - **Error Handling** ([`error`]) - Task, backend, server and client error types
//!
//! ## Failure Model
//!
//! A failure while estimating one property never fails the request it belongs to: it is
//! recorded as an exception next to the property. Only request-level faults (malformed
//! options, none of the requested layers available, no backend to run on) mark a request as
//! errored, and only transport problems surface as errors on the client.

pub mod backend;
pub mod client;
pub mod command;
pub mod config;
pub mod error;
pub mod forcefield;
pub mod layers;
pub mod options;
pub mod progress;
pub mod protocol;
pub mod resources;
pub mod results;
pub mod server;

#[cfg(test)]
pub(crate) mod testing;
