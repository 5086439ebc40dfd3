//! # Workflows Module
//!
//! End-to-end procedures built on the [`core`](crate::core) data model and the
//! [`engine`](crate::engine) orchestration layer.
//!
//! ## Architecture
//!
//! - **Estimation** ([`estimate`]) - Runs a dataset through a short-lived backend and
//!   in-process server and waits for the result, reporting progress along the way
//! - **Shard Merging** ([`merge`]) - Joins the per-worker result documents of a run into one
//! - **Comparison** ([`compare`]) - Pairs estimates with experiment and computes per-type
//!   error statistics
//!
//! Workflows are synchronous; callers wanting to interrupt a long estimation pass a
//! [`CancellationToken`](crate::engine::client::CancellationToken) to
//! [`estimate::run_cancellable`].

pub mod compare;
pub mod estimate;
pub mod merge;
