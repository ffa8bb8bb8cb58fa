//! Core types and the compliance readiness engine behind SOP gap analysis.
//!
//! This crate is deliberately free of HTTP and database dependencies. Storage
//! backends implement the collaborator traits in [`store`]; transport layers
//! drive the [`gap::GapAnalysis`] service.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod clock;
pub mod error;
pub mod facility;
pub mod gap;
pub mod readiness;
pub mod registry;
pub mod requirement;
pub mod review;
pub mod snapshot;
pub mod status;
pub mod store;

pub use error::{Error, Result};
