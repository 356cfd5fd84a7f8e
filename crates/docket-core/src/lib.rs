//! Core types and trait definitions for the Docket incident register.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod access;
pub mod error;
pub mod model;
pub mod participants;
pub mod report;
pub mod store;

pub use error::{Error, Result};
