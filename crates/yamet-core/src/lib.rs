//! Core types, rules and trait definitions for the YAMET therapy-center
//! backend.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! storage backend and the HTTP server both depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod child;
pub mod clinical;
pub mod conversion;
pub mod dashboard;
pub mod error;
pub mod intake;
pub mod lifecycle;
pub mod marketing;
pub mod normalize;
pub mod notification;
pub mod policy;
pub mod settings;
pub mod store;
pub mod user;
pub mod window;

pub use error::{Error, Result};
