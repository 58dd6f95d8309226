//! Core types and the profile normalization & mapping inversion engine.
//!
//! This crate is free of HTTP and database dependencies. Storage backends
//! implement [`store::FormStore`]; the async orchestration in [`service`] and
//! [`resolve`] is generic over that trait.

// Native `async fn` in trait impls; the trait itself names `Send` futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod flatten;
pub mod invert;
pub mod mapping;
pub mod matcher;
pub mod merge;
pub mod profile;
pub mod resolve;
pub mod schema;
pub mod service;
pub mod store;
pub mod value;

pub use error::{Error, Result};
pub use value::{FieldValue, Fields};
