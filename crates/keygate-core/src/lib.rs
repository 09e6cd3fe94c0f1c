//! keygate-core — domain models, the error taxonomy, and the
//! collaborator traits shared by every other crate.
//!
//! This crate performs no IO.

pub mod error;
pub mod models;
pub mod repository;

pub use error::{Error, Result};
