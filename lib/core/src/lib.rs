//! Core utilities shared by the gatehouse crates.
//!
//! This crate provides the `Result` alias used for layered error reports and
//! the identifier generator used for session IDs and entity IDs.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{IdGenerator, UlidGenerator};
