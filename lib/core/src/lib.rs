//! Core types shared by the shelf-gate crates.
//!
//! This crate holds the error-handling foundation and the session identifier
//! that both the session model and the HTTP layer agree on.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ParseIdError, SessionId};
