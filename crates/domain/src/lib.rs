//! Shared types for the cronkit workspace: the error enum and the TOML
//! configuration model.

pub mod config;
pub mod error;

pub use error::{Error, Result};
