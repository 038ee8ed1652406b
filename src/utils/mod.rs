//! Configuration utilities.

/// `delve.toml` parsing, validation and hot reload.
pub mod toml_config;
