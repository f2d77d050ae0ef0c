//! Storage infrastructure: the responder's TOML config file.

pub mod config;
