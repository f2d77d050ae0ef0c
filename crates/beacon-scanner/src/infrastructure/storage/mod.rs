//! Storage infrastructure: the scanner's TOML config file.
//!
//! Keeping file handling here means the scanners and the monitor only ever
//! see plain settings structs and never touch the file system.

pub mod config;
