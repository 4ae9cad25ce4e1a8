//! Command implementations for the CLI
//!
//! - start: Run the hub
//! - test: Test configuration validity
//! - config: Configuration display
//! - tables: List topic tables
//! - logs: Show recent records of a table
//! - settings: Read and write persisted settings

pub mod config;
pub mod logs;
pub mod settings;
pub mod start;
pub mod tables;
