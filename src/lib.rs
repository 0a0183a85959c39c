//! tasklit: a task and tag HTTP API backed by SQLite.
//!
//! This module exports the core components for testing and integration.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod payload;
pub mod server;
pub mod service;
pub mod types;
