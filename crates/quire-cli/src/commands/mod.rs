//! CLI command handlers

pub mod config;
pub mod data;
pub mod document;
pub mod status;
pub mod sync;
