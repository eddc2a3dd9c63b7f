//! FlareInsure Mirror Backend Library
//!
//! Exposes core modules for use by the binary and tests.

pub mod api;
pub mod models;
pub mod registry;
pub mod weather;
