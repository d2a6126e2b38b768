//! # Refind Common Library
//!
//! Shared code for the Refind lost & found services including:
//! - Database models and schema setup (reports, matches)
//! - Matching configuration loading and validation
//! - Root folder resolution
//! - Common error types

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
