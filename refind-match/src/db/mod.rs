//! Database operations for the match engine
//!
//! Typed query modules over the shared refind.db schema.

pub mod matches;
pub mod reports;
