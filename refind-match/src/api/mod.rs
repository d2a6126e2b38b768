//! HTTP API handlers for refind-match
//!
//! The trigger surface: four matching operations plus health and the
//! match lifecycle transition.

pub mod health;
pub mod matching;

pub use health::health_routes;
pub use matching::matching_routes;
