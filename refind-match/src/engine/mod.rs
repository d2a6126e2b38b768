//! Match engine components
//!
//! Scoring pipeline for lost/found report pairs: independent signal
//! computation (text, image, geo, time, metadata), weighted fusion
//! with threshold admission, and the lifecycle runner that persists
//! admitted pairs.

pub mod fusion;
pub mod geo;
pub mod image_client;
pub mod metadata;
pub mod runner;
pub mod selector;
pub mod temporal;
pub mod text_client;

pub use fusion::{FusionEngine, SignalBundle};
pub use image_client::{HttpImageClient, ImageSimilarity};
pub use runner::{MatchRunner, MatchingStatus, SweepOutcome, TriggerOutcome};
pub use text_client::{HttpTextClient, TextSimilarity};
