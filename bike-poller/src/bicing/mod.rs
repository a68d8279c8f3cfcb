//! Bicing (Barcelona) anonymous station feed.

mod client;
mod types;

pub use client::{BicingClient, BicingConfig, BicingError, BicingSnapshot, DEFAULT_URL};
pub use types::BicingStation;
