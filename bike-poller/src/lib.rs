//! City bike-share station poller.
//!
//! Polls the BiciMAD (Madrid) and Bicing (Barcelona) station feeds on a
//! fixed interval and keeps only the snapshots that changed. BiciMAD needs
//! an access token, which is cached on disk and refreshed when the provider
//! stops accepting it.

pub mod bicimad;
pub mod bicing;
pub mod collector;
pub mod config;
pub mod fingerprint;
pub mod polling;
pub mod transport;
