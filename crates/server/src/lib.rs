//! HTTP trigger surface for the lumiere content pipeline.

pub mod api;
pub mod metrics;
pub mod state;
