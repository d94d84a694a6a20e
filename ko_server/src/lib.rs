//! HTTP and WebSocket front end for the knockout contest engine.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
