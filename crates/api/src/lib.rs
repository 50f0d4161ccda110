//! HTTP API: configuration, identity extraction, routing, and error mapping.

pub mod app;
pub mod config;
pub mod middleware;
