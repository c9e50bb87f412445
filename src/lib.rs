//! Prometheus bridge exporter: polls an application's `/healthz` and `/stats`
//! endpoints on every scrape and re-emits them as gauge metrics.

pub mod collector;
pub mod config;
pub mod server;
pub mod types;
