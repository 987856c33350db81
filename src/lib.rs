//! market-tracker: market price ingestion with change-only history
//!
//! This library provides the core components for:
//! - Fetching gold, currency and crypto quotes from the upstream market API
//! - Change-detecting upserts into a current-price table and history log
//! - A fixed-interval ingestion scheduler with overlap protection
//! - A broadcast hub that fans updates out to WebSocket subscribers
//! - REST queries over current prices and per-symbol timelines

pub mod api;
pub mod cli;
pub mod config;
pub mod hub;
pub mod ingest;
pub mod market;
pub mod price;
pub mod store;
pub mod telemetry;
