//! News Pulse - a live news event aggregator
//!
//! This crate fetches many syndicated feeds concurrently, normalizes their
//! items into a single event schema, and serves the merged result
//! ranked by recency over a JSON API.

pub mod aggregator;
pub mod config;
pub mod fetcher;
pub mod item_extras;
pub mod models;
pub mod normalizer;
pub mod registry;
pub mod routes;
