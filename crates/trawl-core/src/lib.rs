//! Core types, identity discipline, and graph storage for trawl.
//!
//! This crate provides the foundational data structures used across all trawl
//! crates:
//! - [`types`] — Graph nodes, relationships, and error types
//! - [`ids`] — Prefix-tagged deterministic identifiers and the scope UUID scheme
//! - [`hash`] — Content hashing (base62 of xxhash64, SHA-256 raw hashes)
//! - [`store`] — The [`GraphStore`](store::GraphStore) trait for graph persistence
//! - [`sqlite`] — SQLite-backed implementation of `GraphStore`
//! - [`config`] — Configuration loading from `.trawl/trawl.json`
//! - [`collab`] — Embedding and vision collaborator traits

pub mod collab;
pub mod config;
pub mod hash;
pub mod ids;
pub mod sqlite;
pub mod store;
pub mod types;
