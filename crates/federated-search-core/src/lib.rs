//! # Federated Search Core
//!
//! Runtime-agnostic logic for Federated Search: the intent and result data
//! model, intent coercion with its deterministic fallback, the relevance
//! ranker, and the storage traits (content, cache, history) together with
//! in-memory implementations.
//!
//! This crate contains no tokio, sqlx, or HTTP dependencies. The application
//! crate supplies SQLite-backed stores, the language-model client, and the
//! concurrent fan-out.

pub mod cache;
pub mod history;
pub mod intent;
pub mod models;
pub mod rank;
pub mod store;
