//! # Federated Search
//!
//! Natural-language search across eight heterogeneous content stores.
//!
//! A free-text query is interpreted by a language model into an
//! [`Intent`](federated_search_core::models::Intent) (which sources, which
//! filters, which keywords, which order), fanned out concurrently to one
//! adapter per source, scored and merged into a single capped list, cached
//! per user for a short TTL, and logged to a per-user search history that
//! also feeds autocomplete and popular searches.
//!
//! ## Architecture
//!
//! ```text
//!                 ┌──────────────┐
//!   query ──────▶ │ SearchEngine │ ◀──── cache (15 min TTL)
//!                 └──────┬───────┘
//!                        ▼
//!                 ┌──────────────┐      ┌──────────────┐
//!                 │ IntentParser │ ───▶ │LLM / fallback│
//!                 └──────┬───────┘      └──────────────┘
//!                        ▼
//!              ┌───────────────────┐
//!              │ QueryOrchestrator │  (JoinSet, per-adapter timeout)
//!              └─────────┬─────────┘
//!        ┌─────┬─────┬───┴──┬──────┬──────┬──────┬──────┐
//!        ▼     ▼     ▼      ▼      ▼      ▼      ▼      ▼
//!      files people events forum stories videos equip suppliers
//!        └─────┴─────┴──────┴──┬───┴──────┴──────┴──────┘
//!                              ▼
//!                         rank (≤ 20) ──▶ history (detached)
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! fsearch init
//! fsearch load forumPosts ./seed/forum.json
//! fsearch search "LED sign installation safety" --user u1
//! fsearch suggest vinyl
//! fsearch serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite content store and filter compilation |
//! | [`cache`] | SQLite result cache |
//! | [`history`] | SQLite search history |
//! | [`llm`] | Language-model client |
//! | [`intent`] | Intent parsing with fallback |
//! | [`adapters`] | Per-source query construction and normalization |
//! | [`orchestrator`] | Concurrent fan-out |
//! | [`engine`] | Search entrypoint |
//! | [`error`] | Errors surfaced to callers |
//! | [`server`] | HTTP API |
//! | [`load`] | Bulk record loading |
//! | [`sources`] | Source listing |
//! | [`search_cmd`] | CLI search, suggest, popular and history output |

pub mod adapters;
pub mod cache;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod history;
pub mod intent;
pub mod llm;
pub mod load;
pub mod migrate;
pub mod orchestrator;
pub mod search_cmd;
pub mod server;
pub mod sources;
pub mod sqlite_store;
