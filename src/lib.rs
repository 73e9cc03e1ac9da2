//! # SkillSync
//!
//! A knowledge-sharing backend: knowledge articles, Q&A queries and project
//! communities held in memory, with relevance-ranked search, a stub login
//! flow, document upload, and optional AI-generated answers.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────┐   ┌─────────────────┐
//! │     CLI     │──▶│   HTTP server    │──▶│ skillsync-core  │
//! │ serve/search│   │ axum + sessions  │   │ Store + search  │
//! └─────────────┘   └────────┬─────────┘   └─────────────────┘
//!                            │
//!                            ▼
//!                   ┌──────────────────┐
//!                   │  chat completion │
//!                   │ (OpenAI-compat.) │
//!                   └──────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and env overrides |
//! | [`server`] | HTTP routes and the error envelope |
//! | [`auth`] | Register/login and bearer sessions |
//! | [`upload`] | Multipart file upload |
//! | [`ai`] | Completion providers and prompt building |
//! | [`search`] | `skillsync search` command |

pub mod ai;
pub mod auth;
pub mod config;
pub mod search;
pub mod server;
pub mod upload;
