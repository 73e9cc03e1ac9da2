//! # SkillSync Core
//!
//! Runtime-free logic for SkillSync: the data model, the Porter stemmer and
//! relevance scorer, combined search, dashboard analytics, and the storage
//! abstraction with its in-memory implementation and seed dataset.
//!
//! This crate contains no HTTP, filesystem, or tokio dependencies. The
//! `skillsync` application crate wires it into an axum server.

pub mod models;
pub mod relevance;
pub mod search;
pub mod seed;
pub mod stats;
pub mod stemmer;
pub mod store;
