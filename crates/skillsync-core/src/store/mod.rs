//! Storage abstraction for SkillSync.
//!
//! The [`Store`] trait defines every read and write the application needs
//! over the four collections. [`memory::InMemoryStore`] is the only backend:
//! state lives in process memory and is reset on restart.
//!
//! Implementations must be `Send + Sync` so a single instance can be shared
//! by all request handlers. Each method is atomic: a mutation is validated
//! and applied under one write lock.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    Community, CommunityUpdate, KnowledgeFilter, KnowledgeItem, KnowledgeUpdate, NewAnswer,
    NewCommunity, NewKnowledge, NewQuery, NewUser, Query, QueryFilter, QueryUpdate, User,
};

/// Errors surfaced by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record with the given id.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Input failed validation (missing field, bad value, duplicate).
    #[error("{0}")]
    Invalid(String),

    /// The operation is not allowed in the record's current state.
    #[error("{0}")]
    Conflict(String),

    /// Anything else, e.g. a poisoned lock.
    #[error("internal store error: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        StoreError::Invalid(message.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Abstract storage backend for SkillSync.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`list_knowledge`](Store::list_knowledge) | Knowledge items matching exact filters, store order |
/// | [`create_knowledge`](Store::create_knowledge) | Validate and insert a knowledge item |
/// | [`update_knowledge`](Store::update_knowledge) | Partial update by id |
/// | [`like_knowledge`](Store::like_knowledge) | Increment `likes` by one |
/// | [`list_queries`](Store::list_queries) | Queries matching exact filters |
/// | [`answer_query`](Store::answer_query) | `pending → answered`, once |
/// | [`set_ai_answer`](Store::set_ai_answer) | Store generated text verbatim |
/// | [`join_community`](Store::join_community) | Add a member if not already present |
/// | [`create_user`](Store::create_user) | Register an account |
#[async_trait]
pub trait Store: Send + Sync {
    async fn list_knowledge(&self, filter: &KnowledgeFilter) -> StoreResult<Vec<KnowledgeItem>>;

    async fn get_knowledge(&self, id: &str) -> StoreResult<KnowledgeItem>;

    async fn create_knowledge(&self, new: NewKnowledge) -> StoreResult<KnowledgeItem>;

    async fn update_knowledge(&self, id: &str, update: KnowledgeUpdate)
        -> StoreResult<KnowledgeItem>;

    async fn like_knowledge(&self, id: &str) -> StoreResult<KnowledgeItem>;

    async fn list_queries(&self, filter: &QueryFilter) -> StoreResult<Vec<Query>>;

    async fn get_query(&self, id: &str) -> StoreResult<Query>;

    async fn create_query(&self, new: NewQuery) -> StoreResult<Query>;

    /// Edit question or project. Only pending queries can be edited.
    async fn update_query(&self, id: &str, update: QueryUpdate) -> StoreResult<Query>;

    /// Record a human answer. Fails with [`StoreError::Conflict`] if the
    /// query is already answered.
    async fn answer_query(&self, id: &str, answer: NewAnswer) -> StoreResult<Query>;

    /// Store an AI-generated answer without touching `status`.
    async fn set_ai_answer(&self, id: &str, text: String) -> StoreResult<Query>;

    async fn list_communities(&self) -> StoreResult<Vec<Community>>;

    /// First community whose `project` equals `project`.
    async fn find_community_by_project(&self, project: &str) -> StoreResult<Community>;

    async fn create_community(&self, new: NewCommunity) -> StoreResult<Community>;

    async fn update_community(&self, id: &str, update: CommunityUpdate)
        -> StoreResult<Community>;

    async fn join_community(&self, id: &str, member: &str) -> StoreResult<Community>;

    async fn get_user(&self, id: &str) -> StoreResult<User>;

    /// Case-insensitive username lookup. `Ok(None)` when absent.
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    async fn create_user(&self, new: NewUser) -> StoreResult<User>;
}
