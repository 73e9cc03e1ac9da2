//! Core data models used throughout SkillSync.
//!
//! These are the records held by the [`Store`](crate::store::Store) and
//! returned by the HTTP API. Field names serialize in camelCase so the
//! browser client can consume them unchanged.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Returned when a string does not name a known enum variant.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind} '{value}', expected one of: {expected}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}

/// Kind of knowledge article.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KnowledgeType {
    #[default]
    Knowledge,
    /// Standard Operating Procedure.
    Sop,
    BestPractice,
    Experience,
}

impl KnowledgeType {
    pub const ALL: [KnowledgeType; 4] = [
        KnowledgeType::Knowledge,
        KnowledgeType::Sop,
        KnowledgeType::BestPractice,
        KnowledgeType::Experience,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KnowledgeType::Knowledge => "knowledge",
            KnowledgeType::Sop => "sop",
            KnowledgeType::BestPractice => "best-practice",
            KnowledgeType::Experience => "experience",
        }
    }
}

impl fmt::Display for KnowledgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KnowledgeType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KnowledgeType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "knowledge type",
                value: s.to_string(),
                expected: "knowledge, sop, best-practice, experience",
            })
    }
}

/// Lifecycle of a query. The only transition is `Pending → Answered`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    #[default]
    Pending,
    Answered,
}

impl QueryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryStatus::Pending => "pending",
            QueryStatus::Answered => "answered",
        }
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(QueryStatus::Pending),
            "answered" => Ok(QueryStatus::Answered),
            _ => Err(ParseEnumError {
                kind: "query status",
                value: s.to_string(),
                expected: "pending, answered",
            }),
        }
    }
}

/// Account role. Registration always creates `user`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

/// A file previously accepted by the upload endpoint and linked to an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    /// Name of the stored file inside the upload directory.
    pub filename: String,
    pub original_name: String,
    pub mimetype: String,
    pub size: u64,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeItem {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub author: String,
    pub project: String,
    #[serde(rename = "type")]
    pub kind: KnowledgeType,
    pub created_at: DateTime<Utc>,
    pub likes: u64,
    pub attachments: Vec<Attachment>,
}

impl KnowledgeItem {
    /// Text the relevance scorer sees: title, body, then tags.
    pub fn searchable_text(&self) -> String {
        let mut text = format!("{} {}", self.title, self.content);
        for tag in &self.tags {
            text.push(' ');
            text.push_str(tag);
        }
        text
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub id: String,
    pub question: String,
    pub answer: Option<String>,
    pub author: String,
    pub answered_by: Option<String>,
    pub project: String,
    pub created_at: DateTime<Utc>,
    pub status: QueryStatus,
    pub ai_answer: Option<String>,
}

impl Query {
    pub fn searchable_text(&self) -> String {
        let mut text = self.question.clone();
        for part in [&self.answer, &self.ai_answer].into_iter().flatten() {
            text.push(' ');
            text.push_str(part);
        }
        text
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Community {
    pub id: String,
    pub name: String,
    pub project: String,
    pub members: Vec<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

/// An account. The password is a plaintext placeholder and never serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

// ============ Inputs ============

#[derive(Debug, Clone, Default)]
pub struct NewKnowledge {
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub author: String,
    pub project: String,
    pub kind: KnowledgeType,
    pub attachments: Vec<Attachment>,
}

/// Partial update of a knowledge item. `likes` is deliberately absent.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub project: Option<String>,
    pub kind: Option<KnowledgeType>,
    pub attachments: Option<Vec<Attachment>>,
}

#[derive(Debug, Clone, Default)]
pub struct NewQuery {
    pub question: String,
    pub author: String,
    pub project: String,
}

#[derive(Debug, Clone, Default)]
pub struct QueryUpdate {
    pub question: Option<String>,
    pub project: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewAnswer {
    pub answer: String,
    pub answered_by: String,
}

#[derive(Debug, Clone)]
pub struct NewCommunity {
    pub name: String,
    pub project: String,
    pub description: String,
    pub members: Vec<String>,
    pub is_active: bool,
}

impl Default for NewCommunity {
    fn default() -> Self {
        Self {
            name: String::new(),
            project: String::new(),
            description: String::new(),
            members: Vec::new(),
            is_active: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CommunityUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

// ============ Filters ============

/// Exact-match filters for the knowledge collection.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeFilter {
    pub category: Option<String>,
    pub project: Option<String>,
    pub kind: Option<KnowledgeType>,
}

impl KnowledgeFilter {
    pub fn matches(&self, item: &KnowledgeItem) -> bool {
        self.category.as_ref().map_or(true, |c| &item.category == c)
            && self.project.as_ref().map_or(true, |p| &item.project == p)
            && self.kind.map_or(true, |k| item.kind == k)
    }
}

/// Exact-match filters for the query collection.
#[derive(Debug, Clone, Default)]
pub struct QueryFilter {
    pub project: Option<String>,
    pub status: Option<QueryStatus>,
}

impl QueryFilter {
    pub fn matches(&self, query: &Query) -> bool {
        self.project.as_ref().map_or(true, |p| &query.project == p)
            && self.status.map_or(true, |s| query.status == s)
    }
}

/// Trim entries, drop blanks, and remove duplicates keeping first-seen order.
pub fn dedup_names<I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    names
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty() && seen.insert(n.clone()))
        .collect()
}
