//! AI answer generation.
//!
//! Defines the [`CompletionProvider`] trait and two implementations:
//! - **[`DisabledProvider`]**: always fails with [`AiError::Disabled`]; the default.
//! - **[`OpenAIProvider`]**: calls any OpenAI-compatible
//!   `POST {base_url}/chat/completions` endpoint.
//!
//! [`answer_question`] is the entry point used by the HTTP handlers: it picks
//! the most relevant knowledge items with the same scorer the search
//! endpoints use, builds a prompt around them, and returns the completion
//! text verbatim. There is no retry, caching, or streaming.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use skillsync_core::models::KnowledgeItem;
use skillsync_core::search::{top_knowledge, Scored};
use skillsync_core::store::{Store, StoreError};
use thiserror::Error;

use crate::config::AiConfig;

const SYSTEM_PROMPT: &str = "You are the SkillSync assistant. Answer questions for a team \
using its internal knowledge base. Prefer the provided context and mention which article you \
relied on. If the context does not cover the question, say so and give a concise general answer.";

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI answers are disabled; set [ai].provider in the config to enable them")]
    Disabled,

    #[error("AI completion failed: {0}")]
    Upstream(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

/// A chat-completion backend.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Model identifier reported back to clients.
    fn model_name(&self) -> &str;

    /// Run one completion and return the assistant text.
    async fn complete(&self, messages: &[Message]) -> Result<String, AiError>;
}

// ============ Disabled Provider ============

pub struct DisabledProvider;

#[async_trait]
impl CompletionProvider for DisabledProvider {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn complete(&self, _messages: &[Message]) -> Result<String, AiError> {
        Err(AiError::Disabled)
    }
}

// ============ OpenAI Provider ============

pub struct OpenAIProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAIProvider {
    /// Build a provider from config. The API key is read from the variable
    /// named by `api_key_env`; an unset or empty variable means no
    /// `Authorization` header is sent.
    pub fn new(config: &AiConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.is_empty());
        if api_key.is_none() {
            tracing::warn!(
                "{} is not set; calling {} without an API key",
                config.api_key_env,
                config.base_url
            );
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: chat_endpoint(&config.base_url),
            model: config.model.clone(),
            api_key,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAIProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, AiError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let mut req = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }

        let resp = req.send().await.map_err(|e| {
            AiError::Upstream(format!("request to {} failed: {}", self.endpoint, e))
        })?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| AiError::Upstream(format!("failed to read response: {}", e)))?;
        if !status.is_success() {
            return Err(AiError::Upstream(format!("HTTP {}: {}", status, text)));
        }

        let json: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| AiError::Upstream(format!("invalid JSON response: {}", e)))?;
        parse_completion(&json)
    }
}

/// Instantiate the provider named in config.
pub fn create_provider(config: &AiConfig) -> Result<Arc<dyn CompletionProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledProvider)),
        "openai" => Ok(Arc::new(OpenAIProvider::new(config)?)),
        other => anyhow::bail!("Unknown ai provider: {}", other),
    }
}

/// Resolve the chat completions URL from a base URL.
pub fn chat_endpoint(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.ends_with("/chat/completions") {
        base.to_string()
    } else if base.ends_with("/v1") {
        format!("{}/chat/completions", base)
    } else {
        format!("{}/v1/chat/completions", base)
    }
}

/// Extract `choices[0].message.content`.
fn parse_completion(json: &serde_json::Value) -> Result<String, AiError> {
    json["choices"]
        .get(0)
        .and_then(|c| c["message"]["content"].as_str())
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| AiError::Upstream("response contained no completion text".to_string()))
}

/// System and user messages for `question` with the ranked `context` items.
pub fn build_messages(question: &str, context: &[(KnowledgeItem, f64)]) -> Vec<Message> {
    let mut prompt = String::new();
    if context.is_empty() {
        prompt.push_str("No knowledge base articles matched this question.\n\n");
    } else {
        prompt.push_str("Knowledge base context:\n\n");
        for (i, (item, _)) in context.iter().enumerate() {
            prompt.push_str(&format!(
                "[{}] {} ({}, project: {})\n{}\n",
                i + 1,
                item.title,
                item.kind,
                item.project,
                item.content
            ));
            if !item.tags.is_empty() {
                prompt.push_str(&format!("Tags: {}\n", item.tags.join(", ")));
            }
            prompt.push('\n');
        }
    }
    prompt.push_str("Question: ");
    prompt.push_str(question.trim());

    vec![Message::new("system", SYSTEM_PROMPT), Message::new("user", prompt)]
}

/// Answer plus the knowledge items it was grounded on.
#[derive(Debug, Clone, Serialize)]
pub struct AiAnswer {
    pub answer: String,
    pub sources: Vec<Scored<KnowledgeItem>>,
    pub model: String,
}

/// Rank the store's knowledge against `question`, prompt the provider with
/// the top `context_items`, and return the completion.
pub async fn answer_question<S: Store + ?Sized>(
    store: &S,
    provider: &dyn CompletionProvider,
    question: &str,
    context_items: usize,
) -> Result<AiAnswer, AiError> {
    let context = top_knowledge(store, question, context_items).await?;
    let messages = build_messages(question, &context);

    tracing::debug!(
        model = provider.model_name(),
        context = context.len(),
        "requesting completion"
    );
    let answer = provider.complete(&messages).await?;

    Ok(AiAnswer {
        answer,
        sources: context
            .into_iter()
            .map(|(item, score)| Scored {
                item,
                relevance: Some(score),
            })
            .collect(),
        model: provider.model_name().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillsync_core::store::memory::InMemoryStore;
    use std::sync::Mutex;

    /// Records the prompt and returns a canned answer.
    struct EchoProvider {
        seen: Mutex<Vec<Message>>,
    }

    #[async_trait]
    impl CompletionProvider for EchoProvider {
        fn model_name(&self) -> &str {
            "echo"
        }

        async fn complete(&self, messages: &[Message]) -> Result<String, AiError> {
            *self.seen.lock().unwrap() = messages.to_vec();
            Ok("Use connection pooling.".to_string())
        }
    }

    #[test]
    fn test_chat_endpoint_resolution() {
        assert_eq!(
            chat_endpoint("https://api.openai.com/v1"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            chat_endpoint("http://localhost:1234/"),
            "http://localhost:1234/v1/chat/completions"
        );
        assert_eq!(
            chat_endpoint("http://host/v1/chat/completions"),
            "http://host/v1/chat/completions"
        );
    }

    #[test]
    fn test_parse_completion() {
        let json = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "Hello" } }]
        });
        assert_eq!(parse_completion(&json).unwrap(), "Hello");

        let empty = serde_json::json!({ "choices": [] });
        assert!(matches!(
            parse_completion(&empty),
            Err(AiError::Upstream(_))
        ));

        let null_content = serde_json::json!({
            "choices": [{ "message": { "content": null } }]
        });
        assert!(parse_completion(&null_content).is_err());
    }

    #[test]
    fn test_build_messages_includes_context() {
        let items = skillsync_core::seed::knowledge();
        let context = vec![(items[1].clone(), 3.5)];
        let messages = build_messages("  How do I connect to the database? ", &context);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        let user = &messages[1].content;
        assert!(user.contains("[1] Database Connection SOP (sop, project: Backend Services)"));
        assert!(user.contains("Tags: Database, SOP, Security"));
        assert!(user.ends_with("Question: How do I connect to the database?"));
    }

    #[test]
    fn test_build_messages_without_context() {
        let messages = build_messages("Anything?", &[]);
        assert!(messages[1].content.starts_with("No knowledge base articles"));
    }

    #[test]
    fn test_create_provider_disabled() {
        let provider = create_provider(&AiConfig::default()).unwrap();
        assert_eq!(provider.model_name(), "disabled");
    }

    #[tokio::test]
    async fn test_disabled_provider_fails() {
        let store = InMemoryStore::seeded("admin");
        let err = answer_question(&store, &DisabledProvider, "database", 3)
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::Disabled));
    }

    #[tokio::test]
    async fn test_answer_question_uses_ranked_context() {
        let store = InMemoryStore::seeded("admin");
        let provider = EchoProvider {
            seen: Mutex::new(Vec::new()),
        };
        let answer = answer_question(&store, &provider, "database connection pooling", 2)
            .await
            .unwrap();

        assert_eq!(answer.answer, "Use connection pooling.");
        assert_eq!(answer.model, "echo");
        assert!(!answer.sources.is_empty());
        assert!(answer.sources.len() <= 2);
        assert_eq!(answer.sources[0].item.id, "2");

        let seen = provider.seen.lock().unwrap();
        assert!(seen[1].content.contains("Database Connection SOP"));
    }
}
