//! In-memory [`Store`] implementation.
//!
//! Each collection is a `Vec` behind its own `std::sync::RwLock`, so reads
//! return records in insertion order. Nothing is persisted.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::models::{
    dedup_names, Community, CommunityUpdate, KnowledgeFilter, KnowledgeItem, KnowledgeUpdate,
    NewAnswer, NewCommunity, NewKnowledge, NewQuery, NewUser, Query, QueryFilter, QueryStatus,
    QueryUpdate, User,
};
use crate::seed;

use super::{Store, StoreError, StoreResult};

/// Process-local store for all SkillSync collections.
pub struct InMemoryStore {
    knowledge: RwLock<Vec<KnowledgeItem>>,
    queries: RwLock<Vec<Query>>,
    communities: RwLock<Vec<Community>>,
    users: RwLock<Vec<User>>,
}

impl InMemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self {
            knowledge: RwLock::new(Vec::new()),
            queries: RwLock::new(Vec::new()),
            communities: RwLock::new(Vec::new()),
            users: RwLock::new(Vec::new()),
        }
    }

    /// A store loaded with the mock dataset. The admin account gets
    /// `admin_password`.
    pub fn seeded(admin_password: &str) -> Self {
        Self {
            knowledge: RwLock::new(seed::knowledge()),
            queries: RwLock::new(seed::queries()),
            communities: RwLock::new(seed::communities()),
            users: RwLock::new(seed::users(admin_password)),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn read<T>(lock: &RwLock<T>) -> StoreResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| StoreError::Internal("collection lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> StoreResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| StoreError::Internal("collection lock poisoned".to_string()))
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Trimmed value, or an `Invalid` error naming the field.
fn required(field: &str, value: &str) -> StoreResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StoreError::invalid(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

fn optional(field: &str, value: Option<String>) -> StoreResult<Option<String>> {
    value.map(|v| required(field, &v)).transpose()
}

fn find_mut<'a, T, F>(
    items: &'a mut [T],
    kind: &'static str,
    id: &str,
    key: F,
) -> StoreResult<&'a mut T>
where
    F: Fn(&T) -> &str,
{
    items
        .iter_mut()
        .find(|item| key(item) == id)
        .ok_or_else(|| StoreError::not_found(kind, id))
}

#[async_trait]
impl Store for InMemoryStore {
    async fn list_knowledge(&self, filter: &KnowledgeFilter) -> StoreResult<Vec<KnowledgeItem>> {
        let items = read(&self.knowledge)?;
        Ok(items.iter().filter(|k| filter.matches(k)).cloned().collect())
    }

    async fn get_knowledge(&self, id: &str) -> StoreResult<KnowledgeItem> {
        read(&self.knowledge)?
            .iter()
            .find(|k| k.id == id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("knowledge", id))
    }

    async fn create_knowledge(&self, new: NewKnowledge) -> StoreResult<KnowledgeItem> {
        let item = KnowledgeItem {
            id: new_id(),
            title: required("title", &new.title)?,
            content: required("content", &new.content)?,
            category: required("category", &new.category)?,
            tags: dedup_names(new.tags),
            author: required("author", &new.author)?,
            project: required("project", &new.project)?,
            kind: new.kind,
            created_at: Utc::now(),
            likes: 0,
            attachments: new.attachments,
        };

        write(&self.knowledge)?.push(item.clone());
        Ok(item)
    }

    async fn update_knowledge(
        &self,
        id: &str,
        update: KnowledgeUpdate,
    ) -> StoreResult<KnowledgeItem> {
        let title = optional("title", update.title)?;
        let content = optional("content", update.content)?;
        let category = optional("category", update.category)?;
        let project = optional("project", update.project)?;

        let mut items = write(&self.knowledge)?;
        let item = find_mut(&mut items, "knowledge", id, |k| k.id.as_str())?;
        if let Some(title) = title {
            item.title = title;
        }
        if let Some(content) = content {
            item.content = content;
        }
        if let Some(category) = category {
            item.category = category;
        }
        if let Some(project) = project {
            item.project = project;
        }
        if let Some(tags) = update.tags {
            item.tags = dedup_names(tags);
        }
        if let Some(kind) = update.kind {
            item.kind = kind;
        }
        if let Some(attachments) = update.attachments {
            item.attachments = attachments;
        }
        Ok(item.clone())
    }

    async fn like_knowledge(&self, id: &str) -> StoreResult<KnowledgeItem> {
        let mut items = write(&self.knowledge)?;
        let item = find_mut(&mut items, "knowledge", id, |k| k.id.as_str())?;
        item.likes = item.likes.saturating_add(1);
        Ok(item.clone())
    }

    async fn list_queries(&self, filter: &QueryFilter) -> StoreResult<Vec<Query>> {
        let queries = read(&self.queries)?;
        Ok(queries.iter().filter(|q| filter.matches(q)).cloned().collect())
    }

    async fn get_query(&self, id: &str) -> StoreResult<Query> {
        read(&self.queries)?
            .iter()
            .find(|q| q.id == id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("query", id))
    }

    async fn create_query(&self, new: NewQuery) -> StoreResult<Query> {
        let query = Query {
            id: new_id(),
            question: required("question", &new.question)?,
            answer: None,
            author: required("author", &new.author)?,
            answered_by: None,
            project: required("project", &new.project)?,
            created_at: Utc::now(),
            status: QueryStatus::Pending,
            ai_answer: None,
        };

        write(&self.queries)?.push(query.clone());
        Ok(query)
    }

    async fn update_query(&self, id: &str, update: QueryUpdate) -> StoreResult<Query> {
        let question = optional("question", update.question)?;
        let project = optional("project", update.project)?;

        let mut queries = write(&self.queries)?;
        let query = find_mut(&mut queries, "query", id, |q| q.id.as_str())?;
        if query.status == QueryStatus::Answered {
            return Err(StoreError::Conflict(format!(
                "query {} is already answered and can no longer be edited",
                id
            )));
        }
        if let Some(question) = question {
            query.question = question;
        }
        if let Some(project) = project {
            query.project = project;
        }
        Ok(query.clone())
    }

    async fn answer_query(&self, id: &str, answer: NewAnswer) -> StoreResult<Query> {
        let text = required("answer", &answer.answer)?;
        let answered_by = required("answeredBy", &answer.answered_by)?;

        let mut queries = write(&self.queries)?;
        let query = find_mut(&mut queries, "query", id, |q| q.id.as_str())?;
        if query.status == QueryStatus::Answered {
            return Err(StoreError::Conflict(format!(
                "query {} is already answered",
                id
            )));
        }
        query.answer = Some(text);
        query.answered_by = Some(answered_by);
        query.status = QueryStatus::Answered;
        Ok(query.clone())
    }

    async fn set_ai_answer(&self, id: &str, text: String) -> StoreResult<Query> {
        let mut queries = write(&self.queries)?;
        let query = find_mut(&mut queries, "query", id, |q| q.id.as_str())?;
        query.ai_answer = Some(text);
        Ok(query.clone())
    }

    async fn list_communities(&self) -> StoreResult<Vec<Community>> {
        Ok(read(&self.communities)?.clone())
    }

    async fn find_community_by_project(&self, project: &str) -> StoreResult<Community> {
        read(&self.communities)?
            .iter()
            .find(|c| c.project == project)
            .cloned()
            .ok_or_else(|| StoreError::not_found("community for project", project))
    }

    async fn create_community(&self, new: NewCommunity) -> StoreResult<Community> {
        let community = Community {
            id: new_id(),
            name: required("name", &new.name)?,
            project: required("project", &new.project)?,
            members: dedup_names(new.members),
            description: new.description.trim().to_string(),
            created_at: Utc::now(),
            is_active: new.is_active,
        };

        write(&self.communities)?.push(community.clone());
        Ok(community)
    }

    async fn update_community(
        &self,
        id: &str,
        update: CommunityUpdate,
    ) -> StoreResult<Community> {
        let name = optional("name", update.name)?;

        let mut communities = write(&self.communities)?;
        let community = find_mut(&mut communities, "community", id, |c| c.id.as_str())?;
        if let Some(name) = name {
            community.name = name;
        }
        if let Some(description) = update.description {
            community.description = description.trim().to_string();
        }
        if let Some(is_active) = update.is_active {
            community.is_active = is_active;
        }
        Ok(community.clone())
    }

    async fn join_community(&self, id: &str, member: &str) -> StoreResult<Community> {
        let member = required("memberName", member)?;

        let mut communities = write(&self.communities)?;
        let community = find_mut(&mut communities, "community", id, |c| c.id.as_str())?;
        if !community.members.contains(&member) {
            community.members.push(member);
        }
        Ok(community.clone())
    }

    async fn get_user(&self, id: &str) -> StoreResult<User> {
        read(&self.users)?
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("user", id))
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let username = username.trim();
        Ok(read(&self.users)?
            .iter()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        let username = required("username", &new.username)?;
        let email = required("email", &new.email)?;
        if !email.contains('@') {
            return Err(StoreError::invalid("email must be a valid address"));
        }
        if new.password.is_empty() {
            return Err(StoreError::invalid("password is required"));
        }

        let mut users = write(&self.users)?;
        if users
            .iter()
            .any(|u| u.username.eq_ignore_ascii_case(&username))
        {
            return Err(StoreError::invalid(format!(
                "username '{}' is already taken",
                username
            )));
        }

        let user = User {
            id: new_id(),
            username,
            email,
            password: new.password,
            role: new.role,
            created_at: Utc::now(),
            is_active: true,
        };
        users.push(user.clone());
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{KnowledgeType, Role};

    fn new_knowledge(title: &str) -> NewKnowledge {
        NewKnowledge {
            title: title.into(),
            content: "Use cargo workspaces".into(),
            category: "Tooling".into(),
            tags: vec!["Rust".into(), "Rust".into(), "Cargo".into()],
            author: "Ada".into(),
            project: "Platform".into(),
            kind: KnowledgeType::Knowledge,
            attachments: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_like_increments_by_exactly_one() {
        let store = InMemoryStore::seeded("admin");
        let before = store.get_knowledge("1").await.unwrap().likes;
        let after = store.like_knowledge("1").await.unwrap().likes;
        assert_eq!(after, before + 1);
        assert_eq!(store.get_knowledge("1").await.unwrap().likes, before + 1);
    }

    #[tokio::test]
    async fn test_like_missing_item_is_not_found() {
        let store = InMemoryStore::seeded("admin");
        let err = store.like_knowledge("nope").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_create_knowledge_defaults() {
        let store = InMemoryStore::new();
        let item = store.create_knowledge(new_knowledge("Workspaces")).await.unwrap();
        assert_eq!(item.likes, 0);
        assert_eq!(item.tags, vec!["Rust", "Cargo"]);
        assert_eq!(store.list_knowledge(&KnowledgeFilter::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_knowledge_requires_fields() {
        let store = InMemoryStore::new();
        let err = store.create_knowledge(new_knowledge("   ")).await.unwrap_err();
        assert_eq!(err.to_string(), "title is required");
        assert!(store.list_knowledge(&KnowledgeFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let store = InMemoryStore::new();
        let a = store.create_knowledge(new_knowledge("A")).await.unwrap();
        let b = store.create_knowledge(new_knowledge("B")).await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_update_knowledge_keeps_likes() {
        let store = InMemoryStore::seeded("admin");
        let update = KnowledgeUpdate {
            title: Some("React Hooks Best Practices".into()),
            kind: Some(KnowledgeType::Knowledge),
            ..Default::default()
        };
        let item = store.update_knowledge("1", update).await.unwrap();
        assert_eq!(item.title, "React Hooks Best Practices");
        assert_eq!(item.kind, KnowledgeType::Knowledge);
        assert_eq!(item.likes, 15);
    }

    #[tokio::test]
    async fn test_update_knowledge_rejects_blank_title() {
        let store = InMemoryStore::seeded("admin");
        let update = KnowledgeUpdate {
            title: Some("".into()),
            ..Default::default()
        };
        let err = store.update_knowledge("1", update).await.unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_answer_flips_status_once() {
        let store = InMemoryStore::seeded("admin");
        let answer = NewAnswer {
            answer: "Add indexes".into(),
            answered_by: "Jane Smith".into(),
        };
        let answered = store.answer_query("2", answer.clone()).await.unwrap();
        assert_eq!(answered.status, QueryStatus::Answered);
        assert_eq!(answered.answer.as_deref(), Some("Add indexes"));

        let err = store.answer_query("2", answer).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        let still = store.get_query("2").await.unwrap();
        assert_eq!(still.status, QueryStatus::Answered);
        assert_eq!(still.answered_by.as_deref(), Some("Jane Smith"));
    }

    #[tokio::test]
    async fn test_answer_requires_text() {
        let store = InMemoryStore::seeded("admin");
        let err = store
            .answer_query(
                "2",
                NewAnswer {
                    answer: " ".into(),
                    answered_by: "x".into(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
        assert_eq!(
            store.get_query("2").await.unwrap().status,
            QueryStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_answered_query_cannot_be_edited() {
        let store = InMemoryStore::seeded("admin");
        let update = QueryUpdate {
            question: Some("changed".into()),
            ..Default::default()
        };
        let err = store.update_query("1", update.clone()).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let edited = store.update_query("2", update).await.unwrap();
        assert_eq!(edited.question, "changed");
    }

    #[tokio::test]
    async fn test_ai_answer_keeps_status() {
        let store = InMemoryStore::seeded("admin");
        let q = store
            .set_ai_answer("2", "Use EXPLAIN to find slow plans.".into())
            .await
            .unwrap();
        assert_eq!(q.status, QueryStatus::Pending);
        assert_eq!(q.ai_answer.as_deref(), Some("Use EXPLAIN to find slow plans."));
    }

    #[tokio::test]
    async fn test_create_community_dedups_members() {
        let store = InMemoryStore::new();
        let community = store
            .create_community(NewCommunity {
                name: "Rustaceans".into(),
                project: "Platform".into(),
                members: vec!["Ann".into(), "Ann".into(), "Bob".into()],
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(community.members, vec!["Ann", "Bob"]);
        assert!(community.is_active);

        let joined = store.join_community(&community.id, "Ann").await.unwrap();
        assert_eq!(joined.members, vec!["Ann", "Bob"]);
    }

    #[tokio::test]
    async fn test_join_adds_new_member_once() {
        let store = InMemoryStore::seeded("admin");
        let first = store.join_community("2", "Lisa Chen").await.unwrap();
        let second = store.join_community("2", " Lisa Chen ").await.unwrap();
        assert_eq!(first.members, second.members);
        assert_eq!(
            second.members.iter().filter(|m| *m == "Lisa Chen").count(),
            1
        );
    }

    #[tokio::test]
    async fn test_find_community_by_project() {
        let store = InMemoryStore::seeded("admin");
        let c = store.find_community_by_project("Client X").await.unwrap();
        assert_eq!(c.name, "Client X Project");
        assert!(store.find_community_by_project("Nowhere").await.is_err());
    }

    #[tokio::test]
    async fn test_users_are_unique_by_username() {
        let store = InMemoryStore::seeded("admin");
        let err = store
            .create_user(NewUser {
                username: "ADMIN".into(),
                email: "other@example.com".into(),
                password: "pw".into(),
                role: Role::User,
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already taken"));

        let user = store
            .create_user(NewUser {
                username: "grace".into(),
                email: "grace@example.com".into(),
                password: "pw".into(),
                role: Role::User,
            })
            .await
            .unwrap();
        let found = store.find_user_by_username("Grace").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
    }

    #[tokio::test]
    async fn test_create_user_checks_email() {
        let store = InMemoryStore::new();
        let err = store
            .create_user(NewUser {
                username: "grace".into(),
                email: "not-an-email".into(),
                password: "pw".into(),
                role: Role::User,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }
}
