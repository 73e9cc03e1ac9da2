//! Listing and search over the store.
//!
//! Every frontend (HTTP handlers, CLI, AI context selection) goes through
//! these functions so that filtering and ranking behave identically:
//!
//! 1. Fetch the collection from the [`Store`], applying exact-match filters.
//! 2. Without a search string: sort newest first.
//! 3. With a search string: score each record with
//!    [`calculate_relevance`], drop zero scores, and sort by score
//!    descending. The sort is stable, so ties keep store order.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::models::{KnowledgeFilter, KnowledgeItem, ParseEnumError, Query, QueryFilter};
use crate::relevance::{calculate_relevance, search_terms};
use crate::store::{Store, StoreResult};

/// A record together with its relevance score, if it was searched for.
#[derive(Debug, Clone, Serialize)]
pub struct Scored<T> {
    #[serde(flatten)]
    pub item: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f64>,
}

impl<T> Scored<T> {
    fn unscored(item: T) -> Self {
        Self {
            item,
            relevance: None,
        }
    }
}

/// Which collections a combined search covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchScope {
    #[default]
    All,
    Knowledge,
    Queries,
}

impl SearchScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchScope::All => "all",
            SearchScope::Knowledge => "knowledge",
            SearchScope::Queries => "queries",
        }
    }

    fn includes_knowledge(&self) -> bool {
        matches!(self, SearchScope::All | SearchScope::Knowledge)
    }

    fn includes_queries(&self) -> bool {
        matches!(self, SearchScope::All | SearchScope::Queries)
    }
}

impl fmt::Display for SearchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchScope {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" | "" => Ok(SearchScope::All),
            "knowledge" => Ok(SearchScope::Knowledge),
            "queries" | "query" => Ok(SearchScope::Queries),
            _ => Err(ParseEnumError {
                kind: "search type",
                value: s.to_string(),
                expected: "all, knowledge, queries",
            }),
        }
    }
}

/// One hit of a combined search, tagged with the collection it came from.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "resultType", rename_all = "lowercase")]
pub enum SearchHit {
    Knowledge {
        #[serde(flatten)]
        item: KnowledgeItem,
        relevance: f64,
    },
    Query {
        #[serde(flatten)]
        item: Query,
        relevance: f64,
    },
}

impl SearchHit {
    pub fn relevance(&self) -> f64 {
        match self {
            SearchHit::Knowledge { relevance, .. } | SearchHit::Query { relevance, .. } => {
                *relevance
            }
        }
    }

    pub fn id(&self) -> &str {
        match self {
            SearchHit::Knowledge { item, .. } => &item.id,
            SearchHit::Query { item, .. } => &item.id,
        }
    }

    /// Title for knowledge, question for queries.
    pub fn title(&self) -> &str {
        match self {
            SearchHit::Knowledge { item, .. } => &item.title,
            SearchHit::Query { item, .. } => &item.question,
        }
    }
}

fn by_relevance_desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Score records against `query`, keep positive scores, sort descending.
pub fn rank<T, F>(items: Vec<T>, query: &str, text: F) -> Vec<(T, f64)>
where
    F: Fn(&T) -> String,
{
    let terms = search_terms(query);
    if terms.is_empty() {
        return Vec::new();
    }

    let mut ranked: Vec<(T, f64)> = items
        .into_iter()
        .map(|item| {
            let score = calculate_relevance(&text(&item), &terms);
            (item, score)
        })
        .filter(|(_, score)| *score > 0.0)
        .collect();
    ranked.sort_by(|a, b| by_relevance_desc(a.1, b.1));
    ranked
}

fn blank_to_none(search: Option<&str>) -> Option<&str> {
    search.map(str::trim).filter(|s| !s.is_empty())
}

/// List knowledge items matching `filter`, ranked by `search` when given.
pub async fn list_knowledge<S: Store + ?Sized>(
    store: &S,
    filter: &KnowledgeFilter,
    search: Option<&str>,
) -> StoreResult<Vec<Scored<KnowledgeItem>>> {
    let mut items = store.list_knowledge(filter).await?;

    match blank_to_none(search) {
        Some(q) => Ok(rank(items, q, KnowledgeItem::searchable_text)
            .into_iter()
            .map(|(item, score)| Scored {
                item,
                relevance: Some(score),
            })
            .collect()),
        None => {
            items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(items.into_iter().map(Scored::unscored).collect())
        }
    }
}

/// List queries matching `filter`, ranked by `search` when given.
pub async fn list_queries<S: Store + ?Sized>(
    store: &S,
    filter: &QueryFilter,
    search: Option<&str>,
) -> StoreResult<Vec<Scored<Query>>> {
    let mut queries = store.list_queries(filter).await?;

    match blank_to_none(search) {
        Some(q) => Ok(rank(queries, q, Query::searchable_text)
            .into_iter()
            .map(|(item, score)| Scored {
                item,
                relevance: Some(score),
            })
            .collect()),
        None => {
            queries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(queries.into_iter().map(Scored::unscored).collect())
        }
    }
}

/// Search knowledge and/or queries at once.
///
/// Knowledge hits are placed before query hits and then stably sorted by
/// relevance, so a knowledge item wins a tie.
pub async fn search_all<S: Store + ?Sized>(
    store: &S,
    query: &str,
    scope: SearchScope,
) -> StoreResult<Vec<SearchHit>> {
    let mut hits = Vec::new();

    if scope.includes_knowledge() {
        let items = store.list_knowledge(&KnowledgeFilter::default()).await?;
        hits.extend(
            rank(items, query, KnowledgeItem::searchable_text)
                .into_iter()
                .map(|(item, relevance)| SearchHit::Knowledge { item, relevance }),
        );
    }

    if scope.includes_queries() {
        let queries = store.list_queries(&QueryFilter::default()).await?;
        hits.extend(
            rank(queries, query, Query::searchable_text)
                .into_iter()
                .map(|(item, relevance)| SearchHit::Query { item, relevance }),
        );
    }

    hits.sort_by(|a, b| by_relevance_desc(a.relevance(), b.relevance()));
    Ok(hits)
}

/// The `limit` knowledge items most relevant to `question`.
pub async fn top_knowledge<S: Store + ?Sized>(
    store: &S,
    question: &str,
    limit: usize,
) -> StoreResult<Vec<(KnowledgeItem, f64)>> {
    let items = store.list_knowledge(&KnowledgeFilter::default()).await?;
    let mut ranked = rank(items, question, KnowledgeItem::searchable_text);
    ranked.truncate(limit);
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{KnowledgeType, QueryStatus};
    use crate::store::memory::InMemoryStore;

    #[tokio::test]
    async fn test_list_without_search_is_newest_first() {
        let store = InMemoryStore::seeded("admin");
        let items = list_knowledge(&store, &KnowledgeFilter::default(), None)
            .await
            .unwrap();
        let ids: Vec<&str> = items.iter().map(|s| s.item.id.as_str()).collect();
        // seed dates: 3 = 2024-01-20, 1 = 2024-01-15, 2 = 2024-01-10
        assert_eq!(ids, vec!["3", "1", "2"]);
        assert!(items.iter().all(|s| s.relevance.is_none()));
    }

    #[tokio::test]
    async fn test_search_ranks_and_drops_misses() {
        let store = InMemoryStore::seeded("admin");
        let items = list_knowledge(&store, &KnowledgeFilter::default(), Some("database connection"))
            .await
            .unwrap();
        assert!(!items.is_empty());
        assert_eq!(items[0].item.id, "2");
        let scores: Vec<f64> = items.iter().map(|s| s.relevance.unwrap()).collect();
        assert!(scores.iter().all(|s| *s > 0.0));
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    }

    #[tokio::test]
    async fn test_blank_search_behaves_like_no_search() {
        let store = InMemoryStore::seeded("admin");
        let items = list_knowledge(&store, &KnowledgeFilter::default(), Some("   "))
            .await
            .unwrap();
        assert_eq!(items.len(), 3);
    }

    #[tokio::test]
    async fn test_filters_combine_with_search() {
        let store = InMemoryStore::seeded("admin");
        let filter = KnowledgeFilter {
            kind: Some(KnowledgeType::Sop),
            ..Default::default()
        };
        let items = list_knowledge(&store, &filter, Some("react"))
            .await
            .unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_query_status_filter() {
        let store = InMemoryStore::seeded("admin");
        let filter = QueryFilter {
            status: Some(QueryStatus::Pending),
            ..Default::default()
        };
        let queries = list_queries(&store, &filter, None).await.unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].item.id, "2");
    }

    #[tokio::test]
    async fn test_search_all_mixes_collections() {
        let store = InMemoryStore::seeded("admin");
        let hits = search_all(&store, "database", SearchScope::All).await.unwrap();
        assert!(hits.iter().any(|h| matches!(h, SearchHit::Knowledge { .. })));
        assert!(hits.iter().any(|h| matches!(h, SearchHit::Query { .. })));
        assert!(hits
            .windows(2)
            .all(|w| w[0].relevance() >= w[1].relevance()));

        let only_queries = search_all(&store, "database", SearchScope::Queries)
            .await
            .unwrap();
        assert!(only_queries
            .iter()
            .all(|h| matches!(h, SearchHit::Query { .. })));
    }

    #[tokio::test]
    async fn test_search_hit_serializes_result_type() {
        let store = InMemoryStore::seeded("admin");
        let hits = search_all(&store, "react", SearchScope::Knowledge)
            .await
            .unwrap();
        let json = serde_json::to_value(&hits[0]).unwrap();
        assert_eq!(json["resultType"], "knowledge");
        assert_eq!(json["id"], "1");
        assert!(json["relevance"].as_f64().unwrap() > 0.0);
    }

    #[tokio::test]
    async fn test_top_knowledge_truncates() {
        let store = InMemoryStore::seeded("admin");
        let top = top_knowledge(&store, "best practices for database connections", 1)
            .await
            .unwrap();
        assert_eq!(top.len(), 1);
    }

    #[test]
    fn test_scope_parse() {
        assert_eq!("".parse::<SearchScope>().unwrap(), SearchScope::All);
        assert_eq!(
            "queries".parse::<SearchScope>().unwrap(),
            SearchScope::Queries
        );
        assert!("users".parse::<SearchScope>().is_err());
    }
}
