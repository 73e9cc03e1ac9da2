//! Dashboard counters and distinct-value listings.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::models::{Community, KnowledgeItem, KnowledgeType, Query, QueryStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

/// Aggregate counters served by `GET /api/analytics`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub total_knowledge: usize,
    pub total_queries: usize,
    pub pending_queries: usize,
    pub answered_queries: usize,
    pub ai_answered_queries: usize,
    pub total_communities: usize,
    pub active_communities: usize,
    /// Distinct member names across all communities.
    pub total_members: usize,
    pub total_likes: u64,
    /// Item count per knowledge type. Every type is present, zero or not.
    pub knowledge_by_type: BTreeMap<&'static str, usize>,
    pub top_categories: Vec<CategoryCount>,
}

impl Analytics {
    pub fn compute(
        knowledge: &[KnowledgeItem],
        queries: &[Query],
        communities: &[Community],
    ) -> Self {
        let answered = queries
            .iter()
            .filter(|q| q.status == QueryStatus::Answered)
            .count();

        let mut knowledge_by_type: BTreeMap<&'static str, usize> =
            KnowledgeType::ALL.iter().map(|t| (t.as_str(), 0)).collect();
        for item in knowledge {
            *knowledge_by_type.entry(item.kind.as_str()).or_default() += 1;
        }

        let members: HashSet<&str> = communities
            .iter()
            .flat_map(|c| c.members.iter().map(String::as_str))
            .collect();

        Analytics {
            total_knowledge: knowledge.len(),
            total_queries: queries.len(),
            pending_queries: queries.len() - answered,
            answered_queries: answered,
            ai_answered_queries: queries.iter().filter(|q| q.ai_answer.is_some()).count(),
            total_communities: communities.len(),
            active_communities: communities.iter().filter(|c| c.is_active).count(),
            total_members: members.len(),
            total_likes: knowledge.iter().map(|k| k.likes).sum(),
            knowledge_by_type,
            top_categories: category_counts(knowledge),
        }
    }
}

/// Categories with their item counts, most used first. Ties keep
/// first-seen order.
pub fn category_counts(knowledge: &[KnowledgeItem]) -> Vec<CategoryCount> {
    let mut counts: Vec<CategoryCount> = Vec::new();
    for item in knowledge {
        match counts.iter_mut().find(|c| c.category == item.category) {
            Some(entry) => entry.count += 1,
            None => counts.push(CategoryCount {
                category: item.category.clone(),
                count: 1,
            }),
        }
    }
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

fn distinct<'a, I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(*v))
        .map(str::to_string)
        .collect()
}

/// Distinct knowledge categories in first-seen order.
pub fn distinct_categories(knowledge: &[KnowledgeItem]) -> Vec<String> {
    distinct(knowledge.iter().map(|k| k.category.as_str()))
}

/// Distinct knowledge projects in first-seen order.
pub fn distinct_projects(knowledge: &[KnowledgeItem]) -> Vec<String> {
    distinct(knowledge.iter().map(|k| k.project.as_str()))
}
