//! `skillsync search`: run the combined search from the command line.
//!
//! Searches a freshly seeded store with the same ranking the HTTP endpoint
//! uses and prints one block per hit:
//!
//! ```text
//! 1. [4.25] knowledge / Database Connection SOP
//!     project: Backend Services
//!     created: 2024-01-10
//!     id: 2
//! ```

use anyhow::{bail, Result};
use skillsync_core::search::{search_all, SearchHit, SearchScope};
use skillsync_core::store::memory::InMemoryStore;

use crate::config::Config;

/// Search the seed dataset and print ranked hits.
pub async fn run_search(
    config: &Config,
    query: &str,
    scope: &str,
    limit: Option<usize>,
) -> Result<()> {
    if query.trim().is_empty() {
        bail!("search query must not be empty");
    }
    let scope: SearchScope = scope.parse()?;

    let store = InMemoryStore::seeded(&config.auth.admin_password);
    let mut hits = search_all(&store, query, scope).await?;
    if let Some(limit) = limit {
        hits.truncate(limit);
    }

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        println!("{}", format_hit(i + 1, hit));
    }
    Ok(())
}

fn format_hit(rank: usize, hit: &SearchHit) -> String {
    let (kind, project, created) = match hit {
        SearchHit::Knowledge { item, .. } => ("knowledge", &item.project, item.created_at),
        SearchHit::Query { item, .. } => ("query", &item.project, item.created_at),
    };
    format!(
        "{}. [{:.2}] {} / {}\n    project: {}\n    created: {}\n    id: {}\n",
        rank,
        hit.relevance(),
        kind,
        hit.title(),
        project,
        created.format("%Y-%m-%d"),
        hit.id()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillsync_core::seed;

    #[test]
    fn test_format_hit() {
        let item = seed::knowledge().remove(1);
        let hit = SearchHit::Knowledge {
            item,
            relevance: 4.25,
        };
        let text = format_hit(1, &hit);
        assert!(text.starts_with("1. [4.25] knowledge / Database Connection SOP\n"));
        assert!(text.contains("    created: 2024-01-10\n"));
        assert!(text.contains("    id: 2\n"));
    }

    #[tokio::test]
    async fn test_run_search_rejects_bad_scope() {
        let err = run_search(&Config::default(), "react", "users", None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("search type"));
    }
}
