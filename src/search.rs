//! Search indexing, modeled as the capability set the core consumes
//! from an external full-text engine: alias-versioned index lifecycle
//! plus per-document upsert and query.
//!
//! `InProcessSearch` is the one implementation in this workspace: a
//! tokenized-substring matcher over an in-memory document map, enough
//! to make every query/ranking property testable without depending on
//! a real search engine client.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::catalog::collection::Collection;
use crate::catalog::Catalog;
use crate::channel::Channel;
use crate::error::StoreError;
use crate::id::EntityId;
use crate::series::Series;

/// One row of the search index: an entity, projected for a single
/// series (its own series for a single-series charm, `"bundle"` for
/// bundles, or one compatibility series among several for a
/// multi-series charm).
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct SearchDoc {
    pub url: EntityId,
    pub name: String,
    pub owner: String,
    pub series: Series,
    /// `"charm"` or `"bundle"`.
    pub kind: String,
    pub summary: String,
    pub description: String,
    pub tags: Vec<String>,
    pub provides: Vec<String>,
    pub requires: Vec<String>,
    pub promulgated: bool,
    pub all_series: bool,
    pub single_series: bool,
    pub downloads: u64,
    pub read_acl: Vec<String>,
}

/// Field a query can sort on, per the `sort=name|series|owner|downloads` surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Name,
    Series,
    Owner,
    Downloads,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy)]
pub struct SearchSort {
    pub field: SortField,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub text: Option<String>,
    pub kind: Option<String>,
    pub name: Option<String>,
    pub owner: Option<String>,
    pub series: Option<Series>,
    pub provides: Option<String>,
    pub requires: Option<String>,
    /// Matches a single tag. `categories` is the same field under its
    /// legacy name; a query may set either and both are honored.
    pub tags: Option<String>,
    pub categories: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub promulgated: Option<bool>,
    pub sort: Option<SearchSort>,
    pub skip: usize,
    pub limit: Option<usize>,
}

#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Creates a new versioned index and repoints the alias, if no
    /// index exists or `force` is set. Concurrent callers observe
    /// exactly-once creation.
    async fn ensure_indexes(&self, force: bool) -> Result<(), StoreError>;

    async fn upsert_doc(&self, doc: SearchDoc) -> Result<(), StoreError>;

    async fn remove_base(&self, base_url: &str) -> Result<(), StoreError>;

    async fn query(&self, query: &SearchQuery) -> Vec<SearchDoc>;
}

pub struct InProcessSearch {
    alias_version: RwLock<u64>,
    docs: RwLock<BTreeMap<(EntityId, Series), SearchDoc>>,
}

impl Default for InProcessSearch {
    fn default() -> Self {
        InProcessSearch {
            alias_version: RwLock::new(0),
            docs: RwLock::new(BTreeMap::new()),
        }
    }
}

impl InProcessSearch {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_text(doc: &SearchDoc, text: &str) -> bool {
    let text = text.to_lowercase();
    doc.name.to_lowercase().contains(&text)
        || doc.summary.to_lowercase().contains(&text)
        || doc.description.to_lowercase().contains(&text)
}

#[async_trait]
impl SearchBackend for InProcessSearch {
    async fn ensure_indexes(&self, force: bool) -> Result<(), StoreError> {
        let mut version = self.alias_version.write().await;
        if *version == 0 || force {
            *version += 1;
        }
        Ok(())
    }

    async fn upsert_doc(&self, doc: SearchDoc) -> Result<(), StoreError> {
        self.docs.write().await.insert((doc.url.clone(), doc.series.clone()), doc);
        Ok(())
    }

    async fn remove_base(&self, base_url: &str) -> Result<(), StoreError> {
        self.docs.write().await.retain(|(url, _), _| url.base_url() != base_url);
        Ok(())
    }

    async fn query(&self, query: &SearchQuery) -> Vec<SearchDoc> {
        let tag = query.tags.as_deref().or(query.categories.as_deref());

        let mut results: Vec<SearchDoc> = self
            .docs
            .read()
            .await
            .values()
            .filter(|d| query.text.as_deref().map(|t| matches_text(d, t)).unwrap_or(true))
            .filter(|d| query.kind.as_deref().map(|k| d.kind == k).unwrap_or(true))
            .filter(|d| query.name.as_deref().map(|n| d.name == n).unwrap_or(true))
            .filter(|d| query.owner.as_deref().map(|o| d.owner == o).unwrap_or(true))
            .filter(|d| query.series.as_ref().map(|s| &d.series == s).unwrap_or(true))
            .filter(|d| query.provides.as_deref().map(|i| d.provides.iter().any(|p| p == i)).unwrap_or(true))
            .filter(|d| query.requires.as_deref().map(|i| d.requires.iter().any(|r| r == i)).unwrap_or(true))
            .filter(|d| tag.map(|t| d.tags.iter().any(|dt| dt == t)).unwrap_or(true))
            .filter(|d| query.summary.as_deref().map(|s| d.summary.to_lowercase().contains(&s.to_lowercase())).unwrap_or(true))
            .filter(|d| {
                query
                    .description
                    .as_deref()
                    .map(|s| d.description.to_lowercase().contains(&s.to_lowercase()))
                    .unwrap_or(true)
            })
            .filter(|d| query.promulgated.map(|p| d.promulgated == p).unwrap_or(true))
            .cloned()
            .collect();

        match query.sort {
            Some(sort) => results.sort_by(|a, b| {
                let ordering = match sort.field {
                    SortField::Name => a.name.cmp(&b.name),
                    SortField::Series => a.series.cmp(&b.series),
                    SortField::Owner => a.owner.cmp(&b.owner),
                    SortField::Downloads => a.downloads.cmp(&b.downloads),
                };
                match sort.direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            }),
            // Default relevance ranking: promulgated results outrank
            // non-promulgated ones of equal textual relevance;
            // downloads break further ties.
            None => results.sort_by(|a, b| b.promulgated.cmp(&a.promulgated).then(b.downloads.cmp(&a.downloads))),
        }

        let skip = query.skip.min(results.len());
        let mut page = results.split_off(skip);
        if let Some(limit) = query.limit {
            page.truncate(limit);
        }
        page
    }
}

/// Re-projects `base_url`'s published channel heads into `search` as
/// search documents — the step both `publish` and `setPromulgated`
/// trigger.
pub async fn update_search(catalog: &Catalog, search: &dyn SearchBackend, base_url: &str) -> Result<(), StoreError> {
    let base = catalog
        .base_entities
        .get(&base_url.to_string())
        .await
        .ok_or_else(|| StoreError::not_found(base_url.to_string()))?;

    search.remove_base(base_url).await?;

    let mut read_acl: Vec<String> = base
        .channel_acls
        .get(&Channel::Stable)
        .map(|p| p.read.clone())
        .unwrap_or_default();
    if read_acl.is_empty() {
        read_acl.push("everyone".to_string());
    }

    for (_, by_series) in &base.channel_entities {
        for (series, url) in by_series {
            let Some(entity) = catalog.entities.get(url).await else { continue };
            let all_series = entity.supported_series.len() > 1;
            let downloads = catalog.download_count(&entity.url.to_string()).await;

            let doc = SearchDoc {
                url: entity.url.clone(),
                name: entity.url.name.clone(),
                owner: base.user.clone(),
                series: series.clone(),
                kind: if entity.is_bundle() { "bundle".to_string() } else { "charm".to_string() },
                summary: entity.charm_meta.as_ref().map(|m| m.summary.clone()).unwrap_or_default(),
                description: entity.charm_meta.as_ref().map(|m| m.description.clone()).unwrap_or_default(),
                tags: entity.charm_meta.as_ref().map(|m| m.tags.clone()).unwrap_or_default(),
                provides: entity.charm_provided_interfaces.clone(),
                requires: entity.charm_required_interfaces.clone(),
                promulgated: entity.promulgated_url.is_some(),
                all_series,
                single_series: !all_series,
                downloads,
                read_acl: read_acl.clone(),
            };
            search.upsert_doc(doc).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(url: &str, promulgated: bool, downloads: u64) -> SearchDoc {
        let url: EntityId = url.parse().unwrap();
        SearchDoc {
            name: url.name.clone(),
            owner: url.user.clone().unwrap(),
            series: url.series.clone().unwrap(),
            url,
            kind: "charm".into(),
            summary: "A blog".into(),
            description: "A blog engine".into(),
            tags: vec![],
            provides: vec![],
            requires: vec![],
            promulgated,
            all_series: false,
            single_series: true,
            downloads,
            read_acl: vec!["everyone".into()],
        }
    }

    #[tokio::test]
    async fn promulgated_outranks_non_promulgated_at_equal_relevance() {
        let search = InProcessSearch::new();
        search.upsert_doc(doc("cs:~charmers/trusty/wordpress-1", false, 100)).await.unwrap();
        search.upsert_doc(doc("cs:~other/trusty/wordpress-1", true, 1)).await.unwrap();

        let results = search.query(&SearchQuery { text: Some("blog".into()), ..Default::default() }).await;
        assert_eq!(results[0].owner, "other");
    }

    #[tokio::test]
    async fn filters_by_owner_and_paginates() {
        let search = InProcessSearch::new();
        search.upsert_doc(doc("cs:~charmers/trusty/wordpress-1", false, 1)).await.unwrap();
        search.upsert_doc(doc("cs:~charmers/trusty/mysql-1", false, 1)).await.unwrap();

        let results = search
            .query(&SearchQuery {
                owner: Some("charmers".into()),
                limit: Some(1),
                ..Default::default()
            })
            .await;
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn filters_by_tag_under_either_name() {
        let search = InProcessSearch::new();
        let mut blog = doc("cs:~charmers/trusty/wordpress-1", false, 0);
        blog.tags = vec!["blog".into(), "cms".into()];
        search.upsert_doc(blog).await.unwrap();
        search.upsert_doc(doc("cs:~charmers/trusty/mysql-1", false, 0)).await.unwrap();

        let by_tags = search.query(&SearchQuery { tags: Some("cms".into()), ..Default::default() }).await;
        assert_eq!(by_tags.len(), 1);
        assert_eq!(by_tags[0].name, "wordpress");

        let by_categories = search.query(&SearchQuery { categories: Some("cms".into()), ..Default::default() }).await;
        assert_eq!(by_categories.len(), 1);
    }

    #[tokio::test]
    async fn filters_by_kind() {
        let search = InProcessSearch::new();
        let mut bundle = doc("cs:~charmers/bundle/wordpress-simple-1", false, 0);
        bundle.kind = "bundle".into();
        search.upsert_doc(bundle).await.unwrap();
        search.upsert_doc(doc("cs:~charmers/trusty/wordpress-1", false, 0)).await.unwrap();

        let results = search.query(&SearchQuery { kind: Some("bundle".into()), ..Default::default() }).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].kind, "bundle");
    }

    #[tokio::test]
    async fn sorts_by_requested_field_and_direction() {
        let search = InProcessSearch::new();
        search.upsert_doc(doc("cs:~charmers/trusty/wordpress-1", false, 5)).await.unwrap();
        search.upsert_doc(doc("cs:~charmers/trusty/mysql-1", false, 50)).await.unwrap();

        let ascending = search
            .query(&SearchQuery {
                sort: Some(SearchSort { field: SortField::Downloads, direction: SortDirection::Ascending }),
                ..Default::default()
            })
            .await;
        assert_eq!(ascending[0].name, "wordpress");

        let descending = search
            .query(&SearchQuery {
                sort: Some(SearchSort { field: SortField::Downloads, direction: SortDirection::Descending }),
                ..Default::default()
            })
            .await;
        assert_eq!(descending[0].name, "mysql");
    }
}
