//! Resolves a partial identifier plus an optional channel to exactly
//! one entity, deterministically.

use std::cmp::Ordering;

use crate::catalog::collection::Collection;
use crate::catalog::Catalog;
use crate::channel::Channel;
use crate::error::StoreError;
use crate::id::EntityId;
use crate::model::Entity;

/// Orders candidates so the best match sorts last — channel rank,
/// then promulgated revision, then owned revision, then lexicographic
/// user, each higher/later value winning.
fn compare_candidates(a: &Entity, b: &Entity, channel_requested: bool) -> Ordering {
    if !channel_requested {
        let rank_a = a.published.iter().map(Channel::rank).max().unwrap_or(0);
        let rank_b = b.published.iter().map(Channel::rank).max().unwrap_or(0);
        if rank_a != rank_b {
            return rank_a.cmp(&rank_b);
        }
    }

    let promulgated_a = a.promulgated_revision;
    let promulgated_b = b.promulgated_revision;
    if promulgated_a.is_some() || promulgated_b.is_some() {
        if promulgated_a != promulgated_b {
            return promulgated_a.cmp(&promulgated_b);
        }
    }

    let revision_a = a.url.revision.unwrap_or(0);
    let revision_b = b.url.revision.unwrap_or(0);
    if revision_a != revision_b {
        return revision_a.cmp(&revision_b);
    }

    // Lexicographic user, reversed so the alphabetically-first user
    // sorts last ("wins") for reproducibility — arbitrary but stable.
    b.url.user.cmp(&a.url.user)
}

/// Gathers the candidate set for step 3 of resolution.
async fn candidates(catalog: &Catalog, query: &EntityId) -> Vec<Entity> {
    match (&query.user, &query.series, query.revision) {
        (Some(_), Some(_), Some(_)) => catalog.entities.get(query).await.into_iter().collect(),
        (Some(user), Some(series), None) => {
            let base_url = format!("~{}/{}", user, query.name);
            catalog
                .entities_by_base_url(&base_url)
                .await
                .into_iter()
                .filter(|e| e.supported_series.contains(series) || e.url.series.as_ref() == Some(series))
                .collect()
        }
        (Some(user), None, _) => {
            let base_url = format!("~{}/{}", user, query.name);
            let all = catalog.entities_by_base_url(&base_url).await;
            match &query.series {
                Some(series) => all.into_iter().filter(|e| e.supported_series.contains(series)).collect(),
                None => all,
            }
        }
        (None, Some(_), Some(_)) => {
            if let Some(entity) = catalog.entity_by_promulgated_url(&query.to_string()).await {
                vec![entity]
            } else {
                // Fall back to treating the query as if it were owned —
                // the caller may have supplied an owned URL without `~user`
                // by mistake; nothing resolves without a user in that case.
                Vec::new()
            }
        }
        (None, Some(series), None) => {
            // Promulgated name lookup restricted to a series, e.g.
            // `cs:trusty/wordpress` with no revision.
            catalog
                .entities_by_name(&query.name)
                .await
                .into_iter()
                .filter(|e| e.promulgated_url.is_some())
                .filter(|e| e.supported_series.contains(series) || e.url.series.as_ref() == Some(series))
                .collect()
        }
        (None, None, _) => {
            // Promulgated name lookup: every entity whose name matches and
            // that currently has a promulgated projection.
            catalog
                .entities_by_name(&query.name)
                .await
                .into_iter()
                .filter(|e| e.promulgated_url.is_some())
                .collect()
        }
    }
}

/// Resolves `query` under `channel` (`None`/`Channel::Unpublished`
/// means "no channel restriction").
pub async fn resolve(catalog: &Catalog, query: &EntityId, channel: Option<Channel>) -> Result<Entity, StoreError> {
    let restrict = channel.filter(|c| *c != Channel::Unpublished);

    let mut pool = candidates(catalog, query).await;
    if pool.is_empty() {
        return Err(StoreError::not_found(format!("no matching charm or bundle for {}", query)));
    }

    if let Some(ch) = restrict {
        pool.retain(|e| e.is_published_to(ch));
        if pool.is_empty() {
            return Err(StoreError::not_found(format!("{} not found in {} channel", query, ch)));
        }
    }

    let channel_requested = restrict.is_some();
    pool.sort_by(|a, b| compare_candidates(a, b, channel_requested));
    let resolved = pool.into_iter().last().expect("checked non-empty above");

    catalog.record_download(&resolved.url.to_string()).await;
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, HashSet};

    fn entity(url: &str, promulgated_revision: Option<u32>, published: &[Channel]) -> Entity {
        let url: EntityId = url.parse().unwrap();
        Entity {
            base_url: url.base_url(),
            promulgated_url: promulgated_revision.map(|r| url.clone().with_user(None).with_revision(Some(r))),
            promulgated_revision,
            url,
            blob_hash: "h".into(),
            blob_hash256: "h256".into(),
            size: 1,
            pre_v5_blob_hash: None,
            pre_v5_blob_hash256: None,
            pre_v5_blob_size: None,
            pre_v5_blob_extra_hash: None,
            supported_series: vec![],
            charm_meta: None,
            charm_config: None,
            charm_actions: None,
            charm_provided_interfaces: vec![],
            charm_required_interfaces: vec![],
            bundle_data: None,
            bundle_unit_count: None,
            bundle_machine_count: None,
            contents: BTreeMap::new(),
            published: published.iter().copied().collect::<HashSet<_>>(),
            extra_info: BTreeMap::new(),
            common_info: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn exact_lookup_with_full_identifier() {
        let catalog = Catalog::new();
        catalog.insert_entity(entity("cs:~charmers/trusty/wordpress-23", None, &[])).await.unwrap();

        let found = resolve(&catalog, &"cs:~charmers/trusty/wordpress-23".parse().unwrap(), None).await.unwrap();
        assert_eq!(found.url.revision, Some(23));
    }

    #[tokio::test]
    async fn highest_revision_wins_when_no_channel_requested() {
        let catalog = Catalog::new();
        catalog.insert_entity(entity("cs:~charmers/trusty/wordpress-1", None, &[])).await.unwrap();
        catalog.insert_entity(entity("cs:~charmers/trusty/wordpress-2", None, &[])).await.unwrap();

        let found = resolve(&catalog, &"cs:~charmers/trusty/wordpress".parse().unwrap(), None).await.unwrap();
        assert_eq!(found.url.revision, Some(2));
    }

    #[tokio::test]
    async fn channel_restriction_excludes_unpublished_revisions() {
        let catalog = Catalog::new();
        catalog.insert_entity(entity("cs:~charmers/trusty/wordpress-1", None, &[Channel::Stable])).await.unwrap();
        catalog.insert_entity(entity("cs:~charmers/trusty/wordpress-2", None, &[])).await.unwrap();

        let found = resolve(&catalog, &"cs:~charmers/trusty/wordpress".parse().unwrap(), Some(Channel::Stable))
            .await
            .unwrap();
        assert_eq!(found.url.revision, Some(1));
    }

    #[tokio::test]
    async fn channel_miss_on_fully_qualified_url_reports_channel_not_found() {
        let catalog = Catalog::new();
        catalog.insert_entity(entity("cs:~charmers/trusty/wordpress-1", None, &[])).await.unwrap();

        let err = resolve(&catalog, &"cs:~charmers/trusty/wordpress-1".parse().unwrap(), Some(Channel::Stable))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(msg) if msg.contains("not found in stable channel")));
    }

    #[tokio::test]
    async fn unknown_name_reports_generic_not_found() {
        let catalog = Catalog::new();
        let err = resolve(&catalog, &"cs:~charmers/trusty/missing".parse().unwrap(), None).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(msg) if msg.contains("no matching charm or bundle")));
    }
}
