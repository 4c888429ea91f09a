//! `publish`: makes a resolved entity the channel head for every
//! series it supports.

use std::collections::BTreeSet;

use crate::catalog::collection::Collection;
use crate::catalog::Catalog;
use crate::channel::Channel;
use crate::error::StoreError;
use crate::id::EntityId;
use crate::series::Series;

/// `(resource name, revision)` pairs a caller wants attached to the
/// published entity.
pub type ResourceRevisions = Vec<(String, i64)>;

fn bundle_series() -> Vec<Series> {
    vec![Series::bundle()]
}

/// Publishes `url` (already inserted via ingestion) into `channels`,
/// pinning `resources` as the revision set in effect for this head.
pub async fn publish(
    catalog: &Catalog,
    url: &EntityId,
    resources: &ResourceRevisions,
    channels: &[Channel],
) -> Result<(), StoreError> {
    if let Some(bad) = channels.iter().find(|c| !c.is_publishable()) {
        return Err(StoreError::PublishResourceMismatch(format!("channel `{}` is not publishable", bad)));
    }

    let entity = catalog
        .entities
        .get(url)
        .await
        .ok_or_else(|| StoreError::not_found(url.to_string()))?;

    if !entity.is_bundle() {
        let declared: BTreeSet<String> = entity
            .charm_meta
            .as_ref()
            .map(|m| m.resources.keys().cloned().collect())
            .unwrap_or_default();
        let given: BTreeSet<String> = resources.iter().map(|(name, _)| name.clone()).collect();
        if declared != given {
            return Err(StoreError::PublishResourceMismatch(format!(
                "declared resources {:?} do not match supplied revisions {:?}",
                declared, given
            )));
        }

        for (name, revision) in resources {
            let rows = catalog.resources_for(&entity.base_url, name).await;
            let matches = rows.iter().any(|r| r.revision == *revision && !r.is_placeholder());
            if !matches {
                return Err(StoreError::PublishResourceMismatch(format!(
                    "resource `{}` has no uploaded revision {}",
                    name, revision
                )));
            }
        }
    }

    let series_list: Vec<Series> = if entity.is_bundle() {
        bundle_series()
    } else {
        entity.supported_series.clone()
    };

    for &channel in channels {
        catalog
            .update_base_entity(&entity.base_url, |base| {
                for series in &series_list {
                    base.set_head(channel, series.clone(), entity.url.clone());
                }
            })
            .await?;
    }

    catalog
        .update_entity(&entity.url, |e| {
            for &channel in channels {
                e.published.insert(channel);
            }
        })
        .await?;

    Ok(())
}
