//! `setPromulgated`: transfers the promulgated alias for a charm/bundle
//! name between base entities.

use crate::catalog::collection::Collection;
use crate::catalog::Catalog;
use crate::error::StoreError;
use crate::series::Series;

/// `true` when every series in `subset` is also present in `superset`
/// and `subset` is strictly smaller — i.e. `subset` brings nothing a
/// multi-series promulgated entity doesn't already cover.
fn is_strict_subset(subset: &[Series], superset: &[Series]) -> bool {
    subset.len() < superset.len() && subset.iter().all(|s| superset.contains(s))
}

/// Sets whether `base_url`'s base entity is the promulgated owner of
/// its `name`.
pub async fn set_promulgated(catalog: &Catalog, base_url: &str, on: bool) -> Result<(), StoreError> {
    let base = catalog
        .base_entities
        .get(&base_url.to_string())
        .await
        .ok_or_else(|| StoreError::not_found(base_url.to_string()))?;

    if !on {
        catalog.update_base_entity(base_url, |b| b.promulgated = false).await?;
        return Ok(());
    }

    // Demote whichever other base entity currently holds the name,
    // clearing its entities' promulgatedURL fields as we go — a
    // demoted base must not leave entities claiming a promulgated URL
    // it no longer owns.
    let siblings = catalog.entities_by_name(&base.name).await;
    let mut other_base_urls: Vec<String> = siblings
        .iter()
        .map(|e| e.base_url.clone())
        .filter(|b| b != base_url)
        .collect();
    other_base_urls.sort();
    other_base_urls.dedup();

    for other in &other_base_urls {
        if let Some(other_base) = catalog.base_entities.get(other).await {
            if other_base.promulgated {
                catalog.update_base_entity(other, |b| b.promulgated = false).await?;
                for entity in catalog.entities_by_base_url(other).await {
                    if entity.promulgated_url.is_some() {
                        catalog
                            .update_entity(&entity.url, |e| {
                                e.promulgated_url = None;
                                e.promulgated_revision = None;
                            })
                            .await?;
                    }
                }
            }
        }
    }

    // Re-read: the demotion loop above may have cleared some siblings'
    // promulgatedURL fields, and the rest of this function must see
    // that, not the pre-demotion snapshot.
    let siblings = catalog.entities_by_name(&base.name).await;

    // Already-multi-series entities promulgated under any owner for
    // this name, used to decide whether a single-series promotion is
    // redundant.
    let multi_series_covered: Vec<Series> = siblings
        .iter()
        .filter(|e| e.promulgated_url.is_some() && e.supported_series.len() > 1)
        .flat_map(|e| e.supported_series.clone())
        .collect();

    let mut max_existing_revision: i64 = siblings
        .iter()
        .filter_map(|e| e.promulgated_revision)
        .map(i64::from)
        .max()
        .unwrap_or(-1);

    let own_entities = catalog.entities_by_base_url(base_url).await;
    for entity in own_entities {
        if entity.supported_series.len() == 1 && is_strict_subset(&entity.supported_series, &multi_series_covered) {
            continue;
        }
        if !entity.supported_series.is_empty()
            && entity
                .supported_series
                .iter()
                .all(|s| multi_series_covered.contains(s))
            && entity.supported_series.len() <= multi_series_covered.len()
            && entity.supported_series.len() > 1
        {
            // A multi-series entity whose series are already fully
            // covered by an existing promulgated multi-series entity
            // never degrades an existing promotion; skip minting.
            continue;
        }

        max_existing_revision += 1;
        let new_revision = max_existing_revision as u32;
        let promulgated_url = entity.url.with_user(None).with_revision(Some(new_revision));

        catalog
            .update_entity(&entity.url, |e| {
                e.promulgated_url = Some(promulgated_url.clone());
                e.promulgated_revision = Some(new_revision);
            })
            .await?;
    }

    catalog.update_base_entity(base_url, |b| b.promulgated = true).await?;
    Ok(())
}
