//! Ordered, idempotent, record-and-resume schema upgrades.
//!
//! A static list of `(name, Option<MigrateFn>)` runs once at startup.
//! A migration whose name is already in the executed set is skipped.
//! `run == None` marks an obsolete migration that must stay in the
//! list: its presence is what lets a fresh deployment tell "a
//! migration we don't recognize ran against this data" apart from
//! "nothing has run yet".

use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, info};

use crate::catalog::collection::Collection;
use crate::catalog::Catalog;
use crate::error::StoreError;

pub type MigrateFn = fn(Arc<Catalog>) -> BoxFuture<'static, Result<(), StoreError>>;

pub struct Migration {
    pub name: &'static str,
    pub run: Option<MigrateFn>,
}

/// Recomputes `charm_provided_interfaces`/`charm_required_interfaces`
/// from each entity's parsed metadata. A no-op against catalogs built
/// entirely by the current ingestion path (which already populates
/// these at write time) — it exists for data that predates that
/// denormalization.
fn backfill_charm_interfaces(catalog: Arc<Catalog>) -> BoxFuture<'static, Result<(), StoreError>> {
    Box::pin(async move {
        for entity in catalog.entities.all().await {
            let Some(meta) = entity.charm_meta.clone() else { continue };
            let provided: Vec<String> = meta.provided_interfaces().into_iter().map(String::from).collect();
            let required: Vec<String> = meta.required_interfaces().into_iter().map(String::from).collect();

            if provided == entity.charm_provided_interfaces && required == entity.charm_required_interfaces {
                continue;
            }

            let url = entity.url.clone();
            catalog
                .update_entity(&url, |e| {
                    e.charm_provided_interfaces = provided.clone();
                    e.charm_required_interfaces = required.clone();
                })
                .await?;
        }
        Ok(())
    })
}

/// The indexes declared over the catalog (by baseURL, by
/// promulgatedURL, by blob hash, by interface) are maintained
/// in-memory from construction rather than built lazily, so there is
/// nothing to create here. This entry exists so a fresh deployment's
/// migration list still enforces "every collection this build expects
/// has its indexes" the same way a real document database migration
/// would.
fn ensure_catalog_indexes(_catalog: Arc<Catalog>) -> BoxFuture<'static, Result<(), StoreError>> {
    Box::pin(async move { Ok(()) })
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "2019-01-01_ensure_catalog_indexes",
        run: Some(ensure_catalog_indexes),
    },
    // Superseded by `Channel::from_str` translating `development` to
    // `Edge` on every read; kept so a catalog carrying this name from
    // before that change doesn't trip the "unrecognized migration
    // name" startup check.
    Migration {
        name: "legacy_development_channel_rename",
        run: None,
    },
    Migration {
        name: "2021-06-01_backfill_charm_interfaces",
        run: Some(backfill_charm_interfaces),
    },
];

/// Runs every migration in `MIGRATIONS` not already recorded as
/// executed, in order, recording each by name as it completes.
///
/// Refuses to start against a catalog that has recorded a migration
/// name this build doesn't know about — a newer build's migration ran
/// here and this one can no longer reason about the catalog's shape.
pub async fn run(catalog: Arc<Catalog>) -> Result<(), StoreError> {
    let mut record = catalog.migrations.get(&()).await.unwrap_or_default();

    for name in &record.executed {
        if !MIGRATIONS.iter().any(|m| m.name == name) {
            return Err(StoreError::UnrecognizedMigration(name.clone()));
        }
    }

    for migration in MIGRATIONS {
        if record.has_run(migration.name) {
            debug!(name = migration.name, "skipping already-executed migration");
            continue;
        }

        if let Some(run_fn) = migration.run {
            info!(name = migration.name, "running migration");
            run_fn(catalog.clone()).await?;
        } else {
            debug!(name = migration.name, "recording obsolete migration");
        }

        record.mark_run(migration.name);
        catalog.migrations.force_upsert((), record.clone()).await;
    }

    Ok(())
}
