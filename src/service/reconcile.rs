//! Catalog reconciliation sweep
//!
//! `added_by_count` is maintained incrementally without cross-request
//! coordination, so it can drift. The sweep rebuilds it from the group
//! records, repairs back-references and refreshes posting cadence.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect,
};
use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{error, info};

use super::cadence::recompute_all_cadences;
use super::catalog::holder_condition;
use super::{now, ServiceResult};
use crate::entity::{global_group, group};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub entries_checked: u64,
    pub counters_fixed: u64,
    pub orphans_cleared: u64,
    pub links_added: u64,
    pub cadences_refreshed: u64,
}

/// Run one full sweep. Running it again immediately fixes nothing.
pub async fn reconcile_catalog(db: &DatabaseConnection) -> ServiceResult<ReconcileReport> {
    let mut report = ReconcileReport::default();
    let entries = global_group::Entity::find().all(db).await?;
    let entry_ids: HashSet<i64> = entries.iter().map(|e| e.id).collect();

    // Back-references to entries that no longer exist
    let linked: Vec<(i64, Option<i64>)> = group::Entity::find()
        .select_only()
        .column(group::Column::Id)
        .column(group::Column::GlobalGroupId)
        .filter(group::Column::GlobalGroupId.is_not_null())
        .into_tuple()
        .all(db)
        .await?;
    let orphans: Vec<i64> = linked
        .into_iter()
        .filter(|(_, entry_id)| entry_id.map_or(false, |id| !entry_ids.contains(&id)))
        .map(|(id, _)| id)
        .collect();
    if !orphans.is_empty() {
        let cleared = group::Entity::update_many()
            .col_expr(group::Column::GlobalGroupId, Expr::value(Option::<i64>::None))
            .filter(group::Column::Id.is_in(orphans))
            .exec(db)
            .await?;
        report.orphans_cleared = cleared.rows_affected;
    }

    for entry in &entries {
        report.entries_checked += 1;

        // Legacy rows matched by name get the explicit back-reference
        let linked = group::Entity::update_many()
            .col_expr(group::Column::GlobalGroupId, Expr::value(entry.id))
            .filter(group::Column::GlobalGroupId.is_null())
            .filter(group::Column::Name.eq(entry.name.as_str()))
            .exec(db)
            .await?;
        report.links_added += linked.rows_affected;

        let holders = group::Entity::find()
            .filter(holder_condition(entry))
            .count(db)
            .await? as i64;
        if holders != entry.added_by_count {
            info!(
                "Catalog group \"{}\": added_by_count {} -> {}",
                entry.name, entry.added_by_count, holders
            );
            global_group::Entity::update_many()
                .col_expr(global_group::Column::AddedByCount, Expr::value(holders))
                .col_expr(global_group::Column::UpdatedAt, Expr::value(now()))
                .filter(global_group::Column::Id.eq(entry.id))
                .exec(db)
                .await?;
            report.counters_fixed += 1;
        }
    }

    report.cadences_refreshed = recompute_all_cadences(db).await?;

    info!("Catalog reconciliation finished: {:?}", report);
    Ok(report)
}

/// Spawn a background task running the sweep every `interval`
pub fn spawn_periodic(db: DatabaseConnection, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = reconcile_catalog(&db).await {
                error!("Catalog reconciliation failed: {}", e);
            }
        }
    })
}
