//! Posting cadence
//!
//! `last_post_date`, `posts_this_week` and `posts_this_month` on a group are a
//! cache over its posted posts. Recomputing overwrites them, so it is safe to
//! run at any time.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QuerySelect, Set,
};
use tracing::debug;

use super::{now, ServiceError, ServiceResult};
use crate::entity::group;
use crate::entity::post::{self, PostStatus};

const DAY_SECS: i64 = 24 * 60 * 60;
const WEEK_SECS: i64 = 7 * DAY_SECS;
const MONTH_SECS: i64 = 30 * DAY_SECS;

/// Derived posting counters for one group
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cadence {
    pub last_post_date: Option<i64>,
    pub posts_this_week: i32,
    pub posts_this_month: i32,
}

impl Cadence {
    /// Fold posted timestamps into counters relative to `now`
    pub fn from_posted_times(times: &[i64], now: i64) -> Self {
        let week_start = now - WEEK_SECS;
        let month_start = now - MONTH_SECS;
        Self {
            last_post_date: times.iter().copied().max(),
            posts_this_week: times.iter().filter(|&&t| t >= week_start).count() as i32,
            posts_this_month: times.iter().filter(|&&t| t >= month_start).count() as i32,
        }
    }
}

/// Recompute the cadence cache of one group from its posted posts
pub async fn recompute_cadence<C: ConnectionTrait>(db: &C, group_id: i64) -> ServiceResult<group::Model> {
    recompute_cadence_at(db, group_id, now()).await
}

pub async fn recompute_cadence_at<C: ConnectionTrait>(
    db: &C,
    group_id: i64,
    now: i64,
) -> ServiceResult<group::Model> {
    let group = group::Entity::find_by_id(group_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Group {} not found", group_id)))?;

    let times: Vec<i64> = post::Entity::find()
        .select_only()
        .column(post::Column::PostedAt)
        .filter(post::Column::GroupId.eq(group.id))
        .filter(post::Column::TenantId.eq(group.tenant_id))
        .filter(post::Column::Status.eq(PostStatus::Posted))
        .filter(post::Column::PostedAt.is_not_null())
        .into_tuple::<Option<i64>>()
        .all(db)
        .await?
        .into_iter()
        .flatten()
        .collect();

    let cadence = Cadence::from_posted_times(&times, now);
    if cadence.last_post_date == group.last_post_date
        && cadence.posts_this_week == group.posts_this_week
        && cadence.posts_this_month == group.posts_this_month
    {
        return Ok(group);
    }

    debug!("Group {} cadence refreshed: {:?}", group.id, cadence);
    let mut active = group.into_active_model();
    active.last_post_date = Set(cadence.last_post_date);
    active.posts_this_week = Set(cadence.posts_this_week);
    active.posts_this_month = Set(cadence.posts_this_month);
    active.updated_at = Set(now);
    Ok(active.update(db).await?)
}

/// Recompute every group's cadence cache, returning how many groups were visited
pub async fn recompute_all_cadences<C: ConnectionTrait>(db: &C) -> ServiceResult<u64> {
    let ids: Vec<i64> = group::Entity::find()
        .select_only()
        .column(group::Column::Id)
        .into_tuple::<i64>()
        .all(db)
        .await?;

    let ts = now();
    for id in &ids {
        recompute_cadence_at(db, *id, ts).await?;
    }
    Ok(ids.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing;

    const NOW: i64 = 1_760_000_000;

    #[test]
    fn cadence_windows() {
        let times = [NOW - DAY_SECS, NOW - 6 * DAY_SECS, NOW - 8 * DAY_SECS, NOW - 45 * DAY_SECS];
        let cadence = Cadence::from_posted_times(&times, NOW);
        assert_eq!(cadence.last_post_date, Some(NOW - DAY_SECS));
        assert_eq!(cadence.posts_this_week, 2);
        assert_eq!(cadence.posts_this_month, 3);
    }

    #[test]
    fn empty_history() {
        assert_eq!(Cadence::from_posted_times(&[], NOW), Cadence::default());
    }

    #[tokio::test]
    async fn recompute_counts_only_posted_posts_and_is_idempotent() {
        let db = testing::db().await;
        let company = testing::company(&db, 1, "Lubbock Motors").await;
        let group = testing::manual_group(&db, 1, company.id, "Odessa Swap Meet").await;
        let other = testing::manual_group(&db, 1, company.id, "Midland Deals").await;

        testing::post(&db, &group, PostStatus::Posted, Some(NOW - 2 * DAY_SECS)).await;
        testing::post(&db, &group, PostStatus::Posted, Some(NOW - 20 * DAY_SECS)).await;
        testing::post(&db, &group, PostStatus::Scheduled, None).await;
        testing::post(&db, &other, PostStatus::Posted, Some(NOW - DAY_SECS)).await;

        let first = recompute_cadence_at(&db, group.id, NOW).await.unwrap();
        assert_eq!(first.posts_this_week, 1);
        assert_eq!(first.posts_this_month, 2);
        assert_eq!(first.last_post_date, Some(NOW - 2 * DAY_SECS));

        let second = recompute_cadence_at(&db, group.id, NOW).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn recompute_missing_group_is_not_found() {
        let db = testing::db().await;
        let result = recompute_cadence(&db, 99).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn recompute_all_visits_every_group() {
        let db = testing::db().await;
        let company = testing::company(&db, 1, "Lubbock Motors").await;
        let group = testing::manual_group(&db, 1, company.id, "Odessa Swap Meet").await;
        testing::manual_group(&db, 1, company.id, "Midland Deals").await;
        testing::post(&db, &group, PostStatus::Posted, Some(now())).await;

        assert_eq!(recompute_all_cadences(&db).await.unwrap(), 2);
        let refreshed = group::Entity::find_by_id(group.id).one(&db).await.unwrap().unwrap();
        assert_eq!(refreshed.posts_this_week, 1);
    }
}
