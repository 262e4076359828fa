//! Global catalog operations
//!
//! A tenant's group record "holds" a catalog entry when it carries the
//! entry's id as back-reference, or, for legacy rows without one, when its
//! name equals the entry's name.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

use super::{now, CascadePhase, ServiceError, ServiceResult};
use crate::entity::company::{self, CompanyRef};
use crate::entity::global_group::{self, Location};
use crate::entity::group::{self, GroupSource, GroupStatus, Privacy, QaStatus};
use crate::entity::join_list;
use crate::entity::post::{self, PostStatus};
use crate::quality;

const DEFAULT_COUNTRY: &str = "USA";

/// Column widths of `gd_global_group`
const MAX_NAME_CHARS: usize = 128;
const MAX_CATEGORY_CHARS: usize = 64;
const MAX_CITY_CHARS: usize = 64;
const MAX_STATE_CHARS: usize = 32;
const MAX_COUNTRY_CHARS: usize = 32;
const MAX_URL_CHARS: usize = 255;

/// Payload for contributing a new catalog entry
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ContributeRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub location: Option<Location>,
    pub description: Option<String>,
    pub facebook_url: Option<String>,
    pub member_count: Option<i64>,
    pub privacy: Option<Privacy>,
    #[serde(default)]
    pub industries: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Who else depends on a catalog entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionImpact {
    pub organizations_using: u64,
    pub scheduled_posts: u64,
    pub organizations: Vec<CompanyRef>,
    pub can_delete: bool,
    pub is_contributor: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Affected {
    pub organizations: u64,
    pub posts: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DeletionOutcome {
    pub affected: Affected,
}

/// Filter selecting every group record that holds `entry`
pub fn holder_condition(entry: &global_group::Model) -> Condition {
    Condition::any()
        .add(group::Column::GlobalGroupId.eq(entry.id))
        .add(
            Condition::all()
                .add(group::Column::GlobalGroupId.is_null())
                .add(group::Column::Name.eq(entry.name.as_str())),
        )
}

/// Filter selecting every post that references `entry` by name or through a holder
fn referencing_posts_condition(entry: &global_group::Model, holder_ids: &[i64]) -> Condition {
    Condition::any()
        .add(post::Column::GroupName.eq(entry.name.as_str()))
        .add(post::Column::GroupId.is_in(holder_ids.iter().copied()))
}

async fn find_holder_ids<C: ConnectionTrait>(db: &C, entry: &global_group::Model) -> Result<Vec<i64>, sea_orm::DbErr> {
    group::Entity::find()
        .select_only()
        .column(group::Column::Id)
        .filter(holder_condition(entry))
        .into_tuple::<i64>()
        .all(db)
        .await
}

async fn find_entry<C: ConnectionTrait>(db: &C, entry_id: i64) -> ServiceResult<global_group::Model> {
    global_group::Entity::find_by_id(entry_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Catalog group {} not found", entry_id)))
}

/// List every catalog entry, ordered by name
pub async fn list_entries(db: &DatabaseConnection) -> ServiceResult<Vec<global_group::Model>> {
    Ok(global_group::Entity::find()
        .order_by_asc(global_group::Column::Name)
        .all(db)
        .await?)
}

pub async fn get_entry(db: &DatabaseConnection, entry_id: i64) -> ServiceResult<global_group::Model> {
    find_entry(db, entry_id).await
}

/// Copy a catalog entry into a tenant company's collection and bump its usage counter
pub async fn add_to_company(
    db: &DatabaseConnection,
    tenant_id: i64,
    entry_id: i64,
    company_id: Option<i64>,
) -> ServiceResult<group::Model> {
    let company_id =
        company_id.ok_or_else(|| ServiceError::Validation("company_id is required".to_string()))?;

    company::Entity::find_by_id(company_id)
        .filter(company::Column::TenantId.eq(tenant_id))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Company {} not found", company_id)))?;

    let entry = find_entry(db, entry_id).await?;

    let duplicate = group::Entity::find()
        .filter(group::Column::TenantId.eq(tenant_id))
        .filter(group::Column::CompanyId.eq(company_id))
        .filter(
            Condition::any()
                .add(group::Column::Name.eq(entry.name.as_str()))
                .add(group::Column::GlobalGroupId.eq(entry.id)),
        )
        .one(db)
        .await?;
    let conflict_msg = format!("\"{}\" is already in your collection", entry.name);
    if duplicate.is_some() {
        return Err(ServiceError::Conflict(conflict_msg));
    }

    let ts = now();
    let new_group = group::ActiveModel {
        tenant_id: Set(tenant_id),
        company_id: Set(company_id),
        global_group_id: Set(Some(entry.id)),
        name: Set(entry.name.clone()),
        category: Set(entry.category.clone()),
        description: Set(entry.description.clone()),
        target_city: Set(entry.city.clone()),
        target_state: Set(entry.state.clone()),
        privacy: Set(entry.privacy),
        audience_size: Set(entry.member_count.max(0)),
        quality_score: Set(quality::clamp_score(entry.quality_score)),
        status: Set(GroupStatus::Active),
        qa_status: Set(QaStatus::Approved),
        source: Set(GroupSource::GlobalDatabase),
        last_post_date: Set(None),
        posts_this_week: Set(0),
        posts_this_month: Set(0),
        created_at: Set(ts),
        updated_at: Set(ts),
        ..Default::default()
    };

    // Insert and counter bump commit together. The (tenant, company, name)
    // index catches a concurrent add that passed the check above.
    let created = db
        .transaction::<_, group::Model, ServiceError>(|txn| {
            Box::pin(async move {
                let created = new_group
                    .insert(txn)
                    .await
                    .map_err(|e| ServiceError::from_insert(e, &conflict_msg))?;

                let bumped = global_group::Entity::update_many()
                    .col_expr(
                        global_group::Column::AddedByCount,
                        Expr::col(global_group::Column::AddedByCount).add(1),
                    )
                    .col_expr(global_group::Column::UpdatedAt, Expr::value(ts))
                    .filter(global_group::Column::Id.eq(entry_id))
                    .exec(txn)
                    .await?;
                if bumped.rows_affected == 0 {
                    return Err(ServiceError::NotFound(format!(
                        "Catalog group {} not found",
                        entry_id
                    )));
                }

                Ok(created)
            })
        })
        .await
        .map_err(|e| match e {
            sea_orm::TransactionError::Connection(err) => ServiceError::Storage(err),
            sea_orm::TransactionError::Transaction(err) => err,
        })?;

    info!(
        "Tenant {} added catalog group \"{}\" to company {}",
        tenant_id, created.name, company_id
    );
    Ok(created)
}

/// Create a brand-new catalog entry from tenant supplied data
pub async fn contribute(
    db: &DatabaseConnection,
    tenant_id: i64,
    req: ContributeRequest,
    default_quality_score: i32,
) -> ServiceResult<global_group::Model> {
    let name = req.name.trim().to_string();
    let category = req.category.trim().to_string();
    let (city, state, country) = match &req.location {
        Some(loc) => (
            loc.city.trim().to_string(),
            loc.state.trim().to_string(),
            loc.country.as_deref().map(str::trim).unwrap_or("").to_string(),
        ),
        None => (String::new(), String::new(), String::new()),
    };

    let missing: Vec<&str> = [
        ("name", name.is_empty()),
        ("category", category.is_empty()),
        ("location.city", city.is_empty()),
        ("location.state", state.is_empty()),
    ]
    .into_iter()
    .filter_map(|(field, absent)| absent.then_some(field))
    .collect();
    if !missing.is_empty() {
        return Err(ServiceError::Validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }

    let facebook_url = req
        .facebook_url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());
    let too_long: Vec<String> = [
        ("name", name.as_str(), MAX_NAME_CHARS),
        ("category", category.as_str(), MAX_CATEGORY_CHARS),
        ("location.city", city.as_str(), MAX_CITY_CHARS),
        ("location.state", state.as_str(), MAX_STATE_CHARS),
        ("location.country", country.as_str(), MAX_COUNTRY_CHARS),
        ("facebook_url", facebook_url.as_deref().unwrap_or(""), MAX_URL_CHARS),
    ]
    .into_iter()
    .filter(|(_, value, max)| value.chars().count() > *max)
    .map(|(field, _, max)| format!("{} (max {})", field, max))
    .collect();
    if !too_long.is_empty() {
        return Err(ServiceError::Validation(format!(
            "Fields too long: {}",
            too_long.join(", ")
        )));
    }

    let conflict_msg = format!("A catalog group named \"{}\" already exists", name);
    let existing = global_group::Entity::find()
        .filter(global_group::Column::Name.eq(name.as_str()))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(ServiceError::Conflict(conflict_msg));
    }

    let ts = now();
    let entry = global_group::ActiveModel {
        name: Set(name),
        category: Set(category),
        description: Set(req.description.unwrap_or_default()),
        facebook_url: Set(facebook_url),
        city: Set(city),
        state: Set(state),
        country: Set(if country.is_empty() { DEFAULT_COUNTRY.to_string() } else { country }),
        member_count: Set(req.member_count.unwrap_or(0).max(0)),
        privacy: Set(req.privacy.unwrap_or_default()),
        quality_score: Set(quality::clamp_score(default_quality_score)),
        industries: Set(join_list(&req.industries)),
        tags: Set(join_list(&req.tags)),
        contributed_by: Set(tenant_id.to_string()),
        contributed_at: Set(ts),
        verified: Set(false),
        verified_by_admin: Set(false),
        added_by_count: Set(0),
        trending_score: Set(0),
        created_at: Set(ts),
        updated_at: Set(ts),
        ..Default::default()
    };

    let txn = db.begin().await?;

    // The unique index on name settles a race between two contributors
    let mut entry = entry
        .insert(&txn)
        .await
        .map_err(|e| ServiceError::from_insert(e, &conflict_msg))?;

    // Unlinked rows already carrying this name hold the new entry
    let linked = group::Entity::update_many()
        .col_expr(group::Column::GlobalGroupId, Expr::value(entry.id))
        .col_expr(group::Column::UpdatedAt, Expr::value(ts))
        .filter(group::Column::GlobalGroupId.is_null())
        .filter(group::Column::Name.eq(entry.name.as_str()))
        .exec(&txn)
        .await?;
    if linked.rows_affected > 0 {
        let mut active = entry.into_active_model();
        active.added_by_count = Set(linked.rows_affected as i64);
        entry = active.update(&txn).await?;
    }

    txn.commit().await?;

    info!(
        "Tenant {} contributed catalog group \"{}\" ({} existing holders)",
        tenant_id, entry.name, entry.added_by_count
    );
    Ok(entry)
}

/// Report who would be affected by deleting a catalog entry. Read-only.
pub async fn deletion_impact(
    db: &DatabaseConnection,
    tenant_id: i64,
    entry_id: i64,
    delete_threshold: u64,
) -> ServiceResult<DeletionImpact> {
    let entry = find_entry(db, entry_id).await?;

    let holders = group::Entity::find()
        .filter(holder_condition(&entry))
        .all(db)
        .await?;
    let holder_ids: Vec<i64> = holders.iter().map(|g| g.id).collect();

    let scheduled_posts = post::Entity::find()
        .filter(referencing_posts_condition(&entry, &holder_ids))
        .filter(post::Column::Status.eq(PostStatus::Scheduled))
        .count(db)
        .await?;

    let mut company_ids: Vec<i64> = holders.iter().map(|g| g.company_id).collect();
    company_ids.sort_unstable();
    company_ids.dedup();

    let organizations: BTreeMap<i64, CompanyRef> = company::Entity::find()
        .filter(company::Column::Id.is_in(company_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, CompanyRef::from(c)))
        .collect();

    let organizations_using = holders.len() as u64;
    Ok(DeletionImpact {
        organizations_using,
        scheduled_posts,
        organizations: organizations.into_values().collect(),
        can_delete: organizations_using < delete_threshold,
        is_contributor: entry.is_contributor(tenant_id),
    })
}

/// Delete a catalog entry together with every holding group record and every referencing post
pub async fn delete_entry(
    db: &DatabaseConnection,
    tenant_id: i64,
    entry_id: i64,
    delete_threshold: u64,
) -> ServiceResult<DeletionOutcome> {
    let entry = find_entry(db, entry_id).await?;

    if !entry.is_contributor(tenant_id) {
        return Err(ServiceError::Forbidden(
            "You can only delete groups you contributed".to_string(),
        ));
    }

    let organizations_using = group::Entity::find()
        .filter(holder_condition(&entry))
        .count(db)
        .await?;
    if organizations_using >= delete_threshold {
        return Err(ServiceError::Forbidden(format!(
            "Cannot delete: group is used by {}+ organizations",
            delete_threshold
        )));
    }

    let mut completed = Vec::new();
    let mut phase = CascadePhase::Begin;
    let cascade_err = |phase: CascadePhase, completed: &Vec<CascadePhase>, source: sea_orm::DbErr| {
        warn!(
            "Cascading delete of catalog group {} failed during {} after {:?}",
            entry_id, phase, completed
        );
        ServiceError::Cascade {
            phase,
            completed: completed.clone(),
            source,
        }
    };

    let txn = db
        .begin()
        .await
        .map_err(|e| cascade_err(phase, &completed, e))?;

    let holder_ids = find_holder_ids(&txn, &entry)
        .await
        .map_err(|e| cascade_err(phase, &completed, e))?;
    completed.push(phase);

    phase = CascadePhase::CatalogEntry;
    global_group::Entity::delete_by_id(entry.id)
        .exec(&txn)
        .await
        .map_err(|e| cascade_err(phase, &completed, e))?;
    completed.push(phase);

    phase = CascadePhase::Groups;
    let groups = group::Entity::delete_many()
        .filter(group::Column::Id.is_in(holder_ids.iter().copied()))
        .exec(&txn)
        .await
        .map_err(|e| cascade_err(phase, &completed, e))?;
    completed.push(phase);

    phase = CascadePhase::Posts;
    let posts = post::Entity::delete_many()
        .filter(referencing_posts_condition(&entry, &holder_ids))
        .exec(&txn)
        .await
        .map_err(|e| cascade_err(phase, &completed, e))?;
    completed.push(phase);

    phase = CascadePhase::Commit;
    txn.commit()
        .await
        .map_err(|e| cascade_err(phase, &completed, e))?;

    info!(
        "Tenant {} deleted catalog group \"{}\": {} group records, {} posts",
        tenant_id, entry.name, groups.rows_affected, posts.rows_affected
    );

    Ok(DeletionOutcome {
        affected: Affected {
            organizations: groups.rows_affected,
            posts: posts.rows_affected,
        },
    })
}

/// Give an unlinked group record the back-reference of the catalog entry sharing
/// its name, if one exists, and count it as a holder
pub async fn link_by_name<C: ConnectionTrait>(db: &C, group: group::Model) -> ServiceResult<group::Model> {
    if group.global_group_id.is_some() {
        return Ok(group);
    }

    let Some(entry) = global_group::Entity::find()
        .filter(global_group::Column::Name.eq(group.name.as_str()))
        .one(db)
        .await?
    else {
        return Ok(group);
    };

    let ts = now();
    let mut active = group.into_active_model();
    active.global_group_id = Set(Some(entry.id));
    active.updated_at = Set(ts);
    let linked = active.update(db).await?;

    global_group::Entity::update_many()
        .col_expr(
            global_group::Column::AddedByCount,
            Expr::col(global_group::Column::AddedByCount).add(1),
        )
        .col_expr(global_group::Column::UpdatedAt, Expr::value(ts))
        .filter(global_group::Column::Id.eq(entry.id))
        .exec(db)
        .await?;

    Ok(linked)
}

/// Decrement the usage counter of the entry `group` holds, if any
pub async fn release_holder<C: ConnectionTrait>(db: &C, group: &group::Model) -> ServiceResult<()> {
    let condition = match group.global_group_id {
        Some(entry_id) => global_group::Column::Id.eq(entry_id),
        None => global_group::Column::Name.eq(group.name.as_str()),
    };

    global_group::Entity::update_many()
        .col_expr(
            global_group::Column::AddedByCount,
            Expr::col(global_group::Column::AddedByCount).sub(1),
        )
        .col_expr(global_group::Column::UpdatedAt, Expr::value(now()))
        .filter(condition)
        .filter(global_group::Column::AddedByCount.gt(0))
        .exec(db)
        .await?;
    Ok(())
}
