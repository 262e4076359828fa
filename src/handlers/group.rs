//! Group handlers
//!
//! Tenant-owned group records: manual creation, edits, deletion and the
//! posting cadence refresh. Catalog adoption lives in `handlers::catalog`.

use axum::{
    extract::{Path, Query},
    response::Json,
    Extension,
};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Deserialize;

use crate::entity::group::{self, GroupResponse, GroupSource, GroupStatus, Privacy, QaStatus};
use crate::entity::op_log::{OpResult, OpType};
use crate::entity::{company, post};
use crate::error::{AppError, AppResult, OptionExt};
use crate::handlers::audit::service::log_operation;
use crate::middleware::{CurrentUser, DbConn};
use crate::quality;
use crate::routes::ApiResponse;
use crate::service::{cadence, catalog, now, ServiceError};

const MAX_NAME_CHARS: usize = 128;
const DEFAULT_RATING: i32 = 3;

#[derive(Debug, Deserialize)]
pub struct GroupQuery {
    pub company_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub company_id: Option<i64>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub target_city: String,
    #[serde(default)]
    pub target_state: String,
    #[serde(default)]
    pub privacy: Privacy,
    #[serde(default)]
    pub audience_size: i64,
    pub quality_rating: Option<i32>,
}

/// Partial update; absent fields keep their value
#[derive(Debug, Default, Deserialize)]
pub struct UpdateGroupRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub target_city: Option<String>,
    pub target_state: Option<String>,
    pub privacy: Option<Privacy>,
    pub audience_size: Option<i64>,
    pub quality_rating: Option<i32>,
    pub status: Option<GroupStatus>,
    pub qa_status: Option<QaStatus>,
}

fn validated_name(raw: &str) -> AppResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::Validation("name is required".to_string()));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(AppError::Validation(format!(
            "name must be at most {} characters",
            MAX_NAME_CHARS
        )));
    }
    Ok(name.to_string())
}

fn validated_score(rating: i32) -> AppResult<i32> {
    if !quality::is_valid_rating(rating) {
        return Err(AppError::Validation(format!(
            "quality_rating must be between {} and {}",
            quality::MIN_RATING,
            quality::MAX_RATING
        )));
    }
    Ok(quality::score_from_rating(rating))
}

fn validated_audience(size: i64) -> AppResult<i64> {
    if size < 0 {
        return Err(AppError::Validation("audience_size must not be negative".to_string()));
    }
    Ok(size)
}

async fn ensure_unique_name(
    db: &DbConn,
    tenant_id: i64,
    company_id: i64,
    name: &str,
    exclude: Option<i64>,
) -> AppResult<()> {
    let mut query = group::Entity::find()
        .filter(group::Column::TenantId.eq(tenant_id))
        .filter(group::Column::CompanyId.eq(company_id))
        .filter(group::Column::Name.eq(name));
    if let Some(id) = exclude {
        query = query.filter(group::Column::Id.ne(id));
    }

    if query.one(&**db).await?.is_some() {
        return Err(AppError::Conflict(duplicate_msg(name)));
    }
    Ok(())
}

fn duplicate_msg(name: &str) -> String {
    format!("Group \"{}\" already exists", name)
}

async fn find_owned(db: &DbConn, tenant_id: i64, id: i64) -> AppResult<group::Model> {
    group::Entity::find_by_id(id)
        .filter(group::Column::TenantId.eq(tenant_id))
        .one(&**db)
        .await?
        .ok_or_not_found(format!("Group {} not found", id))
}

/// GET /api/groups
pub async fn list_groups(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<GroupQuery>,
) -> AppResult<Json<ApiResponse<Vec<GroupResponse>>>> {
    let mut select = group::Entity::find().filter(group::Column::TenantId.eq(current_user.id));
    if let Some(company_id) = query.company_id {
        select = select.filter(group::Column::CompanyId.eq(company_id));
    }

    let groups = select
        .order_by_asc(group::Column::Name)
        .all(&*db)
        .await?
        .into_iter()
        .map(GroupResponse::from)
        .collect();
    Ok(Json(ApiResponse::success(groups)))
}

/// GET /api/groups/:id
pub async fn get_group(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<GroupResponse>>> {
    let group = find_owned(&db, current_user.id, id).await?;
    Ok(Json(ApiResponse::success(group.into())))
}

/// POST /api/groups
pub async fn add_group(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Json(req): Json<CreateGroupRequest>,
) -> AppResult<Json<ApiResponse<GroupResponse>>> {
    let name = validated_name(&req.name)?;
    let category = req.category.trim().to_string();
    if category.is_empty() {
        return Err(AppError::Validation("category is required".to_string()));
    }
    let company_id = req
        .company_id
        .ok_or_else(|| AppError::Validation("company_id is required".to_string()))?;
    let quality_score = validated_score(req.quality_rating.unwrap_or(DEFAULT_RATING))?;
    let audience_size = validated_audience(req.audience_size)?;

    company::Entity::find_by_id(company_id)
        .filter(company::Column::TenantId.eq(current_user.id))
        .one(&*db)
        .await?
        .ok_or_not_found(format!("Company {} not found", company_id))?;
    ensure_unique_name(&db, current_user.id, company_id, &name, None).await?;
    let conflict_msg = duplicate_msg(&name);

    let ts = now();
    let new_group = group::ActiveModel {
        tenant_id: Set(current_user.id),
        company_id: Set(company_id),
        global_group_id: Set(None),
        name: Set(name),
        category: Set(category),
        description: Set(req.description.trim().to_string()),
        target_city: Set(req.target_city.trim().to_string()),
        target_state: Set(req.target_state.trim().to_string()),
        privacy: Set(req.privacy),
        audience_size: Set(audience_size),
        quality_score: Set(quality_score),
        status: Set(GroupStatus::Active),
        qa_status: Set(QaStatus::Pending),
        source: Set(GroupSource::Manual),
        last_post_date: Set(None),
        posts_this_week: Set(0),
        posts_this_month: Set(0),
        created_at: Set(ts),
        updated_at: Set(ts),
        ..Default::default()
    };

    // A manual group named like a catalog entry holds that entry
    let txn = db.begin().await?;
    let inserted = new_group
        .insert(&txn)
        .await
        .map_err(|e| ServiceError::from_insert(e, &conflict_msg))?;
    let created = catalog::link_by_name(&txn, inserted).await?;
    txn.commit().await?;

    log_operation(
        current_user.id,
        OpType::CreateGroup,
        format!("group: {} (company {})", created.name, created.company_id),
        OpResult::Success,
    );
    Ok(Json(ApiResponse::success(created.into())))
}

/// PUT /api/groups/:id
pub async fn update_group(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateGroupRequest>,
) -> AppResult<Json<ApiResponse<GroupResponse>>> {
    let existing = find_owned(&db, current_user.id, id).await?;

    let new_name = match req.name.as_deref() {
        Some(raw) => {
            let name = validated_name(raw)?;
            if name != existing.name {
                ensure_unique_name(&db, current_user.id, existing.company_id, &name, Some(id))
                    .await?;
            }
            Some(name)
        }
        None => None,
    };
    let renamed = new_name.as_ref().is_some_and(|name| *name != existing.name);
    let conflict_msg = duplicate_msg(new_name.as_deref().unwrap_or(&existing.name));

    let mut active = existing.clone().into_active_model();
    if let Some(name) = new_name {
        active.name = Set(name);
    }
    if let Some(category) = req.category {
        let category = category.trim().to_string();
        if category.is_empty() {
            return Err(AppError::Validation("category must not be empty".to_string()));
        }
        active.category = Set(category);
    }
    if let Some(description) = req.description {
        active.description = Set(description.trim().to_string());
    }
    if let Some(city) = req.target_city {
        active.target_city = Set(city.trim().to_string());
    }
    if let Some(state) = req.target_state {
        active.target_state = Set(state.trim().to_string());
    }
    if let Some(privacy) = req.privacy {
        active.privacy = Set(privacy);
    }
    if let Some(size) = req.audience_size {
        active.audience_size = Set(validated_audience(size)?);
    }
    if let Some(rating) = req.quality_rating {
        active.quality_score = Set(validated_score(rating)?);
    }
    if let Some(status) = req.status {
        active.status = Set(status);
    }
    if let Some(qa_status) = req.qa_status {
        active.qa_status = Set(qa_status);
    }
    active.updated_at = Set(now());

    // Renaming an unlinked group moves its name match to a different entry
    let txn = db.begin().await?;
    if renamed && existing.global_group_id.is_none() {
        catalog::release_holder(&txn, &existing).await?;
    }
    let mut updated = active
        .update(&txn)
        .await
        .map_err(|e| ServiceError::from_insert(e, &conflict_msg))?;
    if renamed {
        // Posts keep a copy of the group name
        post::Entity::update_many()
            .col_expr(post::Column::GroupName, Expr::value(updated.name.as_str()))
            .filter(post::Column::GroupId.eq(id))
            .exec(&txn)
            .await?;
        updated = catalog::link_by_name(&txn, updated).await?;
    }
    txn.commit().await?;

    log_operation(
        current_user.id,
        OpType::UpdateGroup,
        format!("group: {}", updated.name),
        OpResult::Success,
    );
    Ok(Json(ApiResponse::success(updated.into())))
}

/// DELETE /api/groups/:id
///
/// Removes the group with its posts and releases its hold on the catalog entry.
pub async fn delete_group(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    let existing = find_owned(&db, current_user.id, id).await?;

    let txn = db.begin().await?;
    catalog::release_holder(&txn, &existing).await?;
    let posts = post::Entity::delete_many()
        .filter(post::Column::GroupId.eq(id))
        .filter(post::Column::TenantId.eq(current_user.id))
        .exec(&txn)
        .await?;
    group::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    log_operation(
        current_user.id,
        OpType::DeleteGroup,
        format!("group: {} ({} posts removed)", existing.name, posts.rows_affected),
        OpResult::Success,
    );
    Ok(Json(ApiResponse::success_msg("success")))
}

/// POST /api/groups/:id/cadence
pub async fn refresh_cadence(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<GroupResponse>>> {
    find_owned(&db, current_user.id, id).await?;
    let group = cadence::recompute_cadence(&*db, id).await?;
    Ok(Json(ApiResponse::success(group.into())))
}
