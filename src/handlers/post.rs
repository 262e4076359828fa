//! Post handlers
//!
//! Posts keep the target group's name alongside its id. Any change that
//! moves a post into or out of `posted` refreshes the group's cadence.

use axum::{
    extract::{Path, Query},
    response::Json,
    Extension,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Deserialize;

use crate::entity::group;
use crate::entity::op_log::{OpResult, OpType};
use crate::entity::post::{self, PostStatus};
use crate::error::{AppError, AppResult, OptionExt};
use crate::handlers::audit::service::log_operation;
use crate::middleware::{CurrentUser, DbConn};
use crate::routes::ApiResponse;
use crate::service::{cadence, now};

#[derive(Debug, Deserialize)]
pub struct PostQuery {
    pub group_id: Option<i64>,
    pub status: Option<PostStatus>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub group_id: Option<i64>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub status: PostStatus,
    pub scheduled_for: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: PostStatus,
}

async fn find_owned(db: &DbConn, tenant_id: i64, id: i64) -> AppResult<post::Model> {
    post::Entity::find_by_id(id)
        .filter(post::Column::TenantId.eq(tenant_id))
        .one(&**db)
        .await?
        .ok_or_not_found(format!("Post {} not found", id))
}

/// GET /api/posts
pub async fn list_posts(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<PostQuery>,
) -> AppResult<Json<ApiResponse<Vec<post::Model>>>> {
    let mut select = post::Entity::find().filter(post::Column::TenantId.eq(current_user.id));
    if let Some(group_id) = query.group_id {
        select = select.filter(post::Column::GroupId.eq(group_id));
    }
    if let Some(status) = query.status {
        select = select.filter(post::Column::Status.eq(status));
    }

    let posts = select.order_by_desc(post::Column::Id).all(&*db).await?;
    Ok(Json(ApiResponse::success(posts)))
}

/// POST /api/posts
pub async fn add_post(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Json(req): Json<CreatePostRequest>,
) -> AppResult<Json<ApiResponse<post::Model>>> {
    let group_id = req
        .group_id
        .ok_or_else(|| AppError::Validation("group_id is required".to_string()))?;
    let content = req.content.trim().to_string();
    if content.is_empty() {
        return Err(AppError::Validation("content is required".to_string()));
    }

    let target = group::Entity::find_by_id(group_id)
        .filter(group::Column::TenantId.eq(current_user.id))
        .one(&*db)
        .await?
        .ok_or_not_found(format!("Group {} not found", group_id))?;

    let ts = now();
    let posted = req.status == PostStatus::Posted;
    let new_post = post::ActiveModel {
        tenant_id: Set(current_user.id),
        company_id: Set(target.company_id),
        group_id: Set(target.id),
        group_name: Set(target.name.clone()),
        content: Set(content),
        status: Set(req.status),
        scheduled_for: Set(req.scheduled_for),
        posted_at: Set(posted.then_some(ts)),
        created_at: Set(ts),
        updated_at: Set(ts),
        ..Default::default()
    };

    let txn = db.begin().await?;
    let created = new_post.insert(&txn).await?;
    if posted {
        cadence::recompute_cadence_at(&txn, target.id, ts).await?;
    }
    txn.commit().await?;

    log_operation(
        current_user.id,
        OpType::CreatePost,
        format!("post {} -> group {}", created.id, created.group_name),
        OpResult::Success,
    );
    Ok(Json(ApiResponse::success(created)))
}

/// PUT /api/posts/:id/status
pub async fn update_post_status(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> AppResult<Json<ApiResponse<post::Model>>> {
    let existing = find_owned(&db, current_user.id, id).await?;
    let previous = existing.status;
    if previous == req.status {
        return Ok(Json(ApiResponse::success(existing)));
    }

    let ts = now();
    let group_id = existing.group_id;
    let mut active = existing.into_active_model();
    active.status = Set(req.status);
    active.posted_at = Set((req.status == PostStatus::Posted).then_some(ts));
    active.updated_at = Set(ts);

    let txn = db.begin().await?;
    let updated = active.update(&txn).await?;
    if previous == PostStatus::Posted || req.status == PostStatus::Posted {
        cadence::recompute_cadence_at(&txn, group_id, ts).await?;
    }
    txn.commit().await?;

    log_operation(
        current_user.id,
        OpType::UpdatePostStatus,
        format!("post {}: {:?} -> {:?}", id, previous, updated.status),
        OpResult::Success,
    );
    Ok(Json(ApiResponse::success(updated)))
}

/// DELETE /api/posts/:id
pub async fn delete_post(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    let existing = find_owned(&db, current_user.id, id).await?;

    let txn = db.begin().await?;
    post::Entity::delete_by_id(id).exec(&txn).await?;
    if existing.status == PostStatus::Posted {
        cadence::recompute_cadence(&txn, existing.group_id).await?;
    }
    txn.commit().await?;

    log_operation(
        current_user.id,
        OpType::DeletePost,
        format!("post {} (group {})", id, existing.group_name),
        OpResult::Success,
    );
    Ok(Json(ApiResponse::success_msg("success")))
}
