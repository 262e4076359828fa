//! Company handlers
//!
//! Implements company CRUD for the calling tenant

use axum::{extract::Path, response::Json, Extension};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;

use crate::entity::op_log::{OpResult, OpType};
use crate::entity::{company, group, post};
use crate::error::{AppError, AppResult, OptionExt};
use crate::handlers::audit::service::log_operation;
use crate::middleware::{CurrentUser, DbConn};
use crate::routes::ApiResponse;
use crate::service::now;

const MAX_NAME_CHARS: usize = 128;

#[derive(Debug, Deserialize)]
pub struct CompanyRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
}

impl CompanyRequest {
    fn validated_name(&self) -> AppResult<String> {
        let name = self.name.trim();
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
}

async fn ensure_unique_name(db: &DbConn, tenant_id: i64, name: &str, exclude: Option<i64>) -> AppResult<()> {
    let mut query = company::Entity::find()
        .filter(company::Column::TenantId.eq(tenant_id))
        .filter(company::Column::Name.eq(name));
    if let Some(id) = exclude {
        query = query.filter(company::Column::Id.ne(id));
    }

    if query.one(&**db).await?.is_some() {
        return Err(AppError::Conflict(format!("Company \"{}\" already exists", name)));
    }
    Ok(())
}

async fn find_owned(db: &DbConn, tenant_id: i64, id: i64) -> AppResult<company::Model> {
    company::Entity::find_by_id(id)
        .filter(company::Column::TenantId.eq(tenant_id))
        .one(&**db)
        .await?
        .ok_or_not_found(format!("Company {} not found", id))
}

/// GET /api/companies
pub async fn list_companies(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<Vec<company::Model>>>> {
    let companies = company::Entity::find()
        .filter(company::Column::TenantId.eq(current_user.id))
        .order_by_asc(company::Column::Name)
        .all(&*db)
        .await?;
    Ok(Json(ApiResponse::success(companies)))
}

/// POST /api/companies
pub async fn add_company(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Json(req): Json<CompanyRequest>,
) -> AppResult<Json<ApiResponse<company::Model>>> {
    let name = req.validated_name()?;
    ensure_unique_name(&db, current_user.id, &name, None).await?;

    let ts = now();
    let created = company::ActiveModel {
        tenant_id: Set(current_user.id),
        name: Set(name),
        industry: Set(req.industry.trim().to_string()),
        city: Set(req.city.trim().to_string()),
        state: Set(req.state.trim().to_string()),
        created_at: Set(ts),
        updated_at: Set(ts),
        ..Default::default()
    }
    .insert(&*db)
    .await?;

    log_operation(
        current_user.id,
        OpType::CreateCompany,
        format!("company: {}", created.name),
        OpResult::Success,
    );
    Ok(Json(ApiResponse::success(created)))
}

/// PUT /api/companies/:id
pub async fn update_company(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<CompanyRequest>,
) -> AppResult<Json<ApiResponse<company::Model>>> {
    let existing = find_owned(&db, current_user.id, id).await?;
    let name = req.validated_name()?;
    ensure_unique_name(&db, current_user.id, &name, Some(id)).await?;

    let old_name = existing.name.clone();
    let mut active = existing.into_active_model();
    active.name = Set(name);
    active.industry = Set(req.industry.trim().to_string());
    active.city = Set(req.city.trim().to_string());
    active.state = Set(req.state.trim().to_string());
    active.updated_at = Set(now());
    let updated = active.update(&*db).await?;

    log_operation(
        current_user.id,
        OpType::UpdateCompany,
        format!("company: {} -> {}", old_name, updated.name),
        OpResult::Success,
    );
    Ok(Json(ApiResponse::success(updated)))
}

/// DELETE /api/companies/:id
pub async fn delete_company(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    let existing = find_owned(&db, current_user.id, id).await?;

    let groups = group::Entity::find()
        .filter(group::Column::CompanyId.eq(id))
        .count(&*db)
        .await?;
    let posts = post::Entity::find()
        .filter(post::Column::CompanyId.eq(id))
        .count(&*db)
        .await?;
    if groups > 0 || posts > 0 {
        return Err(AppError::Conflict(format!(
            "Company still has {} groups and {} posts",
            groups, posts
        )));
    }

    company::Entity::delete_by_id(id).exec(&*db).await?;

    log_operation(
        current_user.id,
        OpType::DeleteCompany,
        format!("company: {}", existing.name),
        OpResult::Success,
    );
    Ok(Json(ApiResponse::success_msg("success")))
}
