//! Global catalog handlers
//!
//! Listing, adoption into a company, contribution, deletion impact,
//! cascading deletion and the reconciliation sweep

use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};
use serde::Deserialize;

use crate::entity::global_group::CatalogEntryResponse;
use crate::entity::group::GroupResponse;
use crate::entity::op_log::{OpResult, OpType};
use crate::error::AppResult;
use crate::handlers::audit::service::log_operation;
use crate::middleware::{CurrentUser, DbConn};
use crate::routes::ApiResponse;
use crate::service::catalog::{self, ContributeRequest, DeletionImpact, DeletionOutcome};
use crate::service::reconcile::{self, ReconcileReport};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddToCompanyRequest {
    pub company_id: Option<i64>,
}

/// GET /api/catalog
pub async fn list_catalog(
    Extension(db): Extension<DbConn>,
    Extension(_user): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<Vec<CatalogEntryResponse>>>> {
    let entries = catalog::list_entries(&db).await?;
    Ok(Json(ApiResponse::success(
        entries.into_iter().map(CatalogEntryResponse::from).collect(),
    )))
}

/// GET /api/catalog/:id
pub async fn get_catalog_entry(
    Extension(db): Extension<DbConn>,
    Extension(_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<CatalogEntryResponse>>> {
    let entry = catalog::get_entry(&db, id).await?;
    Ok(Json(ApiResponse::success(entry.into())))
}

/// POST /api/catalog/:id/add
pub async fn add_to_company(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<AddToCompanyRequest>,
) -> AppResult<Json<ApiResponse<GroupResponse>>> {
    match catalog::add_to_company(&db, current_user.id, id, req.company_id).await {
        Ok(group) => {
            let op_desc = format!("catalog group: {} -> company {}", group.name, group.company_id);
            log_operation(current_user.id, OpType::AddCatalogGroup, op_desc, OpResult::Success);
            Ok(Json(ApiResponse::success(group.into())))
        }
        Err(e) => {
            log_operation(current_user.id, OpType::AddCatalogGroup, e.to_string(), OpResult::Failed);
            Err(e.into())
        }
    }
}

/// POST /api/catalog
pub async fn contribute(
    State(state): State<AppState>,
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Json(req): Json<ContributeRequest>,
) -> AppResult<Json<ApiResponse<CatalogEntryResponse>>> {
    match catalog::contribute(&db, current_user.id, req, state.default_quality_score()).await {
        Ok(entry) => {
            let op_desc = format!("catalog group: {}", entry.name);
            log_operation(current_user.id, OpType::ContributeCatalogGroup, op_desc, OpResult::Success);
            Ok(Json(ApiResponse::success(entry.into())))
        }
        Err(e) => {
            log_operation(current_user.id, OpType::ContributeCatalogGroup, e.to_string(), OpResult::Failed);
            Err(e.into())
        }
    }
}

/// GET /api/catalog/:id/impact
pub async fn deletion_impact(
    State(state): State<AppState>,
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<DeletionImpact>>> {
    let impact = catalog::deletion_impact(&db, current_user.id, id, state.delete_threshold()).await?;
    Ok(Json(ApiResponse::success(impact)))
}

/// DELETE /api/catalog/:id
pub async fn delete_catalog_entry(
    State(state): State<AppState>,
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<DeletionOutcome>>> {
    match catalog::delete_entry(&db, current_user.id, id, state.delete_threshold()).await {
        Ok(outcome) => {
            let op_desc = format!(
                "catalog group {}: {} group records, {} posts removed",
                id, outcome.affected.organizations, outcome.affected.posts
            );
            log_operation(current_user.id, OpType::DeleteCatalogGroup, op_desc, OpResult::Success);
            Ok(Json(ApiResponse::success(outcome)))
        }
        Err(e) => {
            let op_desc = format!("catalog group {}: {}", id, e);
            log_operation(current_user.id, OpType::DeleteCatalogGroup, op_desc, OpResult::Failed);
            Err(e.into())
        }
    }
}

/// POST /api/catalog/reconcile
pub async fn reconcile_catalog(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<ReconcileReport>>> {
    let report = reconcile::reconcile_catalog(&db).await?;
    log_operation(
        current_user.id,
        OpType::ReconcileCatalog,
        format!("{} counters fixed, {} links added", report.counters_fixed, report.links_added),
        OpResult::Success,
    );
    Ok(Json(ApiResponse::success(report)))
}
