//! Audit log handlers
//!
//! Lets a tenant page through its own operation log

use axum::{extract::Query, response::Json, Extension};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::{Deserialize, Serialize};

use crate::entity::op_log;
use crate::error::AppResult;
use crate::middleware::{CurrentUser, DbConn};
use crate::routes::ApiResponse;

/// Query parameters for log pagination
#[derive(Debug, Deserialize)]
pub struct LogQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(rename = "pageSize", default = "default_page_size")]
    pub page_size: u64,
}

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    10
}

#[derive(Debug, Serialize)]
pub struct LogResponse {
    pub id: i64,
    #[serde(rename = "opTime")]
    pub op_time: i64,
    #[serde(rename = "opType")]
    pub op_type: String,
    #[serde(rename = "opDesc")]
    pub op_desc: String,
    pub result: String,
}

impl From<op_log::Model> for LogResponse {
    fn from(m: op_log::Model) -> Self {
        Self {
            id: m.id,
            op_time: m.op_time,
            op_type: m.op_type,
            op_desc: m.op_desc,
            result: m.result,
        }
    }
}

/// Query response with pagination
#[derive(Debug, Serialize)]
pub struct LogQueryResponse {
    pub logs: Vec<LogResponse>,
    pub total: u64,
}

/// GET /api/oplog
pub async fn query_oplog(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<LogQuery>,
) -> AppResult<Json<ApiResponse<LogQueryResponse>>> {
    let page = query.page.max(1);
    let page_size = query.page_size.clamp(1, 100);
    let offset = (page - 1) * page_size;

    let own = op_log::Entity::find().filter(op_log::Column::TenantId.eq(current_user.id));

    let logs = own
        .clone()
        .order_by_desc(op_log::Column::Id)
        .offset(offset)
        .limit(page_size)
        .all(&*db)
        .await?
        .into_iter()
        .map(LogResponse::from)
        .collect();

    let total = own.count(&*db).await?;

    Ok(Json(ApiResponse::success(LogQueryResponse { logs, total })))
}

/// Service for adding operation logs
pub mod service {
    use sea_orm::{ActiveModelTrait, Set};
    use tokio::sync::mpsc;

    use crate::entity::op_log::{self, OpResult, OpType};

    /// Log entry to be added
    #[derive(Debug, Clone)]
    pub struct LogEntry {
        pub tenant_id: i64,
        pub op_type: OpType,
        pub op_desc: String,
        pub result: OpResult,
    }

    /// Global log channel
    static LOG_TX: std::sync::OnceLock<mpsc::Sender<LogEntry>> = std::sync::OnceLock::new();

    /// Initialize the audit log service
    /// This function is idempotent - calling it multiple times is safe
    pub fn init(db: sea_orm::DatabaseConnection) {
        if LOG_TX.get().is_some() {
            tracing::debug!("Audit log service already initialized, skipping");
            return;
        }

        let (tx, mut rx) = mpsc::channel::<LogEntry>(200);
        if LOG_TX.set(tx).is_err() {
            tracing::debug!("Audit log service initialized by another thread");
            return;
        }

        tokio::spawn(async move {
            while let Some(entry) = rx.recv().await {
                let log = op_log::ActiveModel {
                    op_time: Set(chrono::Utc::now().timestamp()),
                    tenant_id: Set(entry.tenant_id),
                    op_type: Set(entry.op_type.as_str().to_string()),
                    op_desc: Set(entry.op_desc),
                    result: Set(entry.result.as_str().to_string()),
                    ..Default::default()
                };

                if let Err(e) = log.insert(&db).await {
                    tracing::error!("Failed to log operation: {}", e);
                }
            }
        });
    }

    /// Add an operation log entry
    pub fn add_log(entry: LogEntry) {
        if let Some(tx) = LOG_TX.get() {
            if tx.try_send(entry).is_err() {
                tracing::warn!("Log channel is full, operation log dropped");
            }
        } else {
            tracing::debug!(
                "Audit log service not initialized, log dropped: {} - {}",
                entry.op_type.as_str(),
                entry.op_desc
            );
        }
    }

    /// Helper function to create a log entry from request context
    pub fn log_operation(tenant_id: i64, op_type: OpType, op_desc: impl Into<String>, result: OpResult) {
        add_log(LogEntry {
            tenant_id,
            op_type,
            op_desc: op_desc.into(),
            result,
        });
    }
}
