//! Reconciliation core
//!
//! Catalog adoption, contribution, deletion impact, cascading deletion,
//! posting cadence and the counter sweep. Nothing in here knows about HTTP;
//! handlers translate [`ServiceError`] into responses.

pub mod cadence;
pub mod catalog;
pub mod reconcile;

use sea_orm::{DbErr, SqlErr};
use std::fmt;
use thiserror::Error;

/// Step of a cascading catalog deletion
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CascadePhase {
    Begin,
    CatalogEntry,
    Groups,
    Posts,
    Commit,
}

impl fmt::Display for CascadePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CascadePhase::Begin => "begin",
            CascadePhase::CatalogEntry => "catalog entry",
            CascadePhase::Groups => "group records",
            CascadePhase::Posts => "posts",
            CascadePhase::Commit => "commit",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Storage error: {0}")]
    Storage(#[from] DbErr),

    /// Cascade rolled back; `completed` lists the phases that ran before the failure
    #[error("Cascading delete failed during {phase} (completed: {completed:?}): {source}")]
    Cascade {
        phase: CascadePhase,
        completed: Vec<CascadePhase>,
        #[source]
        source: DbErr,
    },
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    /// Map a unique-constraint violation to `Conflict`, anything else to `Storage`
    pub fn from_insert(err: DbErr, conflict_msg: &str) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::Conflict(conflict_msg.to_string()),
            _ => ServiceError::Storage(err),
        }
    }
}

/// Current Unix timestamp in seconds
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fixtures shared by the service tests

    use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

    use super::now;
    use crate::entity::global_group::SYSTEM_CONTRIBUTOR;
    use crate::entity::group::{GroupSource, GroupStatus, Privacy, QaStatus};
    use crate::entity::post::PostStatus;
    use crate::entity::{company, global_group, group, post};

    pub async fn db() -> DatabaseConnection {
        crate::db::connect_in_memory().await.unwrap()
    }

    pub async fn company(db: &DatabaseConnection, tenant_id: i64, name: &str) -> company::Model {
        company::ActiveModel {
            tenant_id: Set(tenant_id),
            name: Set(name.to_string()),
            industry: Set("Automotive".to_string()),
            city: Set("Lubbock".to_string()),
            state: Set("TX".to_string()),
            created_at: Set(now()),
            updated_at: Set(now()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    pub async fn catalog_entry(
        db: &DatabaseConnection,
        name: &str,
        contributed_by: &str,
    ) -> global_group::Model {
        global_group::ActiveModel {
            name: Set(name.to_string()),
            category: Set("Buy/Sell".to_string()),
            description: Set("Local marketplace".to_string()),
            facebook_url: Set(None),
            city: Set("Lubbock".to_string()),
            state: Set("TX".to_string()),
            country: Set("USA".to_string()),
            member_count: Set(12_500),
            privacy: Set(Privacy::Public),
            quality_score: Set(80),
            industries: Set(String::new()),
            tags: Set(String::new()),
            contributed_by: Set(contributed_by.to_string()),
            contributed_at: Set(now()),
            verified: Set(contributed_by == SYSTEM_CONTRIBUTOR),
            verified_by_admin: Set(false),
            added_by_count: Set(0),
            trending_score: Set(0),
            created_at: Set(now()),
            updated_at: Set(now()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    /// A manually created group with no catalog back-reference
    pub async fn manual_group(
        db: &DatabaseConnection,
        tenant_id: i64,
        company_id: i64,
        name: &str,
    ) -> group::Model {
        group::ActiveModel {
            tenant_id: Set(tenant_id),
            company_id: Set(company_id),
            global_group_id: Set(None),
            name: Set(name.to_string()),
            category: Set("Buy/Sell".to_string()),
            description: Set(String::new()),
            target_city: Set("Lubbock".to_string()),
            target_state: Set("TX".to_string()),
            privacy: Set(Privacy::Public),
            audience_size: Set(0),
            quality_score: Set(60),
            status: Set(GroupStatus::Active),
            qa_status: Set(QaStatus::Pending),
            source: Set(GroupSource::Manual),
            last_post_date: Set(None),
            posts_this_week: Set(0),
            posts_this_month: Set(0),
            created_at: Set(now()),
            updated_at: Set(now()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    pub async fn post(
        db: &DatabaseConnection,
        group: &group::Model,
        status: PostStatus,
        posted_at: Option<i64>,
    ) -> post::Model {
        post::ActiveModel {
            tenant_id: Set(group.tenant_id),
            company_id: Set(group.company_id),
            group_id: Set(group.id),
            group_name: Set(group.name.clone()),
            content: Set("New inventory this weekend".to_string()),
            status: Set(status),
            scheduled_for: Set(None),
            posted_at: Set(posted_at),
            created_at: Set(now()),
            updated_at: Set(now()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }
}
