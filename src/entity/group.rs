//! Group entity - a Facebook group a company posts into
//!
//! Table: gd_group. Rows are owned by a (tenant, company) pair and may
//! carry a back-reference to the global catalog entry they were adopted from.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::quality;

/// Group visibility on Facebook
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    #[sea_orm(string_value = "public")]
    Public,
    #[sea_orm(string_value = "private")]
    Private,
    #[sea_orm(string_value = "closed")]
    Closed,
}

impl Default for Privacy {
    fn default() -> Self {
        Privacy::Public
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "lowercase")]
pub enum GroupStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "paused")]
    Paused,
    #[sea_orm(string_value = "archived")]
    Archived,
}

/// Review state of a group record
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "lowercase")]
pub enum QaStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

/// Where a group record came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(24))")]
#[serde(rename_all = "snake_case")]
pub enum GroupSource {
    #[sea_orm(string_value = "manual")]
    Manual,
    #[sea_orm(string_value = "global_database")]
    GlobalDatabase,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "gd_group")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Owning tenant
    pub tenant_id: i64,

    /// Owning company
    pub company_id: i64,

    /// Catalog entry this record was adopted from (None for legacy/manual rows)
    #[sea_orm(nullable)]
    pub global_group_id: Option<i64>,

    /// Group name (unique per tenant and company, not globally)
    #[sea_orm(column_type = "String(Some(128))")]
    pub name: String,

    #[sea_orm(column_type = "String(Some(64))")]
    pub category: String,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    #[sea_orm(column_type = "String(Some(64))")]
    pub target_city: String,

    #[sea_orm(column_type = "String(Some(32))")]
    pub target_state: String,

    pub privacy: Privacy,

    pub audience_size: i64,

    /// Quality on the canonical 0-100 scale
    pub quality_score: i32,

    pub status: GroupStatus,

    pub qa_status: QaStatus,

    pub source: GroupSource,

    /// Posting cadence cache, recomputed from posts
    #[sea_orm(nullable)]
    pub last_post_date: Option<i64>,
    pub posts_this_week: i32,
    pub posts_this_month: i32,

    /// Unix timestamps
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Group response (quality presented on the 1-5 rating scale)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupResponse {
    pub id: i64,
    pub company_id: i64,
    pub global_group_id: Option<i64>,
    pub name: String,
    pub category: String,
    pub description: String,
    pub target_city: String,
    pub target_state: String,
    pub privacy: Privacy,
    pub audience_size: i64,
    pub quality_rating: i32,
    pub status: GroupStatus,
    pub qa_status: QaStatus,
    pub source: GroupSource,
    pub last_post_date: Option<i64>,
    pub posts_this_week: i32,
    pub posts_this_month: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Model> for GroupResponse {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            company_id: model.company_id,
            global_group_id: model.global_group_id,
            name: model.name,
            category: model.category,
            description: model.description,
            target_city: model.target_city,
            target_state: model.target_state,
            privacy: model.privacy,
            audience_size: model.audience_size,
            quality_rating: quality::rating_from_score(model.quality_score),
            status: model.status,
            qa_status: model.qa_status,
            source: model.source,
            last_post_date: model.last_post_date,
            posts_this_week: model.posts_this_week,
            posts_this_month: model.posts_this_month,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
