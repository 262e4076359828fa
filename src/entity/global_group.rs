//! Global group entity - the shared catalog of group metadata
//!
//! Table: gd_global_group. The name is the natural key; at most one entry
//! exists per distinct name.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::group::Privacy;
use super::split_list;
use crate::quality;

/// `contributed_by` value for seeded entries
pub const SYSTEM_CONTRIBUTOR: &str = "system";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "gd_global_group")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Group name (unique)
    #[sea_orm(column_type = "String(Some(128))", unique)]
    pub name: String,

    #[sea_orm(column_type = "String(Some(64))")]
    pub category: String,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    #[sea_orm(column_type = "String(Some(255))", nullable)]
    pub facebook_url: Option<String>,

    #[sea_orm(column_type = "String(Some(64))")]
    pub city: String,

    #[sea_orm(column_type = "String(Some(32))")]
    pub state: String,

    #[sea_orm(column_type = "String(Some(32))")]
    pub country: String,

    pub member_count: i64,

    pub privacy: Privacy,

    /// Quality on the canonical 0-100 scale
    pub quality_score: i32,

    /// Comma-separated
    #[sea_orm(column_type = "Text")]
    pub industries: String,

    /// Comma-separated
    #[sea_orm(column_type = "Text")]
    pub tags: String,

    /// Tenant id of the contributor, or "system" for seed data
    #[sea_orm(column_type = "String(Some(32))")]
    pub contributed_by: String,

    pub contributed_at: i64,

    pub verified: bool,

    pub verified_by_admin: bool,

    /// Number of group records holding this entry (cache, see catalog::reconcile)
    pub added_by_count: i64,

    pub trending_score: i32,

    /// Unix timestamps
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether `tenant_id` may delete this entry
    pub fn is_contributor(&self, tenant_id: i64) -> bool {
        self.contributed_by == SYSTEM_CONTRIBUTOR || self.contributed_by == tenant_id.to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub state: String,
    #[serde(default)]
    pub country: Option<String>,
}

/// Catalog entry response
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogEntryResponse {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub description: String,
    pub facebook_url: Option<String>,
    pub location: Location,
    pub member_count: i64,
    pub privacy: Privacy,
    pub quality_score: i32,
    pub quality_rating: i32,
    pub industries: Vec<String>,
    pub tags: Vec<String>,
    pub contributed_by: String,
    pub contributed_at: i64,
    pub verified: bool,
    pub verified_by_admin: bool,
    pub added_by_count: i64,
    pub trending_score: i32,
    pub updated_at: i64,
}

impl From<Model> for CatalogEntryResponse {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            industries: split_list(&model.industries),
            tags: split_list(&model.tags),
            quality_rating: quality::rating_from_score(model.quality_score),
            location: Location {
                city: model.city,
                state: model.state,
                country: Some(model.country),
            },
            name: model.name,
            category: model.category,
            description: model.description,
            facebook_url: model.facebook_url,
            member_count: model.member_count,
            privacy: model.privacy,
            quality_score: model.quality_score,
            contributed_by: model.contributed_by,
            contributed_at: model.contributed_at,
            verified: model.verified,
            verified_by_admin: model.verified_by_admin,
            added_by_count: model.added_by_count,
            trending_score: model.trending_score,
            updated_at: model.updated_at,
        }
    }
}
