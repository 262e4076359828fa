//! Post entity - scheduled social posts
//!
//! Table: gd_post

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(24))")]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "scheduled")]
    Scheduled,
    #[sea_orm(string_value = "pending_approval")]
    PendingApproval,
    #[sea_orm(string_value = "ready_to_post")]
    ReadyToPost,
    #[sea_orm(string_value = "posted")]
    Posted,
}

impl Default for PostStatus {
    fn default() -> Self {
        PostStatus::Draft
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "gd_post")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Owning tenant
    pub tenant_id: i64,

    pub company_id: i64,

    /// Target group record
    pub group_id: i64,

    /// Group name at the time of posting (redundant field)
    #[sea_orm(column_type = "String(Some(128))")]
    pub group_name: String,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    pub status: PostStatus,

    #[sea_orm(nullable)]
    pub scheduled_for: Option<i64>,

    /// Set when the post transitions into `posted`
    #[sea_orm(nullable)]
    pub posted_at: Option<i64>,

    /// Unix timestamps
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
