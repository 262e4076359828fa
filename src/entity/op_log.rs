//! OpLog entity - operation audit log
//!
//! Table: gd_op_log

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Operation type
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpType {
    CreateCompany,
    UpdateCompany,
    DeleteCompany,
    CreateGroup,
    UpdateGroup,
    DeleteGroup,
    AddCatalogGroup,
    ContributeCatalogGroup,
    DeleteCatalogGroup,
    ReconcileCatalog,
    CreatePost,
    UpdatePostStatus,
    DeletePost,
}

impl OpType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpType::CreateCompany => "create_company",
            OpType::UpdateCompany => "update_company",
            OpType::DeleteCompany => "delete_company",
            OpType::CreateGroup => "create_group",
            OpType::UpdateGroup => "update_group",
            OpType::DeleteGroup => "delete_group",
            OpType::AddCatalogGroup => "add_catalog_group",
            OpType::ContributeCatalogGroup => "contribute_catalog_group",
            OpType::DeleteCatalogGroup => "delete_catalog_group",
            OpType::ReconcileCatalog => "reconcile_catalog",
            OpType::CreatePost => "create_post",
            OpType::UpdatePostStatus => "update_post_status",
            OpType::DeletePost => "delete_post",
        }
    }
}

/// Operation result
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpResult {
    Success,
    Failed,
}

impl OpResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpResult::Success => "success",
            OpResult::Failed => "failed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "gd_op_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Operation time (Unix timestamp)
    pub op_time: i64,

    /// Acting tenant
    pub tenant_id: i64,

    #[sea_orm(column_type = "String(Some(32))")]
    pub op_type: String,

    #[sea_orm(column_type = "Text")]
    pub op_desc: String,

    #[sea_orm(column_type = "String(Some(16))")]
    pub result: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
