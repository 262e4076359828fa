//! Company entity - organizations a tenant posts on behalf of
//!
//! Table: gd_company

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "gd_company")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Owning tenant
    pub tenant_id: i64,

    /// Company name (unique per tenant)
    #[sea_orm(column_type = "String(Some(128))")]
    pub name: String,

    #[sea_orm(column_type = "String(Some(64))")]
    pub industry: String,

    #[sea_orm(column_type = "String(Some(64))")]
    pub city: String,

    #[sea_orm(column_type = "String(Some(32))")]
    pub state: String,

    /// Unix timestamps
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Company summary used by deletion impact reports
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRef {
    pub id: i64,
    pub name: String,
}

impl From<Model> for CompanyRef {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}
