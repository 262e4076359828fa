use sea_orm::{
    ConnectionTrait, ConnectOptions, Database, DatabaseConnection, DbBackend, DbErr, Schema,
    Statement,
};
use sea_orm::sea_query::{Index, IndexCreateStatement, TableCreateStatement};
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::entity::{company, global_group, group, op_log, post};

/// Initialize database connection and auto-migrate tables
pub async fn init_database(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let database_url = config.connection_url();

    info!("Connecting to {} database: {}", config.db_type, config.name);

    let mut opt = ConnectOptions::new(&database_url);
    opt.max_connections(100)
        .min_connections(5)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(300))
        .sqlx_logging(true)
        .sqlx_logging_level(tracing::log::LevelFilter::Debug);
    if config.db_type == "postgres" {
        opt.set_schema_search_path("public");
    }

    let db = Database::connect(opt).await?;
    info!("Database connection established");

    auto_migrate(&db).await?;

    Ok(db)
}

/// Connect to a private in-memory SQLite database with all tables created
pub async fn connect_in_memory() -> Result<DatabaseConnection, DbErr> {
    // Every pooled connection would otherwise see its own empty database
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);

    let db = Database::connect(opt).await?;
    auto_migrate(&db).await?;
    Ok(db)
}

/// Auto-migrate database tables
async fn auto_migrate(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    info!("Running auto-migration for all entities...");

    create_table_if_not_exists(db, backend, schema.create_table_from_entity(company::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(global_group::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(group::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(post::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(op_log::Entity)).await?;

    if backend == DbBackend::Postgres {
        add_missing_columns(db, backend).await?;
    }

    // A company holds at most one group record per name
    create_index_if_not_exists(
        db,
        backend,
        Index::create()
            .name("idx_gd_group_tenant_company_name")
            .table(group::Entity)
            .col(group::Column::TenantId)
            .col(group::Column::CompanyId)
            .col(group::Column::Name)
            .unique()
            .to_owned(),
    )
    .await?;

    info!("Auto-migration completed successfully");
    Ok(())
}

/// Add missing columns to existing tables
async fn add_missing_columns(db: &DatabaseConnection, backend: DbBackend) -> Result<(), DbErr> {
    // Group tables created before catalog back-references existed
    add_column_if_not_exists(db, backend, "gd_group", "global_group_id", "BIGINT NULL").await?;

    Ok(())
}

/// Add a column to a table if it doesn't exist (PostgreSQL only)
async fn add_column_if_not_exists(
    db: &DatabaseConnection,
    backend: DbBackend,
    table: &str,
    column: &str,
    column_def: &str,
) -> Result<(), DbErr> {
    let check_sql = format!(
        "SELECT column_name FROM information_schema.columns WHERE table_name = '{}' AND column_name = '{}'",
        table, column
    );

    let result = db.query_one(Statement::from_string(backend, check_sql)).await?;

    if result.is_none() {
        let alter_sql = format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, column_def);
        info!("Adding column {}.{}", table, column);
        db.execute(Statement::from_string(backend, alter_sql)).await?;
    }

    Ok(())
}

/// Create a table if it doesn't exist
async fn create_table_if_not_exists(
    db: &DatabaseConnection,
    backend: DbBackend,
    mut stmt: TableCreateStatement,
) -> Result<(), DbErr> {
    stmt.if_not_exists();

    let sql = backend.build(&stmt);

    db.execute(Statement::from_string(backend, sql.to_string())).await?;

    Ok(())
}

/// Create an index if it doesn't exist
async fn create_index_if_not_exists(
    db: &DatabaseConnection,
    backend: DbBackend,
    mut stmt: IndexCreateStatement,
) -> Result<(), DbErr> {
    stmt.if_not_exists();

    db.execute(backend.build(&stmt)).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{EntityTrait, PaginatorTrait};

    #[tokio::test]
    async fn in_memory_database_has_all_tables() {
        let db = connect_in_memory().await.unwrap();
        assert_eq!(company::Entity::find().count(&db).await.unwrap(), 0);
        assert_eq!(global_group::Entity::find().count(&db).await.unwrap(), 0);
        assert_eq!(group::Entity::find().count(&db).await.unwrap(), 0);
        assert_eq!(post::Entity::find().count(&db).await.unwrap(), 0);
        assert_eq!(op_log::Entity::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn group_names_are_unique_per_company() {
        use crate::entity::group::{GroupSource, GroupStatus, Privacy, QaStatus};
        use sea_orm::{ActiveModelTrait, Set};

        let db = connect_in_memory().await.unwrap();
        let row = |tenant_id: i64, company_id: i64| group::ActiveModel {
            tenant_id: Set(tenant_id),
            company_id: Set(company_id),
            global_group_id: Set(None),
            name: Set("Odessa Swap Meet".to_string()),
            category: Set("Buy/Sell".to_string()),
            description: Set(String::new()),
            target_city: Set(String::new()),
            target_state: Set(String::new()),
            privacy: Set(Privacy::Public),
            audience_size: Set(0),
            quality_score: Set(60),
            status: Set(GroupStatus::Active),
            qa_status: Set(QaStatus::Pending),
            source: Set(GroupSource::Manual),
            last_post_date: Set(None),
            posts_this_week: Set(0),
            posts_this_month: Set(0),
            created_at: Set(0),
            updated_at: Set(0),
            ..Default::default()
        };

        row(1, 1).insert(&db).await.unwrap();
        row(1, 2).insert(&db).await.unwrap();
        row(2, 1).insert(&db).await.unwrap();

        let err = row(1, 1).insert(&db).await.unwrap_err();
        assert!(matches!(
            crate::service::ServiceError::from_insert(err, "duplicate"),
            crate::service::ServiceError::Conflict(_)
        ));
    }

    #[tokio::test]
    async fn migration_is_repeatable() {
        let db = connect_in_memory().await.unwrap();
        auto_migrate(&db).await.unwrap();
    }
}
