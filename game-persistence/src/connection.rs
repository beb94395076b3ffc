use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection, DbErr};
use tracing::info;

pub async fn connect_to_database() -> Result<DatabaseConnection, DbErr> {
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite://grid_arena.db?mode=rwc".to_string());

    Database::connect(&database_url).await
}

pub async fn connect_to_memory_database() -> Result<DatabaseConnection, DbErr> {
    Database::connect("sqlite::memory:").await
}

/// Connects to `database_url` and brings the schema up to date.
pub async fn connect_and_migrate(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;
    Migrator::up(&db, None).await?;
    info!("Database ready at {}", database_url);
    Ok(db)
}
