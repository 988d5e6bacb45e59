use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

use crate::error::AppError;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub async fn init_pool(database_url: &str) -> Result<Pool<Postgres>, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    // Schema must be in sync before serving traffic
    MIGRATOR
        .run(&pool)
        .await
        .map_err(|e| AppError::StartServer(format!("database migrations failed: {e}")))?;

    Ok(pool)
}
