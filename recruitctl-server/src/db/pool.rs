//! Database connection pool management

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Default maximum connections for the pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Create a PostgreSQL connection pool.
///
/// # Errors
///
/// Returns an error if the connection fails.
///
/// # Example
///
/// ```ignore
/// let pool = create_pool("postgres://localhost/recruiting").await?;
/// ```
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    create_pool_with_options(database_url, DEFAULT_MAX_CONNECTIONS).await
}

/// Create a PostgreSQL connection pool with an explicit connection cap.
pub async fn create_pool_with_options(
    database_url: &str,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    tracing::debug!(max_connections, "connecting to database");
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Apply the bundled migrations.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    crate::MIGRATOR.run(pool).await
}

#[cfg(test)]
mod tests {
    use super::*;

    // Run with: DATABASE_URL=postgres://... cargo test -p recruitctl-server -- --ignored

    #[tokio::test]
    #[ignore = "requires database"]
    async fn pool_honours_connection_cap() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = create_pool_with_options(&url, 2)
            .await
            .expect("pool creation failed");

        assert_eq!(pool.options().get_max_connections(), 2);
        let (one,): (i32,) = sqlx::query_as("SELECT 1").fetch_one(&pool).await.unwrap();
        assert_eq!(one, 1);
    }

    #[sqlx::test(migrations = false)]
    #[ignore = "requires database"]
    async fn migrate_creates_recruiting_schema(pool: PgPool) {
        migrate(&pool).await.expect("migration failed");
        // Already applied migrations are skipped
        migrate(&pool).await.expect("second migration failed");

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT table_name::text FROM information_schema.tables \
             WHERE table_schema = 'public' ORDER BY table_name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        let tables: Vec<&str> = tables.iter().map(|(t,)| t.as_str()).collect();
        for expected in ["athletes", "coaches", "coach_import_jobs", "university_jobs"] {
            assert!(tables.contains(&expected), "missing table {expected}");
        }

        let (job_status,): (String,) = sqlx::query_as(
            "INSERT INTO coach_import_jobs (file_name, file_url) \
             VALUES ('coaches.csv', 'https://files.test/coaches.csv') RETURNING status",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(job_status, "pending");
    }
}
