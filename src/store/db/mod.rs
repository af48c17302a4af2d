//! SQLite connection pooling for the [`super::sqlite`] adapter.

pub mod model;
pub mod schema;

use diesel::r2d2::{ConnectionManager, Pool};
use diesel::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::error::Result;

/// Embedded migrations from the `migrations/` directory at the crate root.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

/// Create a connection pool for the given database URL (a file path or
/// `:memory:`) and apply any pending migrations.
///
/// # Errors
/// Returns an error if the pool cannot be built or a migration fails.
pub fn create_pool(database_url: &str) -> Result<DbPool> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let pool = Pool::builder()
        .max_size(5)
        .build(manager)
        .map_err(|e| crate::error::StoreError::Connection(e.to_string()))?;

    let mut conn = pool.get().map_err(|e| crate::error::StoreError::Connection(e.to_string()))?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| crate::error::StoreError::Connection(e.to_string()))?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_pool_with_memory_db() {
        let pool = create_pool(":memory:");
        assert!(pool.is_ok());
    }
}
