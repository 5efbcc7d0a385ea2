use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;
use venue_core::db::{DbConfig, RepositoryFactory};
use venue_core::{CatalogRepository, RepositoryError};

use crate::repository::SqliteRepository;

/// Environment variable that overrides where default definitions are seeded from.
pub const SEEDS_DIR_ENV: &str = "VENUE_DB_SQLITE_SEEDS_DIR";

/// Where seed SQL files are read from.
///
/// 1. `VENUE_DB_SQLITE_SEEDS_DIR`, when set.
/// 2. `./seeds`, when it exists in the working directory.
/// 3. The crate's own `seeds` directory.
pub fn seeds_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(SEEDS_DIR_ENV) {
        return PathBuf::from(dir);
    }
    let cwd_seeds = PathBuf::from("./seeds");
    if cwd_seeds.is_dir() {
        return cwd_seeds;
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("seeds")
}

/// Opens a [`SqliteRepository`] for the `"sqlite"` backend.
///
/// The connection string is a file path, a `sqlite:` URL or `:memory:`.
/// Migrations run on every open and the default definitions are seeded
/// without overwriting rows that already exist.
///
/// ```rust,no_run
/// use venue_core::db::RepositoryRegistry;
/// use venue_db_sqlite::SqliteRepositoryFactory;
///
/// let mut registry = RepositoryRegistry::new();
/// registry.register(Box::new(SqliteRepositoryFactory));
/// ```
pub struct SqliteRepositoryFactory;

#[async_trait]
impl RepositoryFactory for SqliteRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn CatalogRepository>, RepositoryError> {
        let repo = SqliteRepository::new(&config.connection_string)
            .await
            .map_err(|e| RepositoryError::Connection(format!("{:#}", e)))?;
        repo.run_migrations()
            .await
            .map_err(|e| RepositoryError::Database(format!("{:#}", e)))?;

        let seeds = seeds_dir();
        debug!(dir = %seeds.display(), "seeding default definitions");
        repo.run_seeds(&seeds)
            .await
            .map_err(|e| RepositoryError::Database(format!("{:#}", e)))?;

        Ok(Box::new(repo))
    }
}
