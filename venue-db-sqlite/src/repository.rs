use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqliteRow};
use sqlx::{Row, Sqlite, Transaction};
use tracing::{debug, info, warn};
use venue_core::{
    CalculationMethod, CatalogItem, CatalogItemKind, CatalogRepository, DefinitionKind,
    NewCatalogItem, RepositoryError, TaxFeeDefinition,
};

use crate::decimal::get_decimal;

const ROLE_FEE: &str = "fee";
const ROLE_TAX: &str = "tax";

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Connects to `database_url`, creating the database file if needed.
    ///
    /// Accepts a bare path (`venue.db`), a sqlx URL (`sqlite:venue.db`) or
    /// `:memory:`.
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {}", database_url))?
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database: {}", database_url))?;
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        debug!("catalog migrations applied");
        Ok(())
    }

    /// Load and execute all SQL seed files from the specified directory.
    /// Files are executed in alphabetical order by filename. A missing
    /// directory is skipped with a warning.
    pub async fn run_seeds(
        &self,
        seeds_dir: &Path,
    ) -> Result<()> {
        if !seeds_dir.is_dir() {
            warn!(dir = %seeds_dir.display(), "seeds directory not found, skipping");
            return Ok(());
        }

        let mut entries: Vec<_> = std::fs::read_dir(seeds_dir)
            .with_context(|| format!("Failed to read seeds directory '{}'", seeds_dir.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "sql"))
            .collect();

        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            let sql = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read seed file '{}'", path.display()))?;

            sqlx::raw_sql(&sql)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to execute seed file '{}'", path.display()))?;
            info!(file = %path.display(), "seed applied");
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Saved fee and tax ids of an item, each in the order they were enabled.
    async fn load_selection(
        &self,
        item_id: i64,
    ) -> Result<(Vec<String>, Vec<String>), RepositoryError> {
        let rows = sqlx::query(
            "SELECT role, definition_id FROM catalog_item_selections
             WHERE item_id = ?
             ORDER BY position",
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut fee_ids = Vec::new();
        let mut tax_ids = Vec::new();
        for row in rows {
            let role: String = row.try_get("role").map_err(db_err)?;
            let definition_id: String = row.try_get("definition_id").map_err(db_err)?;
            match role.as_str() {
                ROLE_FEE => fee_ids.push(definition_id),
                ROLE_TAX => tax_ids.push(definition_id),
                other => {
                    return Err(RepositoryError::Database(format!(
                        "Invalid selection role: {}",
                        other
                    )));
                }
            }
        }
        Ok((fee_ids, tax_ids))
    }
}

fn db_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

/// Rewrites the saved selection of `item_id` inside `tx`.
async fn save_selection(
    tx: &mut Transaction<'_, Sqlite>,
    item_id: i64,
    fee_ids: &[String],
    tax_ids: &[String],
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM catalog_item_selections WHERE item_id = ?")
        .bind(item_id)
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;

    for (role, ids) in [(ROLE_FEE, fee_ids), (ROLE_TAX, tax_ids)] {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut position: i64 = 0;
        for id in ids {
            if !seen.insert(id.as_str()) {
                continue;
            }
            sqlx::query(
                "INSERT INTO catalog_item_selections (item_id, role, definition_id, position)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(item_id)
            .bind(role)
            .bind(id)
            .bind(position)
            .execute(&mut **tx)
            .await
            .map_err(db_err)?;
            position += 1;
        }
    }

    Ok(())
}

fn row_to_definition(row: &SqliteRow) -> Result<TaxFeeDefinition, RepositoryError> {
    let kind_code: String = row.try_get("kind").map_err(db_err)?;
    let kind = DefinitionKind::parse(&kind_code)
        .ok_or_else(|| RepositoryError::Database(format!("Invalid definition kind: {}", kind_code)))?;

    let calculation_code: String = row.try_get("calculation").map_err(db_err)?;
    let calculation = CalculationMethod::parse(&calculation_code).ok_or_else(|| {
        RepositoryError::Database(format!("Invalid calculation method: {}", calculation_code))
    })?;

    Ok(TaxFeeDefinition {
        id: row.try_get("id").map_err(db_err)?,
        name: row.try_get("name").map_err(db_err)?,
        kind,
        calculation,
        value: get_decimal(row, "value")?,
        applies_to: row.try_get("applies_to").map_err(db_err)?,
        is_active: row.try_get("is_active").map_err(db_err)?,
    })
}

fn row_to_item(
    row: &SqliteRow,
    enabled_fee_ids: Vec<String>,
    enabled_tax_ids: Vec<String>,
) -> Result<CatalogItem, RepositoryError> {
    let kind_code: String = row.try_get("kind").map_err(db_err)?;
    let kind = CatalogItemKind::parse(&kind_code)
        .ok_or_else(|| RepositoryError::Database(format!("Invalid item kind: {}", kind_code)))?;

    Ok(CatalogItem {
        id: row.try_get("id").map_err(db_err)?,
        kind,
        name: row.try_get("name").map_err(db_err)?,
        description: row.try_get("description").map_err(db_err)?,
        base_price: get_decimal(row, "base_price")?,
        enabled_tax_ids,
        enabled_fee_ids,
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(|e| RepositoryError::Database(format!("Failed to get created_at: {}", e)))?,
        updated_at: row
            .try_get::<DateTime<Utc>, _>("updated_at")
            .map_err(|e| RepositoryError::Database(format!("Failed to get updated_at: {}", e)))?,
    })
}

const DEFINITION_COLUMNS: &str = "id, name, kind, calculation, value, applies_to, is_active";
const ITEM_COLUMNS: &str = "id, kind, name, description, base_price, created_at, updated_at";

#[async_trait]
impl CatalogRepository for SqliteRepository {
    async fn list_definitions(&self) -> Result<Vec<TaxFeeDefinition>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {DEFINITION_COLUMNS} FROM tax_fee_definitions ORDER BY name, id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_definition).collect()
    }

    async fn get_definition(
        &self,
        id: &str,
    ) -> Result<TaxFeeDefinition, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {DEFINITION_COLUMNS} FROM tax_fee_definitions WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;

        row_to_definition(&row)
    }

    async fn upsert_definition(
        &self,
        definition: &TaxFeeDefinition,
    ) -> Result<(), RepositoryError> {
        definition.validate()?;

        sqlx::query(
            "INSERT INTO tax_fee_definitions (id, name, kind, calculation, value, applies_to, is_active)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                kind = excluded.kind,
                calculation = excluded.calculation,
                value = excluded.value,
                applies_to = excluded.applies_to,
                is_active = excluded.is_active",
        )
        .bind(&definition.id)
        .bind(&definition.name)
        .bind(definition.kind.as_str())
        .bind(definition.calculation.as_str())
        .bind(definition.value.to_string())
        .bind(&definition.applies_to)
        .bind(definition.is_active)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        debug!(id = %definition.id, "definition saved");
        Ok(())
    }

    async fn delete_definition(
        &self,
        id: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM tax_fee_definitions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn set_definition_active(
        &self,
        id: &str,
        is_active: bool,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE tax_fee_definitions SET is_active = ? WHERE id = ?")
            .bind(is_active)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn create_item(
        &self,
        item: NewCatalogItem,
    ) -> Result<CatalogItem, RepositoryError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let result = sqlx::query(
            "INSERT INTO catalog_items (kind, name, description, base_price, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(item.kind.as_str())
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.base_price.to_string())
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        let id = result.last_insert_rowid();
        save_selection(&mut tx, id, &item.enabled_fee_ids, &item.enabled_tax_ids).await?;
        tx.commit().await.map_err(db_err)?;

        debug!(id, kind = item.kind.as_str(), "catalog item created");
        self.get_item(id).await
    }

    async fn get_item(
        &self,
        id: i64,
    ) -> Result<CatalogItem, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM catalog_items WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;

        let (fee_ids, tax_ids) = self.load_selection(id).await?;
        row_to_item(&row, fee_ids, tax_ids)
    }

    async fn update_item(
        &self,
        item: &CatalogItem,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let result = sqlx::query(
            "UPDATE catalog_items SET
                kind = ?, name = ?, description = ?, base_price = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(item.kind.as_str())
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.base_price.to_string())
        .bind(Utc::now())
        .bind(item.id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        save_selection(&mut tx, item.id, &item.enabled_fee_ids, &item.enabled_tax_ids).await?;
        tx.commit().await.map_err(db_err)?;

        Ok(())
    }

    async fn delete_item(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query("DELETE FROM catalog_item_selections WHERE item_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        let result = sqlx::query("DELETE FROM catalog_items WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn list_items(
        &self,
        kind: Option<CatalogItemKind>,
    ) -> Result<Vec<CatalogItem>, RepositoryError> {
        let rows = match kind {
            Some(kind) => {
                sqlx::query(&format!(
                    "SELECT {ITEM_COLUMNS} FROM catalog_items WHERE kind = ? ORDER BY id"
                ))
                .bind(kind.as_str())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM catalog_items ORDER BY id"))
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(db_err)?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: i64 = row.try_get("id").map_err(db_err)?;
            let (fee_ids, tax_ids) = self.load_selection(id).await?;
            items.push(row_to_item(row, fee_ids, tax_ids)?);
        }
        Ok(items)
    }
}
