use async_trait::async_trait;
use thiserror::Error;

use crate::models::{CatalogItem, CatalogItemKind, DefinitionError, NewCatalogItem, TaxFeeDefinition};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<DefinitionError> for RepositoryError {
    fn from(err: DefinitionError) -> Self {
        RepositoryError::Validation(err.to_string())
    }
}

/// Storage for tax/fee definitions and the packages and services that use them.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    // Tax/fee definitions
    async fn list_definitions(&self) -> Result<Vec<TaxFeeDefinition>, RepositoryError>;
    async fn get_definition(&self, id: &str) -> Result<TaxFeeDefinition, RepositoryError>;

    /// Inserts or replaces a definition after checking
    /// [`TaxFeeDefinition::validate`].
    async fn upsert_definition(
        &self,
        definition: &TaxFeeDefinition,
    ) -> Result<(), RepositoryError>;

    /// Removes a definition. Items that reference it keep the id.
    async fn delete_definition(&self, id: &str) -> Result<(), RepositoryError>;

    async fn set_definition_active(
        &self,
        id: &str,
        is_active: bool,
    ) -> Result<(), RepositoryError>;

    // Packages and services
    async fn create_item(&self, item: NewCatalogItem) -> Result<CatalogItem, RepositoryError>;
    async fn get_item(&self, id: i64) -> Result<CatalogItem, RepositoryError>;
    async fn update_item(&self, item: &CatalogItem) -> Result<(), RepositoryError>;
    async fn delete_item(&self, id: i64) -> Result<(), RepositoryError>;

    async fn list_items(
        &self,
        kind: Option<CatalogItemKind>,
    ) -> Result<Vec<CatalogItem>, RepositoryError>;
}
