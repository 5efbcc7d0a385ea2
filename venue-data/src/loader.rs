use std::io::Read;

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};
use venue_core::{
    CalculationMethod, CatalogRepository, DefinitionError, DefinitionKind, RepositoryError,
    TaxFeeDefinition,
};

/// Errors that can occur when importing tax/fee definitions.
#[derive(Debug, Error)]
pub enum DefinitionLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Invalid definition on row {row}: {source}")]
    InvalidRecord {
        row: usize,
        #[source]
        source: DefinitionError,
    },

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<csv::Error> for DefinitionLoaderError {
    fn from(err: csv::Error) -> Self {
        DefinitionLoaderError::CsvParse(err.to_string())
    }
}

/// A single row of a definitions CSV file.
///
/// - `id`: stable identifier referenced by saved selections
/// - `kind`: `tax`, `fee` or `service_charge`
/// - `calculation`: `percentage` or `fixed`
/// - `value`: percentage points or a currency amount
/// - `applies_to`: advisory scope label
/// - `is_active`: `true` or `false`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DefinitionRecord {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub calculation: String,
    pub value: Decimal,
    pub applies_to: String,
    pub is_active: bool,
}

impl DefinitionRecord {
    /// Maps the text codes onto a validated [`TaxFeeDefinition`].
    pub fn into_definition(self) -> Result<TaxFeeDefinition, DefinitionError> {
        let kind =
            DefinitionKind::parse(&self.kind).ok_or(DefinitionError::UnknownKind(self.kind))?;
        let calculation = CalculationMethod::parse(&self.calculation)
            .ok_or(DefinitionError::UnknownCalculation(self.calculation))?;

        let definition = TaxFeeDefinition {
            id: self.id,
            name: self.name,
            kind,
            calculation,
            value: self.value,
            applies_to: self.applies_to,
            is_active: self.is_active,
        };
        definition.validate()?;
        Ok(definition)
    }
}

/// Imports tax/fee definitions from CSV through any [`CatalogRepository`].
pub struct DefinitionLoader;

impl DefinitionLoader {
    /// Parse definition records from a CSV reader.
    ///
    /// Fields are trimmed. Unknown codes are not rejected here; see
    /// [`DefinitionRecord::into_definition`].
    pub fn parse<R: Read>(reader: R) -> Result<Vec<DefinitionRecord>, DefinitionLoaderError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: DefinitionRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Validate every record, then upsert them one by one.
    ///
    /// A record that fails validation stops the load before anything is
    /// written. The upserts themselves are not atomic: a repository error
    /// part way through leaves the earlier rows written, and re-running the
    /// same file completes the load. Loading a file twice leaves the
    /// repository unchanged. Returns the number of definitions written.
    pub async fn load<R: CatalogRepository + ?Sized>(
        repo: &R,
        records: &[DefinitionRecord],
    ) -> Result<usize, DefinitionLoaderError> {
        let definitions = records
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, record)| {
                // header is row 1
                record
                    .into_definition()
                    .map_err(|source| DefinitionLoaderError::InvalidRecord {
                        row: index + 2,
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        for definition in &definitions {
            repo.upsert_definition(definition).await?;
            debug!(id = %definition.id, kind = definition.kind.as_str(), "definition imported");
        }

        info!(count = definitions.len(), "definitions imported");
        Ok(definitions.len())
    }
}
