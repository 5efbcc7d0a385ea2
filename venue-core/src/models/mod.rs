mod catalog_item;
mod pricing_breakdown;
mod tax_fee_definition;

pub use catalog_item::{CatalogItem, CatalogItemKind, NewCatalogItem};
pub use pricing_breakdown::{BreakdownLine, PricingBreakdown};
pub use tax_fee_definition::{
    CalculationMethod, DefinitionError, DefinitionKind, TaxFeeDefinition,
};
