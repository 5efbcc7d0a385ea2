use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::pricing::compute_breakdown;
use crate::models::{PricingBreakdown, TaxFeeDefinition};
use crate::selection::PricingSelection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogItemKind {
    Package,
    Service,
}

impl CatalogItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Package => "package",
            Self::Service => "service",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "package" => Some(Self::Package),
            "service" => Some(Self::Service),
            _ => None,
        }
    }
}

/// A sellable package or service with its saved tax/fee selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: i64,
    pub kind: CatalogItemKind,
    pub name: String,
    pub description: Option<String>,
    pub base_price: Decimal,

    // Saved selection, in the order the user enabled them
    pub enabled_tax_ids: Vec<String>,
    pub enabled_fee_ids: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CatalogItem {
    pub fn selection(&self) -> PricingSelection {
        PricingSelection {
            enabled_fee_ids: self.enabled_fee_ids.clone(),
            enabled_tax_ids: self.enabled_tax_ids.clone(),
        }
    }

    /// Replaces the saved selection, typically right before an update.
    pub fn apply_selection(
        &mut self,
        selection: PricingSelection,
    ) {
        self.enabled_fee_ids = selection.enabled_fee_ids;
        self.enabled_tax_ids = selection.enabled_tax_ids;
    }

    /// Prices this item against the currently known definitions.
    pub fn quote(
        &self,
        definitions: &[TaxFeeDefinition],
    ) -> PricingBreakdown {
        compute_breakdown(
            self.base_price,
            &self.enabled_fee_ids,
            &self.enabled_tax_ids,
            definitions,
        )
    }
}

/// For creating new items (no id or timestamps)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCatalogItem {
    pub kind: CatalogItemKind,
    pub name: String,
    pub description: Option<String>,
    pub base_price: Decimal,
    pub enabled_tax_ids: Vec<String>,
    pub enabled_fee_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::{CalculationMethod, DefinitionKind};

    fn item(kind: CatalogItemKind) -> CatalogItem {
        let now = Utc::now();
        CatalogItem {
            id: 7,
            kind,
            name: "Gold Wedding".to_string(),
            description: None,
            base_price: dec!(500),
            enabled_tax_ids: vec!["sales-tax".to_string()],
            enabled_fee_ids: vec!["service-charge".to_string()],
            created_at: now,
            updated_at: now,
        }
    }

    fn definitions() -> Vec<TaxFeeDefinition> {
        vec![
            TaxFeeDefinition {
                id: "service-charge".to_string(),
                name: "Service Charge".to_string(),
                kind: DefinitionKind::ServiceCharge,
                calculation: CalculationMethod::FixedAmount,
                value: dec!(25),
                applies_to: "all".to_string(),
                is_active: true,
            },
            TaxFeeDefinition {
                id: "sales-tax".to_string(),
                name: "Sales Tax".to_string(),
                kind: DefinitionKind::Tax,
                calculation: CalculationMethod::Percentage,
                value: dec!(10),
                applies_to: "all".to_string(),
                is_active: true,
            },
        ]
    }

    #[test]
    fn kind_codes_round_trip() {
        assert_eq!(CatalogItemKind::parse("package"), Some(CatalogItemKind::Package));
        assert_eq!(CatalogItemKind::parse("service"), Some(CatalogItemKind::Service));
        assert_eq!(CatalogItemKind::parse("venue"), None);
        assert_eq!(CatalogItemKind::Service.as_str(), "service");
    }

    #[test]
    fn packages_and_services_price_identically() {
        let defs = definitions();

        let package = item(CatalogItemKind::Package).quote(&defs);
        let service = item(CatalogItemKind::Service).quote(&defs);

        // (500 + 25) * 1.10
        assert_eq!(package.total, dec!(577.5));
        assert_eq!(package, service);
    }

    #[test]
    fn selection_reflects_saved_ids() {
        let selection = item(CatalogItemKind::Package).selection();

        assert_eq!(selection.enabled_fee_ids, vec!["service-charge".to_string()]);
        assert_eq!(selection.enabled_tax_ids, vec!["sales-tax".to_string()]);
    }

    #[test]
    fn apply_selection_replaces_both_lists() {
        let mut item = item(CatalogItemKind::Service);
        let mut selection = item.selection();
        selection.toggle_fee("service-charge");
        selection.toggle_tax("city-tax");

        item.apply_selection(selection);

        assert!(item.enabled_fee_ids.is_empty());
        assert_eq!(
            item.enabled_tax_ids,
            vec!["sales-tax".to_string(), "city-tax".to_string()]
        );
    }
}
