//! Which fees and taxes are switched on for a package or service.
//!
//! The selection is owned by the caller (a form, a CLI command) and saved on
//! the item as `enabled_fee_ids` / `enabled_tax_ids`. The two lists are kept
//! apart: toggling a fee never touches the taxes and vice versa.

use serde::{Deserialize, Serialize};

use crate::models::TaxFeeDefinition;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingSelection {
    pub enabled_fee_ids: Vec<String>,
    pub enabled_tax_ids: Vec<String>,
}

impl PricingSelection {
    /// Enables `id` as a fee if it is off, disables it if it is on.
    /// Returns whether the fee is enabled afterwards.
    pub fn toggle_fee(
        &mut self,
        id: &str,
    ) -> bool {
        toggle(&mut self.enabled_fee_ids, id)
    }

    /// Enables `id` as a tax if it is off, disables it if it is on.
    /// Returns whether the tax is enabled afterwards.
    pub fn toggle_tax(
        &mut self,
        id: &str,
    ) -> bool {
        toggle(&mut self.enabled_tax_ids, id)
    }

    pub fn is_fee_enabled(
        &self,
        id: &str,
    ) -> bool {
        self.enabled_fee_ids.iter().any(|f| f == id)
    }

    pub fn is_tax_enabled(
        &self,
        id: &str,
    ) -> bool {
        self.enabled_tax_ids.iter().any(|t| t == id)
    }

    pub fn is_empty(&self) -> bool {
        self.enabled_fee_ids.is_empty() && self.enabled_tax_ids.is_empty()
    }
}

fn toggle(
    ids: &mut Vec<String>,
    id: &str,
) -> bool {
    if let Some(pos) = ids.iter().position(|existing| existing == id) {
        ids.remove(pos);
        false
    } else {
        ids.push(id.to_string());
        true
    }
}

/// Active fees and service charges a user may switch on.
pub fn selectable_fees(definitions: &[TaxFeeDefinition]) -> Vec<&TaxFeeDefinition> {
    definitions
        .iter()
        .filter(|d| d.is_active && d.kind.is_fee())
        .collect()
}

/// Active taxes a user may switch on.
pub fn selectable_taxes(definitions: &[TaxFeeDefinition]) -> Vec<&TaxFeeDefinition> {
    definitions
        .iter()
        .filter(|d| d.is_active && d.kind.is_tax())
        .collect()
}
