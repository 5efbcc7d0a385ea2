use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::common::round_half_up;

/// One applied fee or tax in a breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownLine {
    pub definition_id: String,
    pub name: String,
    pub amount: Decimal,
}

/// Itemized result of pricing a package or service.
///
/// Every amount keeps full precision. Rounding happens only through
/// [`PricingBreakdown::display_total`] or the formatting helpers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingBreakdown {
    pub base_price: Decimal,

    // Fees, each computed against the base price
    pub fee_lines: Vec<BreakdownLine>,
    pub fee_subtotal: Decimal,

    /// Base price plus every fee; the basis for percentage taxes.
    pub taxable_amount: Decimal,

    // Taxes, each computed against the taxable amount
    pub tax_lines: Vec<BreakdownLine>,
    pub tax_subtotal: Decimal,

    pub total: Decimal,
}

impl PricingBreakdown {
    /// Total rounded half-up to cents.
    pub fn display_total(&self) -> Decimal {
        round_half_up(self.total)
    }

    pub fn has_adjustments(&self) -> bool {
        !self.fee_lines.is_empty() || !self.tax_lines.is_empty()
    }
}
