//! Cascading fee-and-tax pricing for packages and services.
//!
//! A price is built from a base price, a selection of fees (including service
//! charges) and a selection of taxes. Fees are charged on the base price;
//! taxes are charged on the base price plus all fees.
//!
//! # Steps
//!
//! | Step | Description |
//! |------|-------------|
//! | 1    | Fee lines: each selected fee against the base price |
//! | 2    | Fee subtotal (sum of step 1) |
//! | 3    | Taxable amount (base price + step 2) |
//! | 4    | Tax lines: each selected tax against step 3 |
//! | 5    | Tax subtotal (sum of step 4) |
//! | 6    | Total (base price + step 2 + step 5) |
//!
//! Percentage definitions contribute `basis * value / 100`; fixed definitions
//! contribute `value` whatever the basis. Fees never compound on each other.
//! Nothing is rounded here; see [`PricingBreakdown::display_total`].
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use venue_core::calculations::compute_breakdown;
//! use venue_core::{CalculationMethod, DefinitionKind, TaxFeeDefinition};
//!
//! let definition = |id: &str, kind: DefinitionKind, calculation: CalculationMethod, value| {
//!     TaxFeeDefinition {
//!         id: id.to_string(),
//!         name: id.to_string(),
//!         kind,
//!         calculation,
//!         value,
//!         applies_to: "all".to_string(),
//!         is_active: true,
//!     }
//! };
//! let definitions = vec![
//!     definition("service", DefinitionKind::ServiceCharge, CalculationMethod::FixedAmount, dec!(25)),
//!     definition("gratuity", DefinitionKind::Fee, CalculationMethod::Percentage, dec!(18)),
//!     definition("sales", DefinitionKind::Tax, CalculationMethod::Percentage, dec!(8.5)),
//! ];
//!
//! let breakdown = compute_breakdown("500", &["service", "gratuity"], &["sales"], &definitions);
//!
//! assert_eq!(breakdown.fee_subtotal, dec!(115));
//! assert_eq!(breakdown.taxable_amount, dec!(615));
//! assert_eq!(breakdown.tax_subtotal, dec!(52.275));
//! assert_eq!(breakdown.total, dec!(667.275));
//! assert_eq!(breakdown.display_total(), dec!(667.28));
//! ```

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calculations::common::parse_money_or_zero;
use crate::models::{BreakdownLine, DefinitionKind, PricingBreakdown, TaxFeeDefinition};
use crate::selection::PricingSelection;

/// A base price coerced into the calculator's domain.
///
/// Built from a number or from raw text. Missing, non-numeric and negative
/// input all become zero, so constructing one never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BasePrice(Decimal);

impl BasePrice {
    pub fn amount(&self) -> Decimal {
        self.0
    }
}

impl From<Decimal> for BasePrice {
    fn from(value: Decimal) -> Self {
        Self(value.max(Decimal::ZERO))
    }
}

impl From<Option<Decimal>> for BasePrice {
    fn from(value: Option<Decimal>) -> Self {
        value.map(Self::from).unwrap_or_default()
    }
}

impl From<&str> for BasePrice {
    fn from(raw: &str) -> Self {
        Self(parse_money_or_zero(raw))
    }
}

impl From<&String> for BasePrice {
    fn from(raw: &String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<String> for BasePrice {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<Option<&str>> for BasePrice {
    fn from(raw: Option<&str>) -> Self {
        raw.map(Self::from).unwrap_or_default()
    }
}

/// Input for one pricing calculation.
///
/// Rebuilt from scratch whenever the price or the selection changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingRequest {
    pub base_price: Decimal,
    pub selected_fee_ids: Vec<String>,
    pub selected_tax_ids: Vec<String>,
}

impl PricingRequest {
    pub fn new(
        base_price: impl Into<BasePrice>,
        selection: &PricingSelection,
    ) -> Self {
        Self {
            base_price: base_price.into().amount(),
            selected_fee_ids: selection.enabled_fee_ids.clone(),
            selected_tax_ids: selection.enabled_tax_ids.clone(),
        }
    }
}

/// Calculator for itemized package and service prices.
///
/// Holds the pool of known definitions; selections refer to them by id.
/// Ids missing from the pool, or listed on the wrong side (a tax among the
/// fees or the reverse), are skipped. The pool is not filtered on
/// `is_active`.
#[derive(Debug, Clone, Copy)]
pub struct PricingCalculator<'a> {
    definitions: &'a [TaxFeeDefinition],
}

impl<'a> PricingCalculator<'a> {
    pub fn new(definitions: &'a [TaxFeeDefinition]) -> Self {
        Self { definitions }
    }

    /// Prices a [`PricingRequest`].
    pub fn calculate(
        &self,
        request: &PricingRequest,
    ) -> PricingBreakdown {
        self.breakdown(
            BasePrice::from(request.base_price),
            &request.selected_fee_ids,
            &request.selected_tax_ids,
        )
    }

    /// Runs every step for an already coerced base price.
    pub fn breakdown<S: AsRef<str>>(
        &self,
        base_price: BasePrice,
        selected_fee_ids: &[S],
        selected_tax_ids: &[S],
    ) -> PricingBreakdown {
        let base_price = base_price.amount();

        let fees = self.resolve(selected_fee_ids, DefinitionKind::is_fee);
        let fee_lines = self.lines(&fees, base_price);
        let fee_subtotal = self.subtotal(&fee_lines);

        let taxable_amount = self.taxable_amount(base_price, fee_subtotal);

        let taxes = self.resolve(selected_tax_ids, DefinitionKind::is_tax);
        let tax_lines = self.lines(&taxes, taxable_amount);
        let tax_subtotal = self.subtotal(&tax_lines);

        let total = self.total(base_price, fee_subtotal, tax_subtotal);

        PricingBreakdown {
            base_price,
            fee_lines,
            fee_subtotal,
            taxable_amount,
            tax_lines,
            tax_subtotal,
            total,
        }
    }

    /// Looks up selected ids in caller order, dropping repeats, unknown ids
    /// and definitions of the wrong kind.
    fn resolve<S: AsRef<str>>(
        &self,
        ids: &[S],
        accepts: fn(&DefinitionKind) -> bool,
    ) -> Vec<&'a TaxFeeDefinition> {
        let mut seen = HashSet::new();
        ids.iter()
            .map(AsRef::<str>::as_ref)
            .filter(|id| seen.insert(*id))
            .filter_map(|id| {
                let Some(definition) = self.definitions.iter().find(|d| d.id == id) else {
                    debug!(id, "selected definition not found, skipping");
                    return None;
                };
                if !accepts(&definition.kind) {
                    debug!(
                        id,
                        kind = definition.kind.as_str(),
                        "definition kind not applicable here, skipping"
                    );
                    return None;
                }
                Some(definition)
            })
            .collect()
    }

    /// One line per definition, each computed against the same basis.
    fn lines(
        &self,
        definitions: &[&TaxFeeDefinition],
        basis: Decimal,
    ) -> Vec<BreakdownLine> {
        definitions
            .iter()
            .map(|d| BreakdownLine {
                definition_id: d.id.clone(),
                name: d.name.clone(),
                amount: d.calculation.apply(d.value, basis),
            })
            .collect()
    }

    fn subtotal(
        &self,
        lines: &[BreakdownLine],
    ) -> Decimal {
        lines
            .iter()
            .fold(Decimal::ZERO, |acc, line| acc.saturating_add(line.amount))
    }

    fn taxable_amount(
        &self,
        base_price: Decimal,
        fee_subtotal: Decimal,
    ) -> Decimal {
        base_price.saturating_add(fee_subtotal)
    }

    fn total(
        &self,
        base_price: Decimal,
        fee_subtotal: Decimal,
        tax_subtotal: Decimal,
    ) -> Decimal {
        base_price
            .saturating_add(fee_subtotal)
            .saturating_add(tax_subtotal)
    }
}

/// Prices a base price and fee/tax selection against `definitions`.
///
/// `base_price` may be a [`Decimal`] or raw text; anything that is not a
/// non-negative number counts as zero. This never fails.
pub fn compute_breakdown<S: AsRef<str>>(
    base_price: impl Into<BasePrice>,
    selected_fee_ids: &[S],
    selected_tax_ids: &[S],
    definitions: &[TaxFeeDefinition],
) -> PricingBreakdown {
    PricingCalculator::new(definitions).breakdown(
        base_price.into(),
        selected_fee_ids,
        selected_tax_ids,
    )
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::CalculationMethod;

    const NONE: [&str; 0] = [];

    fn definition(
        id: &str,
        kind: DefinitionKind,
        calculation: CalculationMethod,
        value: Decimal,
    ) -> TaxFeeDefinition {
        TaxFeeDefinition {
            id: id.to_string(),
            name: id.to_string(),
            kind,
            calculation,
            value,
            applies_to: "all".to_string(),
            is_active: true,
        }
    }

    fn test_definitions() -> Vec<TaxFeeDefinition> {
        vec![
            definition("fixed-fee", DefinitionKind::Fee, CalculationMethod::FixedAmount, dec!(10)),
            definition("pct-fee", DefinitionKind::Fee, CalculationMethod::Percentage, dec!(10)),
            definition("pct-fee-2", DefinitionKind::Fee, CalculationMethod::Percentage, dec!(10)),
            definition("pct-tax", DefinitionKind::Tax, CalculationMethod::Percentage, dec!(10)),
            definition("flat-tax", DefinitionKind::Tax, CalculationMethod::FixedAmount, dec!(3)),
        ]
    }

    fn scenario_definitions() -> Vec<TaxFeeDefinition> {
        vec![
            TaxFeeDefinition {
                id: "svc".to_string(),
                name: "Service Charge".to_string(),
                kind: DefinitionKind::ServiceCharge,
                calculation: CalculationMethod::FixedAmount,
                value: dec!(25),
                applies_to: "packages".to_string(),
                is_active: true,
            },
            TaxFeeDefinition {
                id: "grat".to_string(),
                name: "Gratuity".to_string(),
                kind: DefinitionKind::Fee,
                calculation: CalculationMethod::Percentage,
                value: dec!(18),
                applies_to: "all".to_string(),
                is_active: true,
            },
            TaxFeeDefinition {
                id: "sales".to_string(),
                name: "Sales Tax".to_string(),
                kind: DefinitionKind::Tax,
                calculation: CalculationMethod::Percentage,
                value: dec!(8.5),
                applies_to: "all".to_string(),
                is_active: true,
            },
        ]
    }

    // =========================================================================
    // BasePrice tests
    // =========================================================================

    #[test]
    fn base_price_from_text_coerces_to_zero() {
        assert_eq!(BasePrice::from("").amount(), Decimal::ZERO);
        assert_eq!(BasePrice::from("abc").amount(), Decimal::ZERO);
        assert_eq!(BasePrice::from(None::<&str>).amount(), Decimal::ZERO);
        assert_eq!(BasePrice::from("1,500.25").amount(), dec!(1500.25));
    }

    #[test]
    fn base_price_clamps_negative_numbers() {
        assert_eq!(BasePrice::from(dec!(-10)).amount(), Decimal::ZERO);
        assert_eq!(BasePrice::from(None::<Decimal>).amount(), Decimal::ZERO);
        assert_eq!(BasePrice::from(Some(dec!(42))).amount(), dec!(42));
    }

    // =========================================================================
    // fee tests
    // =========================================================================

    #[test]
    fn no_selection_total_equals_base_price() {
        let defs = test_definitions();

        let result = compute_breakdown(dec!(100), &NONE, &NONE, &defs);

        assert_eq!(result.total, dec!(100));
        assert_eq!(result.fee_subtotal, Decimal::ZERO);
        assert_eq!(result.tax_subtotal, Decimal::ZERO);
        assert!(!result.has_adjustments());
    }

    #[test]
    fn fixed_fee_adds_its_value() {
        let defs = test_definitions();

        let result = compute_breakdown(dec!(100), &["fixed-fee"], &NONE, &defs);

        assert_eq!(result.fee_subtotal, dec!(10));
        assert_eq!(result.taxable_amount, dec!(110));
        assert_eq!(result.total, dec!(110));
    }

    #[test]
    fn percentage_fee_is_share_of_base_price() {
        let defs = test_definitions();

        let result = compute_breakdown(dec!(100), &["pct-fee"], &NONE, &defs);

        assert_eq!(result.fee_subtotal, dec!(10));
        assert_eq!(result.total, dec!(110));
    }

    #[test]
    fn percentage_fees_do_not_compound() {
        let defs = test_definitions();

        let result = compute_breakdown(dec!(100), &["pct-fee", "pct-fee-2"], &NONE, &defs);

        // Each 10% is taken from 100, not from a running total
        assert_eq!(result.fee_lines[0].amount, dec!(10));
        assert_eq!(result.fee_lines[1].amount, dec!(10));
        assert_eq!(result.fee_subtotal, dec!(20));
        assert_eq!(result.taxable_amount, dec!(120));
    }

    // =========================================================================
    // tax tests
    // =========================================================================

    #[test]
    fn tax_is_charged_on_fee_inclusive_amount() {
        let defs = test_definitions();

        let result = compute_breakdown(dec!(100), &["fixed-fee"], &["pct-tax"], &defs);

        assert_eq!(result.taxable_amount, dec!(110));
        assert_eq!(result.tax_lines[0].amount, dec!(11));
        assert_eq!(result.total, dec!(121));
    }

    #[test]
    fn fixed_tax_is_not_scaled_by_subtotal() {
        let defs = test_definitions();

        let result = compute_breakdown(dec!(100), &["fixed-fee"], &["flat-tax"], &defs);

        assert_eq!(result.tax_subtotal, dec!(3));
        assert_eq!(result.total, dec!(113));
    }

    #[test]
    fn taxes_do_not_compound_on_each_other() {
        let defs = test_definitions();

        let result = compute_breakdown(dec!(100), &NONE, &["pct-tax", "flat-tax"], &defs);

        assert_eq!(result.tax_lines[0].amount, dec!(10));
        assert_eq!(result.tax_lines[1].amount, dec!(3));
        assert_eq!(result.total, dec!(113));
    }

    // =========================================================================
    // selection resolution tests
    // =========================================================================

    #[test]
    fn unknown_ids_are_ignored() {
        let defs = test_definitions();

        let with_unknown =
            compute_breakdown(dec!(100), &["deleted-fee", "fixed-fee"], &["gone"], &defs);
        let without = compute_breakdown(dec!(100), &["fixed-fee"], &NONE, &defs);

        assert_eq!(with_unknown, without);
    }

    #[test]
    fn lines_follow_caller_order() {
        let defs = test_definitions();

        let result = compute_breakdown(dec!(100), &["pct-fee", "fixed-fee"], &NONE, &defs);

        let ids: Vec<_> = result
            .fee_lines
            .iter()
            .map(|l| l.definition_id.as_str())
            .collect();
        assert_eq!(ids, vec!["pct-fee", "fixed-fee"]);
    }

    #[test]
    fn repeated_id_is_applied_once() {
        let defs = test_definitions();

        let result = compute_breakdown(dec!(100), &["fixed-fee", "fixed-fee"], &NONE, &defs);

        assert_eq!(result.fee_lines.len(), 1);
        assert_eq!(result.fee_subtotal, dec!(10));
    }

    #[test]
    fn tax_listed_as_fee_is_skipped() {
        let defs = test_definitions();

        let result = compute_breakdown(dec!(100), &["pct-tax"], &["fixed-fee"], &defs);

        assert!(result.fee_lines.is_empty());
        assert!(result.tax_lines.is_empty());
        assert_eq!(result.total, dec!(100));
    }

    #[test]
    fn inactive_definitions_still_price() {
        let mut defs = test_definitions();
        defs[0].is_active = false;

        let result = compute_breakdown(dec!(100), &["fixed-fee"], &NONE, &defs);

        assert_eq!(result.total, dec!(110));
    }

    #[test]
    fn negative_definition_value_passes_through() {
        let defs = vec![definition(
            "discount",
            DefinitionKind::Fee,
            CalculationMethod::FixedAmount,
            dec!(-15),
        )];

        let result = compute_breakdown(dec!(100), &["discount"], &NONE, &defs);

        assert_eq!(result.fee_subtotal, dec!(-15));
        assert_eq!(result.total, dec!(85));
    }

    // =========================================================================
    // base price coercion tests
    // =========================================================================

    #[test]
    fn empty_or_non_numeric_base_price_totals_zero() {
        let defs = test_definitions();

        assert_eq!(compute_breakdown("", &NONE, &NONE, &defs).total, Decimal::ZERO);
        assert_eq!(compute_breakdown("abc", &NONE, &NONE, &defs).total, Decimal::ZERO);
    }

    #[test]
    fn malformed_base_price_text_totals_zero() {
        let defs = test_definitions();

        assert_eq!(compute_breakdown("1,2,3", &NONE, &NONE, &defs).total, Decimal::ZERO);
        assert_eq!(compute_breakdown("1e3", &NONE, &NONE, &defs).total, Decimal::ZERO);
    }

    #[test]
    fn largest_base_price_saturates_instead_of_shrinking() {
        let defs = vec![definition(
            "full-tax",
            DefinitionKind::Tax,
            CalculationMethod::Percentage,
            dec!(100),
        )];

        let result = compute_breakdown(Decimal::MAX, &NONE, &["full-tax"], &defs);

        assert_eq!(result.tax_lines[0].amount, Decimal::MAX);
        assert_eq!(result.tax_subtotal, Decimal::MAX);
        assert_eq!(result.total, Decimal::MAX);
    }

    #[test]
    fn zero_base_price_still_applies_fixed_charges() {
        let defs = test_definitions();

        let result = compute_breakdown("", &["fixed-fee", "pct-fee"], &["pct-tax"], &defs);

        assert_eq!(result.fee_subtotal, dec!(10));
        assert_eq!(result.tax_subtotal, dec!(1));
        assert_eq!(result.total, dec!(11));
    }

    // =========================================================================
    // calculate tests
    // =========================================================================

    #[test]
    fn calculate_prices_request_built_from_selection() {
        let defs = scenario_definitions();
        let mut selection = PricingSelection::default();
        selection.toggle_fee("svc");
        selection.toggle_fee("grat");
        selection.toggle_tax("sales");
        let request = PricingRequest::new("500", &selection);

        let result = PricingCalculator::new(&defs).calculate(&request);

        assert_eq!(result.base_price, dec!(500));
        assert_eq!(result.total, dec!(667.275));
    }

    #[test]
    fn calculate_clamps_negative_request_price() {
        let defs = test_definitions();
        let request = PricingRequest {
            base_price: dec!(-50),
            selected_fee_ids: vec!["fixed-fee".to_string()],
            selected_tax_ids: vec![],
        };

        let result = PricingCalculator::new(&defs).calculate(&request);

        assert_eq!(result.base_price, Decimal::ZERO);
        assert_eq!(result.total, dec!(10));
    }

    #[test]
    fn end_to_end_event_package() {
        let defs = scenario_definitions();

        let result = compute_breakdown(dec!(500), &["svc", "grat"], &["sales"], &defs);

        assert_eq!(
            result,
            PricingBreakdown {
                base_price: dec!(500),
                fee_lines: vec![
                    BreakdownLine {
                        definition_id: "svc".to_string(),
                        name: "Service Charge".to_string(),
                        amount: dec!(25),
                    },
                    BreakdownLine {
                        definition_id: "grat".to_string(),
                        name: "Gratuity".to_string(),
                        amount: dec!(90),
                    },
                ],
                fee_subtotal: dec!(115),
                taxable_amount: dec!(615),
                tax_lines: vec![BreakdownLine {
                    definition_id: "sales".to_string(),
                    name: "Sales Tax".to_string(),
                    amount: dec!(52.275),
                }],
                tax_subtotal: dec!(52.275),
                total: dec!(667.275),
            }
        );
        assert_eq!(result.display_total(), dec!(667.28));
    }

    #[test]
    fn repeated_calculation_is_stable() {
        let defs = scenario_definitions();

        let first = compute_breakdown("500", &["svc", "grat"], &["sales"], &defs);
        let second = compute_breakdown(first.base_price, &["svc", "grat"], &["sales"], &defs);

        assert_eq!(first, second);
    }

    // =========================================================================
    // properties
    // =========================================================================

    fn cents() -> impl Strategy<Value = Decimal> {
        (0i64..100_000_000).prop_map(|c| Decimal::new(c, 2))
    }

    proptest! {
        #[test]
        fn no_selection_total_is_base_price(base in cents()) {
            let defs = test_definitions();

            let result = compute_breakdown(base, &NONE, &NONE, &defs);

            prop_assert_eq!(result.total, base);
        }

        #[test]
        fn selection_order_does_not_change_totals(
            base in cents(),
            fees in Just(vec!["fixed-fee", "pct-fee", "pct-fee-2"]).prop_shuffle(),
            taxes in Just(vec!["pct-tax", "flat-tax"]).prop_shuffle(),
        ) {
            let defs = test_definitions();
            let reference = compute_breakdown(
                base,
                &["fixed-fee", "pct-fee", "pct-fee-2"],
                &["pct-tax", "flat-tax"],
                &defs,
            );

            let shuffled = compute_breakdown(base, &fees, &taxes, &defs);

            prop_assert_eq!(shuffled.fee_subtotal, reference.fee_subtotal);
            prop_assert_eq!(shuffled.tax_subtotal, reference.tax_subtotal);
            prop_assert_eq!(shuffled.total, reference.total);
        }

        #[test]
        fn total_is_sum_of_parts(base in cents()) {
            let defs = test_definitions();

            let result = compute_breakdown(base, &["fixed-fee", "pct-fee"], &["pct-tax"], &defs);

            prop_assert_eq!(result.total, result.base_price + result.fee_subtotal + result.tax_subtotal);
            prop_assert_eq!(result.taxable_amount, result.base_price + result.fee_subtotal);
        }
    }
}
