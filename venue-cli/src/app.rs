//! Back-office commands, independent of argument parsing so they can be
//! driven from tests against an in-memory catalog.

use std::fmt::Write;

use venue_core::db::{DbConfig, RepositoryRegistry};
use tracing::info;
use venue_core::{
    BasePrice, CalculationMethod, CatalogItem, CatalogItemKind, CatalogRepository,
    NewCatalogItem, PricingBreakdown, PricingSelection, RepositoryError, TaxFeeDefinition,
    compute_breakdown, format_amount, selectable_fees, selectable_taxes,
};
use venue_db_sqlite::SqliteRepositoryFactory;

const LABEL_WIDTH: usize = 28;
const AMOUNT_WIDTH: usize = 14;

/// All storage backends this binary can open.
pub fn build_registry() -> RepositoryRegistry {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    registry
}

pub async fn open_catalog(config: &DbConfig) -> Result<Box<dyn CatalogRepository>, RepositoryError> {
    build_registry().create(config).await
}

/// Prices an ad-hoc request. `base_price` is raw user text; anything that is
/// not a positive number prices as zero.
pub async fn quote(
    repo: &dyn CatalogRepository,
    base_price: &str,
    fee_ids: &[String],
    tax_ids: &[String],
) -> Result<PricingBreakdown, RepositoryError> {
    let definitions = repo.list_definitions().await?;
    Ok(compute_breakdown(base_price, fee_ids, tax_ids, &definitions))
}

/// Prices a stored package or service with its saved selection.
pub async fn quote_item(
    repo: &dyn CatalogRepository,
    id: i64,
) -> Result<(CatalogItem, PricingBreakdown), RepositoryError> {
    let item = repo.get_item(id).await?;
    let definitions = repo.list_definitions().await?;
    let breakdown = item.quote(&definitions);
    Ok((item, breakdown))
}

/// Active fees and active taxes, in that order.
pub async fn selectable_definitions(
    repo: &dyn CatalogRepository,
) -> Result<(Vec<TaxFeeDefinition>, Vec<TaxFeeDefinition>), RepositoryError> {
    let definitions = repo.list_definitions().await?;
    let fees = selectable_fees(&definitions).into_iter().cloned().collect();
    let taxes = selectable_taxes(&definitions).into_iter().cloned().collect();
    Ok((fees, taxes))
}

/// Ids that may be switched on for an item, as `(fees, taxes)`.
async fn selectable_ids(
    repo: &dyn CatalogRepository,
) -> Result<(Vec<String>, Vec<String>), RepositoryError> {
    let (fees, taxes) = selectable_definitions(repo).await?;
    Ok((
        fees.into_iter().map(|d| d.id).collect(),
        taxes.into_iter().map(|d| d.id).collect(),
    ))
}

fn check_selectable(
    id: &str,
    allowed: &[String],
    group: &str,
) -> Result<(), RepositoryError> {
    if allowed.iter().any(|a| a == id) {
        Ok(())
    } else {
        Err(RepositoryError::Validation(format!(
            "'{id}' is not an active {group}"
        )))
    }
}

/// Saves a new package or service with the given fees and taxes switched on.
///
/// Every id must name an active definition of the matching group. Repeated
/// ids are enabled once. `base_price` is read like the quote form reads it.
pub async fn add_item(
    repo: &dyn CatalogRepository,
    kind: CatalogItemKind,
    name: &str,
    description: Option<String>,
    base_price: &str,
    fee_ids: &[String],
    tax_ids: &[String],
) -> Result<CatalogItem, RepositoryError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(RepositoryError::Validation(
            "item name must not be empty".to_string(),
        ));
    }

    let (allowed_fees, allowed_taxes) = selectable_ids(repo).await?;
    let mut selection = PricingSelection::default();
    for id in fee_ids {
        check_selectable(id, &allowed_fees, "fee")?;
        if !selection.is_fee_enabled(id) {
            selection.toggle_fee(id);
        }
    }
    for id in tax_ids {
        check_selectable(id, &allowed_taxes, "tax")?;
        if !selection.is_tax_enabled(id) {
            selection.toggle_tax(id);
        }
    }

    let item = repo
        .create_item(NewCatalogItem {
            kind,
            name: name.to_string(),
            description,
            base_price: BasePrice::from(base_price).amount(),
            enabled_tax_ids: selection.enabled_tax_ids,
            enabled_fee_ids: selection.enabled_fee_ids,
        })
        .await?;
    info!(id = item.id, kind = item.kind.as_str(), "catalog item created");
    Ok(item)
}

/// Flips each given fee and tax on a saved item and stores the result.
///
/// Switching an id on requires an active definition of the matching group;
/// switching one off does not, so stale ids can always be cleared. Returns
/// the item as stored afterwards.
pub async fn toggle_item_selection(
    repo: &dyn CatalogRepository,
    id: i64,
    fee_ids: &[String],
    tax_ids: &[String],
) -> Result<CatalogItem, RepositoryError> {
    let mut item = repo.get_item(id).await?;
    let (allowed_fees, allowed_taxes) = selectable_ids(repo).await?;

    let mut selection = item.selection();
    for fee in fee_ids {
        if !selection.is_fee_enabled(fee) {
            check_selectable(fee, &allowed_fees, "fee")?;
        }
        selection.toggle_fee(fee);
    }
    for tax in tax_ids {
        if !selection.is_tax_enabled(tax) {
            check_selectable(tax, &allowed_taxes, "tax")?;
        }
        selection.toggle_tax(tax);
    }

    item.apply_selection(selection);
    repo.update_item(&item).await?;
    info!(id, "catalog item selection updated");
    repo.get_item(id).await
}

pub async fn list_items(
    repo: &dyn CatalogRepository,
    kind: Option<CatalogItemKind>,
) -> Result<Vec<CatalogItem>, RepositoryError> {
    repo.list_items(kind).await
}

/// Listing for the `item list` command.
pub fn render_items(
    items: &[CatalogItem],
    currency_symbol: &str,
) -> String {
    let mut out = String::new();
    if items.is_empty() {
        let _ = writeln!(out, "(no items)");
    }
    for item in items {
        let _ = writeln!(
            out,
            "{:>5}  {:<8}{:<32}{:>12}",
            item.id,
            item.kind.as_str(),
            item.name,
            format_amount(item.base_price, currency_symbol)
        );
    }
    out
}

fn push_line(
    out: &mut String,
    label: &str,
    amount: &str,
) {
    let _ = writeln!(out, "{label:<LABEL_WIDTH$}{amount:>AMOUNT_WIDTH$}");
}

/// Itemized price: base price, one `+` line per fee then per tax, and the
/// total. Amounts are rounded for display only.
pub fn render_breakdown(
    breakdown: &PricingBreakdown,
    currency_symbol: &str,
) -> String {
    let mut out = String::new();
    push_line(
        &mut out,
        "Base Price",
        &format_amount(breakdown.base_price, currency_symbol),
    );
    for line in breakdown.fee_lines.iter().chain(&breakdown.tax_lines) {
        push_line(
            &mut out,
            &format!("+ {}", line.name),
            &format_amount(line.amount, currency_symbol),
        );
    }
    push_line(
        &mut out,
        "Total Price",
        &format_amount(breakdown.total, currency_symbol),
    );
    out
}

fn describe(
    definition: &TaxFeeDefinition,
    currency_symbol: &str,
) -> String {
    let value = match definition.calculation {
        CalculationMethod::Percentage => format!("{}%", definition.value.normalize()),
        CalculationMethod::FixedAmount => format_amount(definition.value, currency_symbol),
    };
    format!(
        "  {:<20}{:<32}{:<16}{:>10}  ({})",
        definition.id,
        definition.name,
        definition.kind.label(),
        value,
        definition.applies_to
    )
}

/// Listing for the `definitions` command.
pub fn render_definitions(
    fees: &[TaxFeeDefinition],
    taxes: &[TaxFeeDefinition],
    currency_symbol: &str,
) -> String {
    let mut out = String::new();
    for (heading, definitions) in [("Fees", fees), ("Taxes", taxes)] {
        let _ = writeln!(out, "{heading}:");
        if definitions.is_empty() {
            let _ = writeln!(out, "  (none)");
        }
        for definition in definitions {
            let _ = writeln!(out, "{}", describe(definition, currency_symbol));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use venue_core::{BreakdownLine, DefinitionKind};

    use super::*;

    fn line(
        id: &str,
        name: &str,
        amount: rust_decimal::Decimal,
    ) -> BreakdownLine {
        BreakdownLine {
            definition_id: id.to_string(),
            name: name.to_string(),
            amount,
        }
    }

    #[test]
    fn render_breakdown_itemizes_the_reference_package() {
        let breakdown = PricingBreakdown {
            base_price: dec!(500),
            fee_lines: vec![
                line("service-charge", "Service Charge", dec!(25)),
                line("gratuity", "Gratuity", dec!(90)),
            ],
            fee_subtotal: dec!(115),
            taxable_amount: dec!(615),
            tax_lines: vec![line("sales-tax", "Sales Tax", dec!(52.275))],
            tax_subtotal: dec!(52.275),
            total: dec!(667.275),
        };

        let rendered = render_breakdown(&breakdown, "$");

        let expected = [
            format!("{:<28}{:>14}", "Base Price", "$500.00"),
            format!("{:<28}{:>14}", "+ Service Charge", "$25.00"),
            format!("{:<28}{:>14}", "+ Gratuity", "$90.00"),
            format!("{:<28}{:>14}", "+ Sales Tax", "$52.28"),
            format!("{:<28}{:>14}", "Total Price", "$667.28"),
        ]
        .join("\n")
            + "\n";
        assert_eq!(rendered, expected);
    }

    #[test]
    fn render_breakdown_without_selections_has_two_lines() {
        let breakdown = compute_breakdown("abc", &[] as &[&str], &[], &[]);

        let rendered = render_breakdown(&breakdown, "€");

        assert_eq!(rendered.lines().count(), 2);
        assert!(rendered.starts_with("Base Price"));
        assert!(rendered.trim_end().ends_with("€0.00"));
    }

    #[test]
    fn render_definitions_tells_service_charges_from_fees() {
        let definition = |id: &str, kind, calculation, value| TaxFeeDefinition {
            id: id.to_string(),
            name: id.to_string(),
            kind,
            calculation,
            value,
            applies_to: "all".to_string(),
            is_active: true,
        };
        let fees = vec![
            definition(
                "setup",
                DefinitionKind::ServiceCharge,
                CalculationMethod::FixedAmount,
                dec!(25),
            ),
            definition(
                "gratuity",
                DefinitionKind::Fee,
                CalculationMethod::Percentage,
                dec!(18),
            ),
        ];

        let rendered = render_definitions(&fees, &[], "$");

        let lines: Vec<_> = rendered.lines().collect();
        assert_eq!(lines[0], "Fees:");
        assert!(lines[1].contains("Service Charge"), "got: {}", lines[1]);
        assert!(lines[2].contains("Fee"), "got: {}", lines[2]);
        assert!(!lines[2].contains("Service Charge"), "got: {}", lines[2]);
        assert_eq!(lines[3], "Taxes:");
    }

    #[test]
    fn render_items_lists_kind_name_and_price() {
        let now = chrono::Utc::now();
        let item = CatalogItem {
            id: 3,
            kind: CatalogItemKind::Package,
            name: "Gold Wedding".to_string(),
            description: None,
            base_price: dec!(500),
            enabled_tax_ids: Vec::new(),
            enabled_fee_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        assert_eq!(
            render_items(&[item], "$"),
            format!("{:>5}  {:<8}{:<32}{:>12}\n", 3, "package", "Gold Wedding", "$500.00")
        );
        assert_eq!(render_items(&[], "$"), "(no items)\n");
    }

    #[test]
    fn render_definitions_marks_empty_groups() {
        let rendered = render_definitions(&[], &[], "$");

        assert_eq!(rendered, "Fees:\n  (none)\nTaxes:\n  (none)\n");
    }
}
