pub mod calculations;
pub mod db;
pub mod models;
pub mod selection;

pub use calculations::{
    BasePrice, PricingCalculator, PricingRequest, compute_breakdown, format_amount,
    parse_money_or_zero, round_half_up,
};
pub use db::repository::{CatalogRepository, RepositoryError};
pub use models::*;
pub use selection::{PricingSelection, selectable_fees, selectable_taxes};
