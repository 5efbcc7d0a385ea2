//! Pricing calculations for packages and services.
//!
//! This module provides the fee-and-tax cascade and the money helpers used
//! to coerce input and format results.

pub mod common;
pub mod pricing;

pub use common::{format_amount, parse_money_or_zero, round_half_up};
pub use pricing::{BasePrice, PricingCalculator, PricingRequest, compute_breakdown};
