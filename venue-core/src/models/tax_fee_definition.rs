use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when a tax/fee definition is parsed or validated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("definition id must not be empty")]
    EmptyId,

    #[error("definition '{0}' has an empty name")]
    EmptyName(String),

    #[error("definition '{id}' has negative value {value}")]
    NegativeValue { id: String, value: Decimal },

    #[error("definition '{id}' has percentage {value} above 100")]
    PercentageOutOfRange { id: String, value: Decimal },

    #[error("unknown definition kind '{0}'")]
    UnknownKind(String),

    #[error("unknown calculation method '{0}'")]
    UnknownCalculation(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionKind {
    Tax,
    Fee,
    ServiceCharge,
}

impl DefinitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tax => "tax",
            Self::Fee => "fee",
            Self::ServiceCharge => "service_charge",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "tax" => Some(Self::Tax),
            "fee" => Some(Self::Fee),
            "service_charge" => Some(Self::ServiceCharge),
            _ => None,
        }
    }

    /// Fees and service charges are both applied to the base price.
    pub fn is_fee(&self) -> bool {
        match self {
            Self::Fee | Self::ServiceCharge => true,
            Self::Tax => false,
        }
    }

    pub fn is_tax(&self) -> bool {
        matches!(self, Self::Tax)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Tax => "Tax",
            Self::Fee => "Fee",
            Self::ServiceCharge => "Service Charge",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CalculationMethod {
    #[serde(rename = "percentage")]
    Percentage,
    #[serde(rename = "fixed")]
    FixedAmount,
}

impl CalculationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::FixedAmount => "fixed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "percentage" => Some(Self::Percentage),
            "fixed" => Some(Self::FixedAmount),
            _ => None,
        }
    }

    /// Contribution of `value` against `basis`.
    ///
    /// Percentage values are percentage points, so `8.5` means 8.5% of
    /// `basis`. Fixed amounts ignore the basis entirely. The rate is scaled
    /// down before multiplying, so an overflowing line saturates at
    /// `Decimal::MAX` instead of panicking.
    pub fn apply(
        &self,
        value: Decimal,
        basis: Decimal,
    ) -> Decimal {
        match self {
            Self::Percentage => basis.saturating_mul(value / Decimal::ONE_HUNDRED),
            Self::FixedAmount => value,
        }
    }
}

/// A tax, fee or service charge that can be attached to a package or service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxFeeDefinition {
    pub id: String,
    pub name: String,
    pub kind: DefinitionKind,
    pub calculation: CalculationMethod,

    /// Percentage points for `Percentage`, a currency amount for `FixedAmount`.
    pub value: Decimal,

    /// Advisory scope label such as "services", "packages" or "all".
    pub applies_to: String,
    pub is_active: bool,
}

impl TaxFeeDefinition {
    /// Checks the constraints enforced when a definition is imported or saved.
    ///
    /// The pricing calculator never calls this; it prices whatever it is given.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.id.trim().is_empty() {
            return Err(DefinitionError::EmptyId);
        }
        if self.name.trim().is_empty() {
            return Err(DefinitionError::EmptyName(self.id.clone()));
        }
        if self.value < Decimal::ZERO {
            return Err(DefinitionError::NegativeValue {
                id: self.id.clone(),
                value: self.value,
            });
        }
        if self.calculation == CalculationMethod::Percentage && self.value > Decimal::ONE_HUNDRED
        {
            return Err(DefinitionError::PercentageOutOfRange {
                id: self.id.clone(),
                value: self.value,
            });
        }
        Ok(())
    }
}
