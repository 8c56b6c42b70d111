//! Line items and the billing totals calculator
//!
//! A line item is one priced, discounted, and taxed entry on a bill.
//! The stored figures are always derived here from quantity, price,
//! discount, and VAT; amounts supplied by a caller are never trusted.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{Currency, Money, Rate};

use crate::error::BillingError;

/// VAT applied to the post-discount amount of a line item
///
/// The canonical shape is the structured `{ "rate": <percentage> }`.
/// Early records stored the percentage as a bare number; those
/// deserialize through the untagged adapter below and are normalized to
/// the structured shape on the next write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "VatRepr")]
pub struct VatRate {
    /// VAT percentage (e.g., 12 for 12%)
    pub rate: Decimal,
}

impl VatRate {
    /// Creates a VAT rate from a percentage
    pub fn percentage(rate: Decimal) -> Self {
        Self { rate }
    }

    /// A zero VAT rate
    pub fn zero() -> Self {
        Self {
            rate: Decimal::ZERO,
        }
    }

    /// Returns the rate as an applicable [`Rate`]
    pub fn as_rate(&self) -> Rate {
        Rate::from_percentage(self.rate)
    }
}

impl Default for VatRate {
    fn default() -> Self {
        Self::zero()
    }
}

/// Accepts both the legacy flat-number shape and the structured shape
#[derive(Deserialize)]
#[serde(untagged)]
enum VatRepr {
    Structured { rate: Decimal },
    Flat(Decimal),
}

impl From<VatRepr> for VatRate {
    fn from(repr: VatRepr) -> Self {
        match repr {
            VatRepr::Structured { rate } => VatRate { rate },
            VatRepr::Flat(rate) => VatRate { rate },
        }
    }
}

/// One priced entry on a bill
///
/// Items are kept in insertion order; that order is the display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// What the entry is for
    pub particulars: String,
    /// Quantity (hours, units); missing values default to zero
    #[serde(default)]
    pub quantity: Decimal,
    /// Unit price in the billing's currency
    pub unit_price: Money,
    /// Discount percentage (0-100) applied to quantity x unit price
    #[serde(default)]
    pub discount: Decimal,
    /// VAT applied to the post-discount amount
    #[serde(default)]
    pub vat: VatRate,
}

impl LineItem {
    /// Creates a new line item with no discount and no VAT
    pub fn new(particulars: impl Into<String>, quantity: Decimal, unit_price: Money) -> Self {
        Self {
            particulars: particulars.into(),
            quantity,
            unit_price,
            discount: Decimal::ZERO,
            vat: VatRate::zero(),
        }
    }

    /// Sets the discount percentage
    pub fn with_discount(mut self, percent: Decimal) -> Self {
        self.discount = percent;
        self
    }

    /// Sets the VAT percentage
    pub fn with_vat(mut self, percent: Decimal) -> Self {
        self.vat = VatRate::percentage(percent);
        self
    }

    /// Validates the item against the billing currency
    ///
    /// Negative quantities, prices, and rates are rejected; a discount
    /// cannot exceed 100 percent of the item.
    pub fn validate(&self, currency: Currency) -> Result<(), BillingError> {
        if self.quantity.is_sign_negative() && !self.quantity.is_zero() {
            return Err(BillingError::validation("quantity", "must not be negative"));
        }
        if self.unit_price.is_negative() {
            return Err(BillingError::validation("unit_price", "must not be negative"));
        }
        if self.unit_price.currency() != currency {
            return Err(BillingError::validation(
                "unit_price",
                format!(
                    "currency {} does not match billing currency {}",
                    self.unit_price.currency(),
                    currency
                ),
            ));
        }
        if self.discount.is_sign_negative() && !self.discount.is_zero() {
            return Err(BillingError::validation("discount", "must not be negative"));
        }
        if self.discount > Decimal::ONE_HUNDRED {
            return Err(BillingError::validation("discount", "cannot exceed 100 percent"));
        }
        if self.vat.rate.is_sign_negative() && !self.vat.rate.is_zero() {
            return Err(BillingError::validation("vat", "must not be negative"));
        }
        Ok(())
    }

    /// Computes the derived figures for this item
    ///
    /// ```text
    /// total    = quantity * unit_price
    /// discount = total * (discount% / 100)
    /// vat      = (total - discount) * (vat% / 100)
    /// amount   = total - discount + vat
    /// ```
    ///
    /// Each figure is rounded once with the system rounding rule
    /// ([`Money::rounded`]), so sums over items stay exact.
    pub fn breakdown(&self) -> LineItemBreakdown {
        let total = self.unit_price.multiply(self.quantity).rounded();
        let discount = Rate::from_percentage(self.discount).apply(&total).rounded();
        let taxable = total - discount;
        let vat = self.vat.as_rate().apply(&taxable).rounded();
        let amount = taxable + vat;

        LineItemBreakdown {
            total,
            discount,
            vat,
            amount,
        }
    }
}

/// The derived figures of a single line item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineItemBreakdown {
    /// quantity x unit price
    pub total: Money,
    /// Discount taken off the total
    pub discount: Money,
    /// VAT on the post-discount amount
    pub vat: Money,
    /// What the item adds to the grand total
    pub amount: Money,
}

/// Aggregate totals of a billing record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingTotals {
    /// Sum of item totals before discount and VAT
    pub sub_total: Money,
    /// Sum of item discounts
    pub discount: Money,
    /// Sum of item VAT
    pub tax: Money,
    /// Sum of item amounts
    pub grand_total: Money,
}

impl BillingTotals {
    /// All-zero totals in the given currency
    pub fn zero(currency: Currency) -> Self {
        Self {
            sub_total: Money::zero(currency),
            discount: Money::zero(currency),
            tax: Money::zero(currency),
            grand_total: Money::zero(currency),
        }
    }
}

/// Computes the aggregate totals over an ordered list of line items
///
/// An empty list yields all-zero totals. Every item is validated first;
/// validation errors name the offending item by position.
pub fn compute_totals(items: &[LineItem], currency: Currency) -> Result<BillingTotals, BillingError> {
    let mut totals = BillingTotals::zero(currency);

    for (index, item) in items.iter().enumerate() {
        item.validate(currency).map_err(|err| match err {
            BillingError::Validation { field, message } => BillingError::Validation {
                field: format!("items[{index}].{field}"),
                message,
            },
            other => other,
        })?;

        let breakdown = item.breakdown();
        totals.sub_total = totals.sub_total.checked_add(&breakdown.total)?;
        totals.discount = totals.discount.checked_add(&breakdown.discount)?;
        totals.tax = totals.tax.checked_add(&breakdown.vat)?;
        totals.grand_total = totals.grand_total.checked_add(&breakdown.amount)?;
    }

    Ok(totals)
}
