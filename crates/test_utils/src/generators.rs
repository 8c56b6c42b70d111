//! Property-based test data generators

use proptest::prelude::*;
use rust_decimal::Decimal;

use core_kernel::{Currency, Money};
use domain_billing::LineItem;

/// Strategy producing non-negative USD amounts up to 10,000.00
pub fn money_strategy() -> impl Strategy<Value = Money> {
    (0i64..1_000_000i64).prop_map(|minor| Money::from_minor(minor, Currency::USD))
}

/// Strategy producing strictly positive USD amounts
pub fn positive_money_strategy() -> impl Strategy<Value = Money> {
    (1i64..1_000_000i64).prop_map(|minor| Money::from_minor(minor, Currency::USD))
}

/// Strategy producing valid line items: non-negative quantity and price,
/// discount within 0-100, VAT within 0-40
pub fn line_item_strategy() -> impl Strategy<Value = LineItem> {
    (
        "[A-Za-z ]{1,24}",
        0i64..10_000i64,
        0i64..1_000_000i64,
        0u32..=100u32,
        0u32..=40u32,
    )
        .prop_map(|(particulars, quantity, price_minor, discount, vat)| {
            LineItem::new(
                particulars,
                Decimal::new(quantity, 2),
                Money::from_minor(price_minor, Currency::USD),
            )
            .with_discount(Decimal::from(discount))
            .with_vat(Decimal::from(vat))
        })
}

/// Strategy producing lists of valid line items
pub fn line_items_strategy(max_len: usize) -> impl Strategy<Value = Vec<LineItem>> {
    proptest::collection::vec(line_item_strategy(), 0..max_len)
}
