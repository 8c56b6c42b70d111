//! Custom assertion helpers for domain types

use rust_decimal::Decimal;

use core_kernel::Money;
use domain_billing::{BillingRecord, BillingStatus, BillingTotals};

/// Asserts a money value equals the given decimal amount
///
/// # Panics
///
/// Panics with both values when they differ.
pub fn assert_money_eq(actual: Money, expected: Decimal) {
    assert_eq!(
        actual.amount(),
        expected,
        "expected {} {}, got {}",
        actual.currency(),
        expected,
        actual
    );
}

/// Asserts the four aggregates of a totals block at once
pub fn assert_totals(
    totals: &BillingTotals,
    sub_total: Decimal,
    discount: Decimal,
    tax: Decimal,
    grand_total: Decimal,
) {
    assert_money_eq(totals.sub_total, sub_total);
    assert_money_eq(totals.discount, discount);
    assert_money_eq(totals.tax, tax);
    assert_money_eq(totals.grand_total, grand_total);
}

/// Asserts a billing record's status and cached payment aggregate
pub fn assert_payment_position(record: &BillingRecord, status: BillingStatus, paid: Decimal) {
    assert_eq!(
        record.status, status,
        "billing {} has status {:?}",
        record.bill_number, record.status
    );
    assert_money_eq(record.paid_to_date, paid);
}
