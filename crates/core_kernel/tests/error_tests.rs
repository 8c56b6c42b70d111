//! Integration tests for core error types

use core_kernel::{CoreError, MoneyError, Money, Currency};
use rust_decimal_macros::dec;

#[test]
fn test_money_error_converts_to_core_error() {
    let usd = Money::new(dec!(1), Currency::USD);
    let gbp = Money::new(dec!(1), Currency::GBP);

    let err: CoreError = usd.checked_add(&gbp).unwrap_err().into();
    assert!(matches!(err, CoreError::Money(MoneyError::CurrencyMismatch(_, _))));
}

#[test]
fn test_validation_helper() {
    let err = CoreError::validation("title must not be empty");
    assert!(err.to_string().contains("title must not be empty"));
}

#[test]
fn test_not_found_helper() {
    let err = CoreError::not_found("billing BIL-123");
    assert!(matches!(err, CoreError::NotFound(_)));
}
