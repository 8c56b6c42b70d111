//! Comprehensive tests for domain_billing

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{Currency, Money};

use domain_billing::billing::{derive_status, BillingStatus, BillingType};
use domain_billing::line_item::{compute_totals, BillingTotals, LineItem, VatRate};
use domain_billing::sequence::{
    highest_numeric_suffix, numeric_suffix, BILLING_SEQUENCE, CASE_SEQUENCE, CLIENT_SEQUENCE,
};

fn usd(amount: Decimal) -> Money {
    Money::new(amount, Currency::USD)
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

// ============================================================================
// Calculator Tests
// ============================================================================

mod calculator_tests {
    use super::*;

    #[test]
    fn test_empty_list_is_all_zero() {
        let totals = compute_totals(&[], Currency::USD).unwrap();
        assert_eq!(totals, BillingTotals::zero(Currency::USD));
        assert!(totals.grand_total.is_zero());
    }

    #[test]
    fn test_spec_example_quantity_two_price_hundred() {
        // {quantity: 2, price: 100, discount: 10, vat: 12}
        let item = LineItem::new("Drafting and review", dec!(2), usd(dec!(100)))
            .with_discount(dec!(10))
            .with_vat(dec!(12));

        let b = item.breakdown();
        assert_eq!(b.total, usd(dec!(200)));
        assert_eq!(b.discount, usd(dec!(20)));
        assert_eq!(b.vat, usd(dec!(21.6)));
        assert_eq!(b.amount, usd(dec!(201.6)));
    }

    #[test]
    fn test_multiple_items_aggregate() {
        let items = vec![
            LineItem::new("Court appearance", dec!(1), usd(dec!(500))),
            LineItem::new("Research hours", dec!(4), usd(dec!(150))).with_vat(dec!(10)),
        ];

        let totals = compute_totals(&items, Currency::USD).unwrap();
        assert_eq!(totals.sub_total, usd(dec!(1100)));
        assert_eq!(totals.discount, usd(dec!(0)));
        assert_eq!(totals.tax, usd(dec!(60)));
        assert_eq!(totals.grand_total, usd(dec!(1160)));
    }

    #[test]
    fn test_hundred_percent_discount_is_allowed() {
        let item = LineItem::new("Waived fee", dec!(1), usd(dec!(300))).with_discount(dec!(100));
        let b = item.breakdown();
        assert!(b.amount.is_zero());
        assert_eq!(b.discount, usd(dec!(300)));
    }

    #[test]
    fn test_calling_twice_yields_identical_output() {
        let items = vec![
            LineItem::new("A", dec!(2.5), usd(dec!(99.99))).with_vat(dec!(7.5)),
            LineItem::new("B", dec!(1), usd(dec!(0.01))).with_discount(dec!(50)),
        ];
        assert_eq!(
            compute_totals(&items, Currency::USD).unwrap(),
            compute_totals(&items, Currency::USD).unwrap()
        );
    }

    #[test]
    fn test_validation_errors_name_the_item() {
        let items = vec![
            LineItem::new("Fine", dec!(1), usd(dec!(10))),
            LineItem::new("Broken", dec!(1), usd(dec!(10))).with_vat(dec!(-5)),
        ];
        let err = compute_totals(&items, Currency::USD).unwrap_err();
        assert!(err.to_string().contains("items[1].vat"));
    }

    #[test]
    fn test_vat_structured_and_flat_shapes_compute_identically() {
        let flat: LineItem = serde_json::from_str(
            r#"{"particulars":"X","quantity":"1","unit_price":{"amount":"100","currency":"USD"},"vat":"18"}"#,
        )
        .unwrap();
        let structured: LineItem = serde_json::from_str(
            r#"{"particulars":"X","quantity":"1","unit_price":{"amount":"100","currency":"USD"},"vat":{"rate":"18"}}"#,
        )
        .unwrap();

        assert_eq!(flat.vat, VatRate::percentage(dec!(18)));
        assert_eq!(flat.breakdown(), structured.breakdown());
    }
}

// ============================================================================
// Status Derivation Tests
// ============================================================================

mod status_tests {
    use super::*;

    fn due() -> NaiveDate {
        d(2024, 12, 31)
    }

    fn today() -> NaiveDate {
        d(2024, 6, 1)
    }

    #[test]
    fn test_full_payment_settles_the_bill() {
        let status = derive_status(usd(dec!(500)), usd(dec!(500)), due(), today());
        assert_eq!(status, BillingStatus::Paid);
    }

    #[test]
    fn test_partial_then_over_payment() {
        // grand 300: 100 paid -> partial; cumulative 350 -> overpaid
        assert_eq!(
            derive_status(usd(dec!(300)), usd(dec!(100)), due(), today()),
            BillingStatus::PartiallyPaid
        );
        assert_eq!(
            derive_status(usd(dec!(300)), usd(dec!(350)), due(), today()),
            BillingStatus::OverPaid
        );
    }

    #[test]
    fn test_overdue_only_for_unsettled_bills() {
        let due = d(2024, 1, 31);
        let today = d(2024, 2, 15);

        assert_eq!(
            derive_status(usd(dec!(100)), usd(dec!(0)), due, today),
            BillingStatus::Overdue
        );
        assert_eq!(
            derive_status(usd(dec!(100)), usd(dec!(40)), due, today),
            BillingStatus::Overdue
        );
        assert_eq!(
            derive_status(usd(dec!(100)), usd(dec!(100)), due, today),
            BillingStatus::Paid
        );
    }

    #[test]
    fn test_fractional_settlement_boundary() {
        // One cent short is still partial
        assert_eq!(
            derive_status(usd(dec!(100.00)), usd(dec!(99.99)), due(), today()),
            BillingStatus::PartiallyPaid
        );
        // One cent over flips to overpaid
        assert_eq!(
            derive_status(usd(dec!(100.00)), usd(dec!(100.01)), due(), today()),
            BillingStatus::OverPaid
        );
    }

    #[test]
    fn test_status_serde_shape() {
        assert_eq!(
            serde_json::to_string(&BillingStatus::PartiallyPaid).unwrap(),
            "\"partially_paid\""
        );
        assert_eq!(
            serde_json::to_string(&BillingStatus::OverPaid).unwrap(),
            "\"over_paid\""
        );
    }

    #[test]
    fn test_billing_type_serde_shape() {
        assert_eq!(
            serde_json::to_string(&BillingType::TimeBased).unwrap(),
            "\"time_based\""
        );
    }
}

// ============================================================================
// Sequence Tests
// ============================================================================

mod sequence_tests {
    use super::*;

    #[test]
    fn test_prefixes_match_record_families() {
        assert_eq!(BILLING_SEQUENCE.prefix, "BILL-");
        assert_eq!(CASE_SEQUENCE.prefix, "CAS-");
        assert_eq!(CLIENT_SEQUENCE.prefix, "");
    }

    #[test]
    fn test_sequential_rendering_is_gapless() {
        let numbers: Vec<String> = (1..=25).map(|n| BILLING_SEQUENCE.render(n)).collect();
        assert_eq!(numbers[0], "BILL-000001");
        assert_eq!(numbers[24], "BILL-000025");

        let unique: std::collections::HashSet<_> = numbers.iter().collect();
        assert_eq!(unique.len(), numbers.len());
    }

    #[test]
    fn test_scan_seed_matches_legacy_behavior() {
        // The legacy path: scan all values, take max suffix, add one
        let existing = vec!["BILL-000007", "BILL-000019", "BILL-000002"];
        let next = highest_numeric_suffix(existing.iter().copied()) + 1;
        assert_eq!(BILLING_SEQUENCE.render(next), "BILL-000020");
    }

    #[test]
    fn test_client_numbers_are_bare_digits() {
        assert_eq!(CLIENT_SEQUENCE.render(42), "000042");
        assert_eq!(numeric_suffix("000042"), 42);
    }
}
