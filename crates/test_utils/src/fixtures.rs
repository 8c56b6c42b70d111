//! Test Fixtures
//!
//! Pre-built test data for common entities. Fixtures are deterministic
//! where determinism matters (dates, amounts) and random where identity
//! uniqueness matters (IDs).

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use core_kernel::{CaseId, ClientId, Currency, Money, UserId};
use domain_billing::CaseRef;

/// Common monetary fixtures
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// A typical retainer fee
    pub fn retainer() -> Money {
        Money::new(dec!(500.00), Currency::USD)
    }

    /// A typical hourly rate
    pub fn hourly_rate() -> Money {
        Money::new(dec!(250.00), Currency::USD)
    }

    /// Zero dollars
    pub fn zero() -> Money {
        Money::zero(Currency::USD)
    }

    /// An amount in a non-default currency
    pub fn eur_fee() -> Money {
        Money::new(dec!(400.00), Currency::EUR)
    }
}

/// Common date fixtures
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// Start of the billed window
    pub fn billing_start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    /// End of the billed window
    pub fn billing_end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    /// Payment due date
    pub fn due_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 31).unwrap()
    }

    /// A reference "today" before the due date
    pub fn before_due() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
    }

    /// A reference "today" after the due date
    pub fn after_due() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 8, 15).unwrap()
    }
}

/// Common string fixtures
pub struct StringFixtures;

impl StringFixtures {
    pub fn bill_number() -> &'static str {
        "BILL-000042"
    }

    pub fn case_number() -> &'static str {
        "CAS-000007"
    }

    pub fn title() -> &'static str {
        "June retainer"
    }
}

/// Identifier fixtures
pub struct IdFixtures;

impl IdFixtures {
    pub fn case_id() -> CaseId {
        CaseId::new_v7()
    }

    pub fn client_id() -> ClientId {
        ClientId::new_v7()
    }

    pub fn user_id() -> UserId {
        UserId::new_v7()
    }

    /// A seeded case directory entry
    pub fn case_ref() -> CaseRef {
        CaseRef {
            id: Self::case_id(),
            client_id: Self::client_id(),
            case_number: StringFixtures::case_number().to_string(),
        }
    }
}
