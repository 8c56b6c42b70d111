//! Test Data Builders
//!
//! Builder patterns for constructing test data with sensible defaults.
//! Tests specify only the fields they care about.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{BillingId, BillingPeriod, CaseId, ClientId, Currency, Money, UserId};
use domain_billing::{
    compute_totals, derive_status, BillingRecord, BillingType, LineItem, Payment, PaymentMethod,
};

use crate::fixtures::{IdFixtures, StringFixtures, TemporalFixtures};

/// Builder for billing records
pub struct BillingRecordBuilder {
    bill_number: String,
    case_id: CaseId,
    client_id: ClientId,
    title: String,
    billing_type: BillingType,
    currency: Currency,
    period_start: NaiveDate,
    period_end: Option<NaiveDate>,
    due_date: NaiveDate,
    items: Vec<LineItem>,
    paid_to_date: Money,
    created_by: UserId,
    is_active: bool,
    today: NaiveDate,
}

impl Default for BillingRecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BillingRecordBuilder {
    /// Creates a builder with default values: a one-time USD billing over
    /// June 2024, one 500.00 line item, nothing paid
    pub fn new() -> Self {
        Self {
            bill_number: StringFixtures::bill_number().to_string(),
            case_id: IdFixtures::case_id(),
            client_id: IdFixtures::client_id(),
            title: StringFixtures::title().to_string(),
            billing_type: BillingType::OneTime,
            currency: Currency::USD,
            period_start: TemporalFixtures::billing_start(),
            period_end: Some(TemporalFixtures::billing_end()),
            due_date: TemporalFixtures::due_date(),
            items: vec![LineItem::new(
                "Legal services",
                dec!(1),
                Money::new(dec!(500.00), Currency::USD),
            )],
            paid_to_date: Money::zero(Currency::USD),
            created_by: IdFixtures::user_id(),
            is_active: true,
            today: TemporalFixtures::before_due(),
        }
    }

    pub fn with_bill_number(mut self, number: impl Into<String>) -> Self {
        self.bill_number = number.into();
        self
    }

    pub fn with_case_id(mut self, case_id: CaseId) -> Self {
        self.case_id = case_id;
        self
    }

    pub fn with_client_id(mut self, client_id: ClientId) -> Self {
        self.client_id = client_id;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_billing_type(mut self, billing_type: BillingType) -> Self {
        self.billing_type = billing_type;
        self
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn with_period(mut self, start: NaiveDate, end: Option<NaiveDate>) -> Self {
        self.period_start = start;
        self.period_end = end;
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = due_date;
        self
    }

    pub fn with_items(mut self, items: Vec<LineItem>) -> Self {
        self.items = items;
        self
    }

    pub fn with_no_items(mut self) -> Self {
        self.items = Vec::new();
        self
    }

    pub fn with_paid_to_date(mut self, paid: Money) -> Self {
        self.paid_to_date = paid;
        self
    }

    pub fn with_created_by(mut self, user: UserId) -> Self {
        self.created_by = user;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Sets the reference date used to derive the status
    pub fn as_of(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Builds the record, deriving totals and status the way the billing
    /// engine would
    pub fn build(self) -> BillingRecord {
        let totals =
            compute_totals(&self.items, self.currency).expect("builder items must be valid");
        let status = derive_status(
            totals.grand_total,
            self.paid_to_date,
            self.due_date,
            self.today,
        );
        let now = Utc::now();

        BillingRecord {
            id: BillingId::new_v7(),
            bill_number: self.bill_number,
            case_id: self.case_id,
            client_id: self.client_id,
            title: self.title,
            billing_type: self.billing_type,
            currency: self.currency,
            period: BillingPeriod {
                start: self.period_start,
                end: self.period_end,
            },
            due_date: self.due_date,
            items: self.items,
            totals,
            paid_to_date: self.paid_to_date,
            status,
            created_by: self.created_by,
            is_active: self.is_active,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Builder for payments
pub struct PaymentBuilder {
    billing_id: BillingId,
    amount: Money,
    date: NaiveDate,
    method: PaymentMethod,
    received_by: UserId,
    transaction_id: Option<String>,
    note: Option<String>,
}

impl PaymentBuilder {
    /// Creates a builder paying 100.00 USD by bank transfer
    pub fn for_billing(billing_id: BillingId) -> Self {
        Self {
            billing_id,
            amount: Money::new(dec!(100.00), Currency::USD),
            date: TemporalFixtures::before_due(),
            method: PaymentMethod::BankTransfer,
            received_by: IdFixtures::user_id(),
            transaction_id: None,
            note: None,
        }
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_amount_usd(mut self, amount: Decimal) -> Self {
        self.amount = Money::new(amount, Currency::USD);
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    pub fn with_method(mut self, method: PaymentMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_received_by(mut self, user: UserId) -> Self {
        self.received_by = user;
        self
    }

    pub fn with_transaction_id(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn build(self) -> Payment {
        let mut payment = Payment::new(
            self.billing_id,
            self.amount,
            self.date,
            self.method,
            self.received_by,
        );
        payment.transaction_id = self.transaction_id;
        payment.note = self.note;
        payment
    }
}
