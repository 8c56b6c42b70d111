//! Billing records and payment status derivation
//!
//! A billing record is an invoice-like document: a set of line items with
//! computed totals, owed by a client for a case. Its payment status is
//! never set by hand; it is derived from the grand total, the cumulative
//! payments received, and the due date.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{BillingId, BillingPeriod, CaseId, ClientId, Currency, Money, UserId};

use crate::line_item::{BillingTotals, LineItem};

/// Classification governing whether line items are user-editable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingType {
    /// Single fixed bill
    OneTime,
    /// Billed per agreed milestone
    Milestone,
    /// Items derived from time-tracking entries
    TimeBased,
    /// Billed per completed task
    TaskBased,
}

impl BillingType {
    /// Returns true when line items may be hand-edited
    ///
    /// Time-based items come from the time-tracking system and are
    /// replaced wholesale when entries change, never edited on the bill.
    pub fn items_editable(&self) -> bool {
        !matches!(self, BillingType::TimeBased)
    }
}

/// Derived payment status of a billing record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingStatus {
    /// No payments recorded
    Unpaid,
    /// Payments cover part of the grand total
    PartiallyPaid,
    /// Payments exactly cover the grand total
    Paid,
    /// Payments exceed the grand total
    OverPaid,
    /// Past due and not settled
    Overdue,
}

/// Derives the payment status from the grand total, cumulative payments,
/// and due date
///
/// The standing is decided by comparing totals; an unsettled bill past
/// its due date reports as overdue. `today` is threaded explicitly so the
/// rule stays pure.
pub fn derive_status(
    grand_total: Money,
    total_paid: Money,
    due_date: NaiveDate,
    today: NaiveDate,
) -> BillingStatus {
    let standing = if total_paid.is_zero() {
        BillingStatus::Unpaid
    } else if total_paid == grand_total {
        BillingStatus::Paid
    } else if total_paid > grand_total {
        BillingStatus::OverPaid
    } else {
        BillingStatus::PartiallyPaid
    };

    if due_date < today
        && matches!(standing, BillingStatus::Unpaid | BillingStatus::PartiallyPaid)
    {
        BillingStatus::Overdue
    } else {
        standing
    }
}

/// An invoice-like document owed by a client for a case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingRecord {
    /// Unique identifier
    pub id: BillingId,
    /// Human-readable bill number (unique, sequence-assigned)
    pub bill_number: String,
    /// Case this bill belongs to
    pub case_id: CaseId,
    /// Client being billed; resolved from the case when not supplied
    pub client_id: ClientId,
    /// Bill title
    pub title: String,
    /// Billing classification
    pub billing_type: BillingType,
    /// Bill currency
    pub currency: Currency,
    /// Date window the bill covers
    pub period: BillingPeriod,
    /// Payment due date
    pub due_date: NaiveDate,
    /// Line items, in display order
    pub items: Vec<LineItem>,
    /// Derived aggregates over the items
    pub totals: BillingTotals,
    /// Cached sum of active payments, maintained by status recompute
    pub paid_to_date: Money,
    /// Derived payment status
    pub status: BillingStatus,
    /// Actor who created the bill
    pub created_by: UserId,
    /// Soft-delete flag; financial records are never physically removed
    pub is_active: bool,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl BillingRecord {
    /// Returns the outstanding amount (may be negative when overpaid)
    pub fn due_amount(&self) -> Money {
        self.totals.grand_total - self.paid_to_date
    }

    /// Returns true when the bill is fully covered or overpaid
    pub fn is_settled(&self) -> bool {
        matches!(self.status, BillingStatus::Paid | BillingStatus::OverPaid)
    }

    /// Returns true when line items may be hand-edited
    pub fn items_editable(&self) -> bool {
        self.billing_type.items_editable()
    }

    /// Refreshes the cached payment aggregate and derived status
    pub fn apply_payment_state(&mut self, total_paid: Money, today: NaiveDate) {
        self.paid_to_date = total_paid;
        self.status = derive_status(self.totals.grand_total, total_paid, self.due_date, today);
        self.updated_at = Utc::now();
    }
}
