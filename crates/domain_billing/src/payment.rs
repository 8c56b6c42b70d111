//! Payment records
//!
//! A payment is money received against exactly one billing record. The
//! billing reference is immutable for the life of the payment; removing a
//! payment voids it (soft delete) so the financial trail survives.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{BillingId, Money, PaymentId, UserId};

/// How a payment was received
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Cheque,
    CreditCard,
    Other,
}

/// A record of money received against a billing record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    /// Unique identifier
    pub id: PaymentId,
    /// Billing record being paid; immutable
    pub billing_id: BillingId,
    /// Amount received; strictly positive
    pub amount: Money,
    /// Date the payment was received
    pub date: NaiveDate,
    /// Payment method
    pub method: PaymentMethod,
    /// Actor who recorded the payment
    pub received_by: UserId,
    /// External transaction reference
    pub transaction_id: Option<String>,
    /// Receipt reference
    pub receipt: Option<String>,
    /// Free-text note
    pub note: Option<String>,
    /// Soft-delete flag; voided payments stop counting toward the billing
    pub is_active: bool,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Creates a new payment record
    pub fn new(
        billing_id: BillingId,
        amount: Money,
        date: NaiveDate,
        method: PaymentMethod,
        received_by: UserId,
    ) -> Self {
        Self {
            id: PaymentId::new_v7(),
            billing_id,
            amount,
            date,
            method,
            received_by,
            transaction_id: None,
            receipt: None,
            note: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    /// Sets the external transaction reference
    pub fn with_transaction_id(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }

    /// Sets the receipt reference
    pub fn with_receipt(mut self, receipt: impl Into<String>) -> Self {
        self.receipt = Some(receipt.into());
        self
    }

    /// Sets a note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Voids the payment
    pub fn void(&mut self) {
        self.is_active = false;
    }
}
