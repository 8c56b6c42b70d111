//! Billing Domain - Billing Records and Payment Reconciliation
//!
//! This crate implements the billing engine for the practice management
//! system: line-item totals, billing records with sequential bill numbers,
//! a payment ledger, and the derived payment status of every bill.
//!
//! # Core rules
//!
//! - Line-item amounts are always recomputed server-side; client-supplied
//!   amounts are never trusted.
//! - A billing's status is a pure function of its grand total, the sum of
//!   its active payments, and its due date.
//! - Time-based billings carry line items derived from external time
//!   tracking; those items cannot be hand-edited.
//! - Financial records are soft-deleted, never physically removed.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_billing::{BillingService, CreateBillingRequest, LineItem};
//!
//! let service = BillingService::new(billings, payments, directory, sequences);
//! let bill = service.create_billing(request, actor).await?;
//! ```

pub mod line_item;
pub mod billing;
pub mod payment;
pub mod sequence;
pub mod ports;
pub mod service;
pub mod adapters;
pub mod error;

pub use line_item::{LineItem, LineItemBreakdown, BillingTotals, VatRate, compute_totals};
pub use billing::{BillingRecord, BillingType, BillingStatus, derive_status};
pub use payment::{Payment, PaymentMethod};
pub use sequence::{SequenceKey, BILLING_SEQUENCE, CASE_SEQUENCE, CLIENT_SEQUENCE};
pub use ports::{
    BillingStore, PaymentStore, SequenceStore, CaseDirectory,
    CreateBillingRequest, UpdateBillingPatch, CreatePaymentRequest, PaymentPatch,
    BillingQuery, PageRequest, Page, BillingSummary, CaseRef,
};
pub use service::{BillingService, PaymentService};
pub use error::BillingError;
