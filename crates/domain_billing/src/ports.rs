//! Billing Domain Ports
//!
//! This module defines the port interfaces the billing domain needs from
//! its surroundings: the billing and payment stores, the atomic sequence
//! counter, and the read-only case directory. Adapters provide either the
//! internal database implementation (`infra_db`) or the in-memory mock
//! ([`crate::adapters::memory`]).
//!
//! Application services receive the port traits:
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use domain_billing::{BillingService, BillingStore};
//!
//! let service = BillingService::new(billings, payments, directory, sequences);
//! let bill = service.create_billing(request, actor).await?;
//! ```

use async_trait::async_trait;
use chrono::NaiveDate;

use core_kernel::{
    BillingId, CaseId, ClientId, Currency, DomainPort, Money, OperationMetadata, PaymentId,
    PortError,
};

use crate::billing::{BillingRecord, BillingStatus, BillingType};
use crate::line_item::LineItem;
use crate::payment::{Payment, PaymentMethod};

/// A case as seen by the billing domain: enough to validate existence and
/// resolve the client being billed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseRef {
    /// Case identifier
    pub id: CaseId,
    /// Client the case belongs to
    pub client_id: ClientId,
    /// Human-readable case number
    pub case_number: String,
}

/// Request for creating a billing record
#[derive(Debug, Clone)]
pub struct CreateBillingRequest {
    /// Bill title
    pub title: String,
    /// Case being billed
    pub case_id: CaseId,
    /// Client; resolved from the case when omitted
    pub client_id: Option<ClientId>,
    /// Billing classification
    pub billing_type: BillingType,
    /// Bill currency
    pub currency: Currency,
    /// Start of the covered window
    pub billing_start: NaiveDate,
    /// End of the covered window; required for time-based billings
    pub billing_end: Option<NaiveDate>,
    /// Payment due date
    pub due_date: NaiveDate,
    /// Caller-supplied bill number; generated when omitted
    pub bill_number: Option<String>,
    /// Line items; amounts are recomputed server-side
    pub items: Vec<LineItem>,
}

/// Patch for updating a billing record
///
/// Absent fields are left unchanged. An items patch on a time-based
/// billing is a forbidden operation.
#[derive(Debug, Clone, Default)]
pub struct UpdateBillingPatch {
    /// New title
    pub title: Option<String>,
    /// New window start
    pub billing_start: Option<NaiveDate>,
    /// New window end
    pub billing_end: Option<NaiveDate>,
    /// New due date
    pub due_date: Option<NaiveDate>,
    /// Replacement line items; totals are recomputed
    pub items: Option<Vec<LineItem>>,
}

/// Request for recording a payment
#[derive(Debug, Clone)]
pub struct CreatePaymentRequest {
    /// Billing record being paid
    pub billing_id: BillingId,
    /// Amount received; strictly positive
    pub amount: Money,
    /// Date received
    pub date: NaiveDate,
    /// Payment method
    pub method: PaymentMethod,
    /// External transaction reference
    pub transaction_id: Option<String>,
    /// Receipt reference
    pub receipt: Option<String>,
    /// Free-text note
    pub note: Option<String>,
}

/// Patch for updating a payment
///
/// The billing reference is immutable and deliberately absent here.
#[derive(Debug, Clone, Default)]
pub struct PaymentPatch {
    /// New amount; strictly positive
    pub amount: Option<Money>,
    /// New payment date
    pub date: Option<NaiveDate>,
    /// New method
    pub method: Option<PaymentMethod>,
    /// New transaction reference
    pub transaction_id: Option<String>,
    /// New receipt reference
    pub receipt: Option<String>,
    /// New note
    pub note: Option<String>,
}

/// Query parameters for listing billings
#[derive(Debug, Clone, Default)]
pub struct BillingQuery {
    /// Filter by case
    pub case_id: Option<CaseId>,
    /// Filter by client
    pub client_id: Option<ClientId>,
    /// Free-text match over bill number and title (case-insensitive)
    pub search: Option<String>,
    /// Include soft-deleted records
    pub include_inactive: bool,
}

impl BillingQuery {
    /// Creates a query filtered to one case
    pub fn by_case(case_id: CaseId) -> Self {
        Self {
            case_id: Some(case_id),
            ..Default::default()
        }
    }

    /// Creates a query filtered to one client
    pub fn by_client(client_id: ClientId) -> Self {
        Self {
            client_id: Some(client_id),
            ..Default::default()
        }
    }

    /// Adds a free-text search term
    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }
}

/// Pagination parameters (page numbers start at 1)
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit,
        }
    }

    /// Offset of the first row on this page
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, limit: 20 }
    }
}

/// One page of results
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    /// Total matching rows across all pages
    pub total: u64,
}

impl<T> Page<T> {
    /// Maps the page items, keeping the pagination envelope
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            limit: self.limit,
            total: self.total,
        }
    }
}

/// A billing record enriched with its payment position
#[derive(Debug, Clone)]
pub struct BillingSummary {
    pub record: BillingRecord,
    /// Cumulative active payments
    pub total_paid: Money,
    /// grand_total - total_paid
    pub due_amount: Money,
}

/// Persistence port for billing records
///
/// Implementations must enforce uniqueness of `bill_number` and surface a
/// violation as [`PortError::Conflict`].
#[async_trait]
pub trait BillingStore: DomainPort {
    /// Persists a new billing record
    async fn insert_billing(
        &self,
        record: &BillingRecord,
        metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError>;

    /// Retrieves a billing record by ID (active or not)
    async fn get_billing(
        &self,
        id: BillingId,
        metadata: Option<OperationMetadata>,
    ) -> Result<BillingRecord, PortError>;

    /// Looks up a billing record by bill number
    async fn find_by_bill_number(
        &self,
        bill_number: &str,
        metadata: Option<OperationMetadata>,
    ) -> Result<Option<BillingRecord>, PortError>;

    /// Overwrites a billing record
    async fn update_billing(
        &self,
        record: &BillingRecord,
        metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError>;

    /// Writes the cached payment aggregate and derived status
    async fn set_payment_state(
        &self,
        id: BillingId,
        paid_to_date: Money,
        status: BillingStatus,
        metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError>;

    /// Soft-deletes a billing record
    async fn deactivate_billing(
        &self,
        id: BillingId,
        metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError>;

    /// Lists billing records matching the query, newest first
    async fn list_billings(
        &self,
        query: &BillingQuery,
        page: PageRequest,
        metadata: Option<OperationMetadata>,
    ) -> Result<Page<BillingRecord>, PortError>;
}

/// Persistence port for the payment ledger
///
/// Mutating operations return the post-mutation cumulative total of
/// active payments for the affected billing, computed atomically with the
/// mutation, so the caller's status recompute never reads a total stale
/// relative to its own write.
#[async_trait]
pub trait PaymentStore: DomainPort {
    /// Persists a payment; returns the new cumulative total
    async fn insert_payment(
        &self,
        payment: &Payment,
        metadata: Option<OperationMetadata>,
    ) -> Result<Money, PortError>;

    /// Retrieves a payment by ID
    async fn get_payment(
        &self,
        id: PaymentId,
        metadata: Option<OperationMetadata>,
    ) -> Result<Payment, PortError>;

    /// Overwrites a payment; returns the new cumulative total
    async fn update_payment(
        &self,
        payment: &Payment,
        metadata: Option<OperationMetadata>,
    ) -> Result<Money, PortError>;

    /// Voids a payment; returns the parent billing and new cumulative total
    async fn void_payment(
        &self,
        id: PaymentId,
        metadata: Option<OperationMetadata>,
    ) -> Result<(BillingId, Money), PortError>;

    /// Voids every active payment of a billing; returns how many
    async fn void_payments_for_billing(
        &self,
        billing_id: BillingId,
        metadata: Option<OperationMetadata>,
    ) -> Result<u64, PortError>;

    /// Lists active payments of a billing in payment-date order
    async fn list_payments_for_billing(
        &self,
        billing_id: BillingId,
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<Payment>, PortError>;

    /// Sums active payments of a billing in the billing's currency
    async fn sum_payments(
        &self,
        billing_id: BillingId,
        metadata: Option<OperationMetadata>,
    ) -> Result<Money, PortError>;
}

/// Atomic counter port for sequence numbers
#[async_trait]
pub trait SequenceStore: DomainPort {
    /// Atomically reserves and returns the next value of a sequence
    ///
    /// The first reservation of a fresh sequence returns 1.
    async fn next_value(
        &self,
        sequence: &str,
        metadata: Option<OperationMetadata>,
    ) -> Result<u64, PortError>;
}

/// Read-only lookup into the case/client directory
#[async_trait]
pub trait CaseDirectory: DomainPort {
    /// Finds a case by ID; `None` when it does not exist
    async fn find_case(
        &self,
        id: CaseId,
        metadata: Option<OperationMetadata>,
    ) -> Result<Option<CaseRef>, PortError>;
}
