//! Billing and payment application services
//!
//! The services orchestrate the domain operations over the port traits:
//! billing creation/update/deletion with derived totals, the payment
//! ledger, and the status recompute that keeps the cached payment
//! aggregate honest. Every mutating operation takes the authenticated
//! actor explicitly; there is no ambient request context.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use core_kernel::{BillingId, BillingPeriod, Money, OperationMetadata, PaymentId, UserId};

use crate::billing::{derive_status, BillingRecord, BillingStatus, BillingType};
use crate::error::BillingError;
use crate::line_item::compute_totals;
use crate::payment::Payment;
use crate::ports::{
    BillingQuery, BillingStore, BillingSummary, CaseDirectory, CreateBillingRequest,
    CreatePaymentRequest, Page, PageRequest, PaymentPatch, PaymentStore, SequenceStore,
    UpdateBillingPatch,
};
use crate::sequence::BILLING_SEQUENCE;

/// Writes the cached payment aggregate and the status derived from it.
///
/// This is the single code path that refreshes `paid_to_date` and
/// `status` after ledger activity; every payment mutation funnels here.
async fn refresh_payment_state(
    billings: &Arc<dyn BillingStore>,
    billing: &BillingRecord,
    total_paid: Money,
    metadata: Option<OperationMetadata>,
) -> Result<BillingStatus, BillingError> {
    let today = Utc::now().date_naive();
    let status = derive_status(billing.totals.grand_total, total_paid, billing.due_date, today);
    billings
        .set_payment_state(billing.id, total_paid, status, metadata)
        .await?;
    Ok(status)
}

fn require_title(title: &str) -> Result<String, BillingError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(BillingError::validation("title", "is required"));
    }
    Ok(trimmed.to_string())
}

fn actor_metadata(actor: UserId) -> Option<OperationMetadata> {
    Some(OperationMetadata::initiated_by(actor.to_string()))
}

/// Service for managing billing records
#[derive(Clone)]
pub struct BillingService {
    billings: Arc<dyn BillingStore>,
    payments: Arc<dyn PaymentStore>,
    directory: Arc<dyn CaseDirectory>,
    sequences: Arc<dyn SequenceStore>,
}

impl BillingService {
    /// Creates a new billing service over the given ports
    pub fn new(
        billings: Arc<dyn BillingStore>,
        payments: Arc<dyn PaymentStore>,
        directory: Arc<dyn CaseDirectory>,
        sequences: Arc<dyn SequenceStore>,
    ) -> Self {
        Self {
            billings,
            payments,
            directory,
            sequences,
        }
    }

    /// Creates a billing record
    ///
    /// Validates the required fields, resolves the case (and through it
    /// the client, when not supplied), resolves the bill number, computes
    /// the totals, and persists the record with status seeded to unpaid.
    ///
    /// A caller-supplied bill number that collides is a terminal
    /// conflict. A collision on a *generated* number means another writer
    /// won the same reservation window; the number is regenerated and the
    /// insert retried exactly once.
    #[instrument(skip(self, input, actor), fields(case_id = %input.case_id))]
    pub async fn create_billing(
        &self,
        input: CreateBillingRequest,
        actor: UserId,
    ) -> Result<BillingRecord, BillingError> {
        let metadata = actor_metadata(actor);

        let title = require_title(&input.title)?;
        if input.billing_type == BillingType::TimeBased && input.billing_end.is_none() {
            return Err(BillingError::validation(
                "billing_end",
                "is required for time-based billings",
            ));
        }
        let period = BillingPeriod::new(input.billing_start, input.billing_end)?;
        let totals = compute_totals(&input.items, input.currency)?;

        let case = self
            .directory
            .find_case(input.case_id, metadata.clone())
            .await?
            .ok_or_else(|| BillingError::not_found("Case", input.case_id))?;
        let client_id = input.client_id.unwrap_or(case.client_id);

        let (bill_number, generated) = match input.bill_number {
            Some(number) => {
                if self
                    .billings
                    .find_by_bill_number(&number, metadata.clone())
                    .await?
                    .is_some()
                {
                    return Err(BillingError::Conflict(format!(
                        "bill number {number} already exists"
                    )));
                }
                (number, false)
            }
            None => (self.next_bill_number(metadata.clone()).await?, true),
        };

        let now = Utc::now();
        let mut record = BillingRecord {
            id: BillingId::new_v7(),
            bill_number,
            case_id: case.id,
            client_id,
            title,
            billing_type: input.billing_type,
            currency: input.currency,
            period,
            due_date: input.due_date,
            items: input.items,
            totals,
            paid_to_date: Money::zero(input.currency),
            status: BillingStatus::Unpaid,
            created_by: actor,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        match self.billings.insert_billing(&record, metadata.clone()).await {
            Ok(()) => Ok(record),
            Err(err) if err.is_conflict() && generated => {
                // Lost the reservation race; one fresh number, one retry
                record.bill_number = self.next_bill_number(metadata.clone()).await?;
                self.billings.insert_billing(&record, metadata).await?;
                Ok(record)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Updates a billing record
    ///
    /// An items patch on a time-based billing is forbidden and mutates
    /// nothing. New items mean new totals, and the status is re-derived
    /// against the existing payment sum, so changing a bill's total can
    /// flip it between paid, partially paid, and overpaid without any new
    /// payment activity.
    #[instrument(skip(self, patch, _actor), fields(billing_id = %id))]
    pub async fn update_billing(
        &self,
        id: BillingId,
        patch: UpdateBillingPatch,
        _actor: UserId,
    ) -> Result<BillingRecord, BillingError> {
        let mut record = self.billings.get_billing(id, None).await?;
        if !record.is_active {
            return Err(BillingError::not_found("Billing", id));
        }
        if patch.items.is_some() && !record.items_editable() {
            return Err(BillingError::forbidden(
                "line items of a time-based billing are derived from time tracking and cannot be edited",
            ));
        }

        if let Some(title) = patch.title {
            record.title = require_title(&title)?;
        }
        if patch.billing_start.is_some() || patch.billing_end.is_some() {
            let start = patch.billing_start.unwrap_or(record.period.start);
            let end = patch.billing_end.or(record.period.end);
            record.period = BillingPeriod::new(start, end)?;
        }
        if let Some(due_date) = patch.due_date {
            record.due_date = due_date;
        }
        if let Some(items) = patch.items {
            record.totals = compute_totals(&items, record.currency)?;
            record.items = items;
        }

        let total_paid = self.payments.sum_payments(id, None).await?;
        record.apply_payment_state(total_paid, Utc::now().date_naive());

        self.billings.update_billing(&record, None).await?;
        Ok(record)
    }

    /// Soft-deletes a billing record and voids its payments
    #[instrument(skip(self, actor), fields(billing_id = %id))]
    pub async fn delete_billing(&self, id: BillingId, actor: UserId) -> Result<(), BillingError> {
        let metadata = actor_metadata(actor);

        let record = self.billings.get_billing(id, metadata.clone()).await?;
        if !record.is_active {
            return Err(BillingError::not_found("Billing", id));
        }

        self.billings.deactivate_billing(id, metadata.clone()).await?;
        self.payments
            .void_payments_for_billing(id, metadata)
            .await?;
        Ok(())
    }

    /// Retrieves a billing record with its payment position
    pub async fn get_billing(&self, id: BillingId) -> Result<BillingSummary, BillingError> {
        let record = self.billings.get_billing(id, None).await?;
        if !record.is_active {
            return Err(BillingError::not_found("Billing", id));
        }
        Ok(summarize(record))
    }

    /// Lists billing records with their payment positions
    pub async fn list_billings(
        &self,
        query: BillingQuery,
        page: PageRequest,
    ) -> Result<Page<BillingSummary>, BillingError> {
        let records = self.billings.list_billings(&query, page, None).await?;
        Ok(records.map(summarize))
    }

    async fn next_bill_number(
        &self,
        metadata: Option<OperationMetadata>,
    ) -> Result<String, BillingError> {
        let value = self
            .sequences
            .next_value(BILLING_SEQUENCE.name, metadata)
            .await?;
        Ok(BILLING_SEQUENCE.render(value))
    }
}

fn summarize(record: BillingRecord) -> BillingSummary {
    let total_paid = record.paid_to_date;
    let due_amount = record.due_amount();
    BillingSummary {
        record,
        total_paid,
        due_amount,
    }
}

/// Service for the payment ledger
#[derive(Clone)]
pub struct PaymentService {
    billings: Arc<dyn BillingStore>,
    payments: Arc<dyn PaymentStore>,
}

impl PaymentService {
    /// Creates a new payment service over the given ports
    pub fn new(billings: Arc<dyn BillingStore>, payments: Arc<dyn PaymentStore>) -> Self {
        Self { billings, payments }
    }

    /// Records a payment against a billing record
    ///
    /// The parent billing's cached aggregate and status are refreshed
    /// from the sum of ALL its active payments, not just the new one.
    #[instrument(skip(self, input, actor), fields(billing_id = %input.billing_id))]
    pub async fn create_payment(
        &self,
        input: CreatePaymentRequest,
        actor: UserId,
    ) -> Result<Payment, BillingError> {
        let metadata = actor_metadata(actor);

        if !input.amount.is_positive() {
            return Err(BillingError::validation("amount", "must be positive"));
        }

        let billing = self
            .billings
            .get_billing(input.billing_id, metadata.clone())
            .await?;
        if !billing.is_active {
            return Err(BillingError::not_found("Billing", input.billing_id));
        }
        if input.amount.currency() != billing.currency {
            return Err(BillingError::validation(
                "amount",
                format!(
                    "currency {} does not match billing currency {}",
                    input.amount.currency(),
                    billing.currency
                ),
            ));
        }

        let mut payment = Payment::new(
            input.billing_id,
            input.amount,
            input.date,
            input.method,
            actor,
        );
        payment.transaction_id = input.transaction_id;
        payment.receipt = input.receipt;
        payment.note = input.note;

        let total_paid = self
            .payments
            .insert_payment(&payment, metadata.clone())
            .await?;
        refresh_payment_state(&self.billings, &billing, total_paid, metadata).await?;

        Ok(payment)
    }

    /// Updates a payment and refreshes the parent billing's status
    #[instrument(skip(self, patch, actor), fields(payment_id = %id))]
    pub async fn update_payment(
        &self,
        id: PaymentId,
        patch: PaymentPatch,
        actor: UserId,
    ) -> Result<Payment, BillingError> {
        let metadata = actor_metadata(actor);

        let mut payment = self.payments.get_payment(id, metadata.clone()).await?;
        if !payment.is_active {
            return Err(BillingError::not_found("Payment", id));
        }

        let billing = self
            .billings
            .get_billing(payment.billing_id, metadata.clone())
            .await?;

        if let Some(amount) = patch.amount {
            if !amount.is_positive() {
                return Err(BillingError::validation("amount", "must be positive"));
            }
            if amount.currency() != billing.currency {
                return Err(BillingError::validation(
                    "amount",
                    format!(
                        "currency {} does not match billing currency {}",
                        amount.currency(),
                        billing.currency
                    ),
                ));
            }
            payment.amount = amount;
        }
        if let Some(date) = patch.date {
            payment.date = date;
        }
        if let Some(method) = patch.method {
            payment.method = method;
        }
        if patch.transaction_id.is_some() {
            payment.transaction_id = patch.transaction_id;
        }
        if patch.receipt.is_some() {
            payment.receipt = patch.receipt;
        }
        if patch.note.is_some() {
            payment.note = patch.note;
        }

        let total_paid = self
            .payments
            .update_payment(&payment, metadata.clone())
            .await?;
        refresh_payment_state(&self.billings, &billing, total_paid, metadata).await?;

        Ok(payment)
    }

    /// Voids a payment and refreshes the parent billing's status
    #[instrument(skip(self, actor), fields(payment_id = %id))]
    pub async fn delete_payment(
        &self,
        id: PaymentId,
        actor: UserId,
    ) -> Result<(), BillingError> {
        let metadata = actor_metadata(actor);

        let (billing_id, total_paid) = self.payments.void_payment(id, metadata.clone()).await?;
        let billing = self.billings.get_billing(billing_id, metadata.clone()).await?;
        refresh_payment_state(&self.billings, &billing, total_paid, metadata).await?;

        Ok(())
    }

    /// Lists the active payments of a billing record
    pub async fn list_payments_for_billing(
        &self,
        billing_id: BillingId,
    ) -> Result<Vec<Payment>, BillingError> {
        // Validate the reference before listing
        self.billings.get_billing(billing_id, None).await?;
        let payments = self
            .payments
            .list_payments_for_billing(billing_id, None)
            .await?;
        Ok(payments)
    }
}
