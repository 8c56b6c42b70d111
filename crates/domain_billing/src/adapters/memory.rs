//! In-memory adapter
//!
//! Implements every billing-domain port over process-local maps. Used as
//! the mock adapter in tests and local tooling. A single store-wide lock
//! makes each port operation atomic, including the cumulative payment
//! sums returned by ledger mutations.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use core_kernel::{
    AdapterHealth, BillingId, CaseId, DomainPort, HealthCheckResult, HealthCheckable, Money,
    OperationMetadata, PaymentId, PortError,
};

use crate::billing::{BillingRecord, BillingStatus};
use crate::payment::Payment;
use crate::ports::{
    BillingQuery, BillingStore, CaseDirectory, CaseRef, Page, PageRequest, PaymentStore,
    SequenceStore,
};
use crate::sequence::highest_numeric_suffix;

#[derive(Default)]
struct Inner {
    billings: HashMap<BillingId, BillingRecord>,
    bill_numbers: HashMap<String, BillingId>,
    payments: HashMap<PaymentId, Payment>,
    sequences: HashMap<String, u64>,
    cases: HashMap<CaseId, CaseRef>,
}

/// In-memory implementation of the billing domain ports
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a case into the directory (builder form)
    pub fn with_case(self, case: CaseRef) -> Self {
        self.insert_case(case);
        self
    }

    /// Seeds a case into the directory
    pub fn insert_case(&self, case: CaseRef) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.cases.insert(case.id, case);
    }

    /// Seeds a sequence counter from existing rendered numbers
    ///
    /// Migration path for data produced by the legacy scan-then-increment
    /// assignment: the counter resumes after the highest suffix in use.
    pub fn seed_sequence<'a>(&self, sequence: &str, existing: impl IntoIterator<Item = &'a str>) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let highest = highest_numeric_suffix(existing);
        inner.sequences.insert(sequence.to_string(), highest);
    }
}

impl Inner {
    fn active_payment_sum(&self, billing_id: BillingId) -> Result<Money, PortError> {
        let billing = self
            .billings
            .get(&billing_id)
            .ok_or_else(|| PortError::not_found("Billing", billing_id))?;

        let mut total = Money::zero(billing.currency);
        for payment in self
            .payments
            .values()
            .filter(|p| p.billing_id == billing_id && p.is_active)
        {
            total = total
                .checked_add(&payment.amount)
                .map_err(|e| PortError::internal(e.to_string()))?;
        }
        Ok(total)
    }
}

impl DomainPort for InMemoryStore {}

#[async_trait]
impl HealthCheckable for InMemoryStore {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult {
            adapter_id: "in-memory-store".to_string(),
            status: AdapterHealth::Healthy,
            latency_ms: 0,
            message: None,
            checked_at: Utc::now(),
        }
    }
}

#[async_trait]
impl BillingStore for InMemoryStore {
    async fn insert_billing(
        &self,
        record: &BillingRecord,
        _metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        if inner.bill_numbers.contains_key(&record.bill_number) {
            return Err(PortError::conflict(format!(
                "bill number {} already exists",
                record.bill_number
            )));
        }
        inner
            .bill_numbers
            .insert(record.bill_number.clone(), record.id);
        inner.billings.insert(record.id, record.clone());
        Ok(())
    }

    async fn get_billing(
        &self,
        id: BillingId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<BillingRecord, PortError> {
        let inner = self.inner.read().expect("store lock poisoned");
        inner
            .billings
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Billing", id))
    }

    async fn find_by_bill_number(
        &self,
        bill_number: &str,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Option<BillingRecord>, PortError> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner
            .bill_numbers
            .get(bill_number)
            .and_then(|id| inner.billings.get(id))
            .cloned())
    }

    async fn update_billing(
        &self,
        record: &BillingRecord,
        _metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        if !inner.billings.contains_key(&record.id) {
            return Err(PortError::not_found("Billing", record.id));
        }
        inner.billings.insert(record.id, record.clone());
        Ok(())
    }

    async fn set_payment_state(
        &self,
        id: BillingId,
        paid_to_date: Money,
        status: BillingStatus,
        _metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let record = inner
            .billings
            .get_mut(&id)
            .ok_or_else(|| PortError::not_found("Billing", id))?;
        record.paid_to_date = paid_to_date;
        record.status = status;
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn deactivate_billing(
        &self,
        id: BillingId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let record = inner
            .billings
            .get_mut(&id)
            .ok_or_else(|| PortError::not_found("Billing", id))?;
        record.is_active = false;
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn list_billings(
        &self,
        query: &BillingQuery,
        page: PageRequest,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Page<BillingRecord>, PortError> {
        let inner = self.inner.read().expect("store lock poisoned");

        let search = query.search.as_ref().map(|s| s.to_lowercase());
        let mut matches: Vec<&BillingRecord> = inner
            .billings
            .values()
            .filter(|r| query.include_inactive || r.is_active)
            .filter(|r| query.case_id.map_or(true, |c| r.case_id == c))
            .filter(|r| query.client_id.map_or(true, |c| r.client_id == c))
            .filter(|r| {
                search.as_ref().map_or(true, |term| {
                    r.bill_number.to_lowercase().contains(term)
                        || r.title.to_lowercase().contains(term)
                })
            })
            .collect();

        // Newest first
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matches.len() as u64;
        let items = matches
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .cloned()
            .collect();

        Ok(Page {
            items,
            page: page.page,
            limit: page.limit,
            total,
        })
    }
}

#[async_trait]
impl PaymentStore for InMemoryStore {
    async fn insert_payment(
        &self,
        payment: &Payment,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Money, PortError> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        if !inner.billings.contains_key(&payment.billing_id) {
            return Err(PortError::not_found("Billing", payment.billing_id));
        }
        inner.payments.insert(payment.id, payment.clone());
        inner.active_payment_sum(payment.billing_id)
    }

    async fn get_payment(
        &self,
        id: PaymentId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Payment, PortError> {
        let inner = self.inner.read().expect("store lock poisoned");
        inner
            .payments
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Payment", id))
    }

    async fn update_payment(
        &self,
        payment: &Payment,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Money, PortError> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        if !inner.payments.contains_key(&payment.id) {
            return Err(PortError::not_found("Payment", payment.id));
        }
        inner.payments.insert(payment.id, payment.clone());
        inner.active_payment_sum(payment.billing_id)
    }

    async fn void_payment(
        &self,
        id: PaymentId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<(BillingId, Money), PortError> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let payment = inner
            .payments
            .get_mut(&id)
            .filter(|p| p.is_active)
            .ok_or_else(|| PortError::not_found("Payment", id))?;
        payment.void();
        let billing_id = payment.billing_id;
        let total = inner.active_payment_sum(billing_id)?;
        Ok((billing_id, total))
    }

    async fn void_payments_for_billing(
        &self,
        billing_id: BillingId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<u64, PortError> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let mut voided = 0;
        for payment in inner
            .payments
            .values_mut()
            .filter(|p| p.billing_id == billing_id && p.is_active)
        {
            payment.void();
            voided += 1;
        }
        Ok(voided)
    }

    async fn list_payments_for_billing(
        &self,
        billing_id: BillingId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Vec<Payment>, PortError> {
        let inner = self.inner.read().expect("store lock poisoned");
        let mut payments: Vec<Payment> = inner
            .payments
            .values()
            .filter(|p| p.billing_id == billing_id && p.is_active)
            .cloned()
            .collect();
        payments.sort_by(|a, b| a.date.cmp(&b.date).then(a.created_at.cmp(&b.created_at)));
        Ok(payments)
    }

    async fn sum_payments(
        &self,
        billing_id: BillingId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Money, PortError> {
        let inner = self.inner.read().expect("store lock poisoned");
        inner.active_payment_sum(billing_id)
    }
}

#[async_trait]
impl SequenceStore for InMemoryStore {
    async fn next_value(
        &self,
        sequence: &str,
        _metadata: Option<OperationMetadata>,
    ) -> Result<u64, PortError> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let counter = inner.sequences.entry(sequence.to_string()).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }
}

#[async_trait]
impl CaseDirectory for InMemoryStore {
    async fn find_case(
        &self,
        id: CaseId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Option<CaseRef>, PortError> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner.cases.get(&id).cloned())
    }
}
