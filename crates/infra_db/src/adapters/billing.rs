//! PostgreSQL Billing Adapter
//!
//! This module provides the internal (database) adapter for the billing
//! domain, implementing the `domain_billing` port traits over the
//! `BillingRepository`. It:
//!
//! - Translates domain requests into repository operations
//! - Converts database rows back to domain models
//! - Handles error translation between database and port errors
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use infra_db::PostgresBillingAdapter;
//! use domain_billing::BillingStore;
//!
//! let adapter = Arc::new(PostgresBillingAdapter::new(pool));
//! let port: Arc<dyn BillingStore> = adapter;
//! let billing = port.get_billing(billing_id, None).await?;
//! ```

use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{
    AdapterHealth, BillingId, BillingPeriod, CaseId, ClientId, Currency, DomainPort,
    HealthCheckResult, HealthCheckable, Money, OperationMetadata, PaymentId, PortError, UserId,
};
use domain_billing::{
    BillingQuery, BillingRecord, BillingStatus, BillingStore, BillingType, CaseDirectory,
    CaseRef, LineItem, Page, PageRequest, Payment, PaymentMethod, PaymentStore, SequenceStore,
};
use domain_billing::line_item::BillingTotals;

use crate::error::DatabaseError;
use crate::repositories::billing::{
    BillingFilter, BillingRepository, BillingRow, CaseRow, PaymentRow,
};

/// PostgreSQL-backed implementation of the billing domain ports
///
/// # Error Handling
///
/// Database errors are translated to `PortError` variants:
/// - `DatabaseError::NotFound` -> `PortError::NotFound`
/// - `DatabaseError::DuplicateEntry` -> `PortError::Conflict`
/// - Connection failures -> `PortError::Connection`
/// - Other errors -> `PortError::Internal`
#[derive(Debug, Clone)]
pub struct PostgresBillingAdapter {
    repository: BillingRepository,
    pool: PgPool,
}

impl PostgresBillingAdapter {
    /// Creates a new PostgreSQL billing adapter
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: BillingRepository::new(pool.clone()),
            pool,
        }
    }

    /// Returns a reference to the underlying repository
    ///
    /// Useful for operations not exposed through the port traits, such as
    /// bulk maintenance queries.
    pub fn repository(&self) -> &BillingRepository {
        &self.repository
    }
}

// ============================================================================
// Error translation
// ============================================================================

fn db_to_port_error(error: DatabaseError) -> PortError {
    match error {
        DatabaseError::NotFound(message) => PortError::NotFound {
            entity_type: "Record".to_string(),
            id: message,
        },
        DatabaseError::DuplicateEntry(message) => PortError::Conflict { message },
        DatabaseError::ForeignKeyViolation(message) => PortError::Validation {
            message,
            field: None,
        },
        other if other.is_connection_error() => PortError::connection(other.to_string()),
        other => {
            let message = other.to_string();
            PortError::Internal {
                message,
                source: Some(Box::new(other)),
            }
        }
    }
}

fn map_not_found(
    error: DatabaseError,
    entity: &str,
    id: impl std::fmt::Display,
) -> PortError {
    if error.is_not_found() {
        PortError::not_found(entity, id)
    } else {
        db_to_port_error(error)
    }
}

// ============================================================================
// Row conversion
// ============================================================================

pub(crate) fn billing_type_to_db(billing_type: BillingType) -> &'static str {
    match billing_type {
        BillingType::OneTime => "one_time",
        BillingType::Milestone => "milestone",
        BillingType::TimeBased => "time_based",
        BillingType::TaskBased => "task_based",
    }
}

pub(crate) fn billing_type_from_db(value: &str) -> Result<BillingType, PortError> {
    match value {
        "one_time" => Ok(BillingType::OneTime),
        "milestone" => Ok(BillingType::Milestone),
        "time_based" => Ok(BillingType::TimeBased),
        "task_based" => Ok(BillingType::TaskBased),
        other => Err(PortError::internal(format!("unknown billing type: {other}"))),
    }
}

pub(crate) fn status_to_db(status: BillingStatus) -> &'static str {
    match status {
        BillingStatus::Unpaid => "unpaid",
        BillingStatus::PartiallyPaid => "partially_paid",
        BillingStatus::Paid => "paid",
        BillingStatus::OverPaid => "over_paid",
        BillingStatus::Overdue => "overdue",
    }
}

pub(crate) fn status_from_db(value: &str) -> Result<BillingStatus, PortError> {
    match value {
        "unpaid" => Ok(BillingStatus::Unpaid),
        "partially_paid" => Ok(BillingStatus::PartiallyPaid),
        "paid" => Ok(BillingStatus::Paid),
        "over_paid" => Ok(BillingStatus::OverPaid),
        "overdue" => Ok(BillingStatus::Overdue),
        other => Err(PortError::internal(format!("unknown billing status: {other}"))),
    }
}

pub(crate) fn method_to_db(method: PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::Cash => "cash",
        PaymentMethod::BankTransfer => "bank_transfer",
        PaymentMethod::Cheque => "cheque",
        PaymentMethod::CreditCard => "credit_card",
        PaymentMethod::Other => "other",
    }
}

pub(crate) fn method_from_db(value: &str) -> Result<PaymentMethod, PortError> {
    match value {
        "cash" => Ok(PaymentMethod::Cash),
        "bank_transfer" => Ok(PaymentMethod::BankTransfer),
        "cheque" => Ok(PaymentMethod::Cheque),
        "credit_card" => Ok(PaymentMethod::CreditCard),
        "other" => Ok(PaymentMethod::Other),
        unknown => Err(PortError::internal(format!("unknown payment method: {unknown}"))),
    }
}

fn currency_from_db(value: &str) -> Result<Currency, PortError> {
    Currency::from_str(value).map_err(|e| PortError::internal(e.to_string()))
}

pub(crate) fn billing_to_row(record: &BillingRecord) -> Result<BillingRow, PortError> {
    let items = serde_json::to_value(&record.items)
        .map_err(|e| PortError::internal(format!("failed to encode line items: {e}")))?;

    Ok(BillingRow {
        billing_id: *record.id.as_uuid(),
        bill_number: record.bill_number.clone(),
        case_id: *record.case_id.as_uuid(),
        client_id: *record.client_id.as_uuid(),
        title: record.title.clone(),
        billing_type: billing_type_to_db(record.billing_type).to_string(),
        currency: record.currency.code().to_string(),
        period_start: record.period.start,
        period_end: record.period.end,
        due_date: record.due_date,
        items,
        sub_total: record.totals.sub_total.amount(),
        discount: record.totals.discount.amount(),
        tax: record.totals.tax.amount(),
        grand_total: record.totals.grand_total.amount(),
        paid_to_date: record.paid_to_date.amount(),
        status: status_to_db(record.status).to_string(),
        created_by: *record.created_by.as_uuid(),
        is_active: record.is_active,
        created_at: record.created_at,
        updated_at: record.updated_at,
    })
}

pub(crate) fn row_to_billing(row: BillingRow) -> Result<BillingRecord, PortError> {
    let currency = currency_from_db(&row.currency)?;
    let items: Vec<LineItem> = serde_json::from_value(row.items)
        .map_err(|e| PortError::internal(format!("failed to decode line items: {e}")))?;

    Ok(BillingRecord {
        id: BillingId::from_uuid(row.billing_id),
        bill_number: row.bill_number,
        case_id: CaseId::from_uuid(row.case_id),
        client_id: ClientId::from_uuid(row.client_id),
        title: row.title,
        billing_type: billing_type_from_db(&row.billing_type)?,
        currency,
        period: BillingPeriod {
            start: row.period_start,
            end: row.period_end,
        },
        due_date: row.due_date,
        items,
        totals: BillingTotals {
            sub_total: Money::new(row.sub_total, currency),
            discount: Money::new(row.discount, currency),
            tax: Money::new(row.tax, currency),
            grand_total: Money::new(row.grand_total, currency),
        },
        paid_to_date: Money::new(row.paid_to_date, currency),
        status: status_from_db(&row.status)?,
        created_by: UserId::from_uuid(row.created_by),
        is_active: row.is_active,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

pub(crate) fn payment_to_row(payment: &Payment) -> PaymentRow {
    PaymentRow {
        payment_id: *payment.id.as_uuid(),
        billing_id: *payment.billing_id.as_uuid(),
        amount: payment.amount.amount(),
        currency: payment.amount.currency().code().to_string(),
        payment_date: payment.date,
        method: method_to_db(payment.method).to_string(),
        received_by: *payment.received_by.as_uuid(),
        transaction_id: payment.transaction_id.clone(),
        receipt: payment.receipt.clone(),
        note: payment.note.clone(),
        is_active: payment.is_active,
        created_at: payment.created_at,
    }
}

pub(crate) fn row_to_payment(row: PaymentRow) -> Result<Payment, PortError> {
    let currency = currency_from_db(&row.currency)?;

    Ok(Payment {
        id: PaymentId::from_uuid(row.payment_id),
        billing_id: BillingId::from_uuid(row.billing_id),
        amount: Money::new(row.amount, currency),
        date: row.payment_date,
        method: method_from_db(&row.method)?,
        received_by: UserId::from_uuid(row.received_by),
        transaction_id: row.transaction_id,
        receipt: row.receipt,
        note: row.note,
        is_active: row.is_active,
        created_at: row.created_at,
    })
}

fn row_to_case(row: CaseRow) -> CaseRef {
    CaseRef {
        id: CaseId::from_uuid(row.case_id),
        client_id: ClientId::from_uuid(row.client_id),
        case_number: row.case_number,
    }
}

// Mark as a domain port
impl DomainPort for PostgresBillingAdapter {}

#[async_trait]
impl HealthCheckable for PostgresBillingAdapter {
    /// Checks database connectivity with a trivial query
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult {
                adapter_id: "postgres-billing-adapter".to_string(),
                status: AdapterHealth::Healthy,
                latency_ms,
                message: None,
                checked_at: Utc::now(),
            },
            Err(e) => HealthCheckResult {
                adapter_id: "postgres-billing-adapter".to_string(),
                status: AdapterHealth::Unhealthy,
                latency_ms,
                message: Some(format!("Database error: {}", e)),
                checked_at: Utc::now(),
            },
        }
    }
}

#[async_trait]
impl BillingStore for PostgresBillingAdapter {
    #[instrument(skip(self, record, _metadata), fields(bill_number = %record.bill_number))]
    async fn insert_billing(
        &self,
        record: &BillingRecord,
        _metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError> {
        debug!("Inserting billing record");

        let row = billing_to_row(record)?;
        self.repository
            .insert_billing(&row)
            .await
            .map_err(db_to_port_error)
    }

    #[instrument(skip(self, _metadata), fields(billing_id = %id))]
    async fn get_billing(
        &self,
        id: BillingId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<BillingRecord, PortError> {
        debug!("Fetching billing by ID");

        let row = self
            .repository
            .fetch_billing(*id.as_uuid())
            .await
            .map_err(db_to_port_error)?
            .ok_or_else(|| PortError::not_found("Billing", id))?;

        row_to_billing(row)
    }

    #[instrument(skip(self, _metadata))]
    async fn find_by_bill_number(
        &self,
        bill_number: &str,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Option<BillingRecord>, PortError> {
        let row = self
            .repository
            .fetch_by_bill_number(bill_number)
            .await
            .map_err(db_to_port_error)?;

        row.map(row_to_billing).transpose()
    }

    #[instrument(skip(self, record, _metadata), fields(billing_id = %record.id))]
    async fn update_billing(
        &self,
        record: &BillingRecord,
        _metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError> {
        debug!("Updating billing record");

        let row = billing_to_row(record)?;
        self.repository
            .update_billing(&row)
            .await
            .map_err(|e| map_not_found(e, "Billing", record.id))
    }

    #[instrument(skip(self, _metadata), fields(billing_id = %id, status = ?status))]
    async fn set_payment_state(
        &self,
        id: BillingId,
        paid_to_date: Money,
        status: BillingStatus,
        _metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError> {
        debug!("Writing payment state");

        self.repository
            .set_payment_state(*id.as_uuid(), paid_to_date.amount(), status_to_db(status))
            .await
            .map_err(|e| map_not_found(e, "Billing", id))
    }

    #[instrument(skip(self, _metadata), fields(billing_id = %id))]
    async fn deactivate_billing(
        &self,
        id: BillingId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError> {
        self.repository
            .deactivate_billing(*id.as_uuid())
            .await
            .map_err(|e| map_not_found(e, "Billing", id))
    }

    #[instrument(skip(self, query, page, _metadata))]
    async fn list_billings(
        &self,
        query: &BillingQuery,
        page: PageRequest,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Page<BillingRecord>, PortError> {
        debug!("Listing billing records");

        let filter = BillingFilter {
            case_id: query.case_id.map(|id| *id.as_uuid()),
            client_id: query.client_id.map(|id| *id.as_uuid()),
            search: query.search.clone(),
            include_inactive: query.include_inactive,
        };

        let (rows, total) = self
            .repository
            .list_billings(&filter, i64::from(page.limit), page.offset() as i64)
            .await
            .map_err(db_to_port_error)?;

        let items = rows
            .into_iter()
            .map(row_to_billing)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            items,
            page: page.page,
            limit: page.limit,
            total: total as u64,
        })
    }
}

#[async_trait]
impl PaymentStore for PostgresBillingAdapter {
    #[instrument(skip(self, payment, _metadata), fields(billing_id = %payment.billing_id))]
    async fn insert_payment(
        &self,
        payment: &Payment,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Money, PortError> {
        debug!("Recording payment");

        let row = payment_to_row(payment);
        let total = self
            .repository
            .insert_payment(&row)
            .await
            .map_err(db_to_port_error)?;

        Ok(Money::new(total, payment.amount.currency()))
    }

    #[instrument(skip(self, _metadata), fields(payment_id = %id))]
    async fn get_payment(
        &self,
        id: PaymentId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Payment, PortError> {
        let row = self
            .repository
            .fetch_payment(*id.as_uuid())
            .await
            .map_err(db_to_port_error)?
            .ok_or_else(|| PortError::not_found("Payment", id))?;

        row_to_payment(row)
    }

    #[instrument(skip(self, payment, _metadata), fields(payment_id = %payment.id))]
    async fn update_payment(
        &self,
        payment: &Payment,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Money, PortError> {
        debug!("Updating payment");

        let row = payment_to_row(payment);
        let total = self
            .repository
            .update_payment(&row)
            .await
            .map_err(|e| map_not_found(e, "Payment", payment.id))?;

        Ok(Money::new(total, payment.amount.currency()))
    }

    #[instrument(skip(self, _metadata), fields(payment_id = %id))]
    async fn void_payment(
        &self,
        id: PaymentId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<(BillingId, Money), PortError> {
        debug!("Voiding payment");

        let (billing_uuid, total) = self
            .repository
            .void_payment(*id.as_uuid())
            .await
            .map_err(|e| map_not_found(e, "Payment", id))?;

        let billing_id = BillingId::from_uuid(billing_uuid);
        let billing = self.get_billing(billing_id, None).await?;

        Ok((billing_id, Money::new(total, billing.currency)))
    }

    #[instrument(skip(self, _metadata), fields(billing_id = %billing_id))]
    async fn void_payments_for_billing(
        &self,
        billing_id: BillingId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<u64, PortError> {
        self.repository
            .void_payments_for_billing(*billing_id.as_uuid())
            .await
            .map_err(db_to_port_error)
    }

    #[instrument(skip(self, _metadata), fields(billing_id = %billing_id))]
    async fn list_payments_for_billing(
        &self,
        billing_id: BillingId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Vec<Payment>, PortError> {
        let rows = self
            .repository
            .list_payments(*billing_id.as_uuid())
            .await
            .map_err(db_to_port_error)?;

        rows.into_iter().map(row_to_payment).collect()
    }

    #[instrument(skip(self, _metadata), fields(billing_id = %billing_id))]
    async fn sum_payments(
        &self,
        billing_id: BillingId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Money, PortError> {
        let billing = self.get_billing(billing_id, None).await?;
        let total = self
            .repository
            .sum_payments(*billing_id.as_uuid())
            .await
            .map_err(db_to_port_error)?;

        Ok(Money::new(total, billing.currency))
    }
}

#[async_trait]
impl SequenceStore for PostgresBillingAdapter {
    #[instrument(skip(self, _metadata))]
    async fn next_value(
        &self,
        sequence: &str,
        _metadata: Option<OperationMetadata>,
    ) -> Result<u64, PortError> {
        let value = self
            .repository
            .next_sequence_value(sequence)
            .await
            .map_err(db_to_port_error)?;

        Ok(value as u64)
    }
}

#[async_trait]
impl CaseDirectory for PostgresBillingAdapter {
    #[instrument(skip(self, _metadata), fields(case_id = %id))]
    async fn find_case(
        &self,
        id: CaseId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Option<CaseRef>, PortError> {
        let row = self
            .repository
            .fetch_case(*id.as_uuid())
            .await
            .map_err(db_to_port_error)?;

        Ok(row.map(row_to_case))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use core_kernel::Rate;
    use test_utils::BillingRecordBuilder;

    fn sample_billing() -> BillingRecord {
        let items = vec![
            LineItem::new("Drafting", dec!(2), Money::new(dec!(100), Currency::USD))
                .with_discount(dec!(10))
                .with_vat(dec!(12)),
        ];
        BillingRecordBuilder::new()
            .with_bill_number("BILL-000001")
            .with_items(items)
            .build()
    }

    #[test]
    fn test_billing_row_round_trip() {
        let record = sample_billing();
        let row = billing_to_row(&record).unwrap();
        assert_eq!(row.bill_number, "BILL-000001");
        assert_eq!(row.billing_type, "one_time");
        assert_eq!(row.status, "unpaid");
        assert_eq!(row.grand_total, dec!(201.6));

        let back = row_to_billing(row).unwrap();
        assert_eq!(back.id, record.id);
        assert_eq!(back.items, record.items);
        assert_eq!(back.totals, record.totals);
        assert_eq!(back.status, record.status);
    }

    #[test]
    fn test_payment_row_round_trip() {
        let payment = Payment::new(
            BillingId::new_v7(),
            Money::new(dec!(150.25), Currency::USD),
            NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            PaymentMethod::Cheque,
            UserId::new_v7(),
        )
        .with_transaction_id("TXN-1")
        .with_note("partial");

        let row = payment_to_row(&payment);
        assert_eq!(row.method, "cheque");
        assert_eq!(row.amount, dec!(150.25));

        let back = row_to_payment(row).unwrap();
        assert_eq!(back.id, payment.id);
        assert_eq!(back.amount, payment.amount);
        assert_eq!(back.method, payment.method);
        assert_eq!(back.transaction_id, payment.transaction_id);
    }

    #[test]
    fn test_enum_mappings_are_total() {
        for billing_type in [
            BillingType::OneTime,
            BillingType::Milestone,
            BillingType::TimeBased,
            BillingType::TaskBased,
        ] {
            let db = billing_type_to_db(billing_type);
            assert_eq!(billing_type_from_db(db).unwrap(), billing_type);
        }

        for status in [
            BillingStatus::Unpaid,
            BillingStatus::PartiallyPaid,
            BillingStatus::Paid,
            BillingStatus::OverPaid,
            BillingStatus::Overdue,
        ] {
            let db = status_to_db(status);
            assert_eq!(status_from_db(db).unwrap(), status);
        }

        for method in [
            PaymentMethod::Cash,
            PaymentMethod::BankTransfer,
            PaymentMethod::Cheque,
            PaymentMethod::CreditCard,
            PaymentMethod::Other,
        ] {
            let db = method_to_db(method);
            assert_eq!(method_from_db(db).unwrap(), method);
        }
    }

    #[test]
    fn test_unknown_enum_values_are_internal_errors() {
        assert!(billing_type_from_db("hourly").is_err());
        assert!(status_from_db("written_off").is_err());
        assert!(method_from_db("barter").is_err());
    }

    #[test]
    fn test_legacy_flat_vat_in_stored_items_decodes() {
        // Rows written before the structured VAT shape carry flat numbers
        let record = sample_billing();
        let mut row = billing_to_row(&record).unwrap();
        row.items = serde_json::json!([{
            "particulars": "Consultation",
            "quantity": "1",
            "unit_price": { "amount": "100", "currency": "USD" },
            "discount": "0",
            "vat": "18"
        }]);

        let back = row_to_billing(row).unwrap();
        assert_eq!(back.items[0].vat.as_rate(), Rate::from_percentage(dec!(18)));
    }
}
