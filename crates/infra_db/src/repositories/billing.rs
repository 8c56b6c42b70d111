//! Billing repository implementation
//!
//! Raw SQL access for billing records, the payment ledger, the atomic
//! sequence counter, and the case directory lookup. Queries are built
//! without compile-time verification so the crate builds with no database
//! available; the adapter layer owns domain conversion.
//!
//! Ledger mutations that affect a billing's payment position run inside a
//! transaction together with the aggregate SUM, so the returned total is
//! never stale relative to the mutation itself.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::DatabaseError;

/// Repository for billing records, payments, sequences, and case lookups
#[derive(Debug, Clone)]
pub struct BillingRepository {
    pool: PgPool,
}

/// Database row for a billing record
///
/// Line items are an embedded JSONB document, preserving insertion order.
#[derive(Debug, Clone)]
pub struct BillingRow {
    pub billing_id: Uuid,
    pub bill_number: String,
    pub case_id: Uuid,
    pub client_id: Uuid,
    pub title: String,
    pub billing_type: String,
    pub currency: String,
    pub period_start: NaiveDate,
    pub period_end: Option<NaiveDate>,
    pub due_date: NaiveDate,
    pub items: serde_json::Value,
    pub sub_total: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub grand_total: Decimal,
    pub paid_to_date: Decimal,
    pub status: String,
    pub created_by: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database row for a payment
#[derive(Debug, Clone)]
pub struct PaymentRow {
    pub payment_id: Uuid,
    pub billing_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub payment_date: NaiveDate,
    pub method: String,
    pub received_by: Uuid,
    pub transaction_id: Option<String>,
    pub receipt: Option<String>,
    pub note: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Database row for a case directory entry
#[derive(Debug, Clone)]
pub struct CaseRow {
    pub case_id: Uuid,
    pub client_id: Uuid,
    pub case_number: String,
}

/// Filters for the billing listing query
#[derive(Debug, Clone, Default)]
pub struct BillingFilter {
    pub case_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub search: Option<String>,
    pub include_inactive: bool,
}

fn billing_from_row(row: &PgRow) -> Result<BillingRow, DatabaseError> {
    Ok(BillingRow {
        billing_id: row.try_get("billing_id")?,
        bill_number: row.try_get("bill_number")?,
        case_id: row.try_get("case_id")?,
        client_id: row.try_get("client_id")?,
        title: row.try_get("title")?,
        billing_type: row.try_get("billing_type")?,
        currency: row.try_get("currency")?,
        period_start: row.try_get("period_start")?,
        period_end: row.try_get("period_end")?,
        due_date: row.try_get("due_date")?,
        items: row.try_get("items")?,
        sub_total: row.try_get("sub_total")?,
        discount: row.try_get("discount")?,
        tax: row.try_get("tax")?,
        grand_total: row.try_get("grand_total")?,
        paid_to_date: row.try_get("paid_to_date")?,
        status: row.try_get("status")?,
        created_by: row.try_get("created_by")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn payment_from_row(row: &PgRow) -> Result<PaymentRow, DatabaseError> {
    Ok(PaymentRow {
        payment_id: row.try_get("payment_id")?,
        billing_id: row.try_get("billing_id")?,
        amount: row.try_get("amount")?,
        currency: row.try_get("currency")?,
        payment_date: row.try_get("payment_date")?,
        method: row.try_get("method")?,
        received_by: row.try_get("received_by")?,
        transaction_id: row.try_get("transaction_id")?,
        receipt: row.try_get("receipt")?,
        note: row.try_get("note")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
    })
}

const SELECT_BILLING: &str = "SELECT billing_id, bill_number, case_id, client_id, title, \
     billing_type, currency, period_start, period_end, due_date, items, \
     sub_total, discount, tax, grand_total, paid_to_date, status, \
     created_by, is_active, created_at, updated_at FROM billings";

const SELECT_PAYMENT: &str = "SELECT payment_id, billing_id, amount, currency, payment_date, \
     method, received_by, transaction_id, receipt, note, is_active, created_at FROM payments";

const ACTIVE_PAYMENT_SUM: &str =
    "SELECT COALESCE(SUM(amount), 0) FROM payments WHERE billing_id = $1 AND is_active";

impl BillingRepository {
    /// Creates a new BillingRepository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ========================================================================
    // Billing records
    // ========================================================================

    /// Inserts a billing record
    ///
    /// A bill-number collision surfaces as `DatabaseError::DuplicateEntry`
    /// via the unique constraint.
    pub async fn insert_billing(&self, row: &BillingRow) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO billings (billing_id, bill_number, case_id, client_id, title, \
             billing_type, currency, period_start, period_end, due_date, items, \
             sub_total, discount, tax, grand_total, paid_to_date, status, \
             created_by, is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, \
             $16, $17, $18, $19, $20, $21)",
        )
        .bind(row.billing_id)
        .bind(&row.bill_number)
        .bind(row.case_id)
        .bind(row.client_id)
        .bind(&row.title)
        .bind(&row.billing_type)
        .bind(&row.currency)
        .bind(row.period_start)
        .bind(row.period_end)
        .bind(row.due_date)
        .bind(&row.items)
        .bind(row.sub_total)
        .bind(row.discount)
        .bind(row.tax)
        .bind(row.grand_total)
        .bind(row.paid_to_date)
        .bind(&row.status)
        .bind(row.created_by)
        .bind(row.is_active)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::from(&e))?;

        Ok(())
    }

    /// Fetches a billing record by ID
    pub async fn fetch_billing(&self, billing_id: Uuid) -> Result<Option<BillingRow>, DatabaseError> {
        let row = sqlx::query(&format!("{SELECT_BILLING} WHERE billing_id = $1"))
            .bind(billing_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(billing_from_row).transpose()
    }

    /// Fetches a billing record by bill number
    pub async fn fetch_by_bill_number(
        &self,
        bill_number: &str,
    ) -> Result<Option<BillingRow>, DatabaseError> {
        let row = sqlx::query(&format!("{SELECT_BILLING} WHERE bill_number = $1"))
            .bind(bill_number)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(billing_from_row).transpose()
    }

    /// Overwrites a billing record
    pub async fn update_billing(&self, row: &BillingRow) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE billings SET title = $2, billing_type = $3, currency = $4, \
             period_start = $5, period_end = $6, due_date = $7, items = $8, \
             sub_total = $9, discount = $10, tax = $11, grand_total = $12, \
             paid_to_date = $13, status = $14, is_active = $15, updated_at = $16 \
             WHERE billing_id = $1",
        )
        .bind(row.billing_id)
        .bind(&row.title)
        .bind(&row.billing_type)
        .bind(&row.currency)
        .bind(row.period_start)
        .bind(row.period_end)
        .bind(row.due_date)
        .bind(&row.items)
        .bind(row.sub_total)
        .bind(row.discount)
        .bind(row.tax)
        .bind(row.grand_total)
        .bind(row.paid_to_date)
        .bind(&row.status)
        .bind(row.is_active)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Billing", row.billing_id));
        }
        Ok(())
    }

    /// Writes the cached payment aggregate and status
    pub async fn set_payment_state(
        &self,
        billing_id: Uuid,
        paid_to_date: Decimal,
        status: &str,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE billings SET paid_to_date = $2, status = $3, updated_at = $4 \
             WHERE billing_id = $1",
        )
        .bind(billing_id)
        .bind(paid_to_date)
        .bind(status)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Billing", billing_id));
        }
        Ok(())
    }

    /// Flags a billing record inactive
    pub async fn deactivate_billing(&self, billing_id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE billings SET is_active = FALSE, updated_at = $2 WHERE billing_id = $1",
        )
        .bind(billing_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Billing", billing_id));
        }
        Ok(())
    }

    /// Lists billing records matching the filter, newest first
    ///
    /// Returns the page of rows and the total match count.
    pub async fn list_billings(
        &self,
        filter: &BillingFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<BillingRow>, i64), DatabaseError> {
        const MATCH: &str = "($1::uuid IS NULL OR case_id = $1) \
             AND ($2::uuid IS NULL OR client_id = $2) \
             AND ($3::text IS NULL OR bill_number ILIKE '%' || $3 || '%' \
                  OR title ILIKE '%' || $3 || '%') \
             AND ($4 OR is_active)";

        let rows = sqlx::query(&format!(
            "{SELECT_BILLING} WHERE {MATCH} ORDER BY created_at DESC LIMIT $5 OFFSET $6"
        ))
        .bind(filter.case_id)
        .bind(filter.client_id)
        .bind(filter.search.as_deref())
        .bind(filter.include_inactive)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query(&format!("SELECT COUNT(*) FROM billings WHERE {MATCH}"))
            .bind(filter.case_id)
            .bind(filter.client_id)
            .bind(filter.search.as_deref())
            .bind(filter.include_inactive)
            .fetch_one(&self.pool)
            .await?
            .try_get(0)?;

        let rows = rows
            .iter()
            .map(billing_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((rows, total))
    }

    // ========================================================================
    // Payment ledger
    // ========================================================================

    /// Inserts a payment and returns the new active-payment total
    ///
    /// Insert and SUM run in one transaction.
    pub async fn insert_payment(&self, row: &PaymentRow) -> Result<Decimal, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO payments (payment_id, billing_id, amount, currency, payment_date, \
             method, received_by, transaction_id, receipt, note, is_active, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(row.payment_id)
        .bind(row.billing_id)
        .bind(row.amount)
        .bind(&row.currency)
        .bind(row.payment_date)
        .bind(&row.method)
        .bind(row.received_by)
        .bind(row.transaction_id.as_deref())
        .bind(row.receipt.as_deref())
        .bind(row.note.as_deref())
        .bind(row.is_active)
        .bind(row.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| DatabaseError::from(&e))?;

        let total: Decimal = sqlx::query(ACTIVE_PAYMENT_SUM)
            .bind(row.billing_id)
            .fetch_one(&mut *tx)
            .await?
            .try_get(0)?;

        tx.commit().await?;
        Ok(total)
    }

    /// Fetches a payment by ID
    pub async fn fetch_payment(&self, payment_id: Uuid) -> Result<Option<PaymentRow>, DatabaseError> {
        let row = sqlx::query(&format!("{SELECT_PAYMENT} WHERE payment_id = $1"))
            .bind(payment_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(payment_from_row).transpose()
    }

    /// Overwrites a payment and returns the new active-payment total
    pub async fn update_payment(&self, row: &PaymentRow) -> Result<Decimal, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE payments SET amount = $2, payment_date = $3, method = $4, \
             transaction_id = $5, receipt = $6, note = $7, is_active = $8 \
             WHERE payment_id = $1",
        )
        .bind(row.payment_id)
        .bind(row.amount)
        .bind(row.payment_date)
        .bind(&row.method)
        .bind(row.transaction_id.as_deref())
        .bind(row.receipt.as_deref())
        .bind(row.note.as_deref())
        .bind(row.is_active)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Payment", row.payment_id));
        }

        let total: Decimal = sqlx::query(ACTIVE_PAYMENT_SUM)
            .bind(row.billing_id)
            .fetch_one(&mut *tx)
            .await?
            .try_get(0)?;

        tx.commit().await?;
        Ok(total)
    }

    /// Voids a payment; returns the parent billing and the new total
    pub async fn void_payment(&self, payment_id: Uuid) -> Result<(Uuid, Decimal), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "UPDATE payments SET is_active = FALSE \
             WHERE payment_id = $1 AND is_active RETURNING billing_id",
        )
        .bind(payment_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Payment", payment_id))?;

        let billing_id: Uuid = row.try_get("billing_id")?;

        let total: Decimal = sqlx::query(ACTIVE_PAYMENT_SUM)
            .bind(billing_id)
            .fetch_one(&mut *tx)
            .await?
            .try_get(0)?;

        tx.commit().await?;
        Ok((billing_id, total))
    }

    /// Voids every active payment of a billing; returns how many
    pub async fn void_payments_for_billing(&self, billing_id: Uuid) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            "UPDATE payments SET is_active = FALSE WHERE billing_id = $1 AND is_active",
        )
        .bind(billing_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Lists active payments of a billing in payment-date order
    pub async fn list_payments(&self, billing_id: Uuid) -> Result<Vec<PaymentRow>, DatabaseError> {
        let rows = sqlx::query(&format!(
            "{SELECT_PAYMENT} WHERE billing_id = $1 AND is_active \
             ORDER BY payment_date, created_at"
        ))
        .bind(billing_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(payment_from_row).collect()
    }

    /// Sums active payments of a billing
    pub async fn sum_payments(&self, billing_id: Uuid) -> Result<Decimal, DatabaseError> {
        let total: Decimal = sqlx::query(ACTIVE_PAYMENT_SUM)
            .bind(billing_id)
            .fetch_one(&self.pool)
            .await?
            .try_get(0)?;

        Ok(total)
    }

    // ========================================================================
    // Sequences and case directory
    // ========================================================================

    /// Atomically reserves the next value of a sequence
    ///
    /// Single-row upsert with an atomic increment; concurrent callers
    /// serialize on the row and never observe the same value.
    pub async fn next_sequence_value(&self, sequence: &str) -> Result<i64, DatabaseError> {
        let value: i64 = sqlx::query(
            "INSERT INTO sequences (sequence_name, current_value) VALUES ($1, 1) \
             ON CONFLICT (sequence_name) \
             DO UPDATE SET current_value = sequences.current_value + 1 \
             RETURNING current_value",
        )
        .bind(sequence)
        .fetch_one(&self.pool)
        .await?
        .try_get(0)?;

        Ok(value)
    }

    /// Fetches a case directory entry
    pub async fn fetch_case(&self, case_id: Uuid) -> Result<Option<CaseRow>, DatabaseError> {
        let row = sqlx::query("SELECT case_id, client_id, case_number FROM cases WHERE case_id = $1")
            .bind(case_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => Ok(Some(CaseRow {
                case_id: r.try_get("case_id")?,
                client_id: r.try_get("client_id")?,
                case_number: r.try_get("case_number")?,
            })),
            None => Ok(None),
        }
    }
}
