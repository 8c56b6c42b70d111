//! Billing period types
//!
//! A billing period is the civil-date window a bill covers. Time-based
//! billings require a bounded window; other billing types may leave the
//! end open (e.g., a retainer billed from an engagement date).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors related to billing period operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid period: start {start} must not be after end {end}")]
    InvalidPeriod {
        start: String,
        end: String,
    },

    #[error("Due date {due} precedes period start {start}")]
    DueBeforeStart {
        due: String,
        start: String,
    },
}

/// The date window a billing record covers
///
/// The start date is inclusive; the end date, when present, is inclusive
/// as well (bills cover whole civil days).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPeriod {
    /// Start of the period (inclusive)
    pub start: NaiveDate,
    /// End of the period (inclusive), None means open-ended
    pub end: Option<NaiveDate>,
}

impl BillingPeriod {
    /// Creates a new billing period
    pub fn new(start: NaiveDate, end: Option<NaiveDate>) -> Result<Self, TemporalError> {
        if let Some(end) = end {
            if start > end {
                return Err(TemporalError::InvalidPeriod {
                    start: start.to_string(),
                    end: end.to_string(),
                });
            }
        }
        Ok(Self { start, end })
    }

    /// Creates an open-ended period starting from the given date
    pub fn from(start: NaiveDate) -> Self {
        Self { start, end: None }
    }

    /// Creates a bounded period
    pub fn bounded(start: NaiveDate, end: NaiveDate) -> Result<Self, TemporalError> {
        Self::new(start, Some(end))
    }

    /// Returns true if this period contains the given date
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && self.end.map_or(true, |e| date <= e)
    }

    /// Returns true if this period overlaps with another
    pub fn overlaps(&self, other: &BillingPeriod) -> bool {
        let self_end = self.end.unwrap_or(NaiveDate::MAX);
        let other_end = other.end.unwrap_or(NaiveDate::MAX);

        self.start <= other_end && other.start <= self_end
    }

    /// Returns true if this period has no end date
    pub fn is_open_ended(&self) -> bool {
        self.end.is_none()
    }

    /// Closes the period at the given date
    pub fn close_at(&mut self, date: NaiveDate) -> Result<(), TemporalError> {
        if date < self.start {
            return Err(TemporalError::InvalidPeriod {
                start: self.start.to_string(),
                end: date.to_string(),
            });
        }
        self.end = Some(date);
        Ok(())
    }
}
