//! Sequence numbers for human-readable record identifiers
//!
//! Bill, case, and client numbers are monotonic sequences rendered as a
//! fixed prefix plus a zero-padded six-digit suffix. Reservation is
//! atomic through [`SequenceStore`](crate::ports::SequenceStore); the
//! storage-layer uniqueness constraint on the rendered number remains the
//! last line of defense against duplicates.
//!
//! Legacy deployments assigned numbers by scanning existing records for
//! the highest numeric suffix. [`highest_numeric_suffix`] keeps that scan
//! available for seeding a counter from pre-existing data.

/// A named sequence and its display prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceKey {
    /// Counter name in the sequence store
    pub name: &'static str,
    /// Prefix of the rendered number
    pub prefix: &'static str,
}

impl SequenceKey {
    /// Renders a reserved value as the human-readable number
    pub fn render(&self, value: u64) -> String {
        format!("{}{:06}", self.prefix, value)
    }
}

/// Billing numbers: `BILL-000001`, `BILL-000002`, ...
pub const BILLING_SEQUENCE: SequenceKey = SequenceKey {
    name: "billing",
    prefix: "BILL-",
};

/// Case numbers: `CAS-000001`, ...
pub const CASE_SEQUENCE: SequenceKey = SequenceKey {
    name: "case",
    prefix: "CAS-",
};

/// Client numbers carry no prefix: `000001`, ...
pub const CLIENT_SEQUENCE: SequenceKey = SequenceKey {
    name: "client",
    prefix: "",
};

/// Extracts the first contiguous digit run from a value
///
/// Unparseable or digit-free values count as zero.
pub fn numeric_suffix(value: &str) -> u64 {
    let digits: String = value
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

/// Returns the highest numeric suffix across existing values
///
/// This is the legacy scan-then-increment seed: the next number after a
/// migration is `highest_numeric_suffix(existing) + 1`.
pub fn highest_numeric_suffix<'a, I>(values: I) -> u64
where
    I: IntoIterator<Item = &'a str>,
{
    values.into_iter().map(numeric_suffix).max().unwrap_or(0)
}
