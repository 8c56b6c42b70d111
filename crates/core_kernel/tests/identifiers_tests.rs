//! Integration tests for typed identifiers

use std::collections::HashSet;
use core_kernel::{BillingId, CaseId, ClientId, PaymentId, UserId};

#[test]
fn test_prefixes() {
    assert_eq!(CaseId::prefix(), "CAS");
    assert_eq!(ClientId::prefix(), "CLI");
    assert_eq!(BillingId::prefix(), "BIL");
    assert_eq!(PaymentId::prefix(), "PAY");
    assert_eq!(UserId::prefix(), "USR");
}

#[test]
fn test_display_round_trip() {
    let id = CaseId::new_v7();
    let parsed: CaseId = id.to_string().parse().unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn test_parse_without_prefix() {
    let id = UserId::new();
    let bare = id.as_uuid().to_string();
    let parsed: UserId = bare.parse().unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn test_random_ids_are_unique() {
    let ids: HashSet<_> = (0..100).map(|_| BillingId::new()).collect();
    assert_eq!(ids.len(), 100);
}

#[test]
fn test_serde_is_transparent() {
    let id = PaymentId::new();
    let json = serde_json::to_string(&id).unwrap();
    // Serializes as the bare UUID string, no prefix
    assert_eq!(json, format!("\"{}\"", id.as_uuid()));
}
