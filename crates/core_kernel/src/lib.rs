//! Core Kernel - Foundational types and utilities for the practice management system
//!
//! This crate provides the fundamental building blocks used across all domain modules:
//! - Money types with precise decimal arithmetic
//! - Billing period types for bill coverage windows
//! - Common identifiers and value objects
//! - Port infrastructure for the hexagonal architecture

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod ports;
pub mod error;

pub use money::{Money, Currency, Rate, MoneyError};
pub use temporal::{BillingPeriod, TemporalError};
pub use identifiers::{CaseId, ClientId, BillingId, PaymentId, UserId};
pub use ports::{
    PortError, DomainPort, OperationMetadata,
    HealthCheckable, HealthCheckResult, AdapterHealth,
};
pub use error::CoreError;
