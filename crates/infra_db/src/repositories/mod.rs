//! Repository implementations

pub mod billing;

pub use billing::BillingRepository;
