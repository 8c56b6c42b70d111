//! Port adapters

pub mod billing;

pub use billing::PostgresBillingAdapter;
