//! Infrastructure Database Layer
//!
//! This crate provides the PostgreSQL persistence for the billing engine,
//! implementing the `domain_billing` port traits over SQLx.
//!
//! # Architecture
//!
//! The crate follows the repository pattern: `repositories` holds the raw
//! SQL and row types, `adapters` bridges rows to domain models and
//! translates database errors into port errors.
//!
//! Line items are persisted as an embedded JSONB document on the billing
//! row, mirroring their embedded, ordered nature in the domain model.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{StorageConfig, create_pool, PostgresBillingAdapter};
//!
//! let config = StorageConfig::from_env()?;
//! let pool = create_pool(config.database()).await?;
//! let adapter = PostgresBillingAdapter::new(pool);
//! ```

pub mod pool;
pub mod config;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{DatabasePool, create_pool, DatabaseConfig};
pub use config::StorageConfig;
pub use error::DatabaseError;
pub use adapters::PostgresBillingAdapter;
