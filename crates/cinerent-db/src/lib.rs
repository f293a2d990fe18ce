//! # cinerent-db: Persistence and Coordinators for the Rental Core
//!
//! Owns every read and write of the rental core. SQLite through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cinerent Data Flow                               │
//! │                                                                         │
//! │  HTTP handler (outside this workspace)                                 │
//! │       │  rent / return / set_capacity / deactivate                     │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   cinerent-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐   │   │
//! │  │   │ Coordinators  │    │ Repositories  │    │  Migrations  │   │   │
//! │  │   │  (service/)   │───►│ (repository/) │    │  (embedded)  │   │   │
//! │  │   │               │    │               │    │              │   │   │
//! │  │   │ Rental        │    │ CopyPool      │    │ 001_init.sql │   │   │
//! │  │   │ Return        │    │ Ledger        │    │              │   │   │
//! │  │   │ Capacity      │    │ Rental        │    │              │   │   │
//! │  │   │ Catalog       │    │ Movie         │    │              │   │   │
//! │  │   └──────┬────────┘    └───────────────┘    └──────────────┘   │   │
//! │  │          │ one BEGIN IMMEDIATE ... COMMIT per call             │   │
//! │  │          ▼                                                      │   │
//! │  │   ┌───────────────┐                                             │   │
//! │  │   │   Database    │  SqlitePool, injected into coordinators    │   │
//! │  │   │   (pool.rs)   │                                             │   │
//! │  │   └───────────────┘                                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (WAL)                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, configuration and units of work
//! - [`config`] - Environment-driven settings
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Storage errors and the coordinator error taxonomy
//! - [`repository`] - Statement-level access (copies, ledger, rentals, movies)
//! - [`service`] - The coordinators
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cinerent_db::{Database, DbConfig, RentalConfig, RentalCoordinator};
//!
//! let db = Database::new(DbConfig::load()?).await?;
//! let rentals = RentalCoordinator::new(db.clone(), RentalConfig::load()?);
//!
//! let rental = rentals.rent_until(&user_id, &movie_id, "2025-03-08").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, RentalConfig};
pub use error::{DbError, DbResult, ErrorBody, ErrorKind, RentalError, RentalResult};
pub use pool::{Database, DbConfig, UnitOfWork};

// Repository re-exports for convenience
pub use repository::{CopyPool, Ledger, MovieRepository, RentalRepository};

// Coordinators
pub use service::{CapacityAdjuster, CatalogCoordinator, RentalCoordinator, ReturnCoordinator};
