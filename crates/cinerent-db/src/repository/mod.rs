//! # Repository Module
//!
//! Statement-level access to the rental tables.
//!
//! ## Repositories and Units of Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Coordinator (service/)                                                │
//! │       │                                                                 │
//! │       │  let mut tx = db.begin().await?;        ← BEGIN IMMEDIATE       │
//! │       ▼                                                                 │
//! │  CopyPool::find_available(&mut *tx, movie)                             │
//! │  Ledger::debit(&mut *tx, user, balance, price)                         │
//! │  CopyPool::reserve(&mut *tx, copy)                                     │
//! │  RentalRepository::insert_rental(&mut *tx, ...)                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::commit(tx).await?                    ← or drop = rollback    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repositories hold no pool of their own. Every function takes the
//! `SqliteConnection` it runs on, so several of them compose inside one
//! caller-owned transaction.
//!
//! ## Available Repositories
//!
//! - [`MovieRepository`] - Movie rows, price and active flag
//! - [`CopyPool`] - Copies and their state transitions
//! - [`Ledger`] - User balances and compare-and-set debits
//! - [`RentalRepository`] - Rentals, payments and per-user history

pub mod copy;
pub mod movie;
pub mod rental;
pub mod user;

pub use copy::CopyPool;
pub use movie::MovieRepository;
pub use rental::RentalRepository;
pub use user::Ledger;
