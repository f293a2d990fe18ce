//! # cinerent-core: Pure Rental Domain Logic
//!
//! Types and rules for the movie rental core, free of any I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cinerent Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │           Boundary layer (HTTP, auth, CRUD, not here)           │   │
//! │  │    POST /rent ──► POST /return ──► PUT /movies/:id/capacity     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          cinerent-db coordinators (one transaction each)        │   │
//! │  │    RentalCoordinator, ReturnCoordinator, CapacityAdjuster       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ asks                                   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ cinerent-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │ inventory │  │ validation│  │   │
//! │  │   │  Rental   │  │   Money   │  │ CopyState │  │ end dates │  │   │
//! │  │   │  Payment  │  │  debits   │  │ResizePlan │  │  targets  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Movie, Copy, User, Rental, Payment)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`inventory`] - Copy state machine, copy counts and resize planning
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation (end dates, capacity targets)
//!
//! ## Example Usage
//!
//! ```rust
//! use cinerent_core::inventory::{plan_resize, CopyCounts, ResizePlan};
//!
//! // 2 on the shelf, 1 out with a customer, 1 retired
//! let counts = CopyCounts::new(2, 1, 1);
//!
//! // Growing to 5 reactivates the retired copy before minting a new one
//! let plan = plan_resize(&counts, 5).unwrap();
//! assert_eq!(plan, ResizePlan::Grow { reactivate: 1, create: 1 });
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod inventory;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use inventory::{plan_resize, CopyCounts, CopyState, ResizePlan};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Upper bound for a capacity target.
///
/// Keeps a typo in an admin form (10000 instead of 10) from minting
/// thousands of copy rows inside a single transaction.
pub const MAX_COPIES_PER_MOVIE: i64 = 1000;
