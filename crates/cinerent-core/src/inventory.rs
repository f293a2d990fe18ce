//! # Inventory Module
//!
//! The copy lifecycle and the arithmetic behind capacity changes.
//!
//! ## Copy State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │                 reserve (rent)                                          │
//! │   ┌───────────┐ ─────────────────► ┌──────────┐                         │
//! │   │ available │                    │  rented  │                         │
//! │   └───────────┘ ◄───────────────── └──────────┘                         │
//! │      ▲     │     release (movie active)  │                              │
//! │      │     │                             │ release (movie deactivated)  │
//! │  set │     │ set (shrink / deactivate)   ▼                              │
//! │      │     │                       ┌──────────┐                         │
//! │      │     └─────────────────────► │ inactive │                         │
//! │      └──────────────────────────── └──────────┘                         │
//! │           set (grow / reactivate)                                       │
//! │                                                                         │
//! │  Copies are never deleted, only relabeled.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only `reserve` may enter `rented`, and only `release` may leave it. A
//! direct `set` never touches a rented copy.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Copy State
// =============================================================================

/// Lifecycle state of one rentable copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CopyState {
    /// On the shelf, can be rented.
    Available,
    /// Pinned by exactly one active rental.
    Rented,
    /// Retired by a shrink or a movie deactivation.
    Inactive,
}

impl CopyState {
    /// Storage/wire name of the state.
    pub const fn as_str(&self) -> &'static str {
        match self {
            CopyState::Available => "available",
            CopyState::Rented => "rented",
            CopyState::Inactive => "inactive",
        }
    }

    /// Whether a direct `set_state` may move a copy from `self` to `to`.
    ///
    /// Rented copies are owned by their rental: only release can move them.
    /// Nothing may be `set` into `rented` either, that is what reserve is for.
    pub const fn can_set_to(&self, to: CopyState) -> bool {
        !matches!(self, CopyState::Rented) && !matches!(to, CopyState::Rented)
    }

    /// Target state of a release, depending on whether the movie is active.
    pub const fn released(movie_active: bool) -> CopyState {
        if movie_active {
            CopyState::Available
        } else {
            CopyState::Inactive
        }
    }
}

impl fmt::Display for CopyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checks a direct transition, returning `InvalidTransition` if it is illegal.
pub fn check_set_state(copy_id: &str, from: CopyState, to: CopyState) -> CoreResult<()> {
    if from.can_set_to(to) {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            copy_id: copy_id.to_string(),
            from,
            to,
        })
    }
}

// =============================================================================
// Copy Counts
// =============================================================================

/// Per-state copy counts for one movie.
///
/// `total` is every copy ever created for the movie, since copies are
/// never deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CopyCounts {
    pub total: i64,
    pub available: i64,
    pub rented: i64,
    pub inactive: i64,
}

impl CopyCounts {
    /// Builds counts from the three states; `total` is derived.
    pub const fn new(available: i64, rented: i64, inactive: i64) -> Self {
        CopyCounts {
            total: available + rented + inactive,
            available,
            rented,
            inactive,
        }
    }

    /// Copies that count toward capacity (everything not retired).
    #[inline]
    pub const fn in_service(&self) -> i64 {
        self.available + self.rented
    }

    /// Adds `n` copies in `state`.
    pub fn record(&mut self, state: CopyState, n: i64) {
        match state {
            CopyState::Available => self.available += n,
            CopyState::Rented => self.rented += n,
            CopyState::Inactive => self.inactive += n,
        }
        self.total += n;
    }
}

// =============================================================================
// Resize Planning
// =============================================================================

/// What the copy pool has to do to reach a capacity target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizePlan {
    /// Target already matches the in-service count.
    Unchanged,
    /// Reactivate retired copies first, then mint `create` new ones.
    Grow { reactivate: i64, create: i64 },
    /// Retire this many `available` copies.
    Shrink { retire: i64 },
}

/// Plans a resize of a pool with `counts` toward `target` in-service copies.
///
/// ## Decision Table
/// ```text
/// in_service = available + rented
///
/// target == in_service  → Unchanged
/// target >  in_service  → shortfall = target - in_service
///                         reactivate = min(shortfall, inactive)
///                         create     = shortfall - reactivate
/// target <  in_service  → excess = in_service - target
///                         excess > available → CapacityBelowRented
///                         otherwise          → Shrink { retire: excess }
/// ```
///
/// Errors carry an empty `movie_id`; the caller fills it in.
pub fn plan_resize(counts: &CopyCounts, target: i64) -> CoreResult<ResizePlan> {
    let in_service = counts.in_service();

    if target == in_service {
        return Ok(ResizePlan::Unchanged);
    }

    if target > in_service {
        let shortfall = target - in_service;
        let reactivate = shortfall.min(counts.inactive);
        return Ok(ResizePlan::Grow {
            reactivate,
            create: shortfall - reactivate,
        });
    }

    let excess = in_service - target;
    if excess > counts.available {
        return Err(CoreError::CapacityBelowRented {
            movie_id: String::new(),
            target,
            rented: counts.rented,
            available: counts.available,
        });
    }

    Ok(ResizePlan::Shrink { retire: excess })
}

impl ResizePlan {
    /// Counts the pool will have once the plan is applied.
    pub fn apply(&self, counts: &CopyCounts) -> CopyCounts {
        match *self {
            ResizePlan::Unchanged => *counts,
            ResizePlan::Grow { reactivate, create } => CopyCounts::new(
                counts.available + reactivate + create,
                counts.rented,
                counts.inactive - reactivate,
            ),
            ResizePlan::Shrink { retire } => CopyCounts::new(
                counts.available - retire,
                counts.rented,
                counts.inactive + retire,
            ),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rented_copies_cannot_be_set() {
        assert!(!CopyState::Rented.can_set_to(CopyState::Inactive));
        assert!(!CopyState::Rented.can_set_to(CopyState::Available));
        assert!(!CopyState::Available.can_set_to(CopyState::Rented));
        assert!(CopyState::Available.can_set_to(CopyState::Inactive));
        assert!(CopyState::Inactive.can_set_to(CopyState::Available));

        let err = check_set_state("c-1", CopyState::Rented, CopyState::Inactive).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
    }

    #[test]
    fn test_release_target_follows_movie_flag() {
        assert_eq!(CopyState::released(true), CopyState::Available);
        assert_eq!(CopyState::released(false), CopyState::Inactive);
    }

    #[test]
    fn test_grow_prefers_reactivation() {
        let counts = CopyCounts::new(2, 1, 1);
        let plan = plan_resize(&counts, 5).unwrap();
        assert_eq!(plan, ResizePlan::Grow { reactivate: 1, create: 1 });
        assert_eq!(plan.apply(&counts), CopyCounts::new(4, 1, 0));
    }

    #[test]
    fn test_grow_within_retired_pool_creates_nothing() {
        let counts = CopyCounts::new(0, 0, 4);
        let plan = plan_resize(&counts, 3).unwrap();
        assert_eq!(plan, ResizePlan::Grow { reactivate: 3, create: 0 });
        assert_eq!(plan.apply(&counts).total, 4);
    }

    #[test]
    fn test_equal_target_is_noop() {
        let counts = CopyCounts::new(2, 1, 7);
        assert_eq!(plan_resize(&counts, 3).unwrap(), ResizePlan::Unchanged);
    }

    #[test]
    fn test_shrink_retires_available_only() {
        let counts = CopyCounts::new(3, 2, 0);
        let plan = plan_resize(&counts, 2).unwrap();
        assert_eq!(plan, ResizePlan::Shrink { retire: 3 });
        assert_eq!(plan.apply(&counts), CopyCounts::new(0, 2, 3));
    }

    #[test]
    fn test_shrink_below_rented_is_refused() {
        let counts = CopyCounts::new(3, 2, 0);
        let err = plan_resize(&counts, 1).unwrap_err();
        assert!(matches!(
            err,
            CoreError::CapacityBelowRented { rented: 2, available: 3, target: 1, .. }
        ));
    }

    #[test]
    fn test_total_is_conserved_by_every_plan() {
        let counts = CopyCounts::new(2, 1, 1);
        for target in 1..=6 {
            let plan = plan_resize(&counts, target).unwrap();
            let after = plan.apply(&counts);
            assert_eq!(after.in_service(), target);
            // growing may add copies, nothing else changes the total
            if let ResizePlan::Grow { create, .. } = plan {
                assert_eq!(after.total, counts.total + create);
            } else {
                assert_eq!(after.total, counts.total);
            }
        }
    }

    #[test]
    fn test_state_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&CopyState::Inactive).unwrap(), "\"inactive\"");
        assert_eq!(CopyState::Rented.to_string(), "rented");
    }
}
