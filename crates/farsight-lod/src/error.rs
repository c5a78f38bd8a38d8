//! Contract-violation errors for region operations.
//!
//! Missing data and stale generation requests are not errors: they surface as
//! absent records and `Ok(false)` writes.

use crate::level_pos::{LevelPos, REGION_DETAIL_LEVEL, RegionPos};

/// Errors returned when a caller breaks the contract of a region operation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LodError {
    /// The detail level is coarser than a region can hold.
    #[error("detail level {0} exceeds the maximum of {REGION_DETAIL_LEVEL}")]
    DetailLevelOutOfRange(u8),

    /// The detail level is finer than the region currently stores.
    #[error("detail level {requested} is below the region minimum of {minimum}")]
    LevelBelowMinimum {
        /// Level asked for.
        requested: u8,
        /// Finest level the region holds.
        minimum: u8,
    },

    /// The position belongs to a different region.
    #[error("{pos} lies outside region {region}")]
    OutsideRegion {
        /// Offending position.
        pos: LevelPos,
        /// Region that received the call.
        region: RegionPos,
    },

    /// A level container was built from the wrong number of records.
    #[error("level {detail} needs {expected} records, got {actual}")]
    LevelSizeMismatch {
        /// Detail level of the container.
        detail: u8,
        /// Records required at that level.
        expected: usize,
        /// Records supplied.
        actual: usize,
    },

    /// Distance policy settings are inconsistent.
    #[error("invalid detail distance settings: {0}")]
    InvalidSettings(String),
}

/// Reject detail levels a region can never hold.
pub(crate) fn check_detail(detail: u8) -> Result<(), LodError> {
    if detail > REGION_DETAIL_LEVEL {
        Err(LodError::DetailLevelOutOfRange(detail))
    } else {
        Ok(())
    }
}
