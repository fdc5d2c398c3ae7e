//! Filter operations
//!
//! This module provides the mean (box-blur) filter and its per-pixel averager.

/// Neighborhood averaging for a single pixel
mod neighborhood;
pub use neighborhood::*;

/// Mean filter operations
mod ops;
pub use ops::*;
