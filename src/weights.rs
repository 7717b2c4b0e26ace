//! Per-block weights for averaging statistics across blocks (batches).
//!
//! The weights returned here are meant to be passed to
//! [`compute_weighted`](crate::average::compute_weighted), one per block.

use num_traits::AsPrimitive;
use serde::{Deserialize, Serialize};

/// Policy for weighting blocks based on their size.
///
/// - `None`: the weight is the block size, so larger blocks contribute more.
/// - `Equal`: every non-empty block has the same weight.
/// - `Variable`: see [`compute_variable`]. Small blocks with unreliable
///   statistics are penalized while all large blocks are weighted equally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    None,
    Variable,
    Equal,
}

/// Bounds for [`compute_variable`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariableParameters {
    /// Blocks smaller than this have zero weight. Should be non-negative.
    pub lower_bound: f64,
    /// Blocks at least this large have unit weight. Should not be less than `lower_bound`.
    pub upper_bound: f64,
}

impl VariableParameters {
    pub fn new(lower_bound: f64, upper_bound: f64) -> Self {
        Self {
            lower_bound,
            upper_bound,
        }
    }
}

impl Default for VariableParameters {
    fn default() -> Self {
        Self::new(0.0, 1000.0)
    }
}

/// Weight of a single block of the given size.
///
/// Zero below the lower bound (or for an empty block), one at or above the
/// upper bound, and increasing linearly from 0 to 1 in between. Equal bounds
/// give a step from 0 to 1 at the bound.
pub fn compute_variable(size: f64, params: &VariableParameters) -> f64 {
    if size < params.lower_bound || size == 0.0 {
        return 0.0;
    }

    if size >= params.upper_bound {
        return 1.0;
    }

    (size - params.lower_bound) / (params.upper_bound - params.lower_bound)
}

/// Weights for multiple blocks, one per entry of `sizes`.
pub fn compute<S>(sizes: &[S], policy: Policy, variable: &VariableParameters) -> Vec<f64>
where
    S: AsPrimitive<f64>,
{
    let sizes = sizes.iter().map(|&size| size.as_());
    match policy {
        Policy::None => sizes.collect(),
        Policy::Equal => sizes
            .map(|size| if size > 0.0 { 1.0 } else { 0.0 })
            .collect(),
        Policy::Variable => sizes
            .map(|size| compute_variable(size, variable))
            .collect(),
    }
}
