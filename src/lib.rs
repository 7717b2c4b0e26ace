//! Element-wise averaging of parallel numeric vectors.
//!
//! [`average`] holds the averaging routines (plain, weighted, NaN-skipping),
//! [`weights`] derives per-block weights from block sizes, and [`config`] /
//! [`job`] drive both from a TOML job file.

pub mod average;
pub mod config;
pub mod job;
pub mod weights;
