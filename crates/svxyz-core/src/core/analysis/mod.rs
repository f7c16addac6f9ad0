//! Derived per-frame quantities and statistics over extracted series.

pub mod distance;
pub mod kde;
pub mod properties;
pub mod symmetry;
