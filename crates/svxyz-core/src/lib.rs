//! # svxyz Core Library
//!
//! Post-processing toolkit for atomistic simulation trajectories (molecular dynamics and
//! ab-initio relaxations): per-frame property extraction, threshold-based frame triage,
//! structure format conversion and distribution plots of extracted series.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer layout:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Frame`, `Cell`, `Voigt`), file
//!   format readers and writers, and pure property computations (force norms, stresses,
//!   pair distances, kernel density estimates).
//!
//! - **[`engine`]: The Filter Core.** Field records built from frames, the ordered
//!   predicate conjunction used to triage frames, frame windowing, configuration
//!   builders, errors and progress reporting.
//!
//! - **[`workflows`]: The Public API.** Complete procedures (`triage`, `extract`, `plot`,
//!   `convert`, `analyze`) that tie `core` and `engine` together and return reports
//!   suitable for printing.

pub mod core;
pub mod engine;
pub mod workflows;
