//! # Workflows Module
//!
//! High-level entry points, one per tool of the suite. Each workflow takes a validated
//! configuration and a [`ProgressReporter`](crate::engine::progress::ProgressReporter),
//! performs the complete read → transform → write pipeline and returns a report for
//! display.
//!
//! - **Triage** ([`triage`]) - Window and filter frames from many inputs into one
//!   extended XYZ file
//! - **Extraction** ([`extract`]) - Write per-frame series tables (`E.dat`, `F.dat`, ...)
//! - **Plotting** ([`plot`]) - Density and projection figures of series tables
//! - **Conversion** ([`convert`]) - Format conversion of a frame selection, and single
//!   frame export to `POSCAR<index>`
//! - **Structure analysis** ([`analyze`]) - Pair-distance classes and lattice summary

pub mod analyze;
pub mod convert;
pub mod extract;
pub mod plot;
pub mod triage;
