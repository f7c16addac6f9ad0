//! Provides input/output functionality for trajectory and structure files.
//!
//! Each supported format lives in its own module and implements the
//! [`traits::TrajectoryReader`] and/or [`traits::TrajectoryWriter`] traits. The
//! [`format`] module ties them together behind a single dispatch point, while
//! [`sidecar`] and [`dat`] cover the plain-text tables that accompany VASP runs and
//! the data files produced by the workflows.

pub mod cif;
pub mod dat;
pub mod extxyz;
pub mod format;
pub mod outcar;
pub mod poscar;
pub mod selection;
pub mod sidecar;
pub mod traits;
pub mod vasprun;
