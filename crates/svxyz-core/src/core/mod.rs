//! # Core Module
//!
//! The foundation of svxyz: data models for trajectory frames, readers and writers for
//! the structure and trajectory formats produced by VASP and ASE-style tools, and the
//! numerical routines used to derive per-frame properties.
//!
//! ## Architecture
//!
//! - **Frame Representation** ([`models`]) - Frames, simulation cells, Voigt tensors and
//!   the element table
//! - **File I/O** ([`io`]) - Extended XYZ, POSCAR, OUTCAR, vasprun.xml, sidecar data
//!   files and `.dat` column tables
//! - **Analysis** ([`analysis`]) - Force/stress/virial derivations, pair distances and
//!   Gaussian kernel density estimation
//! - **Units** ([`units`]) - Conversion constants shared by all of the above

pub mod analysis;
pub mod io;
pub mod models;
pub mod units;
