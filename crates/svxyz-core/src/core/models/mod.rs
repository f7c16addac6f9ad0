//! # Core Models Module
//!
//! Data structures describing a single trajectory frame and the quantities attached to it.
//!
//! ## Key Components
//!
//! - [`frame`] - A frame: species, Cartesian positions, optional cell, calculator results
//!   and an ordered map of extra annotations
//! - [`cell`] - The periodic simulation cell with volume, lattice parameters and
//!   minimum-image displacements
//! - [`voigt`] - Six-component symmetric tensors (stress, virial) in `xx yy zz yz xz xy` order
//! - [`element`] - Chemical element symbols recognised by the readers and filters
//!
//! ## Usage
//!
//! ```ignore
//! use svxyz::core::models::{cell::Cell, frame::Frame};
//! use nalgebra::{Matrix3, Point3};
//!
//! let mut frame = Frame::new(
//!     vec!["O".into(), "H".into(), "H".into()],
//!     vec![Point3::origin(), Point3::new(0.96, 0.0, 0.0), Point3::new(-0.24, 0.93, 0.0)],
//! );
//! frame.set_cell(Cell::new(Matrix3::identity() * 10.0));
//! assert!((frame.volume().unwrap() - 1000.0).abs() < 1e-9);
//! ```

pub mod cell;
pub mod element;
pub mod frame;
pub mod voigt;
