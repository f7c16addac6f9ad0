//! Space-group detection of periodic structures.

use crate::core::models::frame::Frame;
use moyo::MoyoDataset;
use moyo::base::AngleTolerance;
use moyo::data::Setting;
use moyo::base::{Cell as MoyoCell, Lattice};
use moyo::data::hall_symbol_entry;
use nalgebra::Vector3;
use serde::Serialize;
use std::io::{self, Write};
use thiserror::Error;

/// Default symmetry tolerance (Å).
pub const DEFAULT_SYMPREC: f64 = 0.01;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SymmetryError {
    #[error("Symmetry analysis needs a periodic cell")]
    NoCell,
    #[error("The cell is degenerate")]
    DegenerateCell,
    #[error("Tolerance must be a positive number, got {0}")]
    InvalidTolerance(f64),
    #[error("Space group search failed: {0}")]
    Detection(String),
    #[error("No Hall symbol entry for Hall number {0}")]
    UnknownHallNumber(i32),
}

/// The symmetry of a structure at a given tolerance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymmetryInfo {
    /// Short Hermann-Mauguin symbol, e.g. `Fm-3m`.
    pub space_group_symbol: String,
    pub space_group_number: i32,
    pub crystal_system: &'static str,
    pub point_group: &'static str,
    pub symprec: f64,
}

impl SymmetryInfo {
    /// Writes the `Symmetry Information:` block, every entry prefixed by `indent`.
    pub fn write(&self, writer: &mut impl Write, indent: &str) -> io::Result<()> {
        writeln!(writer, "Symmetry Information:")?;
        writeln!(writer, "{}space_group_symbol: {}", indent, self.space_group_symbol)?;
        writeln!(writer, "{}space_group_number: {}", indent, self.space_group_number)?;
        writeln!(writer, "{}crystal_system: {}", indent, self.crystal_system)?;
        writeln!(writer, "{}point_group: {}", indent, self.point_group)?;
        writeln!(writer)
    }
}

// Last space-group number of each crystallographic point group.
const POINT_GROUPS: [(i32, &str); 32] = [
    (1, "1"),
    (2, "-1"),
    (5, "2"),
    (9, "m"),
    (15, "2/m"),
    (24, "222"),
    (46, "mm2"),
    (74, "mmm"),
    (80, "4"),
    (82, "-4"),
    (88, "4/m"),
    (98, "422"),
    (110, "4mm"),
    (122, "-42m"),
    (142, "4/mmm"),
    (146, "3"),
    (148, "-3"),
    (155, "32"),
    (161, "3m"),
    (167, "-3m"),
    (173, "6"),
    (174, "-6"),
    (176, "6/m"),
    (182, "622"),
    (186, "6mm"),
    (190, "-6m2"),
    (194, "6/mmm"),
    (199, "23"),
    (206, "m-3"),
    (214, "432"),
    (220, "-43m"),
    (230, "m-3m"),
];

const CRYSTAL_SYSTEMS: [(i32, &str); 7] = [
    (2, "triclinic"),
    (15, "monoclinic"),
    (74, "orthorhombic"),
    (142, "tetragonal"),
    (167, "trigonal"),
    (194, "hexagonal"),
    (230, "cubic"),
];

fn lookup(table: &[(i32, &'static str)], number: i32) -> Option<&'static str> {
    if number < 1 {
        return None;
    }
    table
        .iter()
        .find(|(last, _)| number <= *last)
        .map(|(_, name)| *name)
}

/// Point group (Hermann-Mauguin) of space group `number`.
pub fn point_group(number: i32) -> Option<&'static str> {
    lookup(&POINT_GROUPS, number)
}

pub fn crystal_system(number: i32) -> Option<&'static str> {
    lookup(&CRYSTAL_SYSTEMS, number)
}

/// Finds the space group of `frame` with distance tolerance `symprec` (Å).
///
/// Species are told apart by symbol only; the frame's `pbc` flags are ignored because a
/// space group is only defined for a fully periodic crystal.
pub fn analyze(frame: &Frame, symprec: f64) -> Result<SymmetryInfo, SymmetryError> {
    if !(symprec.is_finite() && symprec > 0.0) {
        return Err(SymmetryError::InvalidTolerance(symprec));
    }
    let cell = frame.cell.as_ref().ok_or(SymmetryError::NoCell)?;
    if cell.is_degenerate() {
        return Err(SymmetryError::DegenerateCell);
    }

    let positions: Vec<Vector3<f64>> = frame
        .positions
        .iter()
        .map(|p| cell.to_fractional(&p.coords))
        .collect::<Option<_>>()
        .ok_or(SymmetryError::DegenerateCell)?;
    let mut seen: Vec<&str> = Vec::new();
    let mut numbers: Vec<i32> = Vec::with_capacity(frame.len());
    for symbol in &frame.symbols {
        let index = match seen.iter().position(|k| *k == symbol.as_str()) {
            Some(i) => i,
            None => {
                seen.push(symbol.as_str());
                seen.len() - 1
            }
        };
        numbers.push(index as i32 + 1);
    }

    let moyo_cell = MoyoCell::new(Lattice::new(*cell.matrix()), positions, numbers);
    let dataset = MoyoDataset::new(&moyo_cell, symprec, AngleTolerance::Default, Setting::Spglib)
        .map_err(|e| SymmetryError::Detection(e.to_string()))?;
    let entry = hall_symbol_entry(dataset.hall_number)
        .ok_or(SymmetryError::UnknownHallNumber(dataset.hall_number))?;
    let number = dataset.number;

    Ok(SymmetryInfo {
        space_group_symbol: entry.hm_short.split_whitespace().collect(),
        space_group_number: number,
        crystal_system: crystal_system(number).unwrap_or("unknown"),
        point_group: point_group(number).unwrap_or("unknown"),
        symprec,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::cell::Cell;
    use nalgebra::{Matrix3, Point3};

    fn cubic(a: f64, atoms: &[(&str, [f64; 3])]) -> Frame {
        let cell = Cell::new(Matrix3::identity() * a);
        let mut frame = Frame::new(
            atoms.iter().map(|(s, _)| s.to_string()).collect(),
            atoms
                .iter()
                .map(|(_, f)| Point3::from(cell.to_cartesian(&Vector3::from(*f))))
                .collect(),
        );
        frame.set_cell(cell);
        frame
    }

    #[test]
    fn point_groups_and_systems_follow_space_group_ranges() {
        assert_eq!(point_group(1), Some("1"));
        assert_eq!(point_group(14), Some("2/m"));
        assert_eq!(point_group(62), Some("mmm"));
        assert_eq!(point_group(166), Some("-3m"));
        assert_eq!(point_group(194), Some("6/mmm"));
        assert_eq!(point_group(216), Some("-43m"));
        assert_eq!(point_group(225), Some("m-3m"));
        assert_eq!(point_group(0), None);
        assert_eq!(point_group(231), None);
        assert_eq!(crystal_system(2), Some("triclinic"));
        assert_eq!(crystal_system(3), Some("monoclinic"));
        assert_eq!(crystal_system(143), Some("trigonal"));
        assert_eq!(crystal_system(168), Some("hexagonal"));
        assert_eq!(crystal_system(230), Some("cubic"));
    }

    #[test]
    fn caesium_chloride_is_pm3m() {
        let frame = cubic(4.11, &[("Cs", [0.0, 0.0, 0.0]), ("Cl", [0.5, 0.5, 0.5])]);
        let info = analyze(&frame, DEFAULT_SYMPREC).unwrap();
        assert_eq!(info.space_group_number, 221);
        assert_eq!(info.space_group_symbol, "Pm-3m");
        assert_eq!(info.crystal_system, "cubic");
        assert_eq!(info.point_group, "m-3m");
    }

    #[test]
    fn identical_species_raise_the_symmetry() {
        let frame = cubic(3.0, &[("Fe", [0.0, 0.0, 0.0]), ("Fe", [0.5, 0.5, 0.5])]);
        let info = analyze(&frame, DEFAULT_SYMPREC).unwrap();
        assert_eq!(info.space_group_number, 229);
        assert_eq!(info.space_group_symbol, "Im-3m");
    }

    #[test]
    fn tolerance_absorbs_small_displacements() {
        let frame = cubic(4.0, &[("Cs", [0.0, 0.0, 0.0]), ("Cl", [0.5, 0.5, 0.501])]);
        assert_eq!(analyze(&frame, 0.1).unwrap().space_group_number, 221);
        assert_ne!(analyze(&frame, 1e-4).map(|i| i.space_group_number), Ok(221));
    }

    #[test]
    fn structures_without_a_cell_or_tolerance_are_rejected() {
        let molecule = Frame::new(vec!["H".into()], vec![Point3::origin()]);
        assert_eq!(analyze(&molecule, 0.01), Err(SymmetryError::NoCell));
        let frame = cubic(4.0, &[("Cs", [0.0, 0.0, 0.0])]);
        assert_eq!(analyze(&frame, 0.0), Err(SymmetryError::InvalidTolerance(0.0)));
        assert!(matches!(
            analyze(&frame, f64::NAN),
            Err(SymmetryError::InvalidTolerance(_))
        ));
    }

    #[test]
    fn block_lists_every_entry() {
        let info = SymmetryInfo {
            space_group_symbol: "Fm-3m".into(),
            space_group_number: 225,
            crystal_system: "cubic",
            point_group: "m-3m",
            symprec: 0.01,
        };
        let mut out = Vec::new();
        info.write(&mut out, "  ").unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Symmetry Information:\n  space_group_symbol: Fm-3m\n  space_group_number: 225\n  crystal_system: cubic\n  point_group: m-3m\n\n"
        );
    }
}
