use super::cell::Cell;
use super::voigt::Voigt;
use nalgebra::{Point3, Vector3};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A free-form annotation attached to a frame.
///
/// Extended XYZ comment lines carry arbitrary `key=value` pairs; everything that is not
/// interpreted structurally (lattice, energy, stress, ...) ends up here.
#[derive(Debug, Clone, PartialEq)]
pub enum InfoValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    Text(String),
    FloatArray(Vec<f64>),
}

impl InfoValue {
    /// Interprets the value as a single number.
    ///
    /// Text is parsed if it holds exactly one number; anything else yields `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            InfoValue::Float(v) => Some(*v),
            InfoValue::Int(v) => Some(*v as f64),
            InfoValue::Text(s) => s.trim().parse().ok(),
            InfoValue::FloatArray(v) if v.len() == 1 => Some(v[0]),
            _ => None,
        }
    }

    /// Interprets the value as a list of numbers.
    ///
    /// Text is split on commas and whitespace (`"1.0, 2.0"` and `"1.0 2.0"` both work);
    /// a single token that fails to parse makes the whole value unconvertible.
    pub fn as_f64_vec(&self) -> Option<Vec<f64>> {
        match self {
            InfoValue::FloatArray(v) => Some(v.clone()),
            InfoValue::Float(v) => Some(vec![*v]),
            InfoValue::Int(v) => Some(vec![*v as f64]),
            InfoValue::Text(s) => s
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|t| !t.is_empty())
                .map(|t| t.parse::<f64>().ok())
                .collect(),
            InfoValue::Bool(_) => None,
        }
    }
}

impl fmt::Display for InfoValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // `{:?}` keeps the decimal point on integral values so they read back as floats.
            InfoValue::Float(v) => write!(f, "{:?}", v),
            InfoValue::Int(v) => write!(f, "{}", v),
            InfoValue::Bool(b) => f.write_str(if *b { "T" } else { "F" }),
            InfoValue::Text(s) => f.write_str(s),
            InfoValue::FloatArray(values) => {
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", v)?;
                }
                Ok(())
            }
        }
    }
}

/// A single configuration of a trajectory.
///
/// Units follow the extended XYZ conventions: positions in Å, energy in eV, forces in
/// eV/Å and stress in eV/Å³ with tensile stress positive.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    /// Chemical symbol of each atom.
    pub symbols: Vec<String>,
    /// Cartesian coordinates of each atom.
    pub positions: Vec<Point3<f64>>,
    /// Periodic cell, if the frame has one.
    pub cell: Option<Cell>,
    /// Periodicity along each lattice vector.
    pub pbc: [bool; 3],
    /// Potential energy.
    pub energy: Option<f64>,
    /// Per-atom forces, same length as `positions` when present.
    pub forces: Option<Vec<Vector3<f64>>>,
    /// Stress tensor (tensile positive).
    pub stress: Option<Voigt>,
    /// Additional annotations in insertion-independent (sorted) order.
    pub info: BTreeMap<String, InfoValue>,
}

impl Frame {
    pub fn new(symbols: Vec<String>, positions: Vec<Point3<f64>>) -> Self {
        Self {
            symbols,
            positions,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Attaches a cell and marks the frame periodic in all directions.
    pub fn set_cell(&mut self, cell: Cell) {
        self.cell = Some(cell);
        self.pbc = [true; 3];
    }

    pub fn is_periodic(&self) -> bool {
        self.cell.is_some() && self.pbc.iter().any(|&p| p)
    }

    pub fn volume(&self) -> Option<f64> {
        self.cell.as_ref().map(Cell::volume)
    }

    /// Distinct species present in the frame.
    pub fn species(&self) -> BTreeSet<String> {
        self.symbols.iter().cloned().collect()
    }

    /// Species in order of first appearance, with their counts.
    pub fn composition(&self) -> Vec<(String, usize)> {
        let mut out: Vec<(String, usize)> = Vec::new();
        for symbol in &self.symbols {
            match out.iter_mut().find(|(s, _)| s == symbol) {
                Some((_, n)) => *n += 1,
                None => out.push((symbol.clone(), 1)),
            }
        }
        out
    }

    /// Hill-like formula in order of first appearance (`Fe2O3`).
    pub fn formula(&self) -> String {
        self.composition()
            .into_iter()
            .map(|(s, n)| if n == 1 { s } else { format!("{}{}", s, n) })
            .collect()
    }

    pub fn info_f64(&self, key: &str) -> Option<f64> {
        self.info.get(key).and_then(InfoValue::as_f64)
    }

    pub fn set_info(&mut self, key: impl Into<String>, value: InfoValue) {
        self.info.insert(key.into(), value);
    }

    /// Checks the per-atom arrays agree in length.
    pub fn validate(&self) -> Result<(), String> {
        if self.symbols.len() != self.positions.len() {
            return Err(format!(
                "{} symbols but {} positions",
                self.symbols.len(),
                self.positions.len()
            ));
        }
        if let Some(forces) = &self.forces {
            if forces.len() != self.positions.len() {
                return Err(format!(
                    "{} forces but {} positions",
                    forces.len(),
                    self.positions.len()
                ));
            }
        }
        Ok(())
    }
}
