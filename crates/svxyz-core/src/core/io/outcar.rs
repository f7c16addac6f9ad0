use crate::core::io::traits::TrajectoryReader;
use crate::core::models::cell::Cell;
use crate::core::models::element::{is_valid_symbol, normalize_symbol};
use crate::core::models::frame::Frame;
use crate::core::models::voigt::Voigt;
use crate::core::units::{EV_PER_A3_TO_GPA, KBAR_TO_GPA};
use nalgebra::{Point3, Vector3};
use regex::Regex;
use std::io::{self, BufRead};
use std::sync::LazyLock;
use thiserror::Error;

static TEMPERATURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"kin\. lattice\s+EKIN_LAT=.*\(temperature\s+([\d\.]+)\s+K\)")
        .expect("temperature pattern is valid")
});

#[derive(Debug, Error)]
pub enum OutcarError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: OutcarParseErrorKind },
    #[error("Missing required record: {0}")]
    MissingRecord(&'static str),
}

#[derive(Debug, Error, PartialEq)]
pub enum OutcarParseErrorKind {
    #[error("Invalid number '{value}' in {section}")]
    InvalidFloat { section: &'static str, value: String },
    #[error("Section {0} is truncated")]
    Truncated(&'static str),
    #[error("Invalid species label '{0}'")]
    InvalidSpecies(String),
    #[error("{species} species but {counts} ion counts")]
    CountMismatch { species: usize, counts: usize },
}

pub struct OutcarFile;

#[derive(Default)]
struct Pending {
    cell: Option<Cell>,
    stress: Option<Voigt>,
    positions: Option<Vec<Point3<f64>>>,
    forces: Option<Vec<Vector3<f64>>>,
}

fn numbers(line: &str, section: &'static str, line_num: usize) -> Result<Vec<f64>, OutcarError> {
    line.split_whitespace()
        .map(|t| {
            t.parse::<f64>().map_err(|_| OutcarError::Parse {
                line: line_num,
                kind: OutcarParseErrorKind::InvalidFloat {
                    section,
                    value: t.to_string(),
                },
            })
        })
        .collect()
}

fn truncated(line: usize, section: &'static str) -> OutcarError {
    OutcarError::Parse {
        line,
        kind: OutcarParseErrorKind::Truncated(section),
    }
}

fn kbar_to_tensile(values: [f64; 6]) -> Voigt {
    // OUTCAR prints pressure-like (compressive positive) kB.
    -(Voigt::from_vasp_order(values) * (KBAR_TO_GPA / EV_PER_A3_TO_GPA))
}

impl TrajectoryReader for OutcarFile {
    type Error = OutcarError;

    fn read_frames(reader: &mut impl BufRead) -> Result<Vec<Frame>, Self::Error> {
        let all: Vec<String> = reader.lines().collect::<Result<_, _>>()?;
        let mut species: Vec<String> = Vec::new();
        let mut counts: Vec<usize> = Vec::new();
        let mut symbols: Vec<String> = Vec::new();
        let mut pending = Pending::default();
        let mut in_energy_block = false;
        let mut frames = Vec::new();

        let mut i = 0;
        while i < all.len() {
            let line = &all[i];
            let line_num = i + 1;

            if let Some(rest) = line.trim_start().strip_prefix("VRHFIN") {
                let label = rest
                    .trim_start_matches([' ', '='])
                    .split(':')
                    .next()
                    .unwrap_or("")
                    .trim();
                let symbol = normalize_symbol(label);
                if !is_valid_symbol(&symbol) {
                    return Err(OutcarError::Parse {
                        line: line_num,
                        kind: OutcarParseErrorKind::InvalidSpecies(label.to_string()),
                    });
                }
                species.push(symbol);
            } else if line.contains("ions per type =") {
                let tail = line.split('=').nth(1).unwrap_or("");
                counts = tail
                    .split_whitespace()
                    .map(|t| {
                        t.parse::<usize>().map_err(|_| OutcarError::Parse {
                            line: line_num,
                            kind: OutcarParseErrorKind::InvalidFloat {
                                section: "ions per type",
                                value: t.to_string(),
                            },
                        })
                    })
                    .collect::<Result<_, _>>()?;
            } else if line.contains("direct lattice vectors") {
                let mut rows = [Vector3::zeros(); 3];
                for (k, row) in rows.iter_mut().enumerate() {
                    let next = all
                        .get(i + 1 + k)
                        .ok_or_else(|| truncated(line_num + 1 + k, "direct lattice vectors"))?;
                    let v = numbers(next, "direct lattice vectors", line_num + 1 + k)?;
                    if v.len() < 3 {
                        return Err(truncated(line_num + 1 + k, "direct lattice vectors"));
                    }
                    *row = Vector3::new(v[0], v[1], v[2]);
                }
                pending.cell = Some(Cell::from_vectors(rows[0], rows[1], rows[2]));
                i += 3;
            } else if line.trim_start().starts_with("in kB") {
                let v = numbers(
                    line.trim_start().trim_start_matches("in kB"),
                    "in kB",
                    line_num,
                )?;
                let values: [f64; 6] = v
                    .get(..6)
                    .and_then(|s| s.try_into().ok())
                    .ok_or_else(|| truncated(line_num, "in kB"))?;
                pending.stress = Some(kbar_to_tensile(values));
            } else if line.contains("POSITION") && line.contains("TOTAL-FORCE") {
                if symbols.is_empty() {
                    if species.len() != counts.len() {
                        return Err(OutcarError::Parse {
                            line: line_num,
                            kind: OutcarParseErrorKind::CountMismatch {
                                species: species.len(),
                                counts: counts.len(),
                            },
                        });
                    }
                    symbols = species
                        .iter()
                        .zip(&counts)
                        .flat_map(|(s, &n)| std::iter::repeat_n(s.clone(), n))
                        .collect();
                }
                let n = symbols.len();
                let mut positions = Vec::with_capacity(n);
                let mut forces = Vec::with_capacity(n);
                // Skip the dashed separator under the header.
                for k in 0..n {
                    let idx = i + 2 + k;
                    let row = all
                        .get(idx)
                        .ok_or_else(|| truncated(idx + 1, "POSITION/TOTAL-FORCE"))?;
                    let v = numbers(row, "POSITION/TOTAL-FORCE", idx + 1)?;
                    if v.len() < 6 {
                        return Err(truncated(idx + 1, "POSITION/TOTAL-FORCE"));
                    }
                    positions.push(Point3::new(v[0], v[1], v[2]));
                    forces.push(Vector3::new(v[3], v[4], v[5]));
                }
                pending.positions = Some(positions);
                pending.forces = Some(forces);
                i += 1 + n;
            } else if line.contains("FREE ENERGIE OF THE ION-ELECTRON SYSTEM") {
                in_energy_block = true;
            } else if in_energy_block && line.contains("energy  without entropy") {
                in_energy_block = false;
                let energy = line
                    .split_whitespace()
                    .last()
                    .and_then(|t| t.parse::<f64>().ok())
                    .ok_or_else(|| truncated(line_num, "energy(sigma->0)"))?;
                if let Some(frame) = finish_frame(&symbols, &mut pending, Some(energy)) {
                    frames.push(frame);
                }
            }
            i += 1;
        }

        // An interrupted run can end between the force block and the energy line.
        if let Some(frame) = finish_frame(&symbols, &mut pending, None) {
            frames.push(frame);
        }

        if frames.is_empty() {
            return Err(OutcarError::MissingRecord("POSITION/TOTAL-FORCE block"));
        }
        Ok(frames)
    }
}

fn finish_frame(symbols: &[String], pending: &mut Pending, energy: Option<f64>) -> Option<Frame> {
    let positions = pending.positions.take()?;
    let mut frame = Frame::new(symbols.to_vec(), positions);
    if let Some(cell) = pending.cell {
        frame.set_cell(cell);
    }
    frame.forces = pending.forces.take();
    frame.stress = pending.stress.take();
    frame.energy = energy;
    Some(frame)
}

/// Collects MD temperatures from `kin. lattice EKIN_LAT= ... (temperature X K)` lines.
pub fn scan_temperatures(reader: &mut impl BufRead) -> io::Result<Vec<f64>> {
    let mut temperatures = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if let Some(caps) = TEMPERATURE_RE.captures(&line) {
            if let Ok(t) = caps[1].parse::<f64>() {
                temperatures.push(t);
            }
        }
    }
    Ok(temperatures)
}

/// Collects the `Total+kin.` stress rows, converted to GPa in Voigt order.
///
/// The values keep the OUTCAR sign convention (compressive positive).
pub fn scan_total_kin_stresses(reader: &mut impl BufRead) -> io::Result<Vec<Voigt>> {
    let mut stresses = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if !line.contains("Total+kin.") {
            continue;
        }
        let values: Option<Vec<f64>> = line
            .split_whitespace()
            .skip(1)
            .take(6)
            .map(|t| t.parse().ok())
            .collect();
        if let Some(values) = values.filter(|v| v.len() == 6) {
            let arr = [values[0], values[1], values[2], values[3], values[4], values[5]];
            stresses.push(Voigt::from_vasp_order(arr) * KBAR_TO_GPA);
        }
    }
    Ok(stresses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn ionic_step(shift: f64, energy: f64, temperature: f64) -> String {
        format!(
            "  kinetic pressure (ideal gas correction) =      1.00 kB
  Total+kin.    10.0    20.0    30.0     1.0     2.0     3.0
  in kB      -10.00000   -20.00000   -30.00000    -1.00000    -2.00000    -3.00000
      direct lattice vectors                 reciprocal lattice vectors
     4.000000000  0.000000000  0.000000000     0.250000000  0.000000000  0.000000000
     0.000000000  4.000000000  0.000000000     0.000000000  0.250000000  0.000000000
     0.000000000  0.000000000  4.000000000     0.000000000  0.000000000  0.250000000
 POSITION                                       TOTAL-FORCE (eV/Angst)
 -----------------------------------------------------------------------------------
      {:.5}      0.00000      0.00000         0.100000      0.000000      0.000000
      2.00000      2.00000      2.00000        -0.100000      0.000000      0.000000
 -----------------------------------------------------------------------------------
  FREE ENERGIE OF THE ION-ELECTRON SYSTEM (eV)
  ---------------------------------------------------
  free  energy   TOTEN  =       {:.6} eV

  energy  without entropy=      {:.6}  energy(sigma->0) =      {:.6}
  kin. lattice  EKIN_LAT=           0.000000  (temperature  {:.2} K)
",
            shift,
            energy - 0.01,
            energy + 0.01,
            energy,
            temperature
        )
    }

    fn outcar() -> String {
        let mut s = String::from(
            "   VRHFIN =Fe: d7 s1\n   VRHFIN =O: s2p4\n   ions per type =               1   1\n",
        );
        // Electronic steps print a single-space variant that must not finish a frame.
        s.push_str("  energy without entropy=      -1.0  energy(sigma->0) =      -1.0\n");
        s.push_str(&ionic_step(0.0, -10.5, 300.0));
        s.push_str(&ionic_step(0.1, -10.4, 310.5));
        s
    }

    #[test]
    fn reads_each_ionic_step() {
        let frames = OutcarFile::read_frames(&mut Cursor::new(outcar())).unwrap();
        assert_eq!(frames.len(), 2);
        let f = &frames[0];
        assert_eq!(f.symbols, vec!["Fe", "O"]);
        assert_eq!(f.energy, Some(-10.5));
        assert!((f.volume().unwrap() - 64.0).abs() < 1e-9);
        assert_eq!(f.forces.as_ref().unwrap()[0], Vector3::new(0.1, 0.0, 0.0));
        assert!((frames[1].positions[0].x - 0.1).abs() < 1e-12);
        assert_eq!(frames[1].energy, Some(-10.4));
    }

    #[test]
    fn in_kb_stress_becomes_tensile_ev_per_cubic_angstrom() {
        let frames = OutcarFile::read_frames(&mut Cursor::new(outcar())).unwrap();
        let stress = frames[0].stress.unwrap();
        // -10 kB (tensile in VASP's sign) -> +1 GPa tensile.
        assert!((stress.values()[0] * EV_PER_A3_TO_GPA - 1.0).abs() < 1e-9);
        // VASP XY = -1 kB lands in the last Voigt slot.
        assert!((stress.values()[5] * EV_PER_A3_TO_GPA - 0.1).abs() < 1e-9);
    }

    #[test]
    fn interrupted_run_keeps_the_last_positions_without_energy() {
        let mut text = outcar();
        let cut = text.rfind("  FREE ENERGIE").unwrap();
        text.truncate(cut);
        let frames = OutcarFile::read_frames(&mut Cursor::new(text)).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].energy, None);
    }

    #[test]
    fn missing_force_blocks_is_an_error() {
        let err = OutcarFile::read_frames(&mut Cursor::new("   VRHFIN =Fe: d7\n")).unwrap_err();
        assert!(matches!(err, OutcarError::MissingRecord(_)));
    }

    #[test]
    fn truncated_force_block_reports_its_line() {
        let text = "   VRHFIN =H: s1\n   ions per type = 2\n POSITION   TOTAL-FORCE\n ----\n 0 0 0 0 0 0\n";
        match OutcarFile::read_frames(&mut Cursor::new(text)).unwrap_err() {
            OutcarError::Parse { line, kind } => {
                assert_eq!(line, 6);
                assert_eq!(kind, OutcarParseErrorKind::Truncated("POSITION/TOTAL-FORCE"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn scans_temperatures_and_total_kin_stresses() {
        let temps = scan_temperatures(&mut Cursor::new(outcar())).unwrap();
        assert_eq!(temps, vec![300.0, 310.5]);

        let stresses = scan_total_kin_stresses(&mut Cursor::new(outcar())).unwrap();
        assert_eq!(stresses.len(), 2);
        let s = stresses[0];
        assert!((s.values()[0] - 1.0).abs() < 1e-12);
        // xy yz zx = 1 2 3 kB -> yz, xz, xy in Voigt order.
        assert!((s.values()[3] - 0.2).abs() < 1e-12);
        assert!((s.values()[4] - 0.3).abs() < 1e-12);
        assert!((s.values()[5] - 0.1).abs() < 1e-12);
    }
}
