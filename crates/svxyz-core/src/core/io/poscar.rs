use crate::core::io::traits::{TrajectoryReader, TrajectoryWriter};
use crate::core::models::cell::Cell;
use crate::core::models::element::{is_valid_symbol, normalize_symbol};
use crate::core::models::frame::Frame;
use nalgebra::{Point3, Vector3};
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoscarError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: PoscarParseErrorKind },
    #[error("Cannot write POSCAR: {0}")]
    Unwritable(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum PoscarParseErrorKind {
    #[error("File ended before the {0} section")]
    MissingSection(&'static str),
    #[error("Invalid number '{value}' in {field}")]
    InvalidFloat { field: &'static str, value: String },
    #[error("Invalid atom count '{0}'")]
    InvalidCount(String),
    #[error("{species} species names but {counts} atom counts")]
    CountMismatch { species: usize, counts: usize },
    #[error("No species names found (neither a species line nor symbols in the comment)")]
    MissingSpecies,
    #[error("Invalid chemical symbol '{0}'")]
    InvalidSymbol(String),
}

pub struct PoscarFile;

struct Lines<I> {
    inner: I,
    line: usize,
}

impl<I: Iterator<Item = io::Result<String>>> Lines<I> {
    fn next_line(&mut self, section: &'static str) -> Result<String, PoscarError> {
        self.line += 1;
        match self.inner.next() {
            Some(line) => Ok(line?),
            None => Err(PoscarError::Parse {
                line: self.line,
                kind: PoscarParseErrorKind::MissingSection(section),
            }),
        }
    }

    fn err(&self, kind: PoscarParseErrorKind) -> PoscarError {
        PoscarError::Parse {
            line: self.line,
            kind,
        }
    }

    fn floats(&self, line: &str, n: usize, field: &'static str) -> Result<Vec<f64>, PoscarError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < n {
            return Err(self.err(PoscarParseErrorKind::MissingSection(field)));
        }
        tokens[..n]
            .iter()
            .map(|t| {
                t.parse::<f64>().map_err(|_| {
                    self.err(PoscarParseErrorKind::InvalidFloat {
                        field,
                        value: t.to_string(),
                    })
                })
            })
            .collect()
    }
}

fn parse_symbols(tokens: &[&str]) -> Option<Vec<String>> {
    tokens
        .iter()
        .map(|t| {
            // VASP 5.4 may append a potential hash (`Fe_pv/abc123`).
            let raw = t.split('/').next().unwrap_or(*t);
            let symbol = normalize_symbol(raw);
            is_valid_symbol(&symbol).then_some(symbol)
        })
        .collect()
}

impl TrajectoryReader for PoscarFile {
    type Error = PoscarError;

    fn read_frames(reader: &mut impl BufRead) -> Result<Vec<Frame>, Self::Error> {
        let mut lines = Lines {
            inner: reader.lines(),
            line: 0,
        };

        let comment = lines.next_line("comment")?;
        let scale_line = lines.next_line("scale factor")?;
        let scale = lines.floats(&scale_line, 1, "scale factor")?[0];

        let mut rows = [Vector3::zeros(); 3];
        for row in rows.iter_mut() {
            let line = lines.next_line("lattice")?;
            let v = lines.floats(&line, 3, "lattice")?;
            *row = Vector3::new(v[0], v[1], v[2]);
        }
        let mut cell = Cell::from_vectors(rows[0], rows[1], rows[2]);
        if scale < 0.0 {
            let factor = (-scale / cell.volume()).cbrt();
            cell = cell.scaled(factor);
        } else {
            cell = cell.scaled(scale);
        }

        let mut line = lines.next_line("species")?;
        let first_tokens: Vec<String> = line.split_whitespace().map(String::from).collect();
        let has_species_line = first_tokens
            .first()
            .is_some_and(|t| t.parse::<usize>().is_err());
        let species_tokens = if has_species_line {
            line = lines.next_line("atom counts")?;
            first_tokens
        } else {
            Vec::new()
        };

        let counts: Vec<usize> = line
            .split_whitespace()
            .map(|t| {
                t.parse::<usize>()
                    .map_err(|_| lines.err(PoscarParseErrorKind::InvalidCount(t.to_string())))
            })
            .collect::<Result<_, _>>()?;

        let species = if has_species_line {
            let tokens: Vec<&str> = species_tokens.iter().map(String::as_str).collect();
            parse_symbols(&tokens).ok_or_else(|| {
                lines.err(PoscarParseErrorKind::InvalidSymbol(species_tokens.join(" ")))
            })?
        } else {
            let tokens: Vec<&str> = comment.split_whitespace().take(counts.len()).collect();
            parse_symbols(&tokens)
                .filter(|s| s.len() == counts.len())
                .ok_or_else(|| lines.err(PoscarParseErrorKind::MissingSpecies))?
        };
        if species.len() != counts.len() {
            return Err(lines.err(PoscarParseErrorKind::CountMismatch {
                species: species.len(),
                counts: counts.len(),
            }));
        }

        let mut mode = lines.next_line("coordinate mode")?;
        if mode.trim_start().starts_with(['S', 's']) {
            mode = lines.next_line("coordinate mode")?;
        }
        let cartesian = mode.trim_start().starts_with(['C', 'c', 'K', 'k']);

        let total: usize = counts.iter().sum();
        let symbols: Vec<String> = species
            .iter()
            .zip(&counts)
            .flat_map(|(s, &n)| std::iter::repeat_n(s.clone(), n))
            .collect();
        let mut positions = Vec::with_capacity(total);
        for _ in 0..total {
            let line = lines.next_line("positions")?;
            let v = lines.floats(&line, 3, "positions")?;
            let raw = Vector3::new(v[0], v[1], v[2]);
            let cart = if cartesian {
                // Cartesian coordinates share the lattice scale factor.
                let factor = if scale < 0.0 {
                    cell.vector(0).norm() / rows[0].norm()
                } else {
                    scale
                };
                raw * factor
            } else {
                cell.to_cartesian(&raw)
            };
            positions.push(Point3::from(cart));
        }

        let mut frame = Frame::new(symbols, positions);
        frame.set_cell(cell);
        Ok(vec![frame])
    }
}

impl TrajectoryWriter for PoscarFile {
    type Error = PoscarError;
    const MULTI_FRAME: bool = false;

    fn write_frames(frames: &[Frame], writer: &mut impl Write) -> Result<(), Self::Error> {
        let [frame] = frames else {
            return Err(PoscarError::Unwritable(format!(
                "POSCAR holds exactly one frame, got {}",
                frames.len()
            )));
        };
        let cell = frame
            .cell
            .as_ref()
            .ok_or_else(|| PoscarError::Unwritable("frame has no cell".to_string()))?;
        frame.validate().map_err(PoscarError::Unwritable)?;

        let mut runs: Vec<(&str, usize)> = Vec::new();
        for symbol in &frame.symbols {
            match runs.last_mut() {
                Some((s, n)) if *s == symbol.as_str() => *n += 1,
                _ => runs.push((symbol.as_str(), 1)),
            }
        }

        writeln!(writer, "{}", frame.formula())?;
        writeln!(writer, "{:>19.14}", 1.0)?;
        for i in 0..3 {
            let v = cell.vector(i);
            writeln!(writer, " {:>21.16} {:>21.16} {:>21.16}", v.x, v.y, v.z)?;
        }
        let names: Vec<String> = runs.iter().map(|(s, _)| format!("{:>3}", s)).collect();
        let counts: Vec<String> = runs.iter().map(|(_, n)| format!("{:>3}", n)).collect();
        writeln!(writer, " {}", names.join(" "))?;
        writeln!(writer, " {}", counts.join(" "))?;
        writeln!(writer, "Cartesian")?;
        for p in &frame.positions {
            writeln!(writer, " {:>21.16} {:>21.16} {:>21.16}", p.x, p.y, p.z)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const DIRECT: &str = "Fe O test cell
1.0
4.0 0.0 0.0
0.0 4.0 0.0
0.0 0.0 4.0
Fe O
1 2
Direct
0.0 0.0 0.0
0.5 0.5 0.0
0.5 0.0 0.5
";

    fn read(content: &str) -> Result<Vec<Frame>, PoscarError> {
        PoscarFile::read_frames(&mut Cursor::new(content))
    }

    #[test]
    fn reads_direct_coordinates_into_cartesian() {
        let frames = read(DIRECT).unwrap();
        assert_eq!(frames.len(), 1);
        let f = &frames[0];
        assert_eq!(f.symbols, vec!["Fe", "O", "O"]);
        assert_eq!(f.positions[1], Point3::new(2.0, 2.0, 0.0));
        assert!((f.volume().unwrap() - 64.0).abs() < 1e-12);
        assert!(f.is_periodic());
    }

    #[test]
    fn negative_scale_sets_target_volume() {
        let content = DIRECT.replacen("1.0\n", "-125.0\n", 1);
        let f = &read(&content).unwrap()[0];
        assert!((f.volume().unwrap() - 125.0).abs() < 1e-9);
        assert!((f.positions[1].x - 2.5).abs() < 1e-12);
    }

    #[test]
    fn reads_selective_dynamics_and_cartesian_with_scale() {
        let content = "x\n2.0\n1 0 0\n0 1 0\n0 0 1\nMg\n1\nSelective dynamics\nCartesian\n0.25 0.5 0.0 T T F\n";
        let f = &read(content).unwrap()[0];
        assert_eq!(f.positions[0], Point3::new(0.5, 1.0, 0.0));
        assert!((f.volume().unwrap() - 8.0).abs() < 1e-12);
    }

    #[test]
    fn vasp4_takes_species_from_comment() {
        let content = DIRECT.replace("Fe O\n1 2\n", "1 2\n");
        let f = &read(&content).unwrap()[0];
        assert_eq!(f.symbols, vec!["Fe", "O", "O"]);
    }

    #[test]
    fn vasp4_without_symbols_is_an_error() {
        let content = DIRECT
            .replace("Fe O test cell", "unnamed")
            .replace("Fe O\n1 2\n", "1 2\n");
        assert!(matches!(
            read(&content).unwrap_err(),
            PoscarError::Parse {
                kind: PoscarParseErrorKind::MissingSpecies,
                ..
            }
        ));
    }

    #[test]
    fn truncated_positions_name_the_section() {
        let content = DIRECT.trim_end().rsplit_once('\n').unwrap().0.to_string();
        match read(&content).unwrap_err() {
            PoscarError::Parse { line, kind } => {
                assert_eq!(line, 11);
                assert_eq!(kind, PoscarParseErrorKind::MissingSection("positions"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn write_then_read_preserves_structure() {
        let frame = read(DIRECT).unwrap().remove(0);
        let mut buffer = Vec::new();
        PoscarFile::write_frames(std::slice::from_ref(&frame), &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with("FeO2\n"));
        let back = read(&text).unwrap().remove(0);
        assert_eq!(back.symbols, frame.symbols);
        for (a, b) in back.positions.iter().zip(&frame.positions) {
            assert!((a - b).norm() < 1e-12);
        }
    }

    #[test]
    fn writing_several_frames_or_no_cell_fails() {
        let frame = read(DIRECT).unwrap().remove(0);
        let two = vec![frame.clone(), frame];
        assert!(matches!(
            PoscarFile::write_frames(&two, &mut Vec::new()),
            Err(PoscarError::Unwritable(_))
        ));
        let bare = Frame::new(vec!["H".into()], vec![Point3::origin()]);
        assert!(matches!(
            PoscarFile::write_frames(&[bare], &mut Vec::new()),
            Err(PoscarError::Unwritable(_))
        ));
    }
}
