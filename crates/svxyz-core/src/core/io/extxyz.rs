use crate::core::io::traits::{TrajectoryReader, TrajectoryWriter};
use crate::core::models::cell::Cell;
use crate::core::models::element::{is_valid_symbol, normalize_symbol};
use crate::core::models::frame::{Frame, InfoValue};
use crate::core::models::voigt::Voigt;
use nalgebra::{Matrix3, Point3, Vector3};
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtXyzError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: ExtXyzParseErrorKind,
    },
    #[error("Frame {frame} cannot be written: {reason}")]
    Unwritable { frame: usize, reason: String },
}

#[derive(Debug, Error, PartialEq)]
pub enum ExtXyzParseErrorKind {
    #[error("Invalid atom count '{0}'")]
    InvalidAtomCount(String),
    #[error("File ended after {found} of {expected} atom lines")]
    UnexpectedEof { expected: usize, found: usize },
    #[error("Missing comment line")]
    MissingComment,
    #[error("Unterminated quoted value in comment line")]
    UnterminatedQuote,
    #[error("Invalid Properties specification '{0}'")]
    InvalidProperties(String),
    #[error("Key '{key}' expects {expected} values, found {found}")]
    WrongValueCount {
        key: String,
        expected: &'static str,
        found: usize,
    },
    #[error("Invalid number '{value}' for '{field}'")]
    InvalidFloat { field: String, value: String },
    #[error("Atom line has {found} columns, expected at least {expected}")]
    TooFewColumns { expected: usize, found: usize },
    #[error("Invalid chemical symbol '{0}'")]
    InvalidSymbol(String),
    #[error("Properties must contain species and pos columns")]
    MissingRequiredColumns,
}

#[derive(Debug, Clone, PartialEq)]
struct Column {
    name: String,
    kind: char,
    width: usize,
}

const STRUCTURAL_KEYS: [&str; 6] = ["lattice", "properties", "pbc", "energy", "stress", "virial"];

pub struct ExtXyzFile;

impl TrajectoryReader for ExtXyzFile {
    type Error = ExtXyzError;

    fn read_frames(reader: &mut impl BufRead) -> Result<Vec<Frame>, Self::Error> {
        let mut frames = Vec::new();
        let mut lines = reader.lines().enumerate();

        while let Some((idx, line)) = lines.next() {
            let line = line?;
            let line_num = idx + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let natoms: usize = trimmed.parse().map_err(|_| ExtXyzError::Parse {
                line: line_num,
                kind: ExtXyzParseErrorKind::InvalidAtomCount(trimmed.to_string()),
            })?;

            let (comment_idx, comment) = match lines.next() {
                Some((i, l)) => (i + 1, l?),
                None => {
                    return Err(ExtXyzError::Parse {
                        line: line_num + 1,
                        kind: ExtXyzParseErrorKind::MissingComment,
                    });
                }
            };
            let header = parse_header(&comment).map_err(|kind| ExtXyzError::Parse {
                line: comment_idx,
                kind,
            })?;

            let mut atom_lines = Vec::with_capacity(natoms);
            for found in 0..natoms {
                match lines.next() {
                    Some((i, l)) => atom_lines.push((i + 1, l?)),
                    None => {
                        return Err(ExtXyzError::Parse {
                            line: comment_idx + found + 1,
                            kind: ExtXyzParseErrorKind::UnexpectedEof {
                                expected: natoms,
                                found,
                            },
                        });
                    }
                }
            }

            frames.push(build_frame(header, &atom_lines)?);
        }

        Ok(frames)
    }
}

impl TrajectoryWriter for ExtXyzFile {
    type Error = ExtXyzError;
    const MULTI_FRAME: bool = true;

    fn write_frames(frames: &[Frame], writer: &mut impl Write) -> Result<(), Self::Error> {
        for (index, frame) in frames.iter().enumerate() {
            frame
                .validate()
                .map_err(|reason| ExtXyzError::Unwritable { frame: index, reason })?;
            writeln!(writer, "{}", frame.len())?;
            writeln!(writer, "{}", format_comment(frame))?;

            for (i, (symbol, pos)) in frame.symbols.iter().zip(&frame.positions).enumerate() {
                write!(writer, "{:<3}{:>22}{:>22}{:>22}", symbol, pos.x, pos.y, pos.z)?;
                if let Some(forces) = &frame.forces {
                    let f = forces[i];
                    write!(writer, "{:>22}{:>22}{:>22}", f.x, f.y, f.z)?;
                }
                writeln!(writer)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Header {
    pairs: Vec<(String, String)>,
    extended: bool,
}

fn parse_header(comment: &str) -> Result<Header, ExtXyzParseErrorKind> {
    if !comment.contains('=') {
        return Ok(Header::default());
    }
    Ok(Header {
        pairs: parse_key_values(comment)?,
        extended: true,
    })
}

/// Splits an extended XYZ comment line into `key=value` pairs.
///
/// Values may be bare tokens, `"double quoted"` (with backslash escapes) or `{braced}`.
/// A bare key without `=` is a boolean flag and maps to `T`.
pub fn parse_key_values(comment: &str) -> Result<Vec<(String, String)>, ExtXyzParseErrorKind> {
    let chars: Vec<char> = comment.chars().collect();
    let mut pos = 0;
    let mut pairs = Vec::new();

    let skip_ws = |pos: &mut usize| {
        while *pos < chars.len() && chars[*pos].is_whitespace() {
            *pos += 1;
        }
    };

    loop {
        skip_ws(&mut pos);
        if pos >= chars.len() {
            break;
        }
        let key = read_token(&chars, &mut pos, true)?;
        skip_ws(&mut pos);
        if pos < chars.len() && chars[pos] == '=' {
            pos += 1;
            skip_ws(&mut pos);
            let value = read_token(&chars, &mut pos, false)?;
            pairs.push((key, value));
        } else {
            pairs.push((key, "T".to_string()));
        }
    }
    Ok(pairs)
}

fn read_token(chars: &[char], pos: &mut usize, is_key: bool) -> Result<String, ExtXyzParseErrorKind> {
    let mut out = String::new();
    match chars.get(*pos) {
        Some('"') => {
            *pos += 1;
            loop {
                match chars.get(*pos) {
                    None => return Err(ExtXyzParseErrorKind::UnterminatedQuote),
                    Some('\\') => {
                        if let Some(&next) = chars.get(*pos + 1) {
                            out.push(match next {
                                'n' => '\n',
                                other => other,
                            });
                            *pos += 2;
                        } else {
                            return Err(ExtXyzParseErrorKind::UnterminatedQuote);
                        }
                    }
                    Some('"') => {
                        *pos += 1;
                        break;
                    }
                    Some(&c) => {
                        out.push(c);
                        *pos += 1;
                    }
                }
            }
        }
        Some('{') if !is_key => {
            *pos += 1;
            loop {
                match chars.get(*pos) {
                    None => return Err(ExtXyzParseErrorKind::UnterminatedQuote),
                    Some('}') => {
                        *pos += 1;
                        break;
                    }
                    Some(&c) => {
                        out.push(if c == ',' { ' ' } else { c });
                        *pos += 1;
                    }
                }
            }
        }
        _ => {
            while let Some(&c) = chars.get(*pos) {
                if c.is_whitespace() || (is_key && c == '=') {
                    break;
                }
                out.push(c);
                *pos += 1;
            }
        }
    }
    Ok(out)
}

/// Converts a comment-line value into the most specific [`InfoValue`].
pub fn parse_info_value(raw: &str) -> InfoValue {
    let trimmed = raw.trim();
    match trimmed {
        "T" | "True" | "true" => return InfoValue::Bool(true),
        "F" | "False" | "false" => return InfoValue::Bool(false),
        _ => {}
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return InfoValue::Int(i);
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        return InfoValue::Float(f);
    }
    let tokens: Vec<&str> = trimmed
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.len() > 1 {
        let parsed: Option<Vec<f64>> = tokens.iter().map(|t| t.parse().ok()).collect();
        if let Some(values) = parsed {
            return InfoValue::FloatArray(values);
        }
    }
    InfoValue::Text(raw.to_string())
}

fn parse_floats(key: &str, raw: &str) -> Result<Vec<f64>, ExtXyzParseErrorKind> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.parse::<f64>()
                .map_err(|_| ExtXyzParseErrorKind::InvalidFloat {
                    field: key.to_string(),
                    value: t.to_string(),
                })
        })
        .collect()
}

fn parse_properties(spec: &str) -> Result<Vec<Column>, ExtXyzParseErrorKind> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() % 3 != 0 || parts.is_empty() {
        return Err(ExtXyzParseErrorKind::InvalidProperties(spec.to_string()));
    }
    parts
        .chunks(3)
        .map(|chunk| {
            let kind = chunk[1]
                .chars()
                .next()
                .map(|c| c.to_ascii_uppercase())
                .filter(|c| matches!(c, 'S' | 'R' | 'I' | 'L'))
                .ok_or_else(|| ExtXyzParseErrorKind::InvalidProperties(spec.to_string()))?;
            let width: usize = chunk[2]
                .parse()
                .ok()
                .filter(|&w| w > 0)
                .ok_or_else(|| ExtXyzParseErrorKind::InvalidProperties(spec.to_string()))?;
            Ok(Column {
                name: chunk[0].to_string(),
                kind,
                width,
            })
        })
        .collect()
}

fn parse_symbol(raw: &str) -> Result<String, ExtXyzParseErrorKind> {
    if is_valid_symbol(raw) {
        return Ok(raw.to_string());
    }
    let normalized = normalize_symbol(raw);
    if is_valid_symbol(&normalized) {
        Ok(normalized)
    } else {
        Err(ExtXyzParseErrorKind::InvalidSymbol(raw.to_string()))
    }
}

fn build_frame(header: Header, atom_lines: &[(usize, String)]) -> Result<Frame, ExtXyzError> {
    let mut frame = Frame::default();
    let mut properties = "species:S:1:pos:R:3".to_string();
    let mut pbc: Option<[bool; 3]> = None;
    let mut virial: Option<Matrix3<f64>> = None;
    // Header errors are reported on the comment line, which precedes the first atom line.
    let comment_line = atom_lines.first().map_or(2, |(l, _)| l - 1);
    let header_err = |kind| ExtXyzError::Parse {
        line: comment_line,
        kind,
    };

    for (key, value) in header.pairs {
        let lower = key.to_lowercase();
        if !STRUCTURAL_KEYS.contains(&lower.as_str()) {
            frame.info.insert(key, parse_info_value(&value));
            continue;
        }
        match lower.as_str() {
            "lattice" => {
                let values = parse_floats(&key, &value).map_err(header_err)?;
                let flat: [f64; 9] = values.as_slice().try_into().map_err(|_| {
                    header_err(ExtXyzParseErrorKind::WrongValueCount {
                        key: key.clone(),
                        expected: "9",
                        found: values.len(),
                    })
                })?;
                frame.cell = Some(Cell::from_flat(&flat));
            }
            "properties" => properties = value,
            "pbc" => {
                let flags: Vec<bool> = value
                    .split_whitespace()
                    .map(|t| matches!(t, "T" | "True" | "true" | "1"))
                    .collect();
                let flags: [bool; 3] = flags.as_slice().try_into().map_err(|_| {
                    header_err(ExtXyzParseErrorKind::WrongValueCount {
                        key: key.clone(),
                        expected: "3",
                        found: flags.len(),
                    })
                })?;
                pbc = Some(flags);
            }
            "energy" => {
                let v = value.trim().parse::<f64>().map_err(|_| {
                    header_err(ExtXyzParseErrorKind::InvalidFloat {
                        field: key.clone(),
                        value: value.clone(),
                    })
                })?;
                frame.energy = Some(v);
            }
            "stress" => {
                let values = parse_floats(&key, &value).map_err(header_err)?;
                frame.stress = Some(match values.len() {
                    9 => Voigt::from_matrix(&Matrix3::from_row_slice(&values)),
                    6 => Voigt::new([
                        values[0], values[1], values[2], values[3], values[4], values[5],
                    ]),
                    n => {
                        return Err(header_err(ExtXyzParseErrorKind::WrongValueCount {
                            key,
                            expected: "6 or 9",
                            found: n,
                        }));
                    }
                });
            }
            "virial" => {
                let values = parse_floats(&key, &value).map_err(header_err)?;
                if values.len() != 9 {
                    return Err(header_err(ExtXyzParseErrorKind::WrongValueCount {
                        key,
                        expected: "9",
                        found: values.len(),
                    }));
                }
                virial = Some(Matrix3::from_row_slice(&values));
            }
            _ => unreachable!("structural keys are matched exhaustively"),
        }
    }

    frame.pbc = pbc.unwrap_or([frame.cell.is_some(); 3]);

    if let Some(virial) = virial {
        match frame.volume().filter(|v| *v > 0.0) {
            Some(volume) if frame.stress.is_none() => {
                frame.stress = Some(Voigt::from_matrix(&(-virial / volume)));
            }
            _ => {
                frame.info.insert(
                    "virial".to_string(),
                    InfoValue::FloatArray(virial.transpose().iter().copied().collect()),
                );
            }
        }
    }

    let columns = if header.extended {
        parse_properties(&properties).map_err(header_err)?
    } else {
        parse_properties("species:S:1:pos:R:3").map_err(header_err)?
    };
    read_atoms(&mut frame, &columns, atom_lines)?;
    Ok(frame)
}

fn read_atoms(
    frame: &mut Frame,
    columns: &[Column],
    atom_lines: &[(usize, String)],
) -> Result<(), ExtXyzError> {
    let find = |names: &[&str]| {
        columns
            .iter()
            .position(|c| names.iter().any(|n| c.name.eq_ignore_ascii_case(n)))
    };
    let species_col = find(&["species", "element"]);
    let pos_col = find(&["pos", "positions"]);
    let force_col = find(&["forces", "force"]);
    let (Some(species_col), Some(pos_col)) = (species_col, pos_col) else {
        return Err(ExtXyzError::Parse {
            line: atom_lines.first().map_or(0, |(l, _)| *l),
            kind: ExtXyzParseErrorKind::MissingRequiredColumns,
        });
    };

    let offsets: Vec<usize> = columns
        .iter()
        .scan(0, |acc, c| {
            let start = *acc;
            *acc += c.width;
            Some(start)
        })
        .collect();
    let total_width: usize = columns.iter().map(|c| c.width).sum();

    let mut forces = force_col.map(|_| Vec::with_capacity(atom_lines.len()));

    for (line_num, line) in atom_lines {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < total_width {
            return Err(ExtXyzError::Parse {
                line: *line_num,
                kind: ExtXyzParseErrorKind::TooFewColumns {
                    expected: total_width,
                    found: tokens.len(),
                },
            });
        }
        let vector_at = |col: usize, field: &str| -> Result<Vector3<f64>, ExtXyzError> {
            let start = offsets[col];
            let mut v = [0.0; 3];
            for (k, slot) in v.iter_mut().enumerate() {
                let token = tokens[start + k];
                *slot = token.parse().map_err(|_| ExtXyzError::Parse {
                    line: *line_num,
                    kind: ExtXyzParseErrorKind::InvalidFloat {
                        field: field.to_string(),
                        value: token.to_string(),
                    },
                })?;
            }
            Ok(Vector3::new(v[0], v[1], v[2]))
        };

        let symbol = parse_symbol(tokens[offsets[species_col]]).map_err(|kind| {
            ExtXyzError::Parse {
                line: *line_num,
                kind,
            }
        })?;
        frame.symbols.push(symbol);
        frame
            .positions
            .push(Point3::from(vector_at(pos_col, "pos")?));
        if let (Some(col), Some(forces)) = (force_col, forces.as_mut()) {
            forces.push(vector_at(col, "forces")?);
        }
    }

    frame.forces = forces;
    Ok(())
}

fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

fn format_info(value: &InfoValue) -> String {
    match value {
        InfoValue::Text(s) => {
            if s.is_empty() || s.chars().any(|c| c.is_whitespace() || c == '=' || c == '"') {
                quote(s)
            } else {
                s.clone()
            }
        }
        InfoValue::FloatArray(_) => quote(&value.to_string()),
        other => other.to_string(),
    }
}

fn join_floats(values: impl IntoIterator<Item = f64>) -> String {
    values
        .into_iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_comment(frame: &Frame) -> String {
    let mut parts = Vec::new();
    if let Some(cell) = &frame.cell {
        parts.push(format!("Lattice={}", quote(&join_floats(cell.to_flat()))));
    }
    let properties = if frame.forces.is_some() {
        "species:S:1:pos:R:3:forces:R:3"
    } else {
        "species:S:1:pos:R:3"
    };
    parts.push(format!("Properties={}", properties));
    if let Some(energy) = frame.energy {
        parts.push(format!("energy={}", energy));
    }
    if let Some(stress) = &frame.stress {
        let m = stress.to_matrix();
        parts.push(format!(
            "stress={}",
            quote(&join_floats(m.transpose().iter().copied()))
        ));
    }
    for (key, value) in &frame.info {
        if STRUCTURAL_KEYS.contains(&key.to_lowercase().as_str()) && key != "virial" {
            continue;
        }
        if key == "virial" && frame.stress.is_some() {
            continue;
        }
        parts.push(format!("{}={}", key, format_info(value)));
    }
    let pbc: Vec<&str> = frame
        .pbc
        .iter()
        .map(|&p| if p { "T" } else { "F" })
        .collect();
    parts.push(format!("pbc={}", quote(&pbc.join(" "))));
    parts.join(" ")
}
