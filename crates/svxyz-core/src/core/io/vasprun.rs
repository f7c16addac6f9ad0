use crate::core::io::traits::TrajectoryReader;
use crate::core::models::cell::Cell;
use crate::core::models::element::{is_valid_symbol, normalize_symbol};
use crate::core::models::frame::Frame;
use crate::core::models::voigt::Voigt;
use crate::core::units::{EV_PER_A3_TO_GPA, KBAR_TO_GPA};
use nalgebra::{Matrix3, Point3, Vector3};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::io::{self, BufRead};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum VasprunError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("XML error at byte {position}: {message}")]
    Xml { position: u64, message: String },
    #[error("Invalid number '{value}' in {context}")]
    InvalidFloat { context: &'static str, value: String },
    #[error("Invalid species '{0}' in atominfo")]
    InvalidSpecies(String),
    #[error("Missing required record: {0}")]
    MissingRecord(&'static str),
    #[error("Calculation {index} is inconsistent: {reason}")]
    Inconsistent { index: usize, reason: String },
}

pub struct VasprunFile;

#[derive(Debug)]
struct Element {
    tag: String,
    name: Option<String>,
}

#[derive(Debug, Default)]
struct Calculation {
    basis: Vec<Vector3<f64>>,
    positions: Vec<Vector3<f64>>,
    forces: Vec<Vector3<f64>>,
    stress: Vec<Vector3<f64>>,
    e_0_energy: Option<f64>,
    e_fr_energy: Option<f64>,
}

fn name_attr(e: &BytesStart) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == b"name")
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

fn parse_row(text: &str, context: &'static str) -> Result<Vector3<f64>, VasprunError> {
    let values: Vec<f64> = text
        .split_whitespace()
        .map(|t| {
            t.parse::<f64>().map_err(|_| VasprunError::InvalidFloat {
                context,
                value: t.to_string(),
            })
        })
        .collect::<Result<_, _>>()?;
    if values.len() < 3 {
        return Err(VasprunError::InvalidFloat {
            context,
            value: text.trim().to_string(),
        });
    }
    Ok(Vector3::new(values[0], values[1], values[2]))
}

fn has_tag(stack: &[Element], depth_from_top: usize, tag: &str) -> bool {
    stack
        .len()
        .checked_sub(depth_from_top + 1)
        .and_then(|i| stack.get(i))
        .is_some_and(|e| e.tag == tag)
}

fn ancestor<'a>(stack: &'a [Element], tag: &str) -> Option<&'a Element> {
    stack.iter().rev().find(|e| e.tag == tag)
}

struct Parser {
    stack: Vec<Element>,
    text: String,
    species: Vec<String>,
    rc_column: usize,
    current: Option<Calculation>,
    frames: Vec<Frame>,
}

impl Parser {
    fn start(&mut self, e: &BytesStart) {
        let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        match tag.as_str() {
            "calculation" => self.current = Some(Calculation::default()),
            "rc" => self.rc_column = 0,
            _ => {}
        }
        self.stack.push(Element {
            tag,
            name: name_attr(e),
        });
        self.text.clear();
    }

    fn end(&mut self) -> Result<(), VasprunError> {
        let text = std::mem::take(&mut self.text);
        let Some(top) = self.stack.last() else {
            return Ok(());
        };

        match top.tag.as_str() {
            "c" if self.in_atoms_table() => {
                if self.rc_column == 0 {
                    let symbol = normalize_symbol(text.trim());
                    if !is_valid_symbol(&symbol) {
                        return Err(VasprunError::InvalidSpecies(text.trim().to_string()));
                    }
                    self.species.push(symbol);
                }
                self.rc_column += 1;
            }
            "v" => self.end_vector(&text)?,
            "i" if has_tag(&self.stack, 1, "energy") && has_tag(&self.stack, 2, "calculation") => {
                if let Some(calc) = self.current.as_mut() {
                    let value = || {
                        text.trim()
                            .parse::<f64>()
                            .map_err(|_| VasprunError::InvalidFloat {
                                context: "energy",
                                value: text.trim().to_string(),
                            })
                    };
                    match top.name.as_deref() {
                        Some("e_0_energy") => calc.e_0_energy = Some(value()?),
                        Some("e_fr_energy") => calc.e_fr_energy = Some(value()?),
                        _ => {}
                    }
                }
            }
            "calculation" => {
                if let Some(calc) = self.current.take() {
                    self.finish(calc)?;
                }
            }
            _ => {}
        }
        self.stack.pop();
        Ok(())
    }

    fn in_atoms_table(&self) -> bool {
        ancestor(&self.stack, "atominfo").is_some()
            && ancestor(&self.stack, "array").is_some_and(|a| a.name.as_deref() == Some("atoms"))
            && has_tag(&self.stack, 1, "rc")
    }

    fn end_vector(&mut self, text: &str) -> Result<(), VasprunError> {
        let Some(calc) = self.current.as_mut() else {
            return Ok(());
        };
        let n = self.stack.len();
        if n < 3 || self.stack[n - 2].tag != "varray" {
            return Ok(());
        }
        let varray = self.stack[n - 2].name.as_deref();
        let parent = self.stack[n - 3].tag.as_str();
        let in_structure = ancestor(&self.stack, "structure").is_some();
        match (varray, parent) {
            (Some("basis"), "crystal") if in_structure => {
                calc.basis.push(parse_row(text, "basis")?)
            }
            (Some("positions"), "structure") => calc.positions.push(parse_row(text, "positions")?),
            (Some("forces"), "calculation") => calc.forces.push(parse_row(text, "forces")?),
            (Some("stress"), "calculation") => calc.stress.push(parse_row(text, "stress")?),
            _ => {}
        }
        Ok(())
    }

    fn finish(&mut self, calc: Calculation) -> Result<(), VasprunError> {
        let index = self.frames.len();
        let inconsistent = |reason: String| VasprunError::Inconsistent { index, reason };

        if calc.positions.is_empty() {
            return Ok(());
        }
        if self.species.len() != calc.positions.len() {
            return Err(inconsistent(format!(
                "{} atoms in atominfo but {} positions",
                self.species.len(),
                calc.positions.len()
            )));
        }
        let [a, b, c] = calc.basis.as_slice() else {
            return Err(inconsistent(format!(
                "expected 3 basis vectors, found {}",
                calc.basis.len()
            )));
        };
        let cell = Cell::from_vectors(*a, *b, *c);

        let positions = calc
            .positions
            .iter()
            .map(|f| Point3::from(cell.to_cartesian(f)))
            .collect();
        let mut frame = Frame::new(self.species.clone(), positions);
        frame.set_cell(cell);
        frame.energy = calc.e_0_energy.or(calc.e_fr_energy);

        if !calc.forces.is_empty() {
            if calc.forces.len() != frame.len() {
                return Err(inconsistent(format!(
                    "{} forces for {} atoms",
                    calc.forces.len(),
                    frame.len()
                )));
            }
            frame.forces = Some(calc.forces);
        }
        if let [x, y, z] = calc.stress.as_slice() {
            let kbar = Matrix3::from_rows(&[x.transpose(), y.transpose(), z.transpose()]);
            frame.stress = Some(Voigt::from_matrix(
                &(kbar * (-KBAR_TO_GPA / EV_PER_A3_TO_GPA)),
            ));
        }
        self.frames.push(frame);
        Ok(())
    }
}

impl TrajectoryReader for VasprunFile {
    type Error = VasprunError;

    fn read_frames(reader: &mut impl BufRead) -> Result<Vec<Frame>, Self::Error> {
        let mut xml = Reader::from_reader(reader);
        xml.config_mut().trim_text(true);

        let mut parser = Parser {
            stack: Vec::new(),
            text: String::new(),
            species: Vec::new(),
            rc_column: 0,
            current: None,
            frames: Vec::new(),
        };
        let mut buf = Vec::new();

        loop {
            let event = match xml.read_event_into(&mut buf) {
                Ok(event) => event,
                // A run still in progress ends mid-document; keep what was complete.
                Err(e) if !parser.frames.is_empty() || parser.current.is_some() => {
                    warn!(
                        "vasprun.xml is truncated at byte {} ({}); keeping parsed calculations",
                        xml.buffer_position(),
                        e
                    );
                    break;
                }
                Err(e) => {
                    return Err(VasprunError::Xml {
                        position: xml.buffer_position(),
                        message: e.to_string(),
                    });
                }
            };
            match event {
                Event::Start(ref e) => parser.start(e),
                Event::Text(ref t) => {
                    let text = t.unescape().map_err(|e| VasprunError::Xml {
                        position: xml.buffer_position(),
                        message: e.to_string(),
                    })?;
                    parser.text.push_str(&text);
                }
                Event::End(_) => parser.end()?,
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if let Some(calc) = parser.current.take() {
            parser.finish(calc)?;
        }

        if parser.species.is_empty() {
            return Err(VasprunError::MissingRecord("atominfo"));
        }
        if parser.frames.is_empty() {
            return Err(VasprunError::MissingRecord("calculation"));
        }
        Ok(parser.frames)
    }
}
