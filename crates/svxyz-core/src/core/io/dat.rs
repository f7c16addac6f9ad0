//! Whitespace-separated `.dat` tables shared between the extraction and plotting tools.
//!
//! Every series table has one header row and a trailing `System_ID` column holding the
//! frame index; values are written with six decimals.

use phf::{Map, phf_map};
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatError {
    #[error("File I/O error for '{path}': {source}")]
    Io { path: String, source: io::Error },
    #[error("CSV error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("Malformed table '{path}' on line {line}: {message}")]
    Malformed {
        path: String,
        line: usize,
        message: String,
    },
    #[error("Table '{0}' has no data rows")]
    Empty(String),
}

/// The series produced by the extraction tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeriesKind {
    Energy,
    Force,
    Virial,
    Stress,
    Volume,
    Pressure,
    Temperature,
    Distance,
}

static SERIES_NAMES: Map<&'static str, SeriesKind> = phf_map! {
    "E" => SeriesKind::Energy,
    "energy" => SeriesKind::Energy,
    "F" => SeriesKind::Force,
    "force" => SeriesKind::Force,
    "virial" => SeriesKind::Virial,
    "stress" => SeriesKind::Stress,
    "volume" => SeriesKind::Volume,
    "V" => SeriesKind::Volume,
    "pressure" => SeriesKind::Pressure,
    "P" => SeriesKind::Pressure,
    "temperature" => SeriesKind::Temperature,
    "T" => SeriesKind::Temperature,
    "distance" => SeriesKind::Distance,
    "D" => SeriesKind::Distance,
};

const VIRIAL_LABELS: [&str; 6] = ["τxx", "τyy", "τzz", "τyz", "τxz", "τxy"];
const STRESS_LABELS: [&str; 6] = ["σxx", "σyy", "σzz", "σyz", "σxz", "σxy"];

impl SeriesKind {
    pub const ALL: [SeriesKind; 8] = [
        SeriesKind::Energy,
        SeriesKind::Force,
        SeriesKind::Virial,
        SeriesKind::Stress,
        SeriesKind::Volume,
        SeriesKind::Pressure,
        SeriesKind::Temperature,
        SeriesKind::Distance,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SeriesKind::Energy => "E",
            SeriesKind::Force => "F",
            SeriesKind::Virial => "virial",
            SeriesKind::Stress => "stress",
            SeriesKind::Volume => "volume",
            SeriesKind::Pressure => "pressure",
            SeriesKind::Temperature => "temperature",
            SeriesKind::Distance => "distance",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.dat", self.name())
    }

    /// Column headers, including the trailing `System_ID`.
    pub fn header(self) -> Vec<&'static str> {
        let mut header: Vec<&'static str> = match self {
            SeriesKind::Energy => vec!["Energy(eV)"],
            SeriesKind::Force => vec!["Max_atomic_force_norm", "Mean_atomic_force_norm"],
            SeriesKind::Virial => vec![
                "$\\tau_{xx}$",
                "$\\tau_{yy}$",
                "$\\tau_{zz}$",
                "$\\tau_{yz}$",
                "$\\tau_{xz}$",
                "$\\tau_{xy}$",
            ],
            SeriesKind::Stress => vec![
                "$\\sigma_{xx}$",
                "$\\sigma_{yy}$",
                "$\\sigma_{zz}$",
                "$\\sigma_{yz}$",
                "$\\sigma_{xz}$",
                "$\\sigma_{xy}$",
            ],
            SeriesKind::Volume => vec!["Volume(A^3)"],
            SeriesKind::Pressure => vec!["Pressure(GPa)"],
            SeriesKind::Temperature => vec!["Temperature(K)"],
            SeriesKind::Distance => vec!["Min_distance(A)"],
        };
        header.push("System_ID");
        header
    }

    /// Legend label of each value column.
    pub fn labels(self) -> Vec<&'static str> {
        match self {
            SeriesKind::Energy => vec!["Energy"],
            SeriesKind::Force => vec!["‖F‖ max", "‖F‖ mean"],
            SeriesKind::Virial => VIRIAL_LABELS.to_vec(),
            SeriesKind::Stress => STRESS_LABELS.to_vec(),
            SeriesKind::Volume => vec!["Volume"],
            SeriesKind::Pressure => vec!["Pressure"],
            SeriesKind::Temperature => vec!["Temperature"],
            SeriesKind::Distance => vec!["Min distance"],
        }
    }

    /// Axis label with unit.
    pub fn axis_label(self) -> &'static str {
        match self {
            SeriesKind::Energy => "Energy (eV)",
            SeriesKind::Force => "Force Norm (eV/Å)",
            SeriesKind::Virial => "Virial (eV)",
            SeriesKind::Stress => "Stress Components (GPa)",
            SeriesKind::Volume => "Volume (Å³)",
            SeriesKind::Pressure => "Pressure (GPa)",
            SeriesKind::Temperature => "Temperature (K)",
            SeriesKind::Distance => "Min Distance (Å)",
        }
    }

    pub fn columns(self) -> usize {
        self.header().len() - 1
    }
}

impl FromStr for SeriesKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SERIES_NAMES
            .get(s.trim())
            .copied()
            .ok_or_else(|| format!("unknown data type '{}'", s))
    }
}

impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Streams rows of a series table, one frame per row.
pub struct SeriesWriter<W: Write> {
    inner: csv::Writer<W>,
    width: usize,
}

impl<W: Write> SeriesWriter<W> {
    pub fn new(writer: W, header: &[&str]) -> Result<Self, csv::Error> {
        let mut inner = csv::WriterBuilder::new()
            .delimiter(b' ')
            .has_headers(false)
            .flexible(false)
            .from_writer(writer);
        inner.write_record(header)?;
        Ok(Self {
            inner,
            width: header.len(),
        })
    }

    /// Writes `values` followed by the frame id.
    pub fn write_row(&mut self, values: &[f64], id: usize) -> Result<(), csv::Error> {
        debug_assert_eq!(values.len() + 1, self.width);
        let mut record: Vec<String> = values.iter().map(|v| format!("{:.6}", v)).collect();
        record.push(id.to_string());
        self.inner.write_record(&record)
    }

    pub fn finish(mut self) -> Result<W, csv::Error> {
        self.inner.flush()?;
        self.inner
            .into_inner()
            .map_err(|e| csv::Error::from(io::Error::other(e.to_string())))
    }
}

/// A series table read back from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesTable {
    pub header: Vec<String>,
    /// Value columns, without the id column.
    pub columns: Vec<Vec<f64>>,
    pub ids: Vec<i64>,
}

impl SeriesTable {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn column(&self, index: usize) -> Option<&[f64]> {
        self.columns.get(index).map(Vec::as_slice)
    }
}

fn split_fields(record: &csv::StringRecord) -> Vec<&str> {
    // Runs of spaces show up as empty fields.
    record.iter().filter(|f| !f.is_empty()).collect()
}

/// Reads a series table: a header row, then rows of numbers whose last column is the id.
pub fn read_series_table(reader: impl Read, path: &str) -> Result<SeriesTable, DatError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b' ')
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let header: Vec<String> = csv_reader
        .headers()
        .map_err(|source| DatError::Csv {
            path: path.to_string(),
            source,
        })?
        .iter()
        .filter(|f| !f.is_empty())
        .map(String::from)
        .collect();

    let mut columns: Vec<Vec<f64>> = Vec::new();
    let mut ids = Vec::new();
    let mut width: Option<usize> = None;

    for (row, record) in csv_reader.records().enumerate() {
        let record = record.map_err(|source| DatError::Csv {
            path: path.to_string(),
            source,
        })?;
        let line = record.position().map_or(row + 2, |p| p.line() as usize);
        let fields = split_fields(&record);
        if fields.is_empty() {
            continue;
        }
        let malformed = |message: String| DatError::Malformed {
            path: path.to_string(),
            line,
            message,
        };
        let values: Vec<f64> = fields
            .iter()
            .map(|f| {
                f.parse::<f64>()
                    .map_err(|_| malformed(format!("'{}' is not a number", f)))
            })
            .collect::<Result<_, _>>()?;
        match width {
            None => {
                if values.len() < 2 {
                    return Err(malformed("expected at least one value and an id".into()));
                }
                width = Some(values.len());
                columns = vec![Vec::new(); values.len() - 1];
            }
            Some(w) if w != values.len() => {
                return Err(malformed(format!("expected {} columns, found {}", w, values.len())));
            }
            Some(_) => {}
        }
        let (id, data) = values.split_last().ok_or_else(|| malformed("empty row".into()))?;
        for (column, v) in columns.iter_mut().zip(data) {
            column.push(*v);
        }
        ids.push(*id as i64);
    }

    if ids.is_empty() {
        return Err(DatError::Empty(path.to_string()));
    }
    Ok(SeriesTable {
        header,
        columns,
        ids,
    })
}

pub fn read_series_table_from_path(path: &Path) -> Result<SeriesTable, DatError> {
    let display = path.to_string_lossy().to_string();
    let file = File::open(path).map_err(|source| DatError::Io {
        path: display.clone(),
        source,
    })?;
    read_series_table(BufReader::new(file), &display)
}

/// One row of a free-form `infile.dat`: a title followed by any number of values.
#[derive(Debug, Clone, PartialEq)]
pub struct TitledRow {
    pub title: String,
    pub values: Vec<f64>,
}

/// Reads rows of `title v1 v2 ...`; rows may differ in length.
///
/// Doubled backslashes in titles are collapsed, so `\\sigma` becomes `\sigma`.
pub fn read_titled_rows(reader: impl BufRead, path: &str) -> Result<Vec<TitledRow>, DatError> {
    let mut rows = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| DatError::Io {
            path: path.to_string(),
            source,
        })?;
        let mut tokens = line.split_whitespace();
        let Some(title) = tokens.next() else {
            continue;
        };
        let values = tokens
            .map(|t| {
                t.parse::<f64>().map_err(|_| DatError::Malformed {
                    path: path.to_string(),
                    line: idx + 1,
                    message: format!("'{}' is not a number", t),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(TitledRow {
            title: title.replace("\\\\", "\\"),
            values,
        });
    }
    if rows.is_empty() {
        return Err(DatError::Empty(path.to_string()));
    }
    Ok(rows)
}

pub fn read_titled_rows_from_path(path: &Path) -> Result<Vec<TitledRow>, DatError> {
    let display = path.to_string_lossy().to_string();
    let file = File::open(path).map_err(|source| DatError::Io {
        path: display.clone(),
        source,
    })?;
    read_titled_rows(BufReader::new(file), &display)
}
