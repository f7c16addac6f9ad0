//! Per-frame data that VASP runs keep next to the trajectory.
//!
//! `TB.dat` and `ST.dat` are produced by post-processing scripts of an MD run; when they
//! are absent the same quantities are scanned from the run's `OUTCAR`.

use crate::core::io::outcar::{scan_temperatures, scan_total_kin_stresses};
use crate::core::models::voigt::Voigt;
use regex::Regex;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

pub const TEMPERATURE_FILE: &str = "TB.dat";
pub const STRESS_FILE: &str = "ST.dat";
pub const OUTCAR_FILE: &str = "OUTCAR";

static FIRST_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?").expect("number pattern is valid")
});

#[derive(Debug, Error)]
#[error("Failed to read sidecar '{path}': {source}")]
pub struct SidecarError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// A per-frame series together with the file it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct SidecarSeries<T> {
    pub source: PathBuf,
    pub values: Vec<T>,
}

impl<T> SidecarSeries<T> {
    pub fn get(&self, index: usize) -> Option<&T> {
        self.values.get(index)
    }
}

/// Temperatures (K) and stresses (GPa, compressive positive) found next to an input file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sidecars {
    pub temperatures: Option<SidecarSeries<f64>>,
    pub stresses: Option<SidecarSeries<Voigt>>,
}

impl Sidecars {
    /// Looks for sidecar data in `dir`.
    ///
    /// Temperatures come from `TB.dat`, falling back to the `OUTCAR` MD lines; stresses from
    /// `ST.dat`, falling back to the `OUTCAR` `Total+kin.` rows. A source that exists but
    /// yields no values is treated as absent.
    pub fn discover(dir: &Path) -> Result<Self, SidecarError> {
        let outcar = dir.join(OUTCAR_FILE);

        let temperatures = first_non_empty(&[
            (dir.join(TEMPERATURE_FILE), read_temperature_file as Scanner<f64>),
            (outcar.clone(), scan_temperatures as Scanner<f64>),
        ])?;
        let stresses = first_non_empty(&[
            (dir.join(STRESS_FILE), read_stress_file as Scanner<Voigt>),
            (outcar, scan_total_kin_stresses as Scanner<Voigt>),
        ])?;

        Ok(Self {
            temperatures,
            stresses,
        })
    }

    pub fn temperature(&self, index: usize) -> Option<f64> {
        self.temperatures.as_ref()?.get(index).copied()
    }

    pub fn stress(&self, index: usize) -> Option<Voigt> {
        self.stresses.as_ref()?.get(index).copied()
    }
}

type Scanner<T> = fn(&mut BufReader<File>) -> io::Result<Vec<T>>;

fn first_non_empty<T>(
    candidates: &[(PathBuf, Scanner<T>)],
) -> Result<Option<SidecarSeries<T>>, SidecarError> {
    for (path, scan) in candidates {
        if !path.is_file() {
            continue;
        }
        let wrap = |source| SidecarError {
            path: path.clone(),
            source,
        };
        let file = File::open(path).map_err(wrap)?;
        let values = scan(&mut BufReader::new(file)).map_err(wrap)?;
        if values.is_empty() {
            debug!("Sidecar '{}' holds no values, trying the next source", path.display());
            continue;
        }
        debug!("Loaded {} values from '{}'", values.len(), path.display());
        return Ok(Some(SidecarSeries {
            source: path.clone(),
            values,
        }));
    }
    Ok(None)
}

/// Reads one temperature per line: the first number on each line that has one.
pub fn read_temperature_file(reader: &mut impl BufRead) -> io::Result<Vec<f64>> {
    let mut values = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if let Some(m) = FIRST_NUMBER_RE.find(&line) {
            if let Ok(v) = m.as_str().parse::<f64>() {
                values.push(v);
            }
        }
    }
    Ok(values)
}

/// Reads `step xx yy zz xy yz zx` rows (GPa) into Voigt order; malformed lines are skipped.
pub fn read_stress_file(reader: &mut impl BufRead) -> io::Result<Vec<Voigt>> {
    let mut values = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let parsed: Option<Vec<f64>> = line
            .split_whitespace()
            .skip(1)
            .take(6)
            .map(|t| t.parse().ok())
            .collect();
        if let Some(v) = parsed.filter(|v| v.len() == 6) {
            values.push(Voigt::from_vasp_order([v[0], v[1], v[2], v[3], v[4], v[5]]));
        }
    }
    Ok(values)
}
