use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `"vasprun.xml"` or `["run1/vasprun.xml", "run2/OUTCAR"]`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Patterns {
    One(String),
    Many(Vec<String>),
}

impl Patterns {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Patterns::One(p) => vec![p.clone()],
            Patterns::Many(ps) => ps.clone(),
        }
    }
}

/// Accepts `1`/`0` as well as `true`/`false`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(untagged)]
pub enum Switch {
    Flag(bool),
    Number(i64),
}

impl Switch {
    pub fn is_on(self) -> bool {
        match self {
            Switch::Flag(b) => b,
            Switch::Number(n) => n != 0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SkipSpec {
    pub on: Switch,
    pub count: usize,
}

/// Explicit bound kinds: `{"gt": 0.0, "le": 5.0}`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct BoundSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ge: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub le: Option<f64>,
}

/// A range as written in a configuration file.
///
/// `[lo, hi]` is inclusive on both sides with `null` for an open side; the object form
/// chooses exclusive (`gt`, `lt`) or inclusive (`ge`, `le`) bounds per side.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(untagged)]
pub enum RangeSpec {
    Pair([Option<f64>; 2]),
    Bounds(BoundSpec),
}

impl Default for RangeSpec {
    fn default() -> Self {
        RangeSpec::Pair([None, None])
    }
}

/// `["H", "O"]` or `{"species": ["H", "O"], "mode": "only"}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum AtomicFilterSpec {
    Species(Vec<String>),
    Detailed(DetailedAtomicFilter),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DetailedAtomicFilter {
    pub species: Vec<String>,
    #[serde(default = "default_species_mode")]
    pub mode: String,
}

pub fn default_species_mode() -> String {
    "all".to_string()
}

/// `txyz.json`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TriageFile {
    pub input_files: Patterns,
    pub input_format: Option<String>,
    pub output_file: String,
    pub skip: SkipSpec,
    pub frame_range: [Option<usize>; 2],
    pub energy_range: RangeSpec,
    pub max_atomic_force_range: RangeSpec,
    pub mean_atomic_force_range: RangeSpec,
    pub pressure_range: RangeSpec,
    pub volume_range: RangeSpec,
    pub temperature_range: RangeSpec,
    pub min_distance_range: RangeSpec,
    pub virial_filters: BTreeMap<String, RangeSpec>,
    pub stress_filters: BTreeMap<String, RangeSpec>,
    pub atomic_filters: Option<AtomicFilterSpec>,
    pub minimum_image: bool,
    pub use_sidecars: bool,
    pub stress_unit: String,
    pub show_summary: bool,
}

/// Axis limits of one plot panel; missing sides are fitted to the data.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsFile {
    pub x_min: Option<f64>,
    pub x_max: Option<f64>,
    pub y_min: Option<f64>,
    pub y_max: Option<f64>,
}

/// `pxyz.json`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PlotFile {
    /// Table to read instead of the data type's usual file.
    pub data_file: Option<String>,
    pub output_file: String,
    pub ylabel: String,
    pub colormap: String,
    pub width: u32,
    pub height: u32,
    pub distribution_limits: LimitsFile,
    pub projection_limits: LimitsFile,
}

/// `asefmt.json`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConvertFile {
    pub input_file: String,
    pub output_file: String,
    pub input_format: Option<String>,
    pub output_format: Option<String>,
    pub frames: String,
    #[serde(rename = "_comment", skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// `dxyz.json`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct ExtractFile {
    pub xyz_file: Option<String>,
}

/// `xyz2pos.json`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct FrameFile {
    pub last_used_file: Option<String>,
}

/// `analpos.json`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AnalyzeFile {
    /// Symmetry tolerance (Å).
    pub tol: f64,
    pub input_file: String,
    pub minimum_image: bool,
}
