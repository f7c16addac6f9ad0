use super::config::ConfigError;
use crate::core::analysis::properties;
use crate::core::models::frame::{Frame, InfoValue};
use crate::core::models::voigt::Voigt;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Info key holding the frame temperature (K).
pub const TEMPERATURE_KEY: &str = "temperature";
/// Info key holding the frame stress (GPa, compressive positive, Voigt order).
pub const FSTRESS_KEY: &str = "fstress";
pub const VOLUME_KEY: &str = "volume";
pub const PRESSURE_KEY: &str = "pressure";

/// A named per-frame quantity that predicates can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Energy,
    MaxForce,
    MeanForce,
    Stress,
    Virial,
    Temperature,
    Pressure,
    Volume,
    MinDistance,
    Species,
}

impl Field {
    pub const ALL: [Field; 10] = [
        Field::Energy,
        Field::MaxForce,
        Field::MeanForce,
        Field::Stress,
        Field::Virial,
        Field::Temperature,
        Field::Pressure,
        Field::Volume,
        Field::MinDistance,
        Field::Species,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::Energy => "energy",
            Field::MaxForce => "max_force",
            Field::MeanForce => "mean_force",
            Field::Stress => "stress",
            Field::Virial => "virial",
            Field::Temperature => "temperature",
            Field::Pressure => "pressure",
            Field::Volume => "volume",
            Field::MinDistance => "min_distance",
            Field::Species => "species",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Field::Energy | Field::Virial => "eV",
            Field::MaxForce | Field::MeanForce => "eV/Å",
            Field::Stress | Field::Pressure => "GPa",
            Field::Temperature => "K",
            Field::Volume => "Å³",
            Field::MinDistance => "Å",
            Field::Species => "",
        }
    }

    /// Whether the field holds six Voigt components rather than one number.
    pub fn is_tensor(self) -> bool {
        matches!(self, Field::Stress | Field::Virial)
    }

    pub fn is_scalar(self) -> bool {
        !self.is_tensor() && self != Field::Species
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|f| f.name() == s.trim())
            .ok_or_else(|| ConfigError::UnknownField(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(f64),
    Tensor(Voigt),
    Species(BTreeSet<String>),
}

/// Why a field has no usable value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldIssue {
    /// The frame and its sidecars do not provide the source data.
    Missing,
    /// Source data exists but cannot be turned into a number.
    Unconvertible(String),
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldIssue::Missing => f.write_str("missing"),
            FieldIssue::Unconvertible(why) => write!(f, "unconvertible ({})", why),
        }
    }
}

pub type FieldResult = Result<FieldValue, FieldIssue>;

/// The field values of one frame, restricted to the fields that were requested.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameRecord {
    values: BTreeMap<Field, FieldResult>,
}

impl FrameRecord {
    pub fn get(&self, field: Field) -> Result<&FieldValue, FieldIssue> {
        match self.values.get(&field) {
            Some(Ok(v)) => Ok(v),
            Some(Err(issue)) => Err(issue.clone()),
            None => Err(FieldIssue::Missing),
        }
    }

    pub fn scalar(&self, field: Field) -> Result<f64, FieldIssue> {
        match self.get(field)? {
            FieldValue::Scalar(v) => Ok(*v),
            other => Err(FieldIssue::Unconvertible(format!(
                "{} is not a scalar: {:?}",
                field, other
            ))),
        }
    }

    pub fn tensor(&self, field: Field) -> Result<Voigt, FieldIssue> {
        match self.get(field)? {
            FieldValue::Tensor(v) => Ok(*v),
            other => Err(FieldIssue::Unconvertible(format!(
                "{} is not a tensor: {:?}",
                field, other
            ))),
        }
    }

    pub fn insert(&mut self, field: Field, value: FieldResult) {
        self.values.insert(field, value);
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.values.keys().copied()
    }
}

/// Data found next to the input file for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SidecarValues {
    pub temperature: Option<f64>,
    /// GPa, compressive positive.
    pub stress: Option<Voigt>,
}

fn finite_f64(value: f64, what: &str) -> Result<f64, FieldIssue> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FieldIssue::Unconvertible(format!("{} is {}", what, value)))
    }
}

fn finite(value: f64, what: &str) -> FieldResult {
    finite_f64(value, what).map(FieldValue::Scalar)
}

fn finite_tensor(value: Voigt, what: &str) -> Result<Voigt, FieldIssue> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FieldIssue::Unconvertible(format!(
            "{} has non-finite components",
            what
        )))
    }
}

/// Computes field values for frames.
///
/// Only the requested fields (plus the fields they derive from) are evaluated, so a
/// filter on energy never fails because a frame has no forces.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    fields: BTreeSet<Field>,
    minimum_image: bool,
}

impl RecordBuilder {
    pub fn new(fields: impl IntoIterator<Item = Field>, minimum_image: bool) -> Self {
        Self {
            fields: fields.into_iter().collect(),
            minimum_image,
        }
    }

    pub fn fields(&self) -> &BTreeSet<Field> {
        &self.fields
    }

    pub fn build(&self, frame: &Frame, sidecar: &SidecarValues) -> FrameRecord {
        let mut record = FrameRecord::default();
        for &field in &self.fields {
            let value = match field {
                Field::Energy => match frame.energy {
                    Some(e) => finite(e, "energy"),
                    None => Err(FieldIssue::Missing),
                },
                Field::MaxForce => properties::max_force(frame)
                    .ok_or(FieldIssue::Missing)
                    .and_then(|v| finite(v, "max force")),
                Field::MeanForce => properties::mean_force(frame)
                    .ok_or(FieldIssue::Missing)
                    .and_then(|v| finite(v, "mean force")),
                Field::Stress => resolve_stress(frame, sidecar).map(FieldValue::Tensor),
                Field::Pressure => resolve_stress(frame, sidecar)
                    .and_then(|s| finite(properties::pressure(&s), "pressure")),
                Field::Virial => resolve_stress(frame, sidecar).and_then(|s| {
                    let volume = resolve_volume(frame)?;
                    Ok(FieldValue::Tensor(properties::virial(&s, volume)))
                }),
                Field::Temperature => resolve_temperature(frame, sidecar).map(FieldValue::Scalar),
                Field::Volume => resolve_volume(frame).map(FieldValue::Scalar),
                Field::MinDistance => properties::min_pair_distance(frame, self.minimum_image)
                    .ok_or(FieldIssue::Missing)
                    .and_then(|v| finite(v, "minimum distance")),
                Field::Species => Ok(FieldValue::Species(frame.species())),
            };
            record.insert(field, value);
        }
        record
    }
}

/// Temperature precedence: the frame's own `temperature` info, then the sidecar value.
///
/// An info value that cannot be parsed is reported as unconvertible rather than
/// silently replaced by the sidecar.
pub fn resolve_temperature(frame: &Frame, sidecar: &SidecarValues) -> Result<f64, FieldIssue> {
    if let Some(value) = frame.info.get(TEMPERATURE_KEY) {
        let t = value.as_f64().ok_or_else(|| {
            FieldIssue::Unconvertible(format!("temperature '{}' is not a number", value))
        })?;
        return finite_f64(t, "temperature");
    }
    sidecar
        .temperature
        .ok_or(FieldIssue::Missing)
        .and_then(|t| finite_f64(t, "sidecar temperature"))
}

/// Stress precedence (GPa, compressive positive): `fstress` info, sidecar, the frame's
/// own stress tensor.
pub fn resolve_stress(frame: &Frame, sidecar: &SidecarValues) -> Result<Voigt, FieldIssue> {
    if let Some(value) = frame.info.get(FSTRESS_KEY) {
        let values = value
            .as_f64_vec()
            .filter(|v| v.len() == 6)
            .ok_or_else(|| {
                FieldIssue::Unconvertible(format!("fstress '{}' is not six numbers", value))
            })?;
        let voigt = Voigt::new([values[0], values[1], values[2], values[3], values[4], values[5]]);
        return finite_tensor(voigt, "fstress");
    }
    if let Some(stress) = sidecar.stress {
        return finite_tensor(stress, "sidecar stress");
    }
    match properties::stress_gpa(frame) {
        Some(stress) => finite_tensor(stress, "stress"),
        None => Err(FieldIssue::Missing),
    }
}

pub fn resolve_volume(frame: &Frame) -> Result<f64, FieldIssue> {
    let volume = frame.volume().ok_or(FieldIssue::Missing)?;
    finite_f64(volume, "volume")
}

/// Embeds the derived values into the frame so that a re-read resolves them identically.
///
/// Values that cannot be resolved are left out rather than written as placeholders.
pub fn annotate(frame: &mut Frame, sidecar: &SidecarValues) {
    if let Ok(t) = resolve_temperature(frame, sidecar) {
        frame.set_info(TEMPERATURE_KEY, InfoValue::Float(t));
    }
    if let Ok(v) = resolve_volume(frame) {
        frame.set_info(VOLUME_KEY, InfoValue::Float(v));
    }
    if let Ok(stress) = resolve_stress(frame, sidecar) {
        frame.set_info(PRESSURE_KEY, InfoValue::Float(properties::pressure(&stress)));
        frame.set_info(FSTRESS_KEY, InfoValue::FloatArray(stress.values().to_vec()));
    }
}
