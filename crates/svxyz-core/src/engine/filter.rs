//! The frame filter: a positional window followed by an ordered conjunction of
//! predicates over [`FrameRecord`] fields.

use super::config::ConfigError;
use super::record::{Field, FieldIssue, FieldValue, FrameRecord};
use crate::core::models::element;
use crate::core::models::voigt::VoigtComponent;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// One side of a [`Range`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Bound {
    #[default]
    Unbounded,
    Inclusive(f64),
    Exclusive(f64),
}

impl Bound {
    pub fn from_option(value: Option<f64>) -> Self {
        value.map_or(Bound::Unbounded, Bound::Inclusive)
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Bound::Unbounded => None,
            Bound::Inclusive(v) | Bound::Exclusive(v) => Some(v),
        }
    }

    pub fn is_exclusive(self) -> bool {
        matches!(self, Bound::Exclusive(_))
    }
}

/// Why a pair of bounds does not form a usable interval.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum RangeError {
    #[error("bound is NaN")]
    NanBound,
    #[error("lower bound {lower} exceeds upper bound {upper}")]
    Inverted { lower: f64, upper: f64 },
    #[error("empty interval at {0}")]
    Empty(f64),
}

/// A validated interval on the real line.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Range {
    lower: Bound,
    upper: Bound,
}

impl Range {
    pub fn new(lower: Bound, upper: Bound) -> Result<Self, RangeError> {
        if lower.value().is_some_and(f64::is_nan) || upper.value().is_some_and(f64::is_nan) {
            return Err(RangeError::NanBound);
        }
        if let (Some(lo), Some(hi)) = (lower.value(), upper.value()) {
            if lo > hi {
                return Err(RangeError::Inverted { lower: lo, upper: hi });
            }
            if lo == hi && (lower.is_exclusive() || upper.is_exclusive()) {
                return Err(RangeError::Empty(lo));
            }
        }
        Ok(Self { lower, upper })
    }

    /// An inclusive `[lo, hi]` range where `None` leaves a side open.
    pub fn closed(lo: Option<f64>, hi: Option<f64>) -> Result<Self, RangeError> {
        Self::new(Bound::from_option(lo), Bound::from_option(hi))
    }

    pub fn lower(&self) -> Bound {
        self.lower
    }

    pub fn upper(&self) -> Bound {
        self.upper
    }

    pub fn is_active(&self) -> bool {
        self.lower != Bound::Unbounded || self.upper != Bound::Unbounded
    }

    pub fn contains(&self, value: f64) -> bool {
        let above = match self.lower {
            Bound::Unbounded => true,
            Bound::Inclusive(lo) => value >= lo,
            Bound::Exclusive(lo) => value > lo,
        };
        let below = match self.upper {
            Bound::Unbounded => true,
            Bound::Inclusive(hi) => value <= hi,
            Bound::Exclusive(hi) => value < hi,
        };
        above && below
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.lower {
            Bound::Unbounded => f.write_str("(-inf")?,
            Bound::Inclusive(v) => write!(f, "[{}", v)?,
            Bound::Exclusive(v) => write!(f, "({}", v)?,
        }
        match self.upper {
            Bound::Unbounded => f.write_str(", inf)"),
            Bound::Inclusive(v) => write!(f, ", {}]", v),
            Bound::Exclusive(v) => write!(f, ", {})", v),
        }
    }
}

/// The value a range predicate looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    Scalar(Field),
    Component(Field, VoigtComponent),
}

impl Selector {
    pub fn field(self) -> Field {
        match self {
            Selector::Scalar(field) | Selector::Component(field, _) => field,
        }
    }

    /// The name used in reports: `energy`, `S_xx`, `V_yz`, ...
    pub fn label(self) -> String {
        match self {
            Selector::Scalar(field) => field.name().to_string(),
            Selector::Component(Field::Stress, c) => format!("S_{}", c.suffix()),
            Selector::Component(Field::Virial, c) => format!("V_{}", c.suffix()),
            Selector::Component(field, c) => format!("{}_{}", field.name(), c.suffix()),
        }
    }

    fn value(self, record: &FrameRecord) -> Result<f64, FieldIssue> {
        match self {
            Selector::Scalar(field) => record.scalar(field),
            Selector::Component(field, c) => record.tensor(field).map(|t| t[c]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeciesMatch {
    /// The frame contains every listed species.
    All,
    /// The frame contains at least one listed species.
    Any,
    /// Every species of the frame is listed.
    Only,
    /// The frame contains none of the listed species.
    None,
}

impl SpeciesMatch {
    pub fn name(self) -> &'static str {
        match self {
            SpeciesMatch::All => "all",
            SpeciesMatch::Any => "any",
            SpeciesMatch::Only => "only",
            SpeciesMatch::None => "none",
        }
    }

    pub fn matches(self, frame_species: &BTreeSet<String>, listed: &BTreeSet<String>) -> bool {
        match self {
            SpeciesMatch::All => listed.is_subset(frame_species),
            SpeciesMatch::Any => !listed.is_disjoint(frame_species),
            SpeciesMatch::Only => frame_species.is_subset(listed),
            SpeciesMatch::None => listed.is_disjoint(frame_species),
        }
    }
}

impl std::str::FromStr for SpeciesMatch {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(SpeciesMatch::All),
            "any" => Ok(SpeciesMatch::Any),
            "only" => Ok(SpeciesMatch::Only),
            "none" => Ok(SpeciesMatch::None),
            _ => Err(ConfigError::Unsupported {
                key: "atomic_filters.mode",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Range { selector: Selector, range: Range },
    Species { mode: SpeciesMatch, symbols: BTreeSet<String> },
}

impl Predicate {
    pub fn range(selector: Selector, range: Range) -> Result<Self, ConfigError> {
        let field = selector.field();
        let usable = match selector {
            Selector::Scalar(_) => field.is_scalar(),
            Selector::Component(..) => field.is_tensor(),
        };
        if !usable {
            return Err(ConfigError::FieldKind {
                field: field.name().to_string(),
                usage: match selector {
                    Selector::Scalar(_) => "a scalar range",
                    Selector::Component(..) => "a tensor component range",
                },
            });
        }
        Ok(Predicate::Range { selector, range })
    }

    /// Builds a range predicate from raw bounds, reporting invalid ranges under `selector`'s label.
    pub fn bounded(selector: Selector, lower: Bound, upper: Bound) -> Result<Self, ConfigError> {
        let range = Range::new(lower, upper).map_err(|reason| ConfigError::InvalidRange {
            predicate: selector.label(),
            reason,
        })?;
        Self::range(selector, range)
    }

    pub fn species<I, S>(mode: SpeciesMatch, symbols: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for symbol in symbols {
            let symbol = symbol.as_ref().trim();
            if !element::is_valid_symbol(symbol) {
                return Err(ConfigError::UnknownSpecies(symbol.to_string()));
            }
            set.insert(symbol.to_string());
        }
        if set.is_empty() {
            return Err(ConfigError::EmptySpecies);
        }
        Ok(Predicate::Species { mode, symbols: set })
    }

    pub fn is_active(&self) -> bool {
        match self {
            Predicate::Range { range, .. } => range.is_active(),
            Predicate::Species { .. } => true,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Predicate::Range { selector, .. } => selector.label(),
            Predicate::Species { mode, .. } => format!("species({})", mode.name()),
        }
    }

    pub fn required_field(&self) -> Field {
        match self {
            Predicate::Range { selector, .. } => selector.field(),
            Predicate::Species { .. } => Field::Species,
        }
    }

    pub fn evaluate(&self, record: &FrameRecord) -> Result<(), RejectReason> {
        match self {
            Predicate::Range { selector, range } => {
                let value = selector.value(record).map_err(RejectReason::from)?;
                if value.is_nan() {
                    return Err(RejectReason::Unconvertible(format!(
                        "{} is NaN",
                        selector.label()
                    )));
                }
                if range.contains(value) {
                    Ok(())
                } else {
                    Err(RejectReason::OutOfRange { value })
                }
            }
            Predicate::Species { mode, symbols } => match record.get(Field::Species) {
                Ok(FieldValue::Species(present)) => {
                    if mode.matches(present, symbols) {
                        Ok(())
                    } else {
                        Err(RejectReason::SpeciesMismatch)
                    }
                }
                Ok(other) => Err(RejectReason::Unconvertible(format!(
                    "species field holds {:?}",
                    other
                ))),
                Err(issue) => Err(issue.into()),
            },
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Range { selector, range } => write!(f, "{} in {}", selector.label(), range),
            Predicate::Species { mode, symbols } => {
                let list: Vec<&str> = symbols.iter().map(String::as_str).collect();
                write!(f, "species {} of {}", mode.name(), list.join(","))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    OutOfRange { value: f64 },
    SpeciesMismatch,
    Missing,
    Unconvertible(String),
}

impl RejectReason {
    /// Whether the rejection comes from absent or unusable data rather than a real value.
    pub fn is_data_issue(&self) -> bool {
        matches!(self, RejectReason::Missing | RejectReason::Unconvertible(_))
    }
}

impl From<FieldIssue> for RejectReason {
    fn from(issue: FieldIssue) -> Self {
        match issue {
            FieldIssue::Missing => RejectReason::Missing,
            FieldIssue::Unconvertible(why) => RejectReason::Unconvertible(why),
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::OutOfRange { value } => write!(f, "value {} out of range", value),
            RejectReason::SpeciesMismatch => f.write_str("species mismatch"),
            RejectReason::Missing => f.write_str("missing"),
            RejectReason::Unconvertible(why) => write!(f, "unconvertible ({})", why),
        }
    }
}

/// The first predicate a frame failed.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub predicate: usize,
    pub reason: RejectReason,
}

/// An ordered conjunction of active predicates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameFilter {
    predicates: Vec<Predicate>,
}

impl FrameFilter {
    /// Inactive predicates (ranges with both sides open) are dropped here.
    pub fn new(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Self {
            predicates: predicates.into_iter().filter(Predicate::is_active).collect(),
        }
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn labels(&self) -> Vec<String> {
        self.predicates.iter().map(Predicate::label).collect()
    }

    pub fn required_fields(&self) -> BTreeSet<Field> {
        self.predicates.iter().map(Predicate::required_field).collect()
    }

    /// Short-circuits on the first predicate that fails.
    pub fn evaluate(&self, record: &FrameRecord) -> Result<(), Rejection> {
        for (index, predicate) in self.predicates.iter().enumerate() {
            predicate
                .evaluate(record)
                .map_err(|reason| Rejection { predicate: index, reason })?;
        }
        Ok(())
    }
}

/// Where a frame lands relative to the positional window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPosition {
    SkippedByOffset,
    OutsideWindow,
    Inside,
}

/// Positional pre-stage applied per input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameWindow {
    /// Number of leading frames to skip; `None` disables skipping.
    pub skip: Option<usize>,
    /// Inclusive frame range on the file-local index.
    pub start: Option<usize>,
    pub end: Option<usize>,
}

impl FrameWindow {
    pub fn classify(&self, index: usize) -> WindowPosition {
        if self.skip.is_some_and(|skip| index < skip) {
            return WindowPosition::SkippedByOffset;
        }
        if self.start.is_some_and(|s| index < s) || self.end.is_some_and(|e| index > e) {
            return WindowPosition::OutsideWindow;
        }
        WindowPosition::Inside
    }
}

/// The fate of one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    SkippedByOffset,
    OutsideWindow,
    Passed,
    Rejected(Rejection),
}

impl Verdict {
    pub fn is_passed(&self) -> bool {
        matches!(self, Verdict::Passed)
    }
}

/// Exact tallies of a filter run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterCounts {
    pub read: usize,
    pub skipped_by_offset: usize,
    pub outside_window: usize,
    pub passed: usize,
    pub rejected: usize,
    pub missing_or_unconvertible: usize,
    /// Rejections attributed to each predicate, in predicate order.
    pub per_predicate: Vec<(String, usize)>,
}

impl FilterCounts {
    pub fn new(filter: &FrameFilter) -> Self {
        Self {
            per_predicate: filter.labels().into_iter().map(|l| (l, 0)).collect(),
            ..Self::default()
        }
    }

    pub fn record(&mut self, verdict: &Verdict) {
        self.read += 1;
        match verdict {
            Verdict::SkippedByOffset => self.skipped_by_offset += 1,
            Verdict::OutsideWindow => self.outside_window += 1,
            Verdict::Passed => self.passed += 1,
            Verdict::Rejected(rejection) => {
                self.rejected += 1;
                if rejection.reason.is_data_issue() {
                    self.missing_or_unconvertible += 1;
                }
                if let Some(slot) = self.per_predicate.get_mut(rejection.predicate) {
                    slot.1 += 1;
                }
            }
        }
    }

    pub fn merge(&mut self, other: &FilterCounts) {
        self.read += other.read;
        self.skipped_by_offset += other.skipped_by_offset;
        self.outside_window += other.outside_window;
        self.passed += other.passed;
        self.rejected += other.rejected;
        self.missing_or_unconvertible += other.missing_or_unconvertible;
        for (label, count) in &other.per_predicate {
            match self.per_predicate.iter_mut().find(|(l, _)| l == label) {
                Some(slot) => slot.1 += count,
                None => self.per_predicate.push((label.clone(), *count)),
            }
        }
    }
}

/// Frames kept by a run, in input order, with the run's counts and verdicts.
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub kept: Vec<usize>,
    pub verdicts: Vec<Verdict>,
    pub counts: FilterCounts,
}

/// Applies `window` and then `filter` to one file's records.
///
/// Records for frames outside the window are never looked at, so callers may pass
/// `None` for them.
pub fn apply(
    window: &FrameWindow,
    filter: &FrameFilter,
    records: &[Option<FrameRecord>],
) -> FilterOutcome {
    let mut counts = FilterCounts::new(filter);
    let mut kept = Vec::new();
    let mut verdicts = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let verdict = match window.classify(index) {
            WindowPosition::SkippedByOffset => Verdict::SkippedByOffset,
            WindowPosition::OutsideWindow => Verdict::OutsideWindow,
            WindowPosition::Inside => {
                let empty = FrameRecord::default();
                match filter.evaluate(record.as_ref().unwrap_or(&empty)) {
                    Ok(()) => Verdict::Passed,
                    Err(rejection) => Verdict::Rejected(rejection),
                }
            }
        };
        if verdict.is_passed() {
            kept.push(index);
        }
        counts.record(&verdict);
        verdicts.push(verdict);
    }
    FilterOutcome {
        kept,
        verdicts,
        counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::voigt::Voigt;

    fn record(energy: Option<f64>, stress_xx: f64, species: &[&str]) -> FrameRecord {
        let mut r = FrameRecord::default();
        r.insert(
            Field::Energy,
            energy.map(FieldValue::Scalar).ok_or(FieldIssue::Missing),
        );
        r.insert(
            Field::Stress,
            Ok(FieldValue::Tensor(Voigt::new([stress_xx, 0.0, 0.0, 0.0, 0.0, 0.0]))),
        );
        r.insert(
            Field::Species,
            Ok(FieldValue::Species(species.iter().map(|s| s.to_string()).collect())),
        );
        r
    }

    fn energy_below(hi: f64) -> Predicate {
        Predicate::bounded(
            Selector::Scalar(Field::Energy),
            Bound::Unbounded,
            Bound::Inclusive(hi),
        )
        .unwrap()
    }

    fn stress_xx_above(lo: f64) -> Predicate {
        Predicate::bounded(
            Selector::Component(Field::Stress, VoigtComponent::Xx),
            Bound::Exclusive(lo),
            Bound::Unbounded,
        )
        .unwrap()
    }

    #[test]
    fn range_validation_rejects_nan_and_inverted_bounds() {
        assert_eq!(Range::closed(Some(f64::NAN), None), Err(RangeError::NanBound));
        assert_eq!(
            Range::closed(Some(2.0), Some(1.0)),
            Err(RangeError::Inverted { lower: 2.0, upper: 1.0 })
        );
        assert_eq!(
            Range::new(Bound::Inclusive(1.0), Bound::Exclusive(1.0)),
            Err(RangeError::Empty(1.0))
        );
        assert!(Range::closed(Some(1.0), Some(1.0)).unwrap().contains(1.0));
        let err = Predicate::bounded(
            Selector::Scalar(Field::Temperature),
            Bound::Inclusive(5.0),
            Bound::Inclusive(1.0),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidRange {
                predicate: "temperature".to_string(),
                reason: RangeError::Inverted { lower: 5.0, upper: 1.0 },
            }
        );
    }

    #[test]
    fn bounds_respect_inclusivity() {
        let r = Range::new(Bound::Exclusive(0.0), Bound::Inclusive(1.0)).unwrap();
        assert!(!r.contains(0.0));
        assert!(r.contains(1.0));
        assert!(!r.contains(1.0000001));
        assert_eq!(r.to_string(), "(0, 1]");
    }

    #[test]
    fn field_kinds_and_species_are_validated() {
        assert!(matches!(
            Predicate::range(Selector::Scalar(Field::Stress), Range::default()),
            Err(ConfigError::FieldKind { .. })
        ));
        assert!(matches!(
            Predicate::range(
                Selector::Component(Field::Energy, VoigtComponent::Xx),
                Range::default()
            ),
            Err(ConfigError::FieldKind { .. })
        ));
        assert_eq!(
            Predicate::species(SpeciesMatch::All, ["Fe", "Xx"]).unwrap_err(),
            ConfigError::UnknownSpecies("Xx".into())
        );
        assert_eq!(
            Predicate::species(SpeciesMatch::All, Vec::<String>::new()).unwrap_err(),
            ConfigError::EmptySpecies
        );
    }

    #[test]
    fn species_modes() {
        let frame: BTreeSet<String> = ["Fe", "O"].iter().map(|s| s.to_string()).collect();
        let set = |s: &[&str]| s.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>();
        assert!(SpeciesMatch::All.matches(&frame, &set(&["Fe", "O"])));
        assert!(!SpeciesMatch::All.matches(&frame, &set(&["Fe", "Mg"])));
        assert!(SpeciesMatch::Any.matches(&frame, &set(&["Fe", "Mg"])));
        assert!(SpeciesMatch::Only.matches(&frame, &set(&["Fe", "O", "Mg"])));
        assert!(!SpeciesMatch::Only.matches(&frame, &set(&["Fe"])));
        assert!(SpeciesMatch::None.matches(&frame, &set(&["Mg"])));
        assert!(!SpeciesMatch::None.matches(&frame, &set(&["O"])));
    }

    #[test]
    fn first_failing_predicate_is_reported() {
        let filter = FrameFilter::new([energy_below(-1.0), stress_xx_above(0.0)]);
        let r = record(Some(0.0), -5.0, &["Fe"]);
        assert_eq!(
            filter.evaluate(&r),
            Err(Rejection {
                predicate: 0,
                reason: RejectReason::OutOfRange { value: 0.0 }
            })
        );
    }

    #[test]
    fn kept_set_does_not_depend_on_predicate_order() {
        let records: Vec<Option<FrameRecord>> = vec![
            Some(record(Some(-2.0), 1.0, &["Fe"])),
            Some(record(Some(0.0), 1.0, &["Fe"])),
            Some(record(Some(-2.0), -1.0, &["Fe"])),
            Some(record(None, 1.0, &["Fe"])),
            Some(record(Some(-3.0), 2.0, &["Fe", "O"])),
        ];
        let only_fe = Predicate::species(SpeciesMatch::Only, ["Fe"]).unwrap();
        let forward = FrameFilter::new([energy_below(-1.0), stress_xx_above(0.0), only_fe.clone()]);
        let backward = FrameFilter::new([only_fe, stress_xx_above(0.0), energy_below(-1.0)]);
        let window = FrameWindow::default();
        let a = apply(&window, &forward, &records);
        let b = apply(&window, &backward, &records);
        assert_eq!(a.kept, vec![0]);
        assert_eq!(a.kept, b.kept);
        assert_eq!(a.counts.rejected, b.counts.rejected);
    }

    #[test]
    fn missing_fields_fail_with_an_explicit_reason() {
        let filter = FrameFilter::new([energy_below(100.0)]);
        let outcome = apply(
            &FrameWindow::default(),
            &filter,
            &[Some(record(None, 0.0, &["O"]))],
        );
        assert!(outcome.kept.is_empty());
        assert_eq!(
            outcome.verdicts[0],
            Verdict::Rejected(Rejection {
                predicate: 0,
                reason: RejectReason::Missing
            })
        );
        assert_eq!(outcome.counts.missing_or_unconvertible, 1);
    }

    #[test]
    fn nan_values_are_unconvertible() {
        let filter = FrameFilter::new([energy_below(100.0)]);
        let r = record(Some(f64::NAN), 0.0, &["O"]);
        let rejection = filter.evaluate(&r).unwrap_err();
        assert!(matches!(rejection.reason, RejectReason::Unconvertible(_)));
    }

    #[test]
    fn inactive_predicates_are_dropped() {
        let open = Predicate::bounded(
            Selector::Scalar(Field::Volume),
            Bound::Unbounded,
            Bound::Unbounded,
        )
        .unwrap();
        let filter = FrameFilter::new([open, energy_below(0.0)]);
        assert_eq!(filter.labels(), vec!["energy".to_string()]);
        assert_eq!(filter.required_fields(), BTreeSet::from([Field::Energy]));
    }

    #[test]
    fn window_counts_are_exact() {
        let window = FrameWindow {
            skip: Some(2),
            start: Some(3),
            end: Some(6),
        };
        let filter = FrameFilter::new([energy_below(-1.0)]);
        let records: Vec<Option<FrameRecord>> = (0..10)
            .map(|i| Some(record(Some(if i % 2 == 0 { -2.0 } else { 0.0 }), 0.0, &["O"])))
            .collect();
        let outcome = apply(&window, &filter, &records);
        let c = &outcome.counts;
        assert_eq!(c.read, 10);
        assert_eq!(c.skipped_by_offset, 2);
        // indices 2 and 7..=9
        assert_eq!(c.outside_window, 4);
        assert_eq!(outcome.kept, vec![4, 6]);
        assert_eq!(c.passed, 2);
        assert_eq!(c.rejected, 2);
        assert_eq!(c.per_predicate, vec![("energy".to_string(), 2)]);
        assert_eq!(
            c.read,
            c.skipped_by_offset + c.outside_window + c.passed + c.rejected
        );
    }

    #[test]
    fn disabled_skip_keeps_leading_frames() {
        let window = FrameWindow::default();
        assert_eq!(window.classify(0), WindowPosition::Inside);
        let window = FrameWindow {
            skip: Some(0),
            ..FrameWindow::default()
        };
        assert_eq!(window.classify(0), WindowPosition::Inside);
    }

    #[test]
    fn counts_merge_by_label() {
        let filter = FrameFilter::new([energy_below(0.0)]);
        let mut total = FilterCounts::new(&filter);
        let mut other = FilterCounts::new(&filter);
        other.record(&Verdict::Passed);
        other.record(&Verdict::Rejected(Rejection {
            predicate: 0,
            reason: RejectReason::Missing,
        }));
        total.merge(&other);
        total.merge(&other);
        assert_eq!(total.read, 4);
        assert_eq!(total.passed, 2);
        assert_eq!(total.missing_or_unconvertible, 2);
        assert_eq!(total.per_predicate, vec![("energy".to_string(), 2)]);
    }
}
