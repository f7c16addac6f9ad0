use super::models::{
    AnalyzeFile, AtomicFilterSpec, ConvertFile, LimitsFile, PlotFile, RangeSpec, TriageFile,
};
use crate::cli::{ConvertArgs, ExtractArgs, PlotArgs};
use crate::error::{CliError, Result};
use svxyz::core::io::dat::SeriesKind;
use svxyz::core::io::format::FileFormat;
use svxyz::core::io::selection::FrameSelection;
use svxyz::core::models::voigt::VoigtComponent;
use svxyz::engine::config::{ConfigError, TriageConfig, TriageConfigBuilder};
use svxyz::engine::error::EngineError;
use svxyz::engine::filter::{Bound, FrameWindow, Predicate, Selector, SpeciesMatch};
use svxyz::engine::record::Field;
use svxyz::workflows::analyze::AnalyzeConfig;
use svxyz::workflows::convert::ConvertConfig;
use svxyz::workflows::extract::ExtractConfig;
use svxyz::workflows::plot::{AxisLimits, Colormap, DataSource, PlotConfig};
use std::path::{Path, PathBuf};

/// Settings of a triage run that only affect how the CLI reports it.
#[derive(Debug, Clone)]
pub struct TriageSettings {
    pub core_config: TriageConfig,
    pub show_summary: bool,
}

pub fn parse_format(name: Option<&str>) -> Result<Option<FileFormat>> {
    name.map(|n| n.parse::<FileFormat>().map_err(EngineError::from))
        .transpose()
        .map_err(CliError::from)
}

fn bounds(spec: &RangeSpec, label: &str) -> Result<(Bound, Bound)> {
    match *spec {
        RangeSpec::Pair([lo, hi]) => Ok((Bound::from_option(lo), Bound::from_option(hi))),
        RangeSpec::Bounds(b) => {
            let side = |exclusive: Option<f64>, inclusive: Option<f64>, names: &str| {
                match (exclusive, inclusive) {
                    (Some(_), Some(_)) => Err(CliError::Config(format!(
                        "'{}' sets both {}; use one of them",
                        label, names
                    ))),
                    (Some(v), None) => Ok(Bound::Exclusive(v)),
                    (None, Some(v)) => Ok(Bound::Inclusive(v)),
                    (None, None) => Ok(Bound::Unbounded),
                }
            };
            Ok((side(b.gt, b.ge, "gt and ge")?, side(b.lt, b.le, "lt and le")?))
        }
    }
}

fn range_predicate(selector: Selector, spec: &RangeSpec) -> Result<Predicate> {
    let (lower, upper) = bounds(spec, &selector.label())?;
    Ok(Predicate::bounded(selector, lower, upper)?)
}

/// Component predicates in `xx yy zz yz xz xy` order, whatever order the file lists them in.
fn component_predicates(
    field: Field,
    prefix: &str,
    filters: &std::collections::BTreeMap<String, RangeSpec>,
) -> Result<Vec<Predicate>> {
    let mut keyed = Vec::with_capacity(filters.len());
    for (key, spec) in filters {
        let component = key
            .strip_prefix(prefix)
            .and_then(|suffix| suffix.parse::<VoigtComponent>().ok())
            .ok_or_else(|| {
                CliError::Config(format!(
                    "Unknown {} filter key '{}' (expected {}xx ... {}xy)",
                    field, key, prefix, prefix
                ))
            })?;
        keyed.push((component, spec));
    }
    keyed.sort_by_key(|(c, _)| c.index());
    keyed
        .into_iter()
        .map(|(c, spec)| range_predicate(Selector::Component(field, c), spec))
        .collect()
}

fn species_predicate(spec: &AtomicFilterSpec) -> Result<Predicate> {
    let (mode, species) = match spec {
        AtomicFilterSpec::Species(list) => (SpeciesMatch::All, list),
        AtomicFilterSpec::Detailed(d) => (d.mode.parse::<SpeciesMatch>()?, &d.species),
    };
    Ok(Predicate::species(mode, species)?)
}

fn window(file: &TriageFile) -> Result<FrameWindow> {
    let [start, end] = file.frame_range;
    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            return Err(CliError::Config(format!(
                "frame_range starts after it ends ({} > {})",
                s, e
            )));
        }
    }
    Ok(FrameWindow {
        skip: file.skip.on.is_on().then_some(file.skip.count),
        start,
        end,
    })
}

pub fn build_triage(file: &TriageFile) -> Result<TriageSettings> {
    if file.stress_unit != "GPa" {
        return Err(ConfigError::Unsupported {
            key: "stress_unit",
            value: file.stress_unit.clone(),
        }
        .into());
    }

    let scalar_ranges = [
        (Field::Energy, &file.energy_range),
        (Field::MaxForce, &file.max_atomic_force_range),
        (Field::MeanForce, &file.mean_atomic_force_range),
        (Field::Pressure, &file.pressure_range),
        (Field::Volume, &file.volume_range),
        (Field::Temperature, &file.temperature_range),
        (Field::MinDistance, &file.min_distance_range),
    ];
    let mut predicates = Vec::new();
    for (field, spec) in scalar_ranges {
        predicates.push(range_predicate(Selector::Scalar(field), spec)?);
    }
    predicates.extend(component_predicates(Field::Virial, "V_", &file.virial_filters)?);
    predicates.extend(component_predicates(Field::Stress, "S_", &file.stress_filters)?);
    if let Some(spec) = &file.atomic_filters {
        predicates.push(species_predicate(spec)?);
    }

    let core_config = TriageConfigBuilder::new()
        .input_patterns(file.input_files.to_vec())
        .input_format(parse_format(file.input_format.as_deref())?)
        .output_file(&file.output_file)
        .window(window(file)?)
        .predicates(predicates)
        .minimum_image(file.minimum_image)
        .use_sidecars(file.use_sidecars)
        .build()?;

    Ok(TriageSettings {
        core_config,
        show_summary: file.show_summary,
    })
}

impl From<LimitsFile> for AxisLimits {
    fn from(l: LimitsFile) -> Self {
        Self {
            x_min: l.x_min,
            x_max: l.x_max,
            y_min: l.y_min,
            y_max: l.y_max,
        }
    }
}

pub fn build_plot(file: &PlotFile, args: &PlotArgs) -> Result<PlotConfig> {
    let source: DataSource = args.data_type.parse().map_err(CliError::Argument)?;
    let mut config = PlotConfig::new(source, args.indices.clone());
    if let Some(data_file) = &file.data_file {
        config.data_file = PathBuf::from(data_file);
    }
    config.output_file = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&file.output_file));
    config.ylabel = file.ylabel.clone();
    config.colormap = file
        .colormap
        .parse::<Colormap>()
        .map_err(EngineError::from)?;
    if file.width == 0 || file.height == 0 {
        return Err(CliError::Config(format!(
            "Figure size must be positive, got {}x{}",
            file.width, file.height
        )));
    }
    config.size = (file.width, file.height);
    config.distribution_limits = file.distribution_limits.into();
    config.projection_limits = file.projection_limits.into();
    Ok(config)
}

pub fn build_convert(file: &ConvertFile, args: &ConvertArgs) -> Result<ConvertConfig> {
    let selection_text = args.frames.as_deref().unwrap_or(&file.frames);
    let selection = selection_text
        .parse::<FrameSelection>()
        .map_err(EngineError::from)?;
    Ok(ConvertConfig {
        input_file: args
            .input
            .clone()
            .unwrap_or_else(|| PathBuf::from(&file.input_file)),
        output_file: args
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(&file.output_file)),
        input_format: parse_format(args.input_format.as_deref().or(file.input_format.as_deref()))?,
        output_format: parse_format(
            args.output_format
                .as_deref()
                .or(file.output_format.as_deref()),
        )?,
        selection,
    })
}

pub fn build_extract(input: &Path, args: &ExtractArgs) -> Result<ExtractConfig> {
    let mut config = ExtractConfig::new(input);
    config.input_format = parse_format(args.format.as_deref())?;
    config.output_dir = args.output_dir.clone();
    config.minimum_image = !args.no_minimum_image;
    config.extra_series = args
        .series
        .iter()
        .map(|s| s.parse::<SeriesKind>().map_err(CliError::Argument))
        .collect::<Result<_>>()?;
    Ok(config)
}

pub fn build_analyze(file: &AnalyzeFile, output_dir: &Path) -> AnalyzeConfig {
    let mut config = AnalyzeConfig::new(&file.input_file);
    config.output_dir = output_dir.to_path_buf();
    config.minimum_image = file.minimum_image;
    config.symprec = file.tol;
    config
}
