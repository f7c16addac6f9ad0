use crate::core::io::format::{self, FileFormat};
use crate::core::io::sidecar::Sidecars;
use crate::core::models::frame::Frame;
use crate::engine::config::TriageConfig;
use crate::engine::error::EngineError;
use crate::engine::filter::{self, FilterCounts, Verdict, WindowPosition};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::record::{self, FrameRecord, RecordBuilder, SidecarValues};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub counts: FilterCounts,
}

/// An input that could not be read and was left out of the run.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedInput {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TriageReport {
    pub files: Vec<FileReport>,
    pub skipped_inputs: Vec<SkippedInput>,
    pub total: FilterCounts,
    pub output_file: PathBuf,
}

/// Expands glob patterns into existing files, keeping first-seen order.
///
/// A pattern that matches nothing is not an error by itself; the whole set matching
/// nothing is.
pub fn expand_inputs(patterns: &[String]) -> Result<Vec<PathBuf>, EngineError> {
    let mut paths: Vec<PathBuf> = Vec::new();
    for pattern in patterns {
        let entries = glob::glob(pattern).map_err(|e| EngineError::Pattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
        let mut matched = 0;
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => {
                    matched += 1;
                    if !paths.contains(&path) {
                        paths.push(path);
                    }
                }
                Ok(_) => {}
                Err(e) => warn!("Cannot access '{}': {}", e.path().display(), e.error()),
            }
        }
        if matched == 0 {
            warn!("Pattern '{}' matches no files", pattern);
        }
    }
    if paths.is_empty() {
        return Err(EngineError::NoInputs(patterns.to_vec()));
    }
    Ok(paths)
}

#[instrument(skip_all, name = "triage_workflow")]
pub fn run(config: &TriageConfig, reporter: &ProgressReporter) -> Result<TriageReport, EngineError> {
    let inputs = expand_inputs(&config.input_patterns)?;
    info!(
        "Triaging {} input file(s) with {} active predicate(s).",
        inputs.len(),
        config.filter.len()
    );
    for predicate in config.filter.predicates() {
        debug!("Predicate: {}", predicate);
    }

    let builder = RecordBuilder::new(config.filter.required_fields(), config.minimum_image);
    let mut files = Vec::new();
    let mut skipped_inputs = Vec::new();
    let mut total = FilterCounts::new(&config.filter);
    let mut kept_frames: Vec<Frame> = Vec::new();

    reporter.report(Progress::PhaseStart {
        name: "Filtering frames",
    });
    reporter.report(Progress::TaskStart {
        total_steps: inputs.len() as u64,
    });
    for path in &inputs {
        reporter.report(Progress::Message(path.display().to_string()));
        match triage_file(path, config, &builder) {
            Ok((counts, kept)) => {
                info!(
                    "{}: {} read, {} passed, {} rejected.",
                    path.display(),
                    counts.read,
                    counts.passed,
                    counts.rejected
                );
                total.merge(&counts);
                kept_frames.extend(kept);
                files.push(FileReport {
                    path: path.clone(),
                    counts,
                });
            }
            Err(e) => {
                warn!("Skipping '{}': {}", path.display(), e);
                skipped_inputs.push(SkippedInput {
                    path: path.clone(),
                    reason: e.to_string(),
                });
            }
        }
        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    reporter.phase("Writing output", || {
        format::write_frames(&config.output_file, &kept_frames, Some(FileFormat::ExtXyz))
    })?;
    info!(
        "Wrote {} frame(s) to '{}'.",
        kept_frames.len(),
        config.output_file.display()
    );

    Ok(TriageReport {
        files,
        skipped_inputs,
        total,
        output_file: config.output_file.clone(),
    })
}

fn sidecars_for(path: &Path, enabled: bool) -> Sidecars {
    if !enabled {
        return Sidecars::default();
    }
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    Sidecars::discover(dir).unwrap_or_else(|e| {
        warn!("{}; continuing without sidecar data", e);
        Sidecars::default()
    })
}

fn triage_file(
    path: &Path,
    config: &TriageConfig,
    builder: &RecordBuilder,
) -> Result<(FilterCounts, Vec<Frame>), EngineError> {
    let frames = format::read_frames(path, config.input_format)?;
    let sidecars = sidecars_for(path, config.use_sidecars);
    let sidecar_at = |i: usize| SidecarValues {
        temperature: sidecars.temperature(i),
        stress: sidecars.stress(i),
    };

    #[cfg(not(feature = "parallel"))]
    let iterator = frames.iter();
    #[cfg(feature = "parallel")]
    let iterator = frames.par_iter();

    let records: Vec<Option<FrameRecord>> = iterator
        .enumerate()
        .map(|(i, frame)| match config.window.classify(i) {
            WindowPosition::Inside => Some(builder.build(frame, &sidecar_at(i))),
            _ => None,
        })
        .collect();

    let outcome = filter::apply(&config.window, &config.filter, &records);
    for (i, verdict) in outcome.verdicts.iter().enumerate() {
        if let Verdict::Rejected(rejection) = verdict {
            let label = config
                .filter
                .predicates()
                .get(rejection.predicate)
                .map(|p| p.label())
                .unwrap_or_default();
            debug!("{} frame {}: rejected by {} ({})", path.display(), i, label, rejection.reason);
        }
    }

    let kept = outcome
        .kept
        .iter()
        .map(|&i| {
            let mut frame = frames[i].clone();
            record::annotate(&mut frame, &sidecar_at(i));
            frame
        })
        .collect();
    Ok((outcome.counts, kept))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::extxyz::ExtXyzFile;
    use crate::core::io::traits::TrajectoryWriter;
    use crate::core::models::cell::Cell;
    use crate::core::models::voigt::{Voigt, VoigtComponent};
    use crate::engine::config::TriageConfigBuilder;
    use crate::engine::filter::{Bound, FrameWindow, Predicate, Selector, SpeciesMatch};
    use crate::engine::record::Field;
    use nalgebra::{Matrix3, Point3, Vector3};
    use std::fs;
    use tempfile::tempdir;

    fn frame(energy: f64, force: f64, stress_xx: f64) -> Frame {
        let mut f = Frame::new(
            vec!["Fe".into(), "O".into()],
            vec![Point3::origin(), Point3::new(1.7, 0.1, 0.0)],
        );
        f.set_cell(Cell::new(Matrix3::identity() * 5.123456789));
        f.energy = Some(energy);
        f.forces = Some(vec![Vector3::new(force, 0.0, 0.0), Vector3::zeros()]);
        f.stress = Some(Voigt::new([stress_xx, 0.001, -0.002, 0.0, 0.0003, 0.0]));
        f
    }

    fn predicates() -> Vec<Predicate> {
        vec![
            Predicate::bounded(
                Selector::Scalar(Field::Energy),
                Bound::Inclusive(-10.0),
                Bound::Inclusive(-5.0),
            )
            .unwrap(),
            Predicate::bounded(
                Selector::Scalar(Field::MaxForce),
                Bound::Unbounded,
                Bound::Exclusive(1.0),
            )
            .unwrap(),
            Predicate::bounded(
                Selector::Scalar(Field::Temperature),
                Bound::Inclusive(250.0),
                Bound::Inclusive(350.0),
            )
            .unwrap(),
            Predicate::bounded(
                Selector::Component(Field::Stress, VoigtComponent::Xx),
                Bound::Inclusive(-1.0),
                Bound::Inclusive(1.0),
            )
            .unwrap(),
            Predicate::species(SpeciesMatch::All, ["Fe", "O"]).unwrap(),
        ]
    }

    fn write_input(dir: &Path) -> PathBuf {
        let frames = vec![
            frame(-6.0, 0.5, 0.001),
            frame(-7.123456789012345, 0.2, -0.003),
            frame(-6.0, 2.0, 0.0),
            frame(-1.0, 0.1, 0.0),
            frame(-8.0, 0.1, 0.0),
            frame(-9.0, 0.1, 0.0),
        ];
        let path = dir.join("md.xyz");
        ExtXyzFile::write_frames_to_path(&frames, &path).unwrap();
        // The fifth frame has no temperature entry.
        fs::write(dir.join("TB.dat"), "300\n301.5\n302\n303\n\n").unwrap();
        path
    }

    fn config(inputs: &[PathBuf], output: &Path) -> TriageConfig {
        TriageConfigBuilder::new()
            .input_patterns(inputs.iter().map(|p| p.display().to_string()))
            .output_file(output)
            .predicates(predicates())
            .build()
            .unwrap()
    }

    #[test]
    fn filters_with_sidecars_and_reports_exact_counts() {
        let dir = tempdir().unwrap();
        let input = write_input(dir.path());
        let output = dir.path().join("out").join("filtered.xyz");
        fs::create_dir(dir.path().join("out")).unwrap();

        let report = run(&config(&[input], &output), &ProgressReporter::new()).unwrap();
        let t = &report.total;
        assert_eq!(t.read, 6);
        assert_eq!(t.passed, 2);
        assert_eq!(t.rejected, 4);
        assert_eq!(t.missing_or_unconvertible, 2);
        assert_eq!(
            t.per_predicate,
            vec![
                ("energy".to_string(), 1),
                ("max_force".to_string(), 1),
                ("temperature".to_string(), 2),
                ("S_xx".to_string(), 0),
                ("species(all)".to_string(), 0),
            ]
        );

        let written = format::read_frames(&output, None).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(written[0].info_f64("temperature"), Some(300.0));
        assert_eq!(written[1].info_f64("temperature"), Some(301.5));
        assert!(written[1].info.contains_key("fstress"));
        assert!(written[1].info.contains_key("pressure"));
    }

    #[test]
    fn refiltering_the_output_keeps_every_frame() {
        let dir = tempdir().unwrap();
        let input = write_input(dir.path());
        let sub = dir.path().join("pass1");
        fs::create_dir(&sub).unwrap();
        let first = sub.join("first.xyz");
        run(&config(&[input], &first), &ProgressReporter::new()).unwrap();

        let second = dir.path().join("second.xyz");
        let report = run(&config(&[first.clone()], &second), &ProgressReporter::new()).unwrap();
        assert_eq!(report.total.read, 2);
        assert_eq!(report.total.passed, 2);
        assert_eq!(
            format::read_frames(&first, None).unwrap(),
            format::read_frames(&second, None).unwrap()
        );
    }

    #[test]
    fn window_is_applied_per_file() {
        let dir = tempdir().unwrap();
        let input = write_input(dir.path());
        let output = dir.path().join("windowed.xyz");
        let config = TriageConfigBuilder::new()
            .input_pattern(dir.path().join("*.xyz").display().to_string())
            .output_file(&output)
            .window(FrameWindow {
                skip: Some(1),
                start: None,
                end: Some(3),
            })
            .build()
            .unwrap();
        let report = run(&config, &ProgressReporter::new()).unwrap();
        assert_eq!(report.files.len(), 1);
        assert_eq!(report.files[0].path, input);
        let c = &report.total;
        assert_eq!((c.read, c.skipped_by_offset, c.outside_window, c.passed), (6, 1, 2, 3));
    }

    #[test]
    fn unreadable_inputs_are_skipped() {
        let dir = tempdir().unwrap();
        let input = write_input(dir.path());
        let broken = dir.path().join("broken.xyz");
        fs::write(&broken, "2\ncomment\nFe 0 0\n").unwrap();
        let output = dir.path().join("result.extxyz");
        let report = run(&config(&[broken.clone(), input], &output), &ProgressReporter::new())
            .unwrap();
        assert_eq!(report.skipped_inputs.len(), 1);
        assert_eq!(report.skipped_inputs[0].path, broken);
        assert_eq!(report.files.len(), 1);
        assert_eq!(report.total.read, 6);
    }

    #[test]
    fn nothing_matching_is_an_error() {
        let dir = tempdir().unwrap();
        let pattern = dir.path().join("*.xyz").display().to_string();
        assert!(matches!(
            expand_inputs(&[pattern]),
            Err(EngineError::NoInputs(_))
        ));
    }
}
