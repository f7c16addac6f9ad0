use crate::core::io::dat::{DatError, SeriesKind, SeriesWriter};
use crate::core::io::format::{self, FileFormat};
use crate::core::models::frame::Frame;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::record::{Field, FieldIssue, FrameRecord, RecordBuilder, SidecarValues};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// The four tables every extraction writes.
pub const STANDARD_SERIES: [SeriesKind; 4] = [
    SeriesKind::Energy,
    SeriesKind::Force,
    SeriesKind::Virial,
    SeriesKind::Stress,
];

#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub input_file: PathBuf,
    pub input_format: Option<FileFormat>,
    pub output_dir: PathBuf,
    /// Series written in addition to [`STANDARD_SERIES`].
    pub extra_series: Vec<SeriesKind>,
    pub minimum_image: bool,
}

impl ExtractConfig {
    pub fn new(input_file: impl Into<PathBuf>) -> Self {
        Self {
            input_file: input_file.into(),
            input_format: None,
            output_dir: PathBuf::from("."),
            extra_series: Vec::new(),
            minimum_image: true,
        }
    }

    /// Standard series followed by the extras, without duplicates.
    pub fn series(&self) -> Vec<SeriesKind> {
        let mut all = STANDARD_SERIES.to_vec();
        for kind in &self.extra_series {
            if !all.contains(kind) {
                all.push(*kind);
            }
        }
        all
    }
}

#[derive(Debug, Clone)]
pub struct ExtractReport {
    pub frames: usize,
    pub files: Vec<PathBuf>,
}

fn fields_of(kind: SeriesKind) -> &'static [Field] {
    match kind {
        SeriesKind::Energy => &[Field::Energy],
        SeriesKind::Force => &[Field::MaxForce, Field::MeanForce],
        SeriesKind::Virial => &[Field::Virial],
        SeriesKind::Stress => &[Field::Stress],
        SeriesKind::Volume => &[Field::Volume],
        SeriesKind::Pressure => &[Field::Pressure],
        SeriesKind::Temperature => &[Field::Temperature],
        SeriesKind::Distance => &[Field::MinDistance],
    }
}

/// The row values of `kind` for one frame.
pub fn series_row(kind: SeriesKind, record: &FrameRecord, frame: usize) -> Result<Vec<f64>, EngineError> {
    let missing = |field: Field, issue: FieldIssue| EngineError::MissingProperty {
        frame,
        property: match issue {
            FieldIssue::Missing => field.name().to_string(),
            FieldIssue::Unconvertible(why) => format!("usable {} ({})", field.name(), why),
        },
    };
    let mut row = Vec::with_capacity(kind.columns());
    for &field in fields_of(kind) {
        if field.is_tensor() {
            let tensor = record.tensor(field).map_err(|e| missing(field, e))?;
            row.extend_from_slice(tensor.values());
        } else {
            row.push(record.scalar(field).map_err(|e| missing(field, e))?);
        }
    }
    Ok(row)
}

fn csv_error(path: &Path, source: csv::Error) -> EngineError {
    EngineError::Dat(DatError::Csv {
        path: path.display().to_string(),
        source,
    })
}

/// Writes the series tables of `frames` into `output_dir`.
///
/// Every frame must provide every requested property; the first gap aborts the
/// extraction before any table is written.
pub fn write_series(
    frames: &[Frame],
    series: &[SeriesKind],
    output_dir: &Path,
    minimum_image: bool,
    reporter: &ProgressReporter,
) -> Result<Vec<PathBuf>, EngineError> {
    let fields = series.iter().flat_map(|k| fields_of(*k).iter().copied());
    let builder = RecordBuilder::new(fields, minimum_image);
    let none = SidecarValues::default();

    reporter.report(Progress::TaskStart {
        total_steps: frames.len() as u64,
    });
    let mut rows: Vec<Vec<Vec<f64>>> = vec![Vec::with_capacity(frames.len()); series.len()];
    for (i, frame) in frames.iter().enumerate() {
        let record = builder.build(frame, &none);
        for (table, kind) in rows.iter_mut().zip(series) {
            table.push(series_row(*kind, &record, i)?);
        }
        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);

    fs::create_dir_all(output_dir).map_err(|source| EngineError::File {
        path: output_dir.to_path_buf(),
        source,
    })?;
    let mut written = Vec::with_capacity(series.len());
    for (kind, table) in series.iter().zip(rows) {
        let path = output_dir.join(kind.file_name());
        let file = File::create(&path).map_err(|source| EngineError::File {
            path: path.clone(),
            source,
        })?;
        let mut writer =
            SeriesWriter::new(BufWriter::new(file), &kind.header()).map_err(|e| csv_error(&path, e))?;
        for (id, row) in table.iter().enumerate() {
            writer.write_row(row, id).map_err(|e| csv_error(&path, e))?;
        }
        writer.finish().map_err(|e| csv_error(&path, e))?;
        written.push(path);
    }
    Ok(written)
}

#[instrument(skip_all, name = "extract_workflow")]
pub fn run(config: &ExtractConfig, reporter: &ProgressReporter) -> Result<ExtractReport, EngineError> {
    let frames = reporter.phase("Reading trajectory", || {
        format::read_frames(&config.input_file, config.input_format)
    })?;
    if frames.is_empty() {
        return Err(EngineError::NoFrames(config.input_file.clone()));
    }
    info!(
        "Read {} frame(s) from '{}'.",
        frames.len(),
        config.input_file.display()
    );

    reporter.report(Progress::PhaseStart {
        name: "Extracting series",
    });
    let files = write_series(
        &frames,
        &config.series(),
        &config.output_dir,
        config.minimum_image,
        reporter,
    )?;
    reporter.report(Progress::PhaseFinish);

    let names: Vec<String> = files
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .collect();
    info!("Wrote {}.", names.join(", "));
    Ok(ExtractReport {
        frames: frames.len(),
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::dat::read_series_table_from_path;
    use crate::core::io::extxyz::ExtXyzFile;
    use crate::core::io::traits::TrajectoryWriter;
    use crate::core::models::cell::Cell;
    use crate::core::models::voigt::Voigt;
    use crate::core::units::EV_PER_A3_TO_GPA;
    use nalgebra::{Matrix3, Point3, Vector3};
    use tempfile::tempdir;

    fn frame(energy: f64) -> Frame {
        let mut f = Frame::new(
            vec!["H".into(), "H".into()],
            vec![Point3::origin(), Point3::new(0.0, 0.0, 0.75)],
        );
        f.set_cell(Cell::new(Matrix3::identity() * 2.0));
        f.energy = Some(energy);
        f.forces = Some(vec![Vector3::new(3.0, 4.0, 0.0), Vector3::new(0.0, 0.0, 1.0)]);
        f.stress = Some(Voigt::new([-0.01, 0.0, 0.0, 0.0, 0.0, 0.02]));
        f
    }

    #[test]
    fn writes_the_standard_tables() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("train.xyz");
        ExtXyzFile::write_frames_to_path(&[frame(-1.5), frame(-2.5)], &input).unwrap();
        let mut config = ExtractConfig::new(&input);
        config.output_dir = dir.path().join("dat");
        config.extra_series = vec![SeriesKind::Volume, SeriesKind::Distance, SeriesKind::Energy];

        let report = run(&config, &ProgressReporter::new()).unwrap();
        assert_eq!(report.frames, 2);
        assert_eq!(report.files.len(), 6);

        let e = read_series_table_from_path(&config.output_dir.join("E.dat")).unwrap();
        assert_eq!(e.column(0).unwrap(), &[-1.5, -2.5]);
        assert_eq!(e.ids, vec![0, 1]);

        let f = read_series_table_from_path(&config.output_dir.join("F.dat")).unwrap();
        assert_eq!(f.column(0).unwrap(), &[5.0, 5.0]);
        assert_eq!(f.column(1).unwrap(), &[3.0, 3.0]);

        let s = read_series_table_from_path(&config.output_dir.join("stress.dat")).unwrap();
        let expected_xx = (0.01 * EV_PER_A3_TO_GPA * 1e6).round() / 1e6;
        assert!((s.column(0).unwrap()[0] - expected_xx).abs() < 1e-9);

        let v = read_series_table_from_path(&config.output_dir.join("virial.dat")).unwrap();
        assert!((v.column(0).unwrap()[0] - 0.08).abs() < 1e-9);
        assert!((v.column(5).unwrap()[0] + 0.16).abs() < 1e-9);

        let d = read_series_table_from_path(&config.output_dir.join("distance.dat")).unwrap();
        assert!((d.column(0).unwrap()[0] - 0.75).abs() < 1e-9);
    }

    #[test]
    fn a_missing_property_names_the_frame() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("train.xyz");
        let mut second = frame(-2.0);
        second.forces = None;
        ExtXyzFile::write_frames_to_path(&[frame(-1.0), second], &input).unwrap();
        let mut config = ExtractConfig::new(&input);
        config.output_dir = dir.path().to_path_buf();

        let err = run(&config, &ProgressReporter::new()).unwrap_err();
        match err {
            EngineError::MissingProperty { frame, property } => {
                assert_eq!(frame, 1);
                assert_eq!(property, "max_force");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!dir.path().join("E.dat").exists());
    }
}
