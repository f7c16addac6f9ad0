use crate::core::io::format::{self, FileFormat};
use crate::core::io::selection::FrameSelection;
use crate::engine::error::EngineError;
use crate::engine::progress::ProgressReporter;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct ConvertConfig {
    pub input_file: PathBuf,
    pub output_file: PathBuf,
    pub input_format: Option<FileFormat>,
    pub output_format: Option<FileFormat>,
    pub selection: FrameSelection,
}

#[derive(Debug, Clone)]
pub struct ConvertReport {
    pub frames_read: usize,
    /// Indices of the written frames in the input.
    pub written: Vec<usize>,
    pub output_file: PathBuf,
    pub output_format: FileFormat,
}

#[instrument(skip_all, name = "convert_workflow")]
pub fn run(config: &ConvertConfig, reporter: &ProgressReporter) -> Result<ConvertReport, EngineError> {
    let output_format = FileFormat::resolve(config.output_format, &config.output_file)?;
    let frames = reporter.phase("Reading input", || {
        format::read_frames(&config.input_file, config.input_format)
    })?;
    if frames.is_empty() {
        return Err(EngineError::NoFrames(config.input_file.clone()));
    }

    let indices = config.selection.resolve(frames.len())?;
    if indices.is_empty() {
        return Err(EngineError::EmptySelection {
            selection: config.selection.to_string(),
            available: frames.len(),
        });
    }
    let selected: Vec<_> = indices.iter().map(|&i| frames[i].clone()).collect();

    reporter.phase("Writing output", || {
        format::write_frames(&config.output_file, &selected, Some(output_format))
    })?;
    info!(
        "Converted {} frame(s) of '{}' to '{}' ({}).",
        selected.len(),
        config.input_file.display(),
        config.output_file.display(),
        output_format
    );
    Ok(ConvertReport {
        frames_read: frames.len(),
        written: indices,
        output_file: config.output_file.clone(),
        output_format,
    })
}

/// Name of the POSCAR written for frame `index`, e.g. `POSCAR12` or `POSCAR-1`.
pub fn frame_file_name(index: isize) -> String {
    format!("POSCAR{}", index)
}

/// Writes frame `index` of `input` as a POSCAR in `output_dir`.
#[instrument(skip_all, name = "frame_workflow", fields(index = index))]
pub fn write_frame(
    input: &Path,
    input_format: Option<FileFormat>,
    index: isize,
    output_dir: &Path,
) -> Result<PathBuf, EngineError> {
    let output = output_dir.join(frame_file_name(index));
    let config = ConvertConfig {
        input_file: input.to_path_buf(),
        output_file: output.clone(),
        input_format,
        output_format: Some(FileFormat::Vasp),
        selection: FrameSelection::Index(index),
    };
    run(&config, &ProgressReporter::new())?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::extxyz::ExtXyzFile;
    use crate::core::io::format::IoError;
    use crate::core::io::traits::TrajectoryWriter;
    use crate::core::models::cell::Cell;
    use crate::core::models::frame::Frame;
    use nalgebra::{Matrix3, Point3};
    use tempfile::tempdir;

    fn trajectory(dir: &Path) -> PathBuf {
        let frames: Vec<Frame> = (0..4)
            .map(|i| {
                let mut f = Frame::new(
                    vec!["Si".into(), "C".into()],
                    vec![Point3::origin(), Point3::new(1.0 + i as f64 * 0.1, 1.0, 1.0)],
                );
                f.set_cell(Cell::new(Matrix3::identity() * 4.35));
                f
            })
            .collect();
        let path = dir.join("traj.xyz");
        ExtXyzFile::write_frames_to_path(&frames, &path).unwrap();
        path
    }

    fn config(input: PathBuf, output: PathBuf, selection: &str) -> ConvertConfig {
        ConvertConfig {
            input_file: input,
            output_file: output,
            input_format: None,
            output_format: None,
            selection: selection.parse().unwrap(),
        }
    }

    #[test]
    fn default_selection_converts_the_last_frame() {
        let dir = tempdir().unwrap();
        let input = trajectory(dir.path());
        let mut c = config(input, dir.path().join("CONTCAR"), "-1");
        c.selection = FrameSelection::default();
        let report = run(&c, &ProgressReporter::new()).unwrap();
        assert_eq!(report.written, vec![3]);
        assert_eq!(report.output_format, FileFormat::Vasp);
        let back = format::read_frames(&report.output_file, None).unwrap();
        assert!((back[0].positions[1].x - 1.3).abs() < 1e-10);
    }

    #[test]
    fn slices_write_multi_frame_outputs() {
        let dir = tempdir().unwrap();
        let input = trajectory(dir.path());
        let c = config(input, dir.path().join("every_other.extxyz"), "::2");
        let report = run(&c, &ProgressReporter::new()).unwrap();
        assert_eq!(report.written, vec![0, 2]);
        assert_eq!(format::read_frames(&c.output_file, None).unwrap().len(), 2);
    }

    #[test]
    fn several_frames_into_a_poscar_is_an_error() {
        let dir = tempdir().unwrap();
        let input = trajectory(dir.path());
        let c = config(input.clone(), dir.path().join("POSCAR"), ":");
        assert!(matches!(
            run(&c, &ProgressReporter::new()),
            Err(EngineError::Io(IoError::TooManyFrames { count: 4, .. }))
        ));
        let c = config(input, dir.path().join("out.xyz"), "3:1");
        assert!(matches!(
            run(&c, &ProgressReporter::new()),
            Err(EngineError::EmptySelection { available: 4, .. })
        ));
    }

    #[test]
    fn write_frame_names_the_poscar_after_the_index() {
        let dir = tempdir().unwrap();
        let input = trajectory(dir.path());
        let out = write_frame(&input, None, 1, dir.path()).unwrap();
        assert_eq!(out.file_name().unwrap(), "POSCAR1");
        let back = format::read_frames(&out, Some(FileFormat::Vasp)).unwrap();
        assert!((back[0].positions[1].x - 1.1).abs() < 1e-10);
        assert_eq!(frame_file_name(-1), "POSCAR-1");
        assert!(matches!(
            write_frame(&input, None, 9, dir.path()),
            Err(EngineError::Selection(_))
        ));
    }
}
