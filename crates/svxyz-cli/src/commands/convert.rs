use crate::cli::ConvertArgs;
use crate::config::builder;
use crate::config::file;
use crate::config::models::ConvertFile;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use svxyz::workflows::convert;

pub fn run(args: ConvertArgs, progress: &CliProgressHandler) -> Result<()> {
    if file::create_if_missing(&args.config, &ConvertFile::default())? {
        println!("Default configuration created: {}", args.config.display());
        println!("Configuration file not found. Generated a default configuration; edit it and run again.");
        return Ok(());
    }

    let file: ConvertFile = file::load(&args.config, &args.set_values)?;
    let config = builder::build_convert(&file, &args)?;
    let report = convert::run(&config, &progress.reporter())?;
    println!(
        "✓ Converted {} of {} frame(s) from {} to {} ({}).",
        report.written.len(),
        report.frames_read,
        config.input_file.display(),
        report.output_file.display(),
        report.output_format
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::write_trajectory;
    use crate::error::CliError;
    use svxyz::core::io::extxyz::ExtXyzFile;
    use svxyz::core::io::traits::TrajectoryReader;
    use svxyz::engine::error::EngineError;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn args(config: &Path, frames: Option<&str>, set: &[&str]) -> ConvertArgs {
        ConvertArgs {
            config: config.to_path_buf(),
            input: None,
            output: None,
            input_format: None,
            output_format: None,
            frames: frames.map(String::from),
            set_values: set.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn missing_config_is_created_with_a_format_note() {
        let dir = tempdir().unwrap();
        let config = dir.path().join("asefmt.json");
        run(args(&config, None, &[]), &CliProgressHandler::new(true)).unwrap();
        let text = fs::read_to_string(&config).unwrap();
        assert!(text.contains("\"_comment\""));
        assert!(text.contains("\"input_file\": \"POSCAR\""));
    }

    #[test]
    fn converts_a_slice_of_a_trajectory() {
        let dir = tempdir().unwrap();
        let input = write_trajectory(dir.path(), "md.xyz", 6);
        let output = dir.path().join("every_other.xyz");
        let config = dir.path().join("asefmt.json");
        let mut stored = ConvertFile::default();
        stored.input_file = input.display().to_string();
        stored.output_file = output.display().to_string();
        file::save(&config, &stored).unwrap();

        run(args(&config, Some("::2"), &[]), &CliProgressHandler::new(true)).unwrap();
        let frames = ExtXyzFile::read_frames_from_path(&output).unwrap();
        let energies: Vec<f64> = frames.iter().filter_map(|f| f.energy).collect();
        assert_eq!(energies, vec![-10.0, -8.0, -6.0]);
    }

    #[test]
    fn several_frames_cannot_go_into_one_poscar() {
        let dir = tempdir().unwrap();
        let input = write_trajectory(dir.path(), "md.xyz", 3);
        let config = dir.path().join("asefmt.json");
        let mut stored = ConvertFile::default();
        stored.input_file = input.display().to_string();
        stored.output_file = dir.path().join("POSCAR").display().to_string();
        stored.output_format = Some("vasp".into());
        file::save(&config, &stored).unwrap();

        let err = run(args(&config, None, &["frames=\":\""]), &CliProgressHandler::new(true))
            .unwrap_err();
        assert!(matches!(err, CliError::Core(EngineError::Io(_))));
    }
}
