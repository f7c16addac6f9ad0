use crate::cli::ExtractArgs;
use crate::config::builder;
use crate::config::file;
use crate::config::models::ExtractFile;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use svxyz::workflows::extract;
use std::path::{Path, PathBuf};
use tracing::info;

/// The trajectory to use: the argument (which is then remembered) or the remembered one.
fn resolve_input(args: &ExtractArgs) -> Result<PathBuf> {
    if let Some(input) = &args.input {
        let remembered = ExtractFile {
            xyz_file: Some(input.to_string_lossy().into_owned()),
        };
        file::save(&args.config, &remembered)?;
        println!("Parameters saved to {}.", args.config.display());
        return Ok(input.clone());
    }
    remembered_input(&args.config)
}

fn remembered_input(config: &Path) -> Result<PathBuf> {
    let hint = || {
        CliError::Argument(format!(
            "Provide an input file, or make sure {} exists and contains 'xyz_file'.",
            config.display()
        ))
    };
    if !config.exists() {
        return Err(hint());
    }
    let stored: ExtractFile = file::load(config, &[])?;
    stored.xyz_file.map(PathBuf::from).ok_or_else(hint)
}

pub fn run(args: ExtractArgs, progress: &CliProgressHandler) -> Result<()> {
    let input = resolve_input(&args)?;
    info!("Extracting series from '{}'.", input.display());
    let config = builder::build_extract(&input, &args)?;
    let report = extract::run(&config, &progress.reporter())?;

    let names: Vec<String> = report
        .files
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    println!(
        "✓ Wrote {} for {} frame(s) to {}.",
        names.join(", "),
        report.frames,
        config.output_dir.display()
    );
    Ok(())
}
