use crate::cli::FrameArgs;
use crate::config::builder;
use crate::config::file;
use crate::config::models::FrameFile;
use crate::error::{CliError, Result};
use crate::utils::parser;
use svxyz::workflows::convert;
use std::path::{Path, PathBuf};

fn last_used(config: &Path) -> Result<Option<PathBuf>> {
    if !config.exists() {
        return Ok(None);
    }
    let stored: FrameFile = file::load(config, &[])?;
    Ok(stored.last_used_file.map(PathBuf::from))
}

pub fn run(args: FrameArgs) -> Result<()> {
    let (input, index) =
        parser::parse_frame_args(&args.args).map_err(|e| CliError::Argument(e.to_string()))?;

    let input = match input {
        Some(path) => {
            let stored = FrameFile {
                last_used_file: Some(path.to_string_lossy().into_owned()),
            };
            file::save(&args.config, &stored)?;
            path
        }
        None => last_used(&args.config)?.ok_or_else(|| {
            CliError::Argument(
                "No input file specified and no previous file found. Usage: svxyz frame [FILE] INDEX"
                    .to_string(),
            )
        })?,
    };

    let format = builder::parse_format(args.format.as_deref())?;
    let written = convert::write_frame(&input, format, index, &args.output_dir)?;
    println!(
        "Frame {} from {} has been written to {}.",
        index,
        input.display(),
        written.display()
    );
    Ok(())
}
