use crate::cli::InitArgs;
use crate::error::{CliError, Result};
use std::path::PathBuf;
use tracing::info;

pub fn run(args: InitArgs) -> Result<()> {
    let path = args
        .output
        .unwrap_or_else(|| PathBuf::from(args.tool.config_file_name()));
    if path.exists() && !args.force {
        return Err(CliError::Config(format!(
            "'{}' already exists; pass --force to overwrite it",
            path.display()
        )));
    }
    args.tool.write_default(&path)?;
    info!("Wrote default {:?} configuration to {:?}", args.tool, path);
    println!("Default configuration created: {}", path.display());
    Ok(())
}
