use thiserror::Error;

use super::config::ConfigError;
use crate::core::analysis::kde::KdeError;
use crate::core::analysis::symmetry::SymmetryError;
use crate::core::io::dat::DatError;
use crate::core::io::format::IoError;
use crate::core::io::selection::SelectionError;
use crate::core::io::sidecar::SidecarError;
use std::path::PathBuf;

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("Nothing to plot: {0}")]
    NoData(String),

    #[error("Column {index} does not exist in '{source_name}' ({available} columns)")]
    NoSuchColumn {
        index: usize,
        source_name: String,
        available: usize,
    },

    #[error("Unsupported figure format '{0}' (use .svg or .png)")]
    UnsupportedOutput(String),

    #[error("Unknown colormap '{0}'")]
    UnknownColormap(String),

    #[error("Drawing failed: {0}")]
    Drawing(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    Dat(#[from] DatError),

    #[error(transparent)]
    Sidecar(#[from] SidecarError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("Density estimate for '{series}' failed: {source}")]
    Density {
        series: String,
        #[source]
        source: KdeError,
    },

    #[error(transparent)]
    Plot(#[from] PlotError),

    #[error(transparent)]
    Symmetry(#[from] SymmetryError),

    #[error("Invalid input pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    #[error("No input files match {0:?}")]
    NoInputs(Vec<String>),

    #[error("Frame {frame} has no {property}")]
    MissingProperty { frame: usize, property: String },

    #[error("Selection '{selection}' picks none of the {available} frames")]
    EmptySelection { selection: String, available: usize },

    #[error("File '{0}' holds no frames")]
    NoFrames(PathBuf),

    #[error("File I/O error for '{path}': {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
