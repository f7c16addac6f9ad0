use super::filter::{FrameFilter, FrameWindow, Predicate, RangeError};
use crate::core::io::format::FileFormat;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid range for '{predicate}': {reason}")]
    InvalidRange { predicate: String, reason: RangeError },

    #[error("Unknown field '{0}'")]
    UnknownField(String),

    #[error("Unknown chemical species '{0}' in atomic filter")]
    UnknownSpecies(String),

    #[error("Atomic filter lists no species")]
    EmptySpecies,

    #[error("Field '{field}' cannot be used as {usage}")]
    FieldKind { field: String, usage: &'static str },

    #[error("Unsupported value for '{key}': {value}")]
    Unsupported { key: &'static str, value: String },
}

/// Everything a triage run needs, fully validated.
#[derive(Debug, Clone)]
pub struct TriageConfig {
    pub input_patterns: Vec<String>,
    pub input_format: Option<FileFormat>,
    pub output_file: PathBuf,
    pub window: FrameWindow,
    pub filter: FrameFilter,
    pub minimum_image: bool,
    pub use_sidecars: bool,
}

#[derive(Default)]
pub struct TriageConfigBuilder {
    input_patterns: Vec<String>,
    input_format: Option<FileFormat>,
    output_file: Option<PathBuf>,
    window: Option<FrameWindow>,
    predicates: Vec<Predicate>,
    minimum_image: Option<bool>,
    use_sidecars: Option<bool>,
}

impl TriageConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.input_patterns.push(pattern.into());
        self
    }

    pub fn input_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input_patterns.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn input_format(mut self, format: Option<FileFormat>) -> Self {
        self.input_format = format;
        self
    }

    pub fn output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_file = Some(path.into());
        self
    }

    pub fn window(mut self, window: FrameWindow) -> Self {
        self.window = Some(window);
        self
    }

    pub fn predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn predicates(mut self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.predicates.extend(predicates);
        self
    }

    pub fn minimum_image(mut self, enabled: bool) -> Self {
        self.minimum_image = Some(enabled);
        self
    }

    pub fn use_sidecars(mut self, enabled: bool) -> Self {
        self.use_sidecars = Some(enabled);
        self
    }

    pub fn build(self) -> Result<TriageConfig, ConfigError> {
        if self.input_patterns.is_empty() {
            return Err(ConfigError::MissingParameter("input_files"));
        }
        Ok(TriageConfig {
            input_patterns: self.input_patterns,
            input_format: self.input_format,
            output_file: self
                .output_file
                .ok_or(ConfigError::MissingParameter("output_file"))?,
            window: self.window.unwrap_or_default(),
            filter: FrameFilter::new(self.predicates),
            minimum_image: self.minimum_image.unwrap_or(true),
            use_sidecars: self.use_sidecars.unwrap_or(true),
        })
    }
}
