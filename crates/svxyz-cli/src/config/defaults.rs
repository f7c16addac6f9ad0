use super::file;
use super::models::{
    AnalyzeFile, ConvertFile, ExtractFile, FrameFile, LimitsFile, Patterns, PlotFile, RangeSpec,
    SkipSpec, Switch, TriageFile,
};
use crate::error::Result;
use clap::ValueEnum;
use svxyz::core::analysis::symmetry::DEFAULT_SYMPREC;
use std::collections::BTreeMap;
use std::path::Path;

pub const VIRIAL_KEYS: [&str; 6] = ["V_xx", "V_yy", "V_zz", "V_yz", "V_xz", "V_xy"];
pub const STRESS_KEYS: [&str; 6] = ["S_xx", "S_yy", "S_zz", "S_yz", "S_xz", "S_xy"];

fn open_components(keys: [&str; 6]) -> BTreeMap<String, RangeSpec> {
    keys.iter()
        .map(|k| (k.to_string(), RangeSpec::default()))
        .collect()
}

impl Default for TriageFile {
    fn default() -> Self {
        Self {
            input_files: Patterns::Many(vec!["vasprun.xml".to_string()]),
            input_format: Some("vasp-xml".to_string()),
            output_file: "filtered_output.xyz".to_string(),
            skip: SkipSpec {
                on: Switch::Number(1),
                count: 500,
            },
            frame_range: [None, None],
            energy_range: RangeSpec::default(),
            max_atomic_force_range: RangeSpec::default(),
            mean_atomic_force_range: RangeSpec::default(),
            pressure_range: RangeSpec::default(),
            volume_range: RangeSpec::default(),
            temperature_range: RangeSpec::default(),
            min_distance_range: RangeSpec::default(),
            virial_filters: open_components(VIRIAL_KEYS),
            stress_filters: open_components(STRESS_KEYS),
            atomic_filters: None,
            minimum_image: true,
            use_sidecars: true,
            stress_unit: "GPa".to_string(),
            show_summary: true,
        }
    }
}

impl Default for PlotFile {
    fn default() -> Self {
        Self {
            data_file: None,
            output_file: "pxyz.svg".to_string(),
            ylabel: "data".to_string(),
            colormap: "viridis".to_string(),
            width: 1200,
            height: 600,
            distribution_limits: LimitsFile::default(),
            projection_limits: LimitsFile::default(),
        }
    }
}

impl Default for ConvertFile {
    fn default() -> Self {
        Self {
            input_file: "POSCAR".to_string(),
            output_file: "output.cif".to_string(),
            input_format: None,
            output_format: None,
            frames: "-1".to_string(),
            comment: Some(
                "Formats: extxyz/xyz, vasp (POSCAR), vasp-out (OUTCAR, read only), vasp-xml \
                 (vasprun.xml, read only), cif (write only). null detects the format from the file name. \
                 frames takes an index (-1 = last) or a slice such as 0:100:10."
                    .to_string(),
            ),
        }
    }
}

impl Default for AnalyzeFile {
    fn default() -> Self {
        Self {
            tol: DEFAULT_SYMPREC,
            input_file: "POSCAR".to_string(),
            minimum_image: false,
        }
    }
}

/// The tools that keep a sidecar configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Tool {
    #[value(alias = "txyz")]
    Triage,
    #[value(alias = "dxyz")]
    Extract,
    #[value(alias = "pxyz")]
    Plot,
    #[value(alias = "asefmt")]
    Convert,
    #[value(alias = "xyz2pos")]
    Frame,
    #[value(alias = "analpos")]
    Analyze,
}

impl Tool {
    pub fn config_file_name(self) -> &'static str {
        match self {
            Tool::Triage => "txyz.json",
            Tool::Extract => "dxyz.json",
            Tool::Plot => "pxyz.json",
            Tool::Convert => "asefmt.json",
            Tool::Frame => "xyz2pos.json",
            Tool::Analyze => "analpos.json",
        }
    }

    /// Writes the tool's default configuration to `path`, replacing any existing file.
    pub fn write_default(self, path: &Path) -> Result<()> {
        match self {
            Tool::Triage => file::save(path, &TriageFile::default()),
            Tool::Extract => file::save(path, &ExtractFile::default()),
            Tool::Plot => file::save(path, &PlotFile::default()),
            Tool::Convert => file::save(path, &ConvertFile::default()),
            Tool::Frame => file::save(path, &FrameFile::default()),
            Tool::Analyze => file::save(path, &AnalyzeFile::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn triage_defaults_match_the_documented_file() {
        let value = serde_json::to_value(TriageFile::default()).unwrap();
        assert_eq!(value["input_files"], serde_json::json!(["vasprun.xml"]));
        assert_eq!(value["skip"], serde_json::json!({"on": 1, "count": 500}));
        assert_eq!(value["frame_range"], serde_json::json!([null, null]));
        assert_eq!(value["virial_filters"]["V_yz"], serde_json::json!([null, null]));
        assert_eq!(value["atomic_filters"], serde_json::Value::Null);
        assert_eq!(value["stress_unit"], "GPa");
    }

    #[test]
    fn every_default_reloads_in_both_syntaxes() {
        let dir = tempdir().unwrap();
        for tool in Tool::value_variants() {
            for ext in ["json", "toml"] {
                let path = dir.path().join(format!("{:?}.{}", tool, ext));
                tool.write_default(&path).unwrap();
                let loaded = match tool {
                    // Open component ranges are left out of TOML, which means the same thing.
                    Tool::Triage => file::load::<TriageFile>(&path, &[]).map(|f| {
                        let mut expected = TriageFile::default();
                        if ext == "toml" {
                            expected.virial_filters.clear();
                            expected.stress_filters.clear();
                        }
                        f == expected
                    }),
                    Tool::Extract => file::load::<ExtractFile>(&path, &[])
                        .map(|f| f == ExtractFile::default()),
                    Tool::Plot => {
                        file::load::<PlotFile>(&path, &[]).map(|f| f == PlotFile::default())
                    }
                    Tool::Convert => file::load::<ConvertFile>(&path, &[])
                        .map(|f| f == ConvertFile::default()),
                    Tool::Frame => {
                        file::load::<FrameFile>(&path, &[]).map(|f| f == FrameFile::default())
                    }
                    Tool::Analyze => file::load::<AnalyzeFile>(&path, &[])
                        .map(|f| f == AnalyzeFile::default()),
                };
                assert!(loaded.unwrap(), "{:?} ({})", tool, ext);
            }
        }
    }

    #[test]
    fn file_names_follow_the_script_names() {
        assert_eq!(Tool::Triage.config_file_name(), "txyz.json");
        assert_eq!(Tool::Analyze.config_file_name(), "analpos.json");
        assert_eq!(Tool::from_str("xyz2pos", true), Ok(Tool::Frame));
    }
}
