use crate::core::analysis::distance::{self, PairSummary};
use crate::core::analysis::symmetry::{self, DEFAULT_SYMPREC, SymmetryInfo};
use crate::core::io::format::{self, FileFormat};
use crate::core::models::cell::LatticeParameters;
use crate::core::models::element;
use crate::core::models::frame::Frame;
use crate::engine::error::EngineError;
use crate::engine::progress::ProgressReporter;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

#[derive(Debug, Clone)]
pub struct AnalyzeConfig {
    pub input_file: PathBuf,
    pub input_format: Option<FileFormat>,
    pub output_dir: PathBuf,
    /// Measure distances through periodic boundaries instead of between stored positions.
    pub minimum_image: bool,
    /// Distance tolerance (Å) of the space-group search.
    pub symprec: f64,
}

impl AnalyzeConfig {
    pub fn new(input_file: impl Into<PathBuf>) -> Self {
        Self {
            input_file: input_file.into(),
            input_format: None,
            output_dir: PathBuf::from("."),
            minimum_image: false,
            symprec: DEFAULT_SYMPREC,
        }
    }

    fn base_name(&self) -> String {
        self.input_file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "structure".to_string())
    }

    pub fn distance_file(&self) -> PathBuf {
        self.output_dir.join(format!("distance_{}.dat", self.base_name()))
    }

    pub fn symmetry_file(&self) -> PathBuf {
        self.output_dir.join(format!("sym_{}.dat", self.base_name()))
    }
}

/// Geometry of the analysed structure.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureInfo {
    pub formula: String,
    pub atoms: usize,
    pub composition: Vec<(String, usize)>,
    pub lattice: Option<LatticeParameters>,
    pub volume: Option<f64>,
    /// g/cm³
    pub density: Option<f64>,
}

impl StructureInfo {
    pub fn of(frame: &Frame) -> Self {
        let volume = frame.volume();
        Self {
            formula: frame.formula(),
            atoms: frame.len(),
            composition: frame.composition(),
            lattice: frame.cell.as_ref().map(|c| c.parameters()),
            volume,
            density: volume
                .and_then(|v| element::mass_density(frame.symbols.iter().map(String::as_str), v)),
        }
    }

    pub fn write(&self, writer: &mut impl Write) -> io::Result<()> {
        writeln!(writer, "Structure Information:")?;
        writeln!(writer, "formula: {}", self.formula)?;
        writeln!(writer, "atoms: {}", self.atoms)?;
        match &self.lattice {
            Some(p) => {
                writeln!(writer, "a, b, c (Å): {:.6} {:.6} {:.6}", p.a, p.b, p.c)?;
                writeln!(
                    writer,
                    "alpha, beta, gamma (deg): {:.4} {:.4} {:.4}",
                    p.alpha, p.beta, p.gamma
                )?;
            }
            None => writeln!(writer, "lattice: none")?,
        }
        if let Some(v) = self.volume {
            writeln!(writer, "volume (Å^3): {:.6}", v)?;
        }
        if let Some(d) = self.density {
            writeln!(writer, "density (g/cm^3): {:.6}", d)?;
        }
        writeln!(writer, "composition:")?;
        for (symbol, count) in &self.composition {
            writeln!(writer, "  {:<4}{}", symbol, count)?;
        }
        writeln!(writer)
    }
}

#[derive(Debug, Clone)]
pub struct AnalyzeReport {
    pub structure: StructureInfo,
    /// `None` when the structure has no cell to analyse.
    pub symmetry: Option<SymmetryInfo>,
    pub distances: Vec<PairSummary>,
    pub distance_file: PathBuf,
    pub symmetry_file: PathBuf,
}

fn write_file(
    path: &Path,
    body: impl FnOnce(&mut BufWriter<File>) -> io::Result<()>,
) -> Result<(), EngineError> {
    let wrap = |source| EngineError::File {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = BufWriter::new(File::create(path).map_err(wrap)?);
    body(&mut writer).map_err(wrap)?;
    writer.flush().map_err(wrap)
}

#[instrument(skip_all, name = "analyze_workflow")]
pub fn run(config: &AnalyzeConfig, reporter: &ProgressReporter) -> Result<AnalyzeReport, EngineError> {
    info!("Reading structure: {}", config.input_file.display());
    let mut frames = reporter.phase("Reading structure", || {
        format::read_frames(&config.input_file, config.input_format)
    })?;
    let frame = frames
        .pop()
        .ok_or_else(|| EngineError::NoFrames(config.input_file.clone()))?;

    info!("Calculating distances...");
    let distances = reporter.phase("Calculating distances", || {
        let classes = distance::pair_classes(&frame, config.minimum_image);
        distance::summarize(&frame, &classes)
    });
    let structure = StructureInfo::of(&frame);

    let distance_file = config.distance_file();
    write_file(&distance_file, |w| distance::write_summary_table(w, &distances))?;

    info!("Analyzing symmetry (tol = {})...", config.symprec);
    let symmetry = if frame.cell.is_some() {
        Some(reporter.phase("Analyzing symmetry", || {
            symmetry::analyze(&frame, config.symprec)
        })?)
    } else {
        warn!(
            "'{}' has no cell; skipping symmetry analysis.",
            config.input_file.display()
        );
        None
    };

    let symmetry_file = config.symmetry_file();
    write_file(&symmetry_file, |w| {
        if let Some(sym) = &symmetry {
            sym.write(w, "")?;
        }
        structure.write(w)?;
        distance::write_summary_table(w, &distances)
    })?;
    info!(
        "Saved '{}' and '{}'.",
        distance_file.display(),
        symmetry_file.display()
    );

    Ok(AnalyzeReport {
        structure,
        symmetry,
        distances,
        distance_file,
        symmetry_file,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const ROCKSALT: &str = "MgO rocksalt
1.0
  4.2 0.0 0.0
  0.0 4.2 0.0
  0.0 0.0 4.2
Mg O
1 1
Direct
0.0 0.0 0.0
0.5 0.5 0.5
";

    #[test]
    fn writes_distance_and_structure_tables() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("POSCAR");
        fs::write(&input, ROCKSALT).unwrap();
        let mut config = AnalyzeConfig::new(&input);
        config.output_dir = dir.path().to_path_buf();

        let report = run(&config, &ProgressReporter::new()).unwrap();
        assert_eq!(report.distance_file, dir.path().join("distance_POSCAR.dat"));
        assert_eq!(report.distances.len(), 1);
        assert_eq!(report.distances[0].atom_pair, "Mg1-O2");
        let expected = (3.0f64).sqrt() * 2.1;
        assert!((report.distances[0].min_distance - expected).abs() < 1e-9);

        let info = &report.structure;
        assert_eq!(info.formula, "MgO");
        assert!((info.volume.unwrap() - 74.088).abs() < 1e-9);
        assert!((info.lattice.unwrap().alpha - 90.0).abs() < 1e-9);
        assert!(info.density.unwrap() > 0.8 && info.density.unwrap() < 1.0);

        let sym = report.symmetry.as_ref().unwrap();
        assert_eq!(sym.space_group_number, 221);
        assert_eq!(sym.crystal_system, "cubic");
        assert_eq!(report.symmetry_file, dir.path().join("sym_POSCAR.dat"));
        let text = fs::read_to_string(&report.symmetry_file).unwrap();
        assert!(text.starts_with(
            "Symmetry Information:\nspace_group_symbol: Pm-3m\nspace_group_number: 221\n"
        ));
        assert!(text.contains("\nStructure Information:\nformula: MgO\n"));
        assert!(text.contains("Rank    Pair"));
        let table = fs::read_to_string(&report.distance_file).unwrap();
        assert_eq!(table.lines().count(), 3);
    }

    #[test]
    fn minimum_image_shortens_distances_across_the_boundary() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("POSCAR");
        fs::write(&input, ROCKSALT.replace("0.5 0.5 0.5", "0.9 0.0 0.0")).unwrap();
        let mut config = AnalyzeConfig::new(&input);
        config.output_dir = dir.path().to_path_buf();
        let plain = run(&config, &ProgressReporter::new()).unwrap();
        config.minimum_image = true;
        let wrapped = run(&config, &ProgressReporter::new()).unwrap();
        assert!((plain.distances[0].min_distance - 3.78).abs() < 1e-9);
        assert!((wrapped.distances[0].min_distance - 0.42).abs() < 1e-9);
    }

    #[test]
    fn molecules_skip_symmetry_and_bad_tolerances_fail() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("water.xyz");
        fs::write(&input, "3\nwater\nO 0.0 0.0 0.0\nH 0.96 0.0 0.0\nH -0.24 0.93 0.0\n").unwrap();
        let mut config = AnalyzeConfig::new(&input);
        config.output_dir = dir.path().to_path_buf();
        let report = run(&config, &ProgressReporter::new()).unwrap();
        assert!(report.symmetry.is_none());
        assert_eq!(report.distances.len(), 2);
        let text = fs::read_to_string(&report.symmetry_file).unwrap();
        assert!(text.starts_with("Structure Information:"));

        let poscar = dir.path().join("POSCAR");
        fs::write(&poscar, ROCKSALT).unwrap();
        let mut config = AnalyzeConfig::new(&poscar);
        config.output_dir = dir.path().to_path_buf();
        config.symprec = -1.0;
        assert!(matches!(
            run(&config, &ProgressReporter::new()),
            Err(EngineError::Symmetry(symmetry::SymmetryError::InvalidTolerance(_)))
        ));
    }
}
