use crate::cli::AnalyzeArgs;
use crate::config::builder;
use crate::config::file;
use crate::config::models::AnalyzeFile;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use svxyz::workflows::analyze::{self, AnalyzeReport};
use std::io::{self, Write};

/// Loads `analpos.json`, creating it when missing, and folds the flags into it.
fn merged_config(args: &AnalyzeArgs) -> Result<AnalyzeFile> {
    let mut stored = if file::create_if_missing(&args.config, &AnalyzeFile::default())? {
        println!("Default configuration created: {}", args.config.display());
        AnalyzeFile::default()
    } else {
        file::load(&args.config, &[])?
    };

    let mut changed = false;
    if let Some(path) = &args.file {
        stored.input_file = path.to_string_lossy().into_owned();
        changed = true;
    }
    if args.minimum_image && !stored.minimum_image {
        stored.minimum_image = true;
        changed = true;
    }
    if let Some(tol) = args.tol {
        if tol != stored.tol {
            stored.tol = tol;
            changed = true;
        }
    }
    if changed {
        file::save(&args.config, &stored)?;
        println!("Configuration updated: {}", args.config.display());
    }
    Ok(stored)
}

pub fn run(args: AnalyzeArgs, progress: &CliProgressHandler) -> Result<()> {
    let stored = merged_config(&args)?;
    let config = builder::build_analyze(&stored, &args.output_dir);
    println!("Reading structure file: {}...", config.input_file.display());
    let report = analyze::run(&config, &progress.reporter())?;

    let mut out = io::stdout().lock();
    write_summary(&mut out, &report)?;
    writeln!(out, "Done!")?;
    Ok(())
}

pub fn write_summary(out: &mut impl Write, report: &AnalyzeReport) -> io::Result<()> {
    writeln!(
        out,
        "Saved {} and {}.",
        report.distance_file.display(),
        report.symmetry_file.display()
    )?;
    writeln!(out)?;
    if let Some(symmetry) = &report.symmetry {
        symmetry.write(out, "  ")?;
    }
    report.structure.write(out)?;
    writeln!(out, "Total Distances:")?;
    for d in &report.distances {
        writeln!(
            out,
            "  {:<3} {:<12} Min: {:<10.4} Pair: {}",
            d.rank, d.label, d.min_distance, d.atom_pair
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    const CUBIC_SIC: &str = "SiC
1.0
  4.36 0.0 0.0
  0.0 4.36 0.0
  0.0 0.0 4.36
Si C
1 1
Direct
0.0 0.0 0.0
0.25 0.25 0.25
";

    fn args(dir: &Path, file: Option<PathBuf>) -> AnalyzeArgs {
        AnalyzeArgs {
            file,
            config: dir.join("analpos.json"),
            output_dir: dir.to_path_buf(),
            minimum_image: false,
            tol: None,
        }
    }

    #[test]
    fn file_flag_is_written_back_and_reused() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("CONTCAR");
        fs::write(&input, CUBIC_SIC).unwrap();

        run(args(dir.path(), Some(input.clone())), &CliProgressHandler::new(true)).unwrap();
        let stored: AnalyzeFile = file::load(&dir.path().join("analpos.json"), &[]).unwrap();
        assert_eq!(stored.input_file, input.to_string_lossy());
        assert!(dir.path().join("distance_CONTCAR.dat").exists());

        fs::remove_file(dir.path().join("distance_CONTCAR.dat")).unwrap();
        run(args(dir.path(), None), &CliProgressHandler::new(true)).unwrap();
        assert!(dir.path().join("distance_CONTCAR.dat").exists());
    }

    #[test]
    fn tolerance_is_read_and_overridden() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("POSCAR");
        fs::write(&input, CUBIC_SIC).unwrap();
        fs::write(
            dir.path().join("analpos.json"),
            format!("{{\"tol\": 0.05, \"input_file\": {:?}}}", input.display().to_string()),
        )
        .unwrap();
        let stored = merged_config(&args(dir.path(), None)).unwrap();
        assert_eq!(stored.input_file, input.display().to_string());
        assert_eq!(stored.tol, 0.05);
        assert!(!stored.minimum_image);

        let mut flagged = args(dir.path(), None);
        flagged.tol = Some(0.2);
        assert_eq!(merged_config(&flagged).unwrap().tol, 0.2);
        let saved: AnalyzeFile = file::load(&dir.path().join("analpos.json"), &[]).unwrap();
        assert_eq!(saved.tol, 0.2);
        assert_eq!(builder::build_analyze(&saved, dir.path()).symprec, 0.2);
    }

    #[test]
    fn summary_lists_ranked_pairs() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("POSCAR");
        fs::write(&input, CUBIC_SIC).unwrap();
        let config = builder::build_analyze(
            &AnalyzeFile {
                tol: 0.01,
                input_file: input.display().to_string(),
                minimum_image: false,
            },
            dir.path(),
        );
        let report = analyze::run(&config, &CliProgressHandler::new(true).reporter()).unwrap();
        let mut buffer = Vec::new();
        write_summary(&mut buffer, &report).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with(&format!(
            "Saved {}",
            dir.path().join("distance_POSCAR.dat").display()
        )));
        // Two sites on the body diagonal of a primitive cube keep only the 3m operations.
        assert!(text.contains("  space_group_number: 160\n"));
        assert!(text.contains("  crystal_system: trigonal\n  point_group: 3m\n"));
        assert!(text.contains("Structure Information:"));
        assert!(text.contains("Total Distances:\n  1   Si-C         Min: 1.8879     Pair: Si1-C2"));
    }
}
