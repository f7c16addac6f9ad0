use crate::cli::PlotArgs;
use crate::config::builder;
use crate::config::file;
use crate::config::models::PlotFile;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use svxyz::workflows::plot::{self, PlotReport};

pub fn run(args: PlotArgs, progress: &CliProgressHandler) -> Result<()> {
    if file::create_if_missing(&args.config, &PlotFile::default())? {
        println!("Default configuration created: {}", args.config.display());
        println!("Configuration file not found. Generated a default configuration; edit it and run again.");
        return Ok(());
    }

    let file: PlotFile = file::load(&args.config, &args.set_values)?;
    let config = builder::build_plot(&file, &args)?;
    let report = plot::run(&config, &progress.reporter())?;
    for line in report_lines(&report) {
        println!("{}", line);
    }
    Ok(())
}

pub fn report_lines(report: &PlotReport) -> Vec<String> {
    let mut lines = vec![
        format!("Saved plot to {}", report.output_file.display()),
        format!(
            "{:<14}{:>8}{:>14}{:>14}{:>14}{:>14}{:>14}",
            report.axis_label, "count", "mean", "std", "min", "max", "peak"
        ),
    ];
    for s in &report.series {
        let st = &s.stats;
        lines.push(format!(
            "{:<14}{:>8}{:>14.6}{:>14.6}{:>14.6}{:>14.6}{:>14.6}",
            s.label, st.count, st.mean, st.std_dev, st.min, st.max, st.peak
        ));
    }
    lines
}
