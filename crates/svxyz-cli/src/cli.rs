use crate::config::defaults::Tool;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Shichuan Sun",
    version,
    about = "svxyz - post-processing tools for atomistic simulation trajectories: frame triage, property extraction, distribution plots and structure conversion.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress bars and all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads used to build frame records.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Filter frames of one or more trajectories by energy, force, stress, temperature and more.
    #[command(visible_alias = "txyz")]
    Triage(TriageArgs),
    /// Write E.dat, F.dat, virial.dat and stress.dat tables from a trajectory.
    #[command(visible_alias = "dxyz")]
    Extract(ExtractArgs),
    /// Plot the distribution and projection of columns of an extracted table.
    #[command(visible_alias = "pxyz")]
    Plot(PlotArgs),
    /// Convert structures between file formats.
    #[command(visible_alias = "asefmt")]
    Convert(ConvertArgs),
    /// Write one frame of a trajectory as a POSCAR file.
    #[command(visible_alias = "xyz2pos")]
    Frame(FrameArgs),
    /// Report the symmetry, lattice and pair distances of a structure.
    #[command(visible_alias = "analpos")]
    Analyze(AnalyzeArgs),
    /// Write the default configuration file of a tool.
    Init(InitArgs),
}

/// Arguments for the `triage` subcommand.
#[derive(Args, Debug)]
pub struct TriageArgs {
    /// Configuration file (JSON, or TOML by extension). Created with defaults when missing.
    #[arg(short, long, value_name = "PATH", default_value = "txyz.json")]
    pub config: PathBuf,

    /// Override a configuration value with a JSON value.
    /// Can be used multiple times. Example: -S energy_range=[-310,null]
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,

    /// Also write the per-file counts as JSON.
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,
}

/// Arguments for the `extract` subcommand.
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Trajectory to extract from. Remembered in the configuration file for later runs.
    #[arg(value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// File remembering the last trajectory.
    #[arg(short, long, value_name = "PATH", default_value = "dxyz.json")]
    pub config: PathBuf,

    /// Input format; detected from the file name when omitted.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Directory receiving the .dat tables.
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Additional tables to write (volume, pressure, temperature, distance).
    #[arg(long, value_name = "KIND", value_delimiter = ',')]
    pub series: Vec<String>,

    /// Measure minimum distances between stored positions instead of through the cell.
    #[arg(long)]
    pub no_minimum_image: bool,
}

/// Arguments for the `plot` subcommand.
#[derive(Args, Debug)]
pub struct PlotArgs {
    /// Data type: E, F, virial, stress, volume, pressure, temperature, distance or infile.
    #[arg(value_name = "DATA_TYPE")]
    pub data_type: String,

    /// Column indices of the table (row indices for infile).
    #[arg(value_name = "INDEX", num_args(1..), required = true)]
    pub indices: Vec<usize>,

    /// Configuration file (JSON, or TOML by extension). Created with defaults when missing.
    #[arg(short, long, value_name = "PATH", default_value = "pxyz.json")]
    pub config: PathBuf,

    /// Figure path (.svg or .png), overriding the configuration file.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Override a configuration value with a JSON value. Example: -S colormap=plasma
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `convert` subcommand.
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Configuration file (JSON, or TOML by extension). Created with defaults when missing.
    #[arg(short, long, value_name = "PATH", default_value = "asefmt.json")]
    pub config: PathBuf,

    /// Input structure, overriding `input_file`.
    #[arg(short, long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Output structure, overriding `output_file`.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Input format, overriding `input_format`.
    #[arg(long = "ifmt", value_name = "FORMAT")]
    pub input_format: Option<String>,

    /// Output format, overriding `output_format`.
    #[arg(long = "ofmt", value_name = "FORMAT")]
    pub output_format: Option<String>,

    /// Frames to convert: an index such as -1 or a slice such as 0:100:10.
    #[arg(long, value_name = "SELECTION", allow_hyphen_values = true)]
    pub frames: Option<String>,

    /// Override a configuration value with a JSON value.
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `frame` subcommand.
#[derive(Args, Debug)]
pub struct FrameArgs {
    /// `[FILE] INDEX`: the trajectory (remembered for later runs) and the frame index.
    #[arg(
        value_name = "ARGS",
        num_args(1..=2),
        required = true,
        allow_negative_numbers = true
    )]
    pub args: Vec<String>,

    /// File remembering the last trajectory.
    #[arg(short, long, value_name = "PATH", default_value = "xyz2pos.json")]
    pub config: PathBuf,

    /// Input format; detected from the file name when omitted.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Directory receiving the POSCAR file.
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,
}

/// Arguments for the `analyze` subcommand.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Structure to analyse, stored back into the configuration file.
    #[arg(short, long = "file", value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Configuration file. Created with defaults when missing.
    #[arg(short, long, value_name = "PATH", default_value = "analpos.json")]
    pub config: PathBuf,

    /// Directory receiving the distance and symmetry tables.
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Measure distances through periodic boundaries.
    #[arg(long)]
    pub minimum_image: bool,

    /// Tolerance (Å) for the symmetry analysis, stored back into the configuration file.
    #[arg(long, value_name = "TOL")]
    pub tol: Option<f64>,
}

/// Arguments for the `init` subcommand.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// The tool whose configuration to write.
    #[arg(value_enum)]
    pub tool: Tool,

    /// Destination; defaults to the tool's usual file name in the working directory.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Overwrite an existing file.
    #[arg(long)]
    pub force: bool,
}
