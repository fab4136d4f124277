use std::path::PathBuf;

/// Areal interpolation and correlation CLI (argument schema only)
#[derive(clap::Parser, Debug)]
#[command(name = "arealcorr", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Transfer a source variable onto target polygons and correlate it with a target variable (forbids stdout)
    Analyze(AnalyzeArgs),
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, clap::ValueEnum)]
pub enum WeightingArg { Source, Target }

#[derive(clap::Args, Debug)]
pub struct AnalyzeArgs {
    /// Source layer (GeoJSON FeatureCollection), e.g. census subdivisions
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub source: PathBuf,

    /// Target layer (GeoJSON FeatureCollection), e.g. electoral districts
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub target: PathBuf,

    /// Property on the source layer holding the variable to transfer
    #[arg(long)]
    pub source_field: String,

    /// Property on the target layer holding its own variable
    #[arg(long)]
    pub target_field: String,

    /// Property on the target layer holding the unique identifier
    #[arg(long)]
    pub id_field: String,

    /// JSON analysis config; unspecified settings take their defaults
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Override the config's overlap weighting
    #[arg(long, value_enum)]
    pub weighting: Option<WeightingArg>,

    /// Output GeoJSON file (must be a file path; "-" is rejected)
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: PathBuf,

    /// Overwrite if the file exists
    #[arg(long)]
    pub force: bool,
}
