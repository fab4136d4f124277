use std::path::Path;

use anyhow::{bail, Result};
use arealcorr::{analyze, io, AnalysisConfig, Weighting};
use tracing::warn;

use crate::cli::{AnalyzeArgs, Cli, WeightingArg};

pub fn run(_cli: &Cli, args: &AnalyzeArgs) -> Result<()> {
    // Assert output path is not stdout
    if args.output == Path::new("-") { bail!("stdout is not supported."); }
    if args.output.exists() && !args.force {
        bail!("{} already exists (use --force to overwrite)", args.output.display());
    }

    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_json_file(path)?,
        None => AnalysisConfig::default(),
    };
    if let Some(weighting) = args.weighting {
        config.weighting = match weighting {
            WeightingArg::Source => Weighting::Source,
            WeightingArg::Target => Weighting::Target,
        };
    }

    eprintln!("[analyze] loading sources from {}", args.source.display());
    let sources = io::read_sources_file(&args.source, &args.source_field)?;
    eprintln!("[analyze] loading targets from {}", args.target.display());
    let targets = io::read_targets_file(&args.target, &args.target_field, &args.id_field)?;

    for error in sources.rejected.iter().chain(&targets.rejected) {
        warn!(%error, "feature rejected");
    }

    eprintln!(
        "[analyze] {} sources x {} targets ({} rejected)",
        sources.features.len(),
        targets.features.len(),
        sources.rejected.len() + targets.rejected.len(),
    );
    let analysis = analyze(&sources.features, &targets.features, &config)?;

    eprintln!("[analyze] summary {}", serde_json::to_string(&analysis.summary())?);
    eprintln!("[analyze] writing result to {}", args.output.display());
    io::write_analysis(&args.output, &analysis)?;

    Ok(())
}
