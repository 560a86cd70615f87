use anyhow::{Context, Result};
use std::path::PathBuf;
use structopt::StructOpt;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;

mod analysis;
mod compare;
mod error;
mod features;
mod feedback;
mod landmarks;
mod library;
mod phases;
mod point;
mod score;

const DEFAULT_WORKERS: &str = "4";

#[derive(structopt::StructOpt)]
struct Opt {
    /// Path to a detector landmark dump (JSON) of the swing to analyze.
    #[structopt(required = true)]
    landmarks: PathBuf,

    /// Directory holding one subdirectory of reference swings per player.
    #[structopt(short, long, default_value = "references")]
    references: PathBuf,

    /// Feature-group taxonomy config; the built-in grouping is used when
    /// omitted.
    #[structopt(short, long)]
    groups: Option<PathBuf>,

    /// Worker threads for the comparison stage.
    #[structopt(short, long, default_value = DEFAULT_WORKERS)]
    workers: usize,

    /// Echo the raw landmarks in the report for downstream visualization.
    #[structopt(long)]
    emit_landmarks: bool,

    #[structopt(short, long, default_value = "info", env = "RUST_LOG")]
    log_level: tracing_subscriber::filter::EnvFilter,
}

fn main() -> Result<()> {
    let opt = Opt::from_args();

    tracing::subscriber::set_global_default(
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(opt.log_level),
    )?;

    let taxonomy = match &opt.groups {
        Some(path) => compare::FeatureGroups::from_path(path)
            .context("failed loading feature group config")?,
        None => compare::FeatureGroups::default(),
    };

    let library = library::ReferenceLibrary::load(&opt.references)
        .context("failed loading reference library")?;
    info!(
        message = "reference library ready",
        players = library.num_players(),
        taxonomy_version = taxonomy.version,
    );

    let frames =
        landmarks::read_dump(&opt.landmarks).context("failed reading landmark dump")?;
    landmarks::validate(&frames).context("landmark dump fails the input contract")?;

    let analyzer = analysis::Analyzer::new(library, taxonomy, opt.workers);
    let report = analyzer
        .analyze(&frames, opt.emit_landmarks)
        .context("failed analyzing swing")?;

    println!("{}", report.to_json()?);

    Ok(())
}
