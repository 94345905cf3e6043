use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use village_generator::export;
use village_generator::interest::Scenario;
use village_generator::terrain::synthetic::SyntheticTerrain;
use village_generator::{generate, GenerationError, GenerationParams};

#[derive(Parser, Debug)]
#[command(name = "village_generator")]
#[command(about = "Grow a settlement layout (districts, roads, parcels) on a synthetic terrain")]
struct Args {
    /// Width of the build area in cells
    #[arg(short = 'W', long, default_value = "256")]
    width: usize,

    /// Length of the build area in cells
    #[arg(short = 'L', long, default_value = "256")]
    length: usize,

    /// Random seed (uses random seed if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Wall-clock budget of the growth loop in seconds
    #[arg(short, long)]
    time_limit: Option<f64>,

    /// Layout flavour: compact, balanced or sprawling
    #[arg(long)]
    scenario: Option<Scenario>,

    /// JSON parameter file; flags given on the command line take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write PNG visualisations into this directory
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// Drop a lava pool into the synthetic terrain
    #[arg(long)]
    lava: bool,

    /// Per-iteration diagnostics
    #[arg(long)]
    debug: bool,

    /// Log filter used when RUST_LOG is not set (e.g. "info", "village_generator=debug")
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn run(args: Args) -> Result<(), GenerationError> {
    let mut params = match &args.config {
        Some(path) => GenerationParams::from_json_file(path)?,
        None => GenerationParams::default(),
    };
    if let Some(seed) = args.seed {
        params.seed = seed;
    } else if args.config.is_none() {
        params.seed = rand::random();
    }
    if let Some(limit) = args.time_limit {
        params.time_limit_secs = limit;
    }
    if let Some(scenario) = args.scenario {
        params.scenario = scenario;
    }
    params.debug |= args.debug;
    params.visualize |= args.export.is_some();

    info!("Generating settlement with seed {} on {}x{}", params.seed, args.width, args.length);
    let terrain = SyntheticTerrain {
        width: args.width,
        length: args.length,
        seed: params.derive_seed("terrain"),
        lava_pool: args.lava,
        ..Default::default()
    }
    .generate()?;

    let report = generate(&terrain, params.clone())?;

    for failure in &report.failures {
        info!("parcel {} dropped: {}", failure.parcel, failure.error);
    }
    println!("{}", serde_json::to_string_pretty(&report.stats)?);

    if params.visualize {
        let dir = args.export.unwrap_or_else(|| PathBuf::from("village_output"));
        for path in export::export_report(&report, &terrain, &dir)? {
            info!("wrote {}", path.display());
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if args.debug && args.log_level == "info" { "debug" } else { args.log_level.as_str() };
        EnvFilter::new(level)
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
