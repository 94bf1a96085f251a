//! `exobengal` command-line front end.
//!
//! Trains the three classifiers, scores single observations and computes
//! the Earth Similarity Index.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use exobengal::{esi, Detector, ExoConfig, ModelFamily, Observation};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "exobengal")]
#[command(version, about = "Exoplanet candidate classification", long_about = None)]
struct Cli {
    /// TOML configuration file; EXOBENGAL__* variables override its values
    #[arg(long, env = "EXOBENGAL_CONFIG")]
    config: Option<PathBuf>,

    /// Write logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train and persist a model, then print its evaluation
    Train {
        #[arg(long, value_enum, default_value = "all")]
        family: TrainTarget,

        /// Training table (defaults to paths.data_file)
        #[arg(long)]
        data: Option<PathBuf>,
    },

    /// Classify one observation and print the result as JSON
    Predict {
        #[arg(long, value_enum)]
        family: Family,

        /// koi_period koi_prad koi_teq koi_srad koi_slogg koi_steff koi_impact koi_duration koi_depth
        #[arg(required = true, num_args = 9, allow_negative_numbers = true)]
        values: Vec<f64>,
    },

    /// Earth Similarity Index of a planet
    Esi {
        /// Radius in Earth radii
        #[arg(long, allow_negative_numbers = true)]
        radius: f64,

        /// Equilibrium temperature in kelvin
        #[arg(long, allow_negative_numbers = true)]
        teq: f64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Family {
    Forest,
    Network,
    Neighbors,
}

impl From<Family> for ModelFamily {
    fn from(family: Family) -> Self {
        match family {
            Family::Forest => ModelFamily::Forest,
            Family::Network => ModelFamily::Network,
            Family::Neighbors => ModelFamily::Neighbors,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum TrainTarget {
    Forest,
    Network,
    Neighbors,
    All,
}

fn init_logging(json: bool) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    let config = ExoConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command {
        Command::Train { family, data } => {
            let detector = Detector::new(config);
            let reports = match family {
                TrainTarget::All => detector.train_all(data.as_deref()),
                TrainTarget::Forest => detector.train(ModelFamily::Forest, data.as_deref()).map(|r| vec![r]),
                TrainTarget::Network => detector.train(ModelFamily::Network, data.as_deref()).map(|r| vec![r]),
                TrainTarget::Neighbors => {
                    detector.train(ModelFamily::Neighbors, data.as_deref()).map(|r| vec![r])
                }
            }
            .context("training failed")?;
            for report in &reports {
                println!("{report}");
            }
            info!(models = reports.len(), "training complete");
        }
        Command::Predict { family, values } => {
            let observation = Observation::from_slice(&values)?;
            let result = Detector::new(config)
                .predict_with(family.into(), &observation)
                .context("prediction failed")?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Esi { radius, teq } => {
            println!("{}", esi(radius, teq)?);
        }
    }

    Ok(())
}
