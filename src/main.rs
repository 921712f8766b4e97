use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info};

use plume_fusion::config::Config;
use plume_fusion::input::{load_mask, load_observations, load_plume_record, load_priors};
use plume_fusion::pipeline::{estimate_plumes, fuse};
use plume_fusion::prior::{HourSelection, Policy};
use plume_fusion::{Error, Result};

/// Emission rate estimation from plume observations and inventory priors
#[derive(Parser, Debug)]
#[command(name = "plume_fusion", version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Blend the total of the plume detections with the prior inventory
    Blend {
        /// Plume detections table
        #[arg(long, value_name = "CSV")]
        plumes: PathBuf,

        /// Prior inventory table
        #[arg(long, value_name = "CSV")]
        prior: PathBuf,

        /// Configuration file, defaults apply when omitted
        #[arg(long, value_name = "TOML")]
        config: Option<PathBuf>,

        /// Override the prior aggregation policy
        #[arg(long, value_enum)]
        policy: Option<PolicyArg>,

        /// Override the representative hour selection
        #[arg(long, value_enum)]
        selection: Option<SelectionArg>,
    },
    /// Derive emission rates from plume masks, one per `--mask`, `--mask-meta`, `--plume` triple
    PlumeRate {
        /// Plume mask grid
        #[arg(long, value_name = "CSV", required = true)]
        mask: Vec<PathBuf>,

        /// Mask CRS and affine transform
        #[arg(long, value_name = "TOML", required = true)]
        mask_meta: Vec<PathBuf>,

        /// Plume side table with wind and IME, only the first row is read
        #[arg(long, value_name = "CSV", required = true)]
        plume: Vec<PathBuf>,
    },
    /// Locate the first plume pixel of a mask in map coordinates
    Probe {
        #[arg(long, value_name = "CSV")]
        mask: PathBuf,

        #[arg(long, value_name = "TOML")]
        mask_meta: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolicyArg {
    GrandSum,
    RepresentativeHour,
}

impl From<PolicyArg> for Policy {
    fn from(value: PolicyArg) -> Self {
        match value {
            PolicyArg::GrandSum => Self::GrandSum,
            PolicyArg::RepresentativeHour => Self::RepresentativeHour,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SelectionArg {
    FarthestFromMedian,
    ClosestToMedian,
}

impl From<SelectionArg> for HourSelection {
    fn from(value: SelectionArg) -> Self {
        match value {
            SelectionArg::FarthestFromMedian => Self::FarthestFromMedian,
            SelectionArg::ClosestToMedian => Self::ClosestToMedian,
        }
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Blend {
            plumes,
            prior,
            config,
            policy,
            selection,
        } => {
            let mut config = match config {
                Some(path) => Config::from_file(&path)?,
                None => Config::default(),
            };
            if let Some(policy) = policy {
                config.prior.policy = policy.into();
            }
            if let Some(selection) = selection {
                config.prior.selection = selection.into();
            }

            let observations = load_observations(&plumes)?;
            let priors = load_priors(&prior)?;
            let report = fuse(&observations, &priors, &config)?;
            println!("{report}");
        }
        Command::PlumeRate {
            mask,
            mask_meta,
            plume,
        } => {
            if mask.len() != mask_meta.len() || mask.len() != plume.len() {
                return Err(Error::Config(format!(
                    "got {} masks, {} mask metadata files and {} plume tables, counts must match",
                    mask.len(),
                    mask_meta.len(),
                    plume.len()
                )));
            }

            let masks = mask
                .iter()
                .zip(&mask_meta)
                .map(|(grid, meta)| load_mask(grid, meta))
                .collect::<Result<Vec<_>>>()?;
            let records = plume
                .iter()
                .map(|path| load_plume_record(path))
                .collect::<Result<Vec<_>>>()?;

            let reports = estimate_plumes(masks.iter().zip(&records));
            info!(estimated = reports.len(), of = masks.len(), "plume batch complete");
            for report in reports {
                println!("{report}");
            }
        }
        Command::Probe { mask, mask_meta } => {
            let mask = load_mask(&mask, &mask_meta)?;
            let probe = mask.probe();
            println!("CRS: {}", mask.crs());
            println!("Transform: {:?}", mask.transform());
            println!("Picked pixel: row={}, col={} ({})", probe.row, probe.col, probe.reason);
            println!("Map coords: x={:.3}, y={:.3}", probe.x, probe.y);
            if mask.crs().is_geographic() {
                println!("Note: the CRS is geographic so x/y are degrees, not metres");
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
