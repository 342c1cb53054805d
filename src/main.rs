use anyhow::Context;
use clap::Parser;
use dawn_simulation::{Simulation, SimulationConfig};
use log::{info, LevelFilter};
use std::path::PathBuf;

mod logging;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// TOML file with the simulation parameters.
    /// Options given on the command line take precedence over it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of passengers waiting at the station
    #[arg(short, long)]
    passengers: Option<usize>,

    /// Trains arrive with fewer free seats than this
    #[arg(short, long)]
    max_seats: Option<usize>,

    /// Seed of the free seats generator
    #[arg(short, long)]
    seed: Option<u64>,

    /// Milliseconds a train may take to depart after the last passenger is seated
    #[arg(short, long)]
    grace_ms: Option<u64>,

    /// Seat passengers without any delay
    #[arg(long)]
    no_jitter: bool,

    /// Print the whole run as TOML when finished
    #[arg(short, long)]
    report: bool,

    #[arg(short, long, default_value = "info")]
    log_level: LevelFilter,
}

impl Cli {
    fn simulation_config(&self) -> anyhow::Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::from_file(path)?,
            None => SimulationConfig::default(),
        };

        if let Some(passengers) = self.passengers {
            config.passengers = passengers;
        }
        if let Some(max_seats) = self.max_seats {
            config.max_free_seats = max_seats;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(grace_ms) = self.grace_ms {
            config.departure_grace_ms = grace_ms;
        }
        if self.no_jitter {
            config.boarding_jitter = false;
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_level)?;

    let config = cli.simulation_config()?;
    let simulation = Simulation::new(config)?;
    let report = simulation.run().context("Train automation failed")?;

    info!("{}", report);
    if cli.report {
        println!("{}", report.to_toml()?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_overrides_defaults() {
        let cli = Cli::parse_from([
            "train-station",
            "--passengers",
            "7",
            "--max-seats",
            "4",
            "--no-jitter",
        ]);
        let config = cli.simulation_config().unwrap();
        assert_eq!(config.passengers, 7);
        assert_eq!(config.max_free_seats, 4);
        assert!(!config.boarding_jitter);
        assert_eq!(config.seed, None);
        assert_eq!(cli.log_level, LevelFilter::Info);
    }

    #[test]
    fn log_level_is_parsed() {
        let cli = Cli::parse_from(["train-station", "-l", "trace"]);
        assert_eq!(cli.log_level, LevelFilter::Trace);
    }
}
