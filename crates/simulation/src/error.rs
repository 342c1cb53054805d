use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Failed to initialize the station: {0}")]
    Initialization(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Failed to read configuration {0}: {1}")]
    ConfigRead(PathBuf, std::io::Error),
    #[error("Failed to parse configuration {0}: {1}")]
    ConfigParse(PathBuf, toml::de::Error),
    #[error("Train {train} returned early: {boarded} of {expected} passengers seated")]
    EarlyDeparture {
        train: usize,
        boarded: usize,
        expected: usize,
    },
    #[error("Train {train} failed to depart within {waited:?}")]
    DepartureTimeout { train: usize, waited: Duration },
    #[error("Too many passengers on train {train}: {boarded} boarded, {expected} expected")]
    Overbooked {
        train: usize,
        boarded: usize,
        expected: usize,
    },
    #[error("Passenger {passenger} boarded twice")]
    BoardedTwice { passenger: usize },
    #[error("{boarded} passengers boarded out of {passengers}")]
    Conservation { boarded: usize, passengers: usize },
    #[error("Passengers or trains stopped reporting")]
    Disconnected,
    #[error("Station is not empty: {waiting} waiting, {in_transit} in transit")]
    StationBusy { waiting: usize, in_transit: usize },
}
