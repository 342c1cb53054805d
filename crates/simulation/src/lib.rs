//! Driver for the train station: spawns passengers, sends trains with a
//! random number of free seats and checks every departure.

mod config;
mod error;
mod generator;
mod report;
mod runner;

pub use config::SimulationConfig;
pub use error::SimulationError;
pub use generator::SeatGenerator;
pub use report::{SimulationReport, TrainReport};
pub use runner::Simulation;
