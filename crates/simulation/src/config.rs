use crate::error::SimulationError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Parameters of one simulation run.
/// Can be read from a TOML file, every field is optional there.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Passengers arriving at the station before the first train.
    pub passengers: usize,
    /// Trains arrive with a number of free seats in `[0, max_free_seats)`.
    pub max_free_seats: usize,
    /// Seed of the free seats generator. Derived from the clock when missing.
    pub seed: Option<u64>,
    /// How long a train may linger after its last passenger took a seat.
    pub departure_grace_ms: u64,
    /// Delay seating by up to a microsecond on every other train.
    pub boarding_jitter: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            passengers: 50,
            max_free_seats: 30,
            seed: None,
            departure_grace_ms: 1000,
            boarding_jitter: true,
        }
    }
}

impl SimulationConfig {
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SimulationError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| SimulationError::ConfigRead(path.to_path_buf(), e))?;
        Self::from_toml(&content).map_err(|e| SimulationError::ConfigParse(path.to_path_buf(), e))
    }

    #[inline]
    pub fn departure_grace(&self) -> Duration {
        Duration::from_millis(self.departure_grace_ms)
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        // With a single possible value every train arrives without seats
        // and the platform is never emptied.
        if self.max_free_seats < 2 {
            return Err(SimulationError::InvalidConfig(format!(
                "max_free_seats must be at least 2, got {}",
                self.max_free_seats
            )));
        }
        if self.departure_grace_ms == 0 {
            return Err(SimulationError::InvalidConfig(
                "departure_grace_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
