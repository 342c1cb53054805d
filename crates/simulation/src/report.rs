use serde::Serialize;
use std::fmt::{Display, Formatter};

/// What happened to a single train.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TrainReport {
    pub train: usize,
    pub seats: usize,
    /// Passengers that should have boarded: `min(left, seats)`.
    pub expected: usize,
    pub boarded: usize,
    /// Time from arrival to departure, in microseconds.
    pub elapsed_us: u64,
}

impl TrainReport {
    #[inline]
    pub fn is_short(&self) -> bool {
        self.boarded < self.expected
    }
}

impl Display for TrainReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Train {} departed station with {} new passenger(s) (expected {})",
            self.train, self.boarded, self.expected
        )?;
        if self.is_short() {
            write!(f, " *****")?;
        }
        Ok(())
    }
}

/// Summary of a whole run, one entry per train.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SimulationReport {
    pub seed: u64,
    pub passengers: usize,
    pub boarded: usize,
    pub trains: Vec<TrainReport>,
}

impl SimulationReport {
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }
}

impl Display for SimulationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for train in &self.trains {
            writeln!(f, "{}", train)?;
        }
        if self.boarded == self.passengers {
            write!(
                f,
                "Train Automation System is working well! {} passengers on {} trains",
                self.boarded,
                self.trains.len()
            )
        } else {
            write!(
                f,
                "Only {} of {} passengers boarded",
                self.boarded, self.passengers
            )
        }
    }
}
