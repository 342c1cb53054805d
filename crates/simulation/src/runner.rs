use crate::config::SimulationConfig;
use crate::error::SimulationError;
use crate::generator::SeatGenerator;
use crate::report::{SimulationReport, TrainReport};
use crossbeam_channel::{
    bounded, select, unbounded, Receiver, RecvError, RecvTimeoutError, Sender,
};
use dawn_station::{Departure, Station, StationSnapshot};
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread::{Builder, JoinHandle};
use std::time::Duration;
use web_time::Instant;

// Passenger threads do nothing but park on the station.
const PASSENGER_STACK_SIZE: usize = 64 * 1024;

enum Event {
    Boarded(usize),
    Departed(Departure),
}

/// Drives one station: spawns a thread per passenger, then sends trains
/// one after another until every passenger has boarded.
///
/// The driver plays the role of the train conductor: it seats every
/// passenger reported as admitted by calling [`Station::on_board`], and
/// checks after each train that the station kept its promises.
pub struct Simulation {
    config: SimulationConfig,
    station: Arc<Station>,
}

/// Bookkeeping shared by all trains of one run.
struct Platform {
    boarded: Receiver<usize>,
    seen: HashSet<usize>,
    generator: SeatGenerator,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        Ok(Simulation {
            config,
            station: Station::shared(),
        })
    }

    #[inline]
    pub fn station(&self) -> &Arc<Station> {
        &self.station
    }

    /// Runs the whole simulation on the station of this instance.
    ///
    /// A failed run leaves its passengers parked on the station, and every
    /// later run on the same instance is refused with
    /// [`SimulationError::StationBusy`]. Build a new [`Simulation`] to retry.
    pub fn run(&self) -> Result<SimulationReport, SimulationError> {
        let snapshot = self.station.snapshot();
        if snapshot != StationSnapshot::default() {
            return Err(SimulationError::StationBusy {
                waiting: snapshot.waiting,
                in_transit: snapshot.in_transit,
            });
        }

        let generator = SeatGenerator::new(self.config.max_free_seats, self.config.seed);
        let seed = generator.seed();
        info!(
            "Starting simulation: {} passengers, up to {} free seats per train, seed {}",
            self.config.passengers, self.config.max_free_seats, seed
        );

        let (boarded_tx, boarded_rx) = unbounded();
        let passengers = self.spawn_passengers(&boarded_tx)?;
        drop(boarded_tx);

        let mut platform = Platform {
            boarded: boarded_rx,
            seen: HashSet::with_capacity(self.config.passengers),
            generator,
        };

        let mut trains = Vec::new();
        let mut left = self.config.passengers;
        while left > 0 {
            let report = self.run_train(trains.len() + 1, left, &mut platform)?;
            if report.is_short() {
                warn!(
                    "Train {} left with {} empty seats, passengers are still arriving",
                    report.train,
                    report.expected - report.boarded
                );
            }
            info!("{}", report);

            left -= report.boarded;
            trains.push(report);
        }

        for handle in passengers {
            if let Err(e) = handle.join() {
                error!("Passenger thread panicked: {:?}", e);
            }
        }

        let boarded = platform.seen.len();
        if boarded != self.config.passengers {
            return Err(SimulationError::Conservation {
                boarded,
                passengers: self.config.passengers,
            });
        }

        Ok(SimulationReport {
            seed,
            passengers: self.config.passengers,
            boarded,
            trains,
        })
    }

    fn spawn_passengers(
        &self,
        boarded: &Sender<usize>,
    ) -> Result<Vec<JoinHandle<()>>, SimulationError> {
        (1..=self.config.passengers)
            .map(|id| {
                let station = Arc::clone(&self.station);
                let boarded = boarded.clone();
                Builder::new()
                    .name(format!("passenger-{}", id))
                    .stack_size(PASSENGER_STACK_SIZE)
                    .spawn(move || {
                        station.wait_for_train();
                        info!("Passenger {} has completed waiting for train", id);
                        // Nobody listens only if the run has already failed
                        let _ = boarded.send(id);
                    })
                    .map_err(|e| {
                        SimulationError::Initialization(format!(
                            "Failed to spawn passenger {}: {}. Try reducing the number of passengers",
                            id, e
                        ))
                    })
            })
            .collect()
    }

    fn spawn_train(
        &self,
        train: usize,
        seats: usize,
    ) -> Result<(JoinHandle<()>, Receiver<Departure>), SimulationError> {
        let (departed_tx, departed_rx) = bounded(1);
        let station = Arc::clone(&self.station);
        let handle = Builder::new()
            .name(format!("train-{}", train))
            .spawn(move || {
                let departure = station.load_train(seats);
                let _ = departed_tx.send(departure);
            })
            .map_err(|e| {
                SimulationError::Initialization(format!("Failed to spawn train {}: {}", train, e))
            })?;
        Ok((handle, departed_rx))
    }

    fn run_train(
        &self,
        train: usize,
        left: usize,
        platform: &mut Platform,
    ) -> Result<TrainReport, SimulationError> {
        let seats = platform.generator.next_seats();
        info!("Train {} entering station with {} free seats", train, seats);

        let started = Instant::now();
        let (handle, departed) = self.spawn_train(train, seats)?;

        let expected = left.min(seats);
        let jitter = self.config.boarding_jitter && train % 2 == 1;
        let mut boarded = 0;
        let mut early = None;

        while boarded < expected {
            let event: Result<Event, RecvError> = select! {
                recv(platform.boarded) -> id => id.map(Event::Boarded),
                recv(departed) -> departure => departure.map(Event::Departed),
            };

            match event.map_err(|_| SimulationError::Disconnected)? {
                Event::Boarded(id) => {
                    if !platform.seen.insert(id) {
                        return Err(SimulationError::BoardedTwice { passenger: id });
                    }
                    if jitter {
                        std::thread::sleep(Duration::from_micros(
                            platform.generator.next_jitter_us(),
                        ));
                    }
                    debug!("Passenger {} seated on train {}", id, train);
                    boarded += 1;
                    self.station.on_board();
                }
                Event::Departed(departure) => {
                    if departure.admitted > boarded {
                        return Err(SimulationError::EarlyDeparture {
                            train,
                            boarded,
                            expected: departure.admitted,
                        });
                    }
                    early = Some(departure);
                    break;
                }
            }
        }

        let departure = match early {
            Some(departure) => departure,
            None => {
                let grace = self.config.departure_grace();
                departed.recv_timeout(grace).map_err(|e| match e {
                    RecvTimeoutError::Timeout => SimulationError::DepartureTimeout {
                        train,
                        waited: grace,
                    },
                    RecvTimeoutError::Disconnected => SimulationError::Disconnected,
                })?
            }
        };
        if handle.join().is_err() {
            return Err(SimulationError::Disconnected);
        }

        let extra = platform.boarded.try_iter().count();
        if departure.admitted > expected || extra > 0 {
            return Err(SimulationError::Overbooked {
                train,
                boarded: departure.admitted.max(boarded + extra),
                expected,
            });
        }

        Ok(TrainReport {
            train,
            seats,
            expected,
            boarded,
            elapsed_us: started.elapsed().as_micros() as u64,
        })
    }
}
