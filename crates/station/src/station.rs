use crate::wait_point::WaitPoint;
use log::{debug, error, trace};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// Counters of the station. Only ever touched under the station lock.
#[derive(Debug, Default)]
struct State {
    waiting: usize,
    in_transit: usize,
    // Seats offered by the loading train that no passenger has claimed yet.
    // Passengers only leave the platform by claiming one, so a spurious
    // wake-up never lets a passenger board without a seat.
    offered: usize,
}

/// Copy of the station counters taken under the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StationSnapshot {
    /// Passengers that arrived and were not admitted yet.
    pub waiting: usize,
    /// Passengers admitted into the loading train that did not take a seat yet.
    pub in_transit: usize,
}

/// Outcome of one loading session, returned when the train leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Departure {
    /// Free seats the train arrived with.
    pub capacity: usize,
    /// Passengers moved from the platform into this train.
    pub admitted: usize,
}

impl Departure {
    #[inline]
    pub fn is_full(&self) -> bool {
        self.admitted == self.capacity
    }
}

/// The shared synchronization object between passengers and trains.
///
/// Passengers call [`Station::wait_for_train`] and then [`Station::on_board`]
/// once they are seated. One train at a time calls [`Station::load_train`].
/// None of the operations time out: a train whose passengers never confirm
/// their seat never leaves.
#[derive(Debug)]
pub struct Station {
    state: Mutex<State>,
    admitted: Condvar,
    confirmed: Condvar,
    session_complete: Condvar,
}

impl Default for Station {
    fn default() -> Self {
        Station::new()
    }
}

impl Station {
    pub fn new() -> Self {
        Station {
            state: Mutex::new(State::default()),
            admitted: Condvar::new(),
            confirmed: Condvar::new(),
            session_complete: Condvar::new(),
        }
    }

    /// Creates a station ready to be handed out to passenger and train threads.
    pub fn shared() -> Arc<Self> {
        Arc::new(Station::new())
    }

    pub fn snapshot(&self) -> StationSnapshot {
        let state = self.lock();
        StationSnapshot {
            waiting: state.waiting,
            in_transit: state.in_transit,
        }
    }

    /// Blocks the calling passenger until a train offers it a seat.
    /// Returns once the passenger has left the platform and is in transit;
    /// the caller must then confirm its seat with [`Station::on_board`].
    pub fn wait_for_train(&self) {
        let mut state = self.lock();
        state.waiting += 1;

        let mut state = self.park(WaitPoint::Admitted, state, |s| s.offered == 0);
        state.offered -= 1;
        state.waiting -= 1;
        state.in_transit += 1;
        drop(state);

        // The train re-checks the offer under the lock, so notifying after
        // the unlock cannot be missed.
        self.signal(WaitPoint::Confirmed);
    }

    /// Loads the train with up to `capacity` passengers.
    ///
    /// Passengers are admitted one at a time: a seat is offered, then the train
    /// waits until some passenger claimed it before offering the next one.
    /// Passengers arriving while the train is still admitting may board it.
    /// Once the seats or the platform run out, the train waits until every
    /// admitted passenger confirmed its seat and then departs.
    ///
    /// Must not be called while another train is still loading.
    pub fn load_train(&self, capacity: usize) -> Departure {
        let mut state = self.lock();
        debug!(
            "Train loading with {} free seats, {} passengers waiting",
            capacity, state.waiting
        );

        let mut admitted = 0;
        while state.waiting > 0 && admitted < capacity {
            state.offered += 1;
            self.signal(WaitPoint::Admitted);
            admitted += 1;

            state = self.park(WaitPoint::Confirmed, state, |s| s.offered > 0);
            trace!("Seat {}/{} taken", admitted, capacity);
        }

        let state = self.park(WaitPoint::SessionComplete, state, |s| s.in_transit > 0);
        debug!(
            "Train departed with {} passengers, {} left waiting",
            admitted, state.waiting
        );

        Departure { capacity, admitted }
    }

    /// Confirms that one admitted passenger took its seat.
    /// The last confirmation releases the loading train.
    ///
    /// Must be called exactly once per returned [`Station::wait_for_train`].
    pub fn on_board(&self) {
        let mut state = self.lock();
        let Some(in_transit) = state.in_transit.checked_sub(1) else {
            error!("Passenger boarded without being admitted into a train");
            return;
        };
        state.in_transit = in_transit;
        drop(state);

        if in_transit == 0 {
            self.broadcast(WaitPoint::SessionComplete);
        }
    }

    #[inline]
    fn wait_point(&self, point: WaitPoint) -> &Condvar {
        match point {
            WaitPoint::Admitted => &self.admitted,
            WaitPoint::Confirmed => &self.confirmed,
            WaitPoint::SessionComplete => &self.session_complete,
        }
    }

    // Every transition leaves the counters consistent before anything that
    // can panic, so a poisoned lock still guards valid state.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Parks on `point` while `condition` holds, releasing the lock meanwhile.
    fn park<'a, F>(
        &self,
        point: WaitPoint,
        guard: MutexGuard<'a, State>,
        condition: F,
    ) -> MutexGuard<'a, State>
    where
        F: FnMut(&mut State) -> bool,
    {
        trace!("Parking on {}", point);
        let guard = self
            .wait_point(point)
            .wait_while(guard, condition)
            .unwrap_or_else(PoisonError::into_inner);
        trace!("Released from {}", point);
        guard
    }

    fn signal(&self, point: WaitPoint) {
        trace!("Signal {}", point);
        self.wait_point(point).notify_one();
    }

    fn broadcast(&self, point: WaitPoint) {
        trace!("Broadcast {}", point);
        self.wait_point(point).notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{unbounded, Sender};
    use std::collections::HashSet;
    use std::thread;
    use std::thread::JoinHandle;
    use std::time::{Duration, Instant};

    const TIMEOUT: Duration = Duration::from_secs(5);
    const QUIET: Duration = Duration::from_millis(100);

    fn wait_until(station: &Station, what: impl Fn(StationSnapshot) -> bool) {
        let deadline = Instant::now() + TIMEOUT;
        while !what(station.snapshot()) {
            assert!(
                Instant::now() < deadline,
                "Station never reached the expected state: {:?}",
                station.snapshot()
            );
            thread::sleep(Duration::from_millis(1));
        }
    }

    /// Passengers that report their id once admitted and leave seating to the caller.
    fn spawn_passengers(
        station: &Arc<Station>,
        ids: std::ops::Range<usize>,
        boarded: &Sender<usize>,
    ) -> Vec<JoinHandle<()>> {
        ids.map(|id| {
            let station = Arc::clone(station);
            let boarded = boarded.clone();
            thread::spawn(move || {
                station.wait_for_train();
                boarded.send(id).unwrap();
            })
        })
        .collect()
    }

    /// Passengers that take their seat on their own right after being admitted.
    fn spawn_seating_passengers(station: &Arc<Station>, count: usize) -> Vec<JoinHandle<()>> {
        (0..count)
            .map(|i| {
                let station = Arc::clone(station);
                thread::spawn(move || {
                    station.wait_for_train();
                    thread::sleep(Duration::from_millis((i as u64 * 3) % 7));
                    station.on_board();
                })
            })
            .collect()
    }

    fn join_all(handles: Vec<JoinHandle<()>>) {
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn new_station_is_empty() {
        let station = Station::new();
        assert_eq!(station.snapshot(), StationSnapshot::default());
    }

    #[test]
    fn empty_train_on_empty_platform_departs_immediately() {
        let station = Station::new();
        let departure = station.load_train(0);
        assert_eq!(
            departure,
            Departure {
                capacity: 0,
                admitted: 0
            }
        );
        assert!(departure.is_full());
    }

    #[test]
    fn train_on_empty_platform_departs_immediately() {
        let station = Station::new();
        let departure = station.load_train(10);
        assert_eq!(departure.admitted, 0);
        assert!(!departure.is_full());
        assert_eq!(station.snapshot(), StationSnapshot::default());
    }

    #[test]
    fn train_without_seats_leaves_everyone_waiting() {
        let station = Station::shared();
        let passengers = spawn_seating_passengers(&station, 2);
        wait_until(&station, |s| s.waiting == 2);

        let departure = station.load_train(0);
        assert_eq!(departure.admitted, 0);
        assert_eq!(
            station.snapshot(),
            StationSnapshot {
                waiting: 2,
                in_transit: 0
            }
        );

        assert_eq!(station.load_train(2).admitted, 2);
        join_all(passengers);
    }

    #[test]
    fn train_takes_only_its_seats_and_waits_for_them() {
        let station = Station::shared();
        let (boarded_tx, boarded_rx) = unbounded();
        let mut passengers = spawn_passengers(&station, 0..3, &boarded_tx);
        wait_until(&station, |s| s.waiting == 3);

        let (departed_tx, departed_rx) = unbounded();
        let train = {
            let station = Arc::clone(&station);
            thread::spawn(move || departed_tx.send(station.load_train(2)).unwrap())
        };

        for _ in 0..2 {
            boarded_rx.recv_timeout(TIMEOUT).unwrap();
        }
        assert!(boarded_rx.recv_timeout(QUIET).is_err());
        assert_eq!(
            station.snapshot(),
            StationSnapshot {
                waiting: 1,
                in_transit: 2
            }
        );

        // Nobody is seated yet, the train must still be there
        station.on_board();
        assert!(departed_rx.recv_timeout(QUIET).is_err());
        station.on_board();

        let departure = departed_rx.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(
            departure,
            Departure {
                capacity: 2,
                admitted: 2
            }
        );
        train.join().unwrap();

        // The passenger left on the platform takes the next train
        let (departed_tx, departed_rx) = unbounded();
        passengers.push({
            let station = Arc::clone(&station);
            thread::spawn(move || departed_tx.send(station.load_train(5)).unwrap())
        });
        boarded_rx.recv_timeout(TIMEOUT).unwrap();
        station.on_board();
        assert_eq!(departed_rx.recv_timeout(TIMEOUT).unwrap().admitted, 1);

        join_all(passengers);
        assert_eq!(station.snapshot(), StationSnapshot::default());
    }

    #[test]
    fn spare_seats_take_everyone_waiting() {
        let station = Station::shared();
        let passengers = spawn_seating_passengers(&station, 4);
        wait_until(&station, |s| s.waiting == 4);

        let departure = station.load_train(10);
        assert_eq!(departure.admitted, 4);
        assert_eq!(station.snapshot(), StationSnapshot::default());
        join_all(passengers);
    }

    #[test]
    fn concurrent_confirmations_release_the_train_once() {
        let station = Station::shared();
        let passengers = spawn_seating_passengers(&station, 8);
        wait_until(&station, |s| s.waiting == 8);

        let departure = station.load_train(8);
        assert!(departure.is_full());
        assert_eq!(station.snapshot(), StationSnapshot::default());
        join_all(passengers);
    }

    #[test]
    fn passengers_board_exactly_once() {
        const PASSENGERS: usize = 20;
        const SEATS: usize = 3;

        let station = Station::shared();
        let (boarded_tx, boarded_rx) = unbounded();
        let passengers = spawn_passengers(&station, 0..PASSENGERS, &boarded_tx);
        wait_until(&station, |s| s.waiting == PASSENGERS);

        let mut seen = HashSet::new();
        while seen.len() < PASSENGERS {
            let (departed_tx, departed_rx) = unbounded();
            let train = {
                let station = Arc::clone(&station);
                thread::spawn(move || departed_tx.send(station.load_train(SEATS)).unwrap())
            };

            let expected = SEATS.min(PASSENGERS - seen.len());
            for _ in 0..expected {
                let id = boarded_rx.recv_timeout(TIMEOUT).unwrap();
                assert!(seen.insert(id), "Passenger {} boarded twice", id);
                station.on_board();
            }

            let departure = departed_rx.recv_timeout(TIMEOUT).unwrap();
            assert_eq!(departure.admitted, expected);
            train.join().unwrap();
        }

        assert!(boarded_rx.try_recv().is_err());
        join_all(passengers);
    }

    #[test]
    fn arrivals_during_loading_are_never_lost() {
        const LATE: usize = 20;

        let station = Station::shared();
        let mut passengers = spawn_seating_passengers(&station, 1);
        wait_until(&station, |s| s.waiting == 1);
        passengers.extend(spawn_seating_passengers(&station, LATE));

        let mut total = 0;
        while total < LATE + 1 {
            let departure = station.load_train(30);
            assert!(departure.admitted <= departure.capacity);
            total += departure.admitted;
            assert!(total <= LATE + 1);
            wait_until(&station, |s| s.waiting + total == LATE + 1);
        }

        join_all(passengers);
        assert_eq!(station.snapshot(), StationSnapshot::default());
    }

    #[test]
    fn late_arrival_boards_the_loading_train() {
        const EARLY: usize = 30;
        const LATE: usize = 30;
        const TOTAL: usize = EARLY + LATE;
        // Boarding a train that is already loading needs a lucky interleaving
        const ATTEMPTS: usize = 500;

        for _ in 0..ATTEMPTS {
            let station = Station::shared();
            let mut passengers = spawn_seating_passengers(&station, EARLY);
            wait_until(&station, |s| s.waiting == EARLY);

            let latecomers = {
                let station = Arc::clone(&station);
                thread::spawn(move || {
                    // Arrive only once the train has started admitting
                    while station.snapshot().waiting == EARLY {
                        thread::yield_now();
                    }
                    spawn_seating_passengers(&station, LATE)
                })
            };

            let first = station.load_train(TOTAL);
            passengers.extend(latecomers.join().unwrap());
            assert!(first.admitted >= EARLY);

            let mut total = first.admitted;
            while total < TOTAL {
                wait_until(&station, |s| s.waiting + total == TOTAL);
                total += station.load_train(TOTAL).admitted;
            }
            join_all(passengers);
            assert_eq!(station.snapshot(), StationSnapshot::default());

            if first.admitted > EARLY {
                return;
            }
        }
        panic!(
            "No passenger arriving during loading boarded the train in {} attempts",
            ATTEMPTS
        );
    }

    #[test]
    fn unmatched_confirmation_keeps_counters_intact() {
        let station = Station::new();
        station.on_board();
        assert_eq!(station.snapshot(), StationSnapshot::default());
        assert_eq!(station.load_train(1).admitted, 0);
    }
}
