use tinyrand::{Rand, Seeded, Wyrand};
use web_time::{SystemTime, UNIX_EPOCH};

/// Draws the number of free seats of each arriving train.
pub struct SeatGenerator {
    rng: Wyrand,
    max_free_seats: usize,
    seed: u64,
}

impl SeatGenerator {
    pub fn new(max_free_seats: usize, seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(clock_seed);
        SeatGenerator {
            rng: Wyrand::seed(seed),
            max_free_seats,
            seed,
        }
    }

    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns a value in `[0, max_free_seats)`, or 0 if there is no range.
    pub fn next_seats(&mut self) -> usize {
        if self.max_free_seats == 0 {
            return 0;
        }
        (self.rng.next_u64() % self.max_free_seats as u64) as usize
    }

    /// Either zero or one microsecond, like the boarding delay of a real door.
    pub(crate) fn next_jitter_us(&mut self) -> u64 {
        self.rng.next_u64() % 2
    }
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
