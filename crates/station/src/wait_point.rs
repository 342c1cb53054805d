use std::fmt::{Display, Formatter};

/// Named wake-up points of the station.
/// Every condition variable of the station is addressed through one of these,
/// so each park and each notification says what it is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum WaitPoint {
    /// A seat was offered to the waiting passengers.
    /// Passengers park here, the loading train notifies one of them per seat.
    Admitted,
    /// A passenger claimed the offered seat and is now in transit.
    /// The loading train parks here after every offer.
    Confirmed,
    /// The last passenger in transit took their seat.
    /// The loading train parks here before departing.
    SessionComplete,
}

impl WaitPoint {
    #[cfg(test)]
    pub const ALL: [WaitPoint; 3] = [
        WaitPoint::Admitted,
        WaitPoint::Confirmed,
        WaitPoint::SessionComplete,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            WaitPoint::Admitted => "admitted",
            WaitPoint::Confirmed => "confirmed",
            WaitPoint::SessionComplete => "session_complete",
        }
    }
}

impl Display for WaitPoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
