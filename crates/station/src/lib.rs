//! Train station: a bounded-capacity rendezvous between arriving passengers
//! and trains that load them one seat at a time.
//!
//! A passenger calls [`Station::wait_for_train`] and is blocked until a train
//! offers it a seat. A train calls [`Station::load_train`] with its number of
//! free seats; it admits passengers one by one and does not leave until every
//! admitted passenger called [`Station::on_board`].
//!
//! Only one train may be loading at a time. The station does not check it.

mod station;
mod wait_point;

pub use station::{Departure, Station, StationSnapshot};
