//! Internal implementation details.

mod in_flight;
mod reentrancy;

pub(crate) use in_flight::InFlightSet;
pub(crate) use reentrancy::ReentrancyMarker;
