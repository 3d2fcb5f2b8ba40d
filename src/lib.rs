//! Indexed ephemeris store: read, evaluate and write XEPH files of
//! piecewise Chebyshev expansions.
pub mod chebyshev;
pub mod constants;
pub mod ephemeris;
pub mod registry;
pub mod time_point;
pub mod xeph_errors;

pub use ephemeris::{EphemerisFile, Handle, StateVector};
pub use time_point::TimePoint;
pub use xeph_errors::XephError;
