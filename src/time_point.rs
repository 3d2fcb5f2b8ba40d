//! # Two-part Julian day instants
//!
//! [`TimePoint`] stores an instant as an integer Julian day (`jdi`) plus a
//! fractional day (`jdf` in `[0, 1)`). Keeping both parts apart preserves
//! sub-millisecond resolution over the whole range covered by planetary
//! ephemerides, which a single `f64` Julian date cannot guarantee.
//!
//! ## Conventions
//!
//! * Time scale is whatever the data were fitted in (TDB for the fundamental
//!   ephemerides); no scale conversion happens here.
//! * `a - b` between two time points returns the difference in **days**.
//! * The default value is an **invalid** time point; every consumer checks
//!   [`TimePoint::is_valid`] before using it.
//!
//! ## Text form
//!
//! The XEPH header writes time points as decimal Julian days
//! (`"2451545.5"`). For non-negative Julian days the text form round-trips
//! exactly through [`std::fmt::Display`] and [`std::str::FromStr`].
//!
//! ## See also
//!
//! * [`hifitime::Epoch`] – conversions in both directions, as TDB Julian days.
use std::{
    cmp::Ordering,
    fmt,
    ops::{Add, Sub},
    str::FromStr,
};

use hifitime::{Duration, Epoch};

use crate::xeph_errors::XephError;

/// A high-precision instant split into integer and fractional Julian day.
#[derive(Debug, Clone, Copy)]
pub struct TimePoint {
    jdi: i32,
    jdf: f64,
}

impl Default for TimePoint {
    fn default() -> Self {
        Self::invalid()
    }
}

impl TimePoint {
    /// Build a time point from integer and fractional parts.
    ///
    /// The fractional part may lie outside `[0, 1)`; it is normalized into
    /// the integer part. The result is invalid when `jdf` is not finite or
    /// the normalized day does not fit in an `i32`.
    pub fn new(jdi: i32, jdf: f64) -> Self {
        if !jdf.is_finite() {
            return Self::invalid();
        }
        let whole = jdf.floor();
        let mut frac = jdf - whole;
        let mut day = jdi as f64 + whole;
        // Rounding can push frac to exactly 1.0 for tiny negative inputs
        if frac >= 1.0 {
            frac -= 1.0;
            day += 1.0;
        }
        if !(i32::MIN as f64..=i32::MAX as f64).contains(&day) {
            return Self::invalid();
        }
        TimePoint {
            jdi: day as i32,
            jdf: frac,
        }
    }

    /// Build a time point from a Julian date.
    pub fn from_jd(jd: f64) -> Self {
        Self::new(0, jd)
    }

    /// The invalid (uninitialized) time point.
    pub const fn invalid() -> Self {
        TimePoint {
            jdi: 0,
            jdf: f64::NAN,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.jdf.is_finite()
    }

    /// Integer Julian day.
    pub fn jdi(&self) -> i32 {
        self.jdi
    }

    /// Fractional Julian day, in `[0, 1)`.
    pub fn jdf(&self) -> f64 {
        self.jdf
    }

    /// Julian date as a single `f64` (loses precision far from the epoch).
    pub fn jd(&self) -> f64 {
        self.jdi as f64 + self.jdf
    }

    /// Convert to a [`hifitime::Epoch`], interpreting the Julian days as TDB.
    pub fn to_epoch(&self) -> Result<Epoch, XephError> {
        if !self.is_valid() {
            return Err(XephError::InvalidTimePoint(self.to_string()));
        }
        Ok(Epoch::from_jde_tdb(self.jdi as f64) + Duration::from_days(self.jdf))
    }
}

impl From<Epoch> for TimePoint {
    fn from(epoch: Epoch) -> Self {
        TimePoint::from_jd(epoch.to_jde_tdb_days())
    }
}

impl PartialEq for TimePoint {
    fn eq(&self, other: &Self) -> bool {
        self.jdi == other.jdi && self.jdf == other.jdf
    }
}

impl PartialOrd for TimePoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.jdi.cmp(&other.jdi) {
            Ordering::Equal => self.jdf.partial_cmp(&other.jdf),
            ord => {
                if self.is_valid() && other.is_valid() {
                    Some(ord)
                } else {
                    None
                }
            }
        }
    }
}

impl Sub for TimePoint {
    type Output = f64;

    /// Difference in days.
    fn sub(self, other: Self) -> f64 {
        (self.jdi as i64 - other.jdi as i64) as f64 + (self.jdf - other.jdf)
    }
}

impl Add<f64> for TimePoint {
    type Output = TimePoint;

    fn add(self, days: f64) -> TimePoint {
        TimePoint::new(self.jdi, self.jdf + days)
    }
}

impl Sub<f64> for TimePoint {
    type Output = TimePoint;

    fn sub(self, days: f64) -> TimePoint {
        TimePoint::new(self.jdi, self.jdf - days)
    }
}

impl fmt::Display for TimePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return write!(f, "<invalid>");
        }
        if self.jdi < 0 {
            return write!(f, "{}", self.jd());
        }
        // `jdf` is in [0, 1): its shortest representation is "0" or "0.ddd"
        let frac = format!("{}", self.jdf);
        match frac.strip_prefix('0') {
            Some(digits) if !digits.is_empty() => write!(f, "{}{}", self.jdi, digits),
            _ => write!(f, "{}.0", self.jdi),
        }
    }
}

impl FromStr for TimePoint {
    type Err = XephError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let invalid = || XephError::InvalidTimePoint(s.to_string());
        if text.is_empty() {
            return Err(invalid());
        }

        if text.starts_with('-') {
            let jd = f64::from_str(text).map_err(|_| invalid())?;
            return Some(TimePoint::from_jd(jd))
                .filter(TimePoint::is_valid)
                .ok_or_else(invalid);
        }

        let text = text.strip_prefix('+').unwrap_or(text);
        let (int_part, frac_part) = text.split_once('.').unwrap_or((text, ""));
        if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if !frac_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let jdi = i32::from_str(int_part).map_err(|_| invalid())?;
        let jdf = if frac_part.is_empty() {
            0.0
        } else {
            f64::from_str(&format!("0.{frac_part}")).map_err(|_| invalid())?
        };
        Some(TimePoint::new(jdi, jdf))
            .filter(TimePoint::is_valid)
            .ok_or_else(invalid)
    }
}

#[cfg(test)]
mod time_point_test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_normalization() {
        let t = TimePoint::new(2451545, 1.25);
        assert_eq!(t.jdi(), 2451546);
        assert_eq!(t.jdf(), 0.25);

        let t = TimePoint::new(2451545, -0.25);
        assert_eq!(t.jdi(), 2451544);
        assert_eq!(t.jdf(), 0.75);

        let t = TimePoint::from_jd(2451545.5);
        assert_eq!(t, TimePoint::new(2451545, 0.5));
    }

    #[test]
    fn test_invalid() {
        let t = TimePoint::default();
        assert!(!t.is_valid());
        assert!(TimePoint::from_jd(f64::NAN).partial_cmp(&t).is_none());
        assert!(t.to_epoch().is_err());
    }

    #[test]
    fn test_out_of_range_days() {
        assert!(!TimePoint::from_jd(1.0e12).is_valid());
        assert!(!TimePoint::from_jd(-1.0e12).is_valid());
        assert!(!TimePoint::new(0, 1.0e300).is_valid());
        assert!(!TimePoint::new(i32::MAX, 1.5).is_valid());
        assert!(!(TimePoint::new(i32::MIN, 0.0) - 0.5).is_valid());

        let low = TimePoint::new(i32::MIN, 0.0);
        let high = TimePoint::new(i32::MAX, 0.5);
        assert!(low.is_valid() && high.is_valid());
        assert_eq!(high - low, u32::MAX as f64 + 0.5);
        assert_eq!(low - high, -(u32::MAX as f64) - 0.5);

        for text in ["-1e12", "99999999999.5"] {
            assert_eq!(
                TimePoint::from_str(text),
                Err(XephError::InvalidTimePoint(text.to_string()))
            );
        }
    }

    #[test]
    fn test_ordering_and_difference() {
        let a = TimePoint::new(2451545, 0.0);
        let b = a + 7.5;
        assert!(a < b);
        assert!(b > a);
        assert_eq!(b - a, 7.5);
        assert_eq!(b - 7.5, a);
        assert!(a - 0.001 < a);
    }

    #[test]
    fn test_text_round_trip() {
        for t in [
            TimePoint::new(2451545, 0.0),
            TimePoint::new(2451545, 0.5),
            TimePoint::new(2460000, 0.123456789012345),
            TimePoint::new(2451545, 1e-9),
        ] {
            let text = t.to_string();
            let parsed = TimePoint::from_str(&text).unwrap();
            assert_eq!(parsed, t, "round trip of {text}");
        }
        assert_eq!(TimePoint::new(2451545, 0.0).to_string(), "2451545.0");
        assert_eq!(TimePoint::new(2451545, 0.5).to_string(), "2451545.5");
    }

    #[test]
    fn test_parse_errors() {
        for text in ["", "abc", "2451545.5x", "24515 45", "."] {
            assert_eq!(
                TimePoint::from_str(text),
                Err(XephError::InvalidTimePoint(text.to_string()))
            );
        }
        assert_eq!(
            TimePoint::from_str("-0.25").unwrap(),
            TimePoint::new(-1, 0.75)
        );
    }

    #[test]
    fn test_epoch_conversion() {
        let t = TimePoint::new(2451545, 0.25);
        let epoch = t.to_epoch().unwrap();
        let back = TimePoint::from(epoch);
        assert_abs_diff_eq!(back - t, 0.0, epsilon = 1e-8);
    }
}
