//! State vectors produced by [`super::Handle`].
//!
//! Units
//! -----------------
//! XEPH files carry whatever units their producer chose and the engine never
//! converts them. For the fundamental ephemerides:
//! * `position`: au (km for natural satellites relative to their planet),
//! * `velocity`: the matching unit per day.
//!
//! Arithmetic semantics
//! -----------------
//! Addition and subtraction are component-wise. `velocity` propagates **only
//! when present on both operands**; otherwise it is dropped, so partial
//! information is never mixed silently. This is how a geocentric Moon and a
//! barycentric Earth combine into a barycentric Moon.
use std::ops::{Add, Sub};

use nalgebra::DVector;

/// Position and optional velocity of an object at one instant.
#[derive(Debug, PartialEq, Clone)]
pub struct StateVector {
    pub position: DVector<f64>,
    pub velocity: Option<DVector<f64>>,
}

impl StateVector {
    pub fn dimension(&self) -> usize {
        self.position.len()
    }
}

impl Add for StateVector {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        &self + &other
    }
}

impl Add for &StateVector {
    type Output = StateVector;

    fn add(self, other: Self) -> Self::Output {
        StateVector {
            position: &self.position + &other.position,
            velocity: match (&self.velocity, &other.velocity) {
                (Some(v1), Some(v2)) => Some(v1 + v2),
                _ => None,
            },
        }
    }
}

impl Sub for StateVector {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        &self - &other
    }
}

impl Sub for &StateVector {
    type Output = StateVector;

    fn sub(self, other: Self) -> Self::Output {
        StateVector {
            position: &self.position - &other.position,
            velocity: match (&self.velocity, &other.velocity) {
                (Some(v1), Some(v2)) => Some(v1 - v2),
                _ => None,
            },
        }
    }
}

#[cfg(test)]
mod state_vector_test {
    use super::*;

    #[test]
    fn test_arithmetic() {
        let earth = StateVector {
            position: DVector::from_vec(vec![1.0, 2.0, 3.0]),
            velocity: Some(DVector::from_vec(vec![0.1, 0.2, 0.3])),
        };
        let moon = StateVector {
            position: DVector::from_vec(vec![0.5, 0.5, 0.5]),
            velocity: Some(DVector::from_vec(vec![0.01, 0.01, 0.01])),
        };

        let sum = &earth + &moon;
        assert_eq!(sum.position, DVector::from_vec(vec![1.5, 2.5, 3.5]));
        assert_eq!(sum.dimension(), 3);

        let diff = sum - moon;
        assert_eq!(diff.position, earth.position);
        let v = diff.velocity.unwrap();
        assert!((&v - earth.velocity.as_ref().unwrap()).amax() < 1e-15);

        let no_velocity = StateVector {
            position: DVector::zeros(3),
            velocity: None,
        };
        assert!((earth + no_velocity).velocity.is_none());
    }
}
