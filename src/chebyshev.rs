//! Truncated Chebyshev expansions of vector-valued functions.
//!
//! A [`ChebyshevExpansion`] approximates a function `f: [a, b] → ℝᴺ`
//! (`1 ≤ N ≤ 4` in XEPH files) by one Chebyshev series per component:
//!
//! ```text
//! f_i(x) ≈ c_i0/2 + Σ_{j≥1} c_ij T_j(y),    y = (2x - a - b) / (b - a)
//! ```
//!
//! Each component keeps its full coefficient series plus a *truncated
//! length* `m_i`: evaluation only uses the first `m_i` coefficients.
//! [`ChebyshevExpansion::truncate`] picks the shortest lengths whose
//! discarded coefficients stay below a tolerance, and the serializer only
//! stores the truncated series.
//!
//! Evaluation uses the Clenshaw recurrence; [`ChebyshevExpansion::derivative`]
//! differentiates the series analytically, so velocities obtained from a
//! position expansion are exact derivatives of the fitted polynomial.
use std::f64::consts::PI;

use nalgebra::DVector;

use crate::{constants::MAX_COMPONENTS, xeph_errors::XephError};

#[derive(Debug, Clone, PartialEq)]
pub struct ChebyshevExpansion {
    /// Center of the approximation interval, `(a + b) / 2`.
    x0: f64,
    /// Width of the approximation interval, `b - a`.
    dx: f64,
    /// Full coefficient series, one per component.
    coefficients: Vec<Vec<f64>>,
    /// Truncated length of each coefficient series.
    truncated: Vec<usize>,
}

impl ChebyshevExpansion {
    /// Fit a function over `[a, b]` with `n` coefficients per component.
    ///
    /// The function is sampled at the `n` Chebyshev nodes of the interval
    /// and must return vectors of exactly `n_components` elements.
    ///
    /// Arguments
    /// -----------------
    /// * `f`: Function to approximate.
    /// * `a`, `b`: Bounds of the approximation interval (`a != b`).
    /// * `n`: Number of coefficients per component (≥ 1).
    /// * `n_components`: Dimension of the function values (1 to 4).
    ///
    /// Return
    /// ----------
    /// * The untruncated expansion, or [`XephError::InvalidExpansion`] when the
    ///   arguments or the sampled values are inconsistent.
    pub fn fit<F>(f: F, a: f64, b: f64, n: usize, n_components: usize) -> Result<Self, XephError>
    where
        F: Fn(f64) -> DVector<f64>,
    {
        if n == 0 {
            return Err(XephError::InvalidExpansion(
                "at least one coefficient is required".into(),
            ));
        }
        if n_components == 0 || n_components > MAX_COMPONENTS {
            return Err(XephError::InvalidExpansion(format!(
                "unsupported expansion dimension ({n_components})"
            )));
        }
        let dx = b - a;
        if !dx.is_finite() || 1.0 + dx == 1.0 {
            return Err(XephError::InvalidExpansion(
                "empty or insignificant approximation interval".into(),
            ));
        }
        let x0 = (a + b) / 2.0;

        let mut samples = Vec::with_capacity(n);
        for k in 0..n {
            let y = (PI * (k as f64 + 0.5) / n as f64).cos();
            let value = f(x0 + y * dx / 2.0);
            if value.len() != n_components {
                return Err(XephError::InvalidExpansion(format!(
                    "function returned {} components, expected {n_components}",
                    value.len()
                )));
            }
            samples.push(value);
        }

        let k = 2.0 / n as f64;
        let coefficients: Vec<Vec<f64>> = (0..n_components)
            .map(|i| {
                (0..n)
                    .map(|j| {
                        let s: f64 = samples
                            .iter()
                            .enumerate()
                            .map(|(m, y)| {
                                y[i] * (PI * j as f64 * (m as f64 + 0.5) / n as f64).cos()
                            })
                            .sum();
                        k * s
                    })
                    .collect()
            })
            .collect();

        Ok(ChebyshevExpansion {
            x0,
            dx,
            truncated: vec![n; n_components],
            coefficients,
        })
    }

    /// Build an expansion from precomputed coefficient series over `[a, b]`.
    ///
    /// Every series is used in full (no truncation).
    pub fn from_coefficients(
        coefficients: Vec<Vec<f64>>,
        a: f64,
        b: f64,
    ) -> Result<Self, XephError> {
        if coefficients.is_empty() || coefficients.len() > MAX_COMPONENTS {
            return Err(XephError::InvalidExpansion(format!(
                "unsupported expansion dimension ({})",
                coefficients.len()
            )));
        }
        if coefficients.iter().any(|c| c.is_empty()) {
            return Err(XephError::InvalidExpansion(
                "empty coefficient series".into(),
            ));
        }
        let dx = b - a;
        if !dx.is_finite() || 1.0 + dx == 1.0 {
            return Err(XephError::InvalidExpansion(
                "empty or insignificant approximation interval".into(),
            ));
        }
        Ok(ChebyshevExpansion {
            x0: (a + b) / 2.0,
            dx,
            truncated: coefficients.iter().map(Vec::len).collect(),
            coefficients,
        })
    }

    pub fn lower_bound(&self) -> f64 {
        self.x0 - self.dx / 2.0
    }

    pub fn upper_bound(&self) -> f64 {
        self.x0 + self.dx / 2.0
    }

    pub fn number_of_components(&self) -> usize {
        self.coefficients.len()
    }

    /// Length of the untruncated series (the longest component).
    pub fn length(&self) -> usize {
        self.coefficients.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Truncated length of component `i`.
    pub fn truncated_length(&self, i: usize) -> usize {
        self.truncated[i]
    }

    /// Total number of coefficients left after truncation, all components.
    pub fn number_of_truncated_coefficients(&self) -> usize {
        self.truncated.iter().sum()
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
            .iter()
            .zip(&self.coefficients)
            .any(|(m, c)| *m < c.len())
    }

    pub fn is_valid(&self) -> bool {
        !self.coefficients.is_empty()
            && self.dx.is_finite()
            && self.dx != 0.0
            && self.truncated.iter().all(|m| *m > 0)
    }

    /// Truncated coefficient series of component `i`.
    pub fn coefficients(&self, i: usize) -> &[f64] {
        &self.coefficients[i][..self.truncated[i]]
    }

    /// Upper bound of the error introduced by truncating component `i`.
    ///
    /// This is the sum of absolute values of the discarded coefficients, or
    /// the magnitude of the last coefficient when nothing was discarded.
    pub fn truncation_error(&self, i: usize) -> f64 {
        let c = &self.coefficients[i];
        let m = self.truncated[i];
        if m < c.len() {
            c[m..].iter().map(|x| x.abs()).sum()
        } else {
            c.last().map(|x| x.abs()).unwrap_or(0.0)
        }
    }

    /// Truncate every component to the shortest series whose discarded
    /// coefficients sum (in absolute value) below `e`.
    ///
    /// At least two coefficients are always kept for series that have them.
    ///
    /// Return
    /// ----------
    /// * `true` if every component has been effectively truncated.
    pub fn truncate(&mut self, e: f64) -> bool {
        let e = e.abs();
        let mut truncated_components = 0;
        for (c, m) in self.coefficients.iter().zip(self.truncated.iter_mut()) {
            let mut s = 0.0;
            *m = c.len();
            while *m > 2 {
                s += c[*m - 1].abs();
                if s >= e {
                    break;
                }
                *m -= 1;
            }
            if *m < c.len() {
                truncated_components += 1;
            }
        }
        truncated_components == self.coefficients.len()
    }

    /// Evaluate the truncated expansion at `x` (Clenshaw recurrence).
    pub fn evaluate(&self, x: f64) -> DVector<f64> {
        let y0 = 2.0 * (x - self.x0) / self.dx;
        let y2 = 2.0 * y0;
        DVector::from_iterator(
            self.coefficients.len(),
            self.coefficients
                .iter()
                .zip(&self.truncated)
                .map(|(c, &m)| {
                    let (mut d0, mut d1) = (0.0, 0.0);
                    for j in (1..m).rev() {
                        let d = d1;
                        d1 = y2 * d1 - d0 + c[j];
                        d0 = d;
                    }
                    y0 * d1 - d0 + c[0] / 2.0
                }),
        )
    }

    /// Analytic derivative of the truncated expansion, over the same interval.
    pub fn derivative(&self) -> ChebyshevExpansion {
        let scale = 2.0 / self.dx;
        let coefficients: Vec<Vec<f64>> = self
            .coefficients
            .iter()
            .zip(&self.truncated)
            .map(|(c, &m)| {
                if m < 2 {
                    return vec![0.0];
                }
                // The derivative of a degree n series has degree n - 1
                let n = m - 1;
                let mut d = vec![0.0; n];
                d[n - 1] = 2.0 * n as f64 * c[n];
                if n > 1 {
                    d[n - 2] = 2.0 * (n - 1) as f64 * c[n - 1];
                }
                for j in (0..n.saturating_sub(2)).rev() {
                    d[j] = d[j + 2] + 2.0 * (j + 1) as f64 * c[j + 1];
                }
                d.iter_mut().for_each(|x| *x *= scale);
                d
            })
            .collect();

        ChebyshevExpansion {
            x0: self.x0,
            dx: self.dx,
            truncated: coefficients.iter().map(Vec::len).collect(),
            coefficients,
        }
    }
}
