//! Per-object evaluation cursors.
//!
//! A [`Handle`] binds one object of an [`EphemerisFile`] and evaluates its
//! Chebyshev expansions at arbitrary times. For each derivative order it
//! caches the segment loaded last; a file read only happens when a request
//! falls in a different segment, so stepping forward through time costs one
//! read per segment boundary and a polynomial evaluation otherwise.
//!
//! Handles are cheap, [`Send`], and meant to be owned by one thread each.
//! Any number of handles on different threads can share one store: segment
//! loads use positioned reads and never move a shared file cursor.
//!
//! When the object has no derivative expansions, velocities are obtained by
//! differentiating the cached function expansion analytically. The
//! derivative is cached too and recomputed whenever the function segment
//! changes.
use std::sync::Arc;

use nalgebra::DVector;
use nom::{multi::count, number::complete::le_f64, Parser};

use crate::{
    chebyshev::ChebyshevExpansion, constants::COEFFICIENT_SIZE, time_point::TimePoint,
    xeph_errors::XephError,
};

use super::{
    ephemeris_file::{EphemerisFile, OpenState},
    index_node::find_node,
    object_index::ObjectIndex,
    positioned_read::read_exact_at,
    state_vector::StateVector,
};

/// The segment cached for one derivative order.
#[derive(Debug, Clone, Default)]
struct NodeInfo {
    /// Index of the loaded segment.
    current: Option<usize>,
    start_time: TimePoint,
    end_time: TimePoint,
    /// Expansion over `[0, end_time - start_time]` days.
    expansion: Option<ChebyshevExpansion>,
}

impl NodeInfo {
    fn evaluate(&self, t: TimePoint) -> Result<DVector<f64>, XephError> {
        let expansion = self.expansion.as_ref().ok_or_else(|| {
            XephError::InvalidIndex("no expansion loaded for the requested time".into())
        })?;
        Ok(expansion.evaluate(t - self.start_time))
    }
}

/// Evaluation cursor for one object of an [`EphemerisFile`].
///
/// A live handle keeps its parent store alive and prevents it from being
/// closed or reopened. Cloning a handle creates a new, independent cursor
/// (with a copy of the cached segments) registered on the same store.
#[derive(Debug)]
pub struct Handle {
    parent: Arc<EphemerisFile>,
    state: Arc<OpenState>,
    index: usize,
    node: [NodeInfo; 2],
}

impl Handle {
    /// Create a handle for `object` relative to `origin`.
    ///
    /// Arguments
    /// -----------------
    /// * `parent`: An open store.
    /// * `object`: Object identifier (case-sensitive) or, failing that,
    ///   object name (case-insensitive).
    /// * `origin`: Origin identifier (case-sensitive). Empty to accept the
    ///   first object matching `object` whatever its origin.
    ///
    /// Return
    /// ----------
    /// * [`XephError::ClosedFile`] if the store is not open, or
    ///   [`XephError::UnknownObject`] if no object matches.
    pub fn new(parent: &Arc<EphemerisFile>, object: &str, origin: &str) -> Result<Self, XephError> {
        let state = parent.attach_handle()?;
        // From here on, dropping `handle` releases the counter
        let mut handle = Handle {
            parent: Arc::clone(parent),
            state,
            index: 0,
            node: Default::default(),
        };
        handle.index = handle.state.find_object(object, origin)?;
        Ok(handle)
    }

    fn object(&self) -> &ObjectIndex {
        &self.state.index[self.index]
    }

    /// Evaluate the function (e.g. position) at `t`.
    ///
    /// Return
    /// ----------
    /// * The function value, one element per vector component, or
    ///   [`XephError::InvalidTimePoint`] / [`XephError::TimeOutOfRange`] if
    ///   `t` cannot be evaluated.
    pub fn compute_state(&mut self, t: TimePoint) -> Result<DVector<f64>, XephError> {
        self.check_time(t)?;
        self.update(t, 0)?;
        self.node[0].evaluate(t)
    }

    /// Evaluate the function and its first derivative (e.g. position and
    /// velocity) at `t`.
    ///
    /// The derivative comes from the object's derivative expansions when the
    /// file provides them, and from the analytic derivative of the function
    /// expansion otherwise.
    pub fn compute_state_with_derivative(
        &mut self,
        t: TimePoint,
    ) -> Result<(DVector<f64>, DVector<f64>), XephError> {
        self.check_time(t)?;
        self.update(t, 0)?;
        let p = self.node[0].evaluate(t)?;

        if self.has_derivative() {
            self.update(t, 1)?;
        } else if self.node[1].current != self.node[0].current {
            let function = &self.node[0];
            self.node[1] = NodeInfo {
                current: function.current,
                start_time: function.start_time,
                end_time: function.end_time,
                expansion: function.expansion.as_ref().map(ChebyshevExpansion::derivative),
            };
        }
        let v = self.node[1].evaluate(t)?;
        Ok((p, v))
    }

    /// [`Self::compute_state`] as a [`StateVector`] without velocity.
    pub fn state_vector(&mut self, t: TimePoint) -> Result<StateVector, XephError> {
        Ok(StateVector {
            position: self.compute_state(t)?,
            velocity: None,
        })
    }

    /// [`Self::compute_state_with_derivative`] as a [`StateVector`].
    pub fn state_vectors(&mut self, t: TimePoint) -> Result<StateVector, XephError> {
        let (position, velocity) = self.compute_state_with_derivative(t)?;
        Ok(StateVector {
            position,
            velocity: Some(velocity),
        })
    }

    fn check_time(&self, t: TimePoint) -> Result<(), XephError> {
        if !t.is_valid() {
            return Err(XephError::InvalidTimePoint(t.to_string()));
        }
        if t < self.state.start_time || t > self.state.end_time {
            return Err(self.out_of_range(t));
        }
        Ok(())
    }

    fn out_of_range(&self, t: TimePoint) -> XephError {
        XephError::TimeOutOfRange {
            time: t.to_string(),
            start: self.state.start_time.to_string(),
            end: self.state.end_time.to_string(),
        }
    }

    /// Make sure the segment of derivative order `order` containing `t` is
    /// loaded.
    fn update(&mut self, t: TimePoint, order: usize) -> Result<(), XephError> {
        let state = Arc::clone(&self.state);
        let nodes = &state.index[self.index].nodes[order];
        let i = find_node(nodes, t).ok_or_else(|| self.out_of_range(t))?;
        if self.node[order].current == Some(i) {
            return Ok(());
        }

        let node = &nodes[i];
        let start_time = node.start_time();
        let end_time = nodes
            .get(i + 1)
            .map(|next| next.start_time())
            .unwrap_or(state.end_time);

        let n = node.number_of_coefficients();
        let mut buffer = vec![0u8; n * COEFFICIENT_SIZE];
        read_exact_at(&state.file, &mut buffer, node.position)?;
        let (_, values) = count(le_f64, n)
            .parse(buffer.as_slice())
            .map_err(|e: nom::Err<nom::error::Error<&[u8]>>| XephError::NomParsingError(e.to_string()))?;

        let mut coefficients = Vec::with_capacity(node.number_of_components());
        let mut rest = values.as_slice();
        for &k in node.n.iter().take_while(|&&k| k > 0) {
            let (component, tail) = rest.split_at(k as usize);
            coefficients.push(component.to_vec());
            rest = tail;
        }

        let expansion = ChebyshevExpansion::from_coefficients(coefficients, 0.0, end_time - start_time)?;
        self.node[order] = NodeInfo {
            current: Some(i),
            start_time,
            end_time,
            expansion: Some(expansion),
        };
        Ok(())
    }

    pub fn object_id(&self) -> &str {
        &self.object().object_id
    }

    pub fn origin_id(&self) -> &str {
        &self.object().origin_id
    }

    pub fn object_name(&self) -> &str {
        &self.object().object_name
    }

    pub fn object_description(&self) -> &str {
        &self.object().object_description
    }

    /// Whether the file provides expansions for the first derivative.
    pub fn has_derivative(&self) -> bool {
        self.object().has_derivative()
    }

    /// Absolute magnitude.
    pub fn h(&self) -> Option<f64> {
        self.object().h
    }

    /// Slope parameter.
    pub fn g(&self) -> Option<f64> {
        self.object().g
    }

    /// Color index B-V.
    pub fn b_v(&self) -> Option<f64> {
        self.object().b_v
    }

    /// Diameter in km.
    pub fn d(&self) -> Option<f64> {
        self.object().d
    }

    /// Start of the segment currently loaded for derivative order `order`
    /// (0 or 1), or `None` when nothing is loaded yet.
    pub fn start_time(&self, order: usize) -> Option<TimePoint> {
        let node = self.node.get(order)?;
        node.current.map(|_| node.start_time)
    }

    /// End of the segment currently loaded for derivative order `order`.
    pub fn end_time(&self, order: usize) -> Option<TimePoint> {
        let node = self.node.get(order)?;
        node.current.map(|_| node.end_time)
    }

    pub fn parent_file(&self) -> &Arc<EphemerisFile> {
        &self.parent
    }
}

impl Clone for Handle {
    fn clone(&self) -> Self {
        self.parent.retain_handle();
        Handle {
            parent: Arc::clone(&self.parent),
            state: Arc::clone(&self.state),
            index: self.index,
            node: self.node.clone(),
        }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.parent.release_handle();
    }
}
