//! Binary subspan descriptors and the time-segment locator.
//!
//! Every Chebyshev expansion stored in an XEPH file is described by one
//! [`IndexNode`] in the binary index area that follows the XML header.
//!
//! ## Node layout (24 bytes, little-endian)
//! 1. `jdi`: `i32`, integer Julian day of the segment start,
//! 2. `n`: `[u8; 4]`, coefficient count of each vector component
//!    (0 = absent; the first zero ends the active components),
//! 3. `jdf`: `f64`, fractional Julian day of the segment start,
//! 4. `position`: `u64`, byte offset of the first coefficient.
//!
//! The nodes of one object and derivative order are sorted by start time and
//! contiguous: the end of segment `i` is the start of segment `i + 1`, and the
//! end of the last segment is the end of the file time span.
use nom::{
    bytes::complete::take,
    number::complete::{le_f64, le_i32, le_u64},
    IResult, Parser,
};

use crate::{constants::INDEX_NODE_SIZE, time_point::TimePoint};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexNode {
    /// Integer Julian day of the segment start.
    pub jdi: i32,
    /// Number of Chebyshev coefficients of each component.
    pub n: [u8; 4],
    /// Fractional Julian day of the segment start.
    pub jdf: f64,
    /// File byte position of the first Chebyshev coefficient.
    pub position: u64,
}

impl IndexNode {
    pub fn new(start_time: TimePoint, n: [u8; 4], position: u64) -> Self {
        IndexNode {
            jdi: start_time.jdi(),
            n,
            jdf: start_time.jdf(),
            position,
        }
    }

    pub fn start_time(&self) -> TimePoint {
        TimePoint::new(self.jdi, self.jdf)
    }

    /// Number of active vector components (leading non-zero counts).
    pub fn number_of_components(&self) -> usize {
        self.n.iter().take_while(|&&k| k > 0).count()
    }

    /// Number of stored coefficients, all active components.
    pub fn number_of_coefficients(&self) -> usize {
        self.n
            .iter()
            .take_while(|&&k| k > 0)
            .map(|&k| k as usize)
            .sum()
    }

    /// Decode one node from its 24-byte serialized form.
    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, jdi) = le_i32(input)?;
        let (input, n) = take(4usize).parse(input)?;
        let (input, jdf) = le_f64(input)?;
        let (input, position) = le_u64(input)?;
        Ok((
            input,
            IndexNode {
                jdi,
                n: [n[0], n[1], n[2], n[3]],
                jdf,
                position,
            },
        ))
    }

    pub fn to_bytes(&self) -> [u8; INDEX_NODE_SIZE] {
        let mut bytes = [0u8; INDEX_NODE_SIZE];
        bytes[0..4].copy_from_slice(&self.jdi.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.n);
        bytes[8..16].copy_from_slice(&self.jdf.to_le_bytes());
        bytes[16..24].copy_from_slice(&self.position.to_le_bytes());
        bytes
    }
}

/// Locate the segment containing `t`.
///
/// Binary search for the rightmost node whose start time is `≤ t`. A time
/// equal to a segment boundary belongs to the segment starting there.
/// The upper bound of the last segment is not checked here: callers compare
/// `t` against the file end time first.
///
/// Return
/// ----------
/// * The node index, or `None` when `nodes` is empty or `t` precedes the
///   first segment.
pub fn find_node(nodes: &[IndexNode], t: TimePoint) -> Option<usize> {
    let n = nodes.len();
    if n == 0 || !t.is_valid() || t < nodes[0].start_time() {
        return None;
    }

    // Invariant: nodes[l].start_time() <= t
    let (mut l, mut r) = (0, n - 1);
    loop {
        let m = (l + r) / 2;
        if t < nodes[m].start_time() {
            r = m;
        } else if m == n - 1 || t < nodes[m + 1].start_time() {
            return Some(m);
        } else {
            l = m + 1;
        }
    }
}
