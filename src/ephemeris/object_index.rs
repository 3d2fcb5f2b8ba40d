//! Per-object descriptors of an XEPH file.
//!
//! [`ObjectIndex`] is the in-memory form of one `<Object>` element plus its
//! binary index nodes. It is built once when a file is opened and never
//! modified afterwards. [`EphemerisObject`] is the public snapshot returned by
//! [`crate::ephemeris::EphemerisFile::objects`].
use std::cmp::Ordering;

use super::index_node::IndexNode;

/// Public description of an object available in an ephemeris file.
#[derive(Debug, Clone, PartialEq)]
pub struct EphemerisObject {
    /// Object identifier (mandatory, case-sensitive).
    pub object_id: String,
    /// Identifier of the origin of coordinates (mandatory, case-sensitive).
    pub origin_id: String,
    /// Object name (optional, case-insensitive).
    pub object_name: String,
    pub object_description: String,
    /// Absolute magnitude.
    pub h: Option<f64>,
    /// Slope parameter.
    pub g: Option<f64>,
    /// Color index B-V in magnitudes.
    pub b_v: Option<f64>,
    /// Diameter of the object in km.
    pub d: Option<f64>,
}

#[derive(Debug, Clone)]
pub(crate) struct ObjectIndex {
    pub(crate) object_id: String,
    pub(crate) origin_id: String,
    pub(crate) object_name: String,
    pub(crate) object_description: String,
    pub(crate) h: Option<f64>,
    pub(crate) g: Option<f64>,
    pub(crate) b_v: Option<f64>,
    pub(crate) d: Option<f64>,
    /// Expansion indexes: 0 = function, 1 = derivative.
    pub(crate) nodes: [Vec<IndexNode>; 2],
}

impl ObjectIndex {
    pub(crate) fn new(object_id: &str, origin_id: &str, object_name: &str) -> Self {
        ObjectIndex {
            object_id: object_id.trim().to_string(),
            origin_id: origin_id.trim().to_string(),
            object_name: object_name.trim().to_string(),
            object_description: String::new(),
            h: None,
            g: None,
            b_v: None,
            d: None,
            nodes: [Vec::new(), Vec::new()],
        }
    }

    pub(crate) fn has_derivative(&self) -> bool {
        !self.nodes[1].is_empty()
    }

    /// Ordering on the `(object_id, origin_id)` key, case-sensitive.
    pub(crate) fn cmp_key(&self, object_id: &str, origin_id: &str) -> Ordering {
        (self.object_id.as_str(), self.origin_id.as_str()).cmp(&(object_id, origin_id))
    }

    /// Case-insensitive comparison of the object name.
    pub(crate) fn name_matches(&self, name: &str) -> bool {
        !self.object_name.is_empty() && self.object_name.to_lowercase() == name.to_lowercase()
    }

    pub(crate) fn to_object(&self) -> EphemerisObject {
        EphemerisObject {
            object_id: self.object_id.clone(),
            origin_id: self.origin_id.clone(),
            object_name: self.object_name.clone(),
            object_description: self.object_description.clone(),
            h: self.h,
            g: self.g,
            b_v: self.b_v,
            d: self.d,
        }
    }
}
