//! Writing XEPH files.
//!
//! [`EphemerisFile::serialize`] builds a complete file from per-object lists
//! of contiguous Chebyshev expansions. Everything is validated before the
//! first byte is written, and the output goes to a temporary file in the
//! destination directory that only replaces `path` once fully written, so a
//! failed serialization never leaves a usable partial file behind.
//!
//! Output order: signature, XML header, every index node (objects in
//! `(object_id, origin_id)` order, function then derivative), then every
//! coefficient in the same order.
use std::{
    cmp::Ordering,
    io::{BufWriter, Write},
};

use camino::Utf8Path;
use hifitime::Epoch;
use itertools::Itertools;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::{
    chebyshev::ChebyshevExpansion,
    constants::{
        creator_os, default_creator_application, COEFFICIENT_SIZE, INDEX_NODE_SIZE,
        MAX_COEFFICIENTS, MAX_COMPONENTS, MAX_DERIVATIVE_ORDERS, SIGNATURE_SIZE,
        XEPH_HEADER_COMMENT, XEPH_VERSION,
    },
    time_point::TimePoint,
    xeph_errors::XephError,
};

use super::{
    constant::EphemerisConstant,
    ephemeris_file::EphemerisFile,
    index_node::IndexNode,
    metadata::EphemerisMetadata,
    signature::XephSignature,
    xml_header::{
        format_constant_value, IndexElement, MetadataElement, ObjectElement, TimeSpanElement,
        XephDocument,
    },
};

/// One Chebyshev expansion and the time it starts at.
///
/// The expansion must be defined over `[0, Δt]` days, where `Δt` is the
/// distance to the start of the next segment (or to the end of the file
/// time span for the last one). It is written truncated.
#[derive(Debug, Clone)]
pub struct SerializableEphemerisData {
    pub start_time: TimePoint,
    pub expansion: ChebyshevExpansion,
}

impl SerializableEphemerisData {
    pub fn new(start_time: TimePoint, expansion: ChebyshevExpansion) -> Self {
        SerializableEphemerisData {
            start_time,
            expansion,
        }
    }
}

/// Everything needed to write one object.
#[derive(Debug, Clone, Default)]
pub struct SerializableEphemerisObjectData {
    pub object_id: String,
    pub origin_id: String,
    pub object_name: String,
    pub object_description: String,
    pub h: Option<f64>,
    pub g: Option<f64>,
    pub b_v: Option<f64>,
    pub d: Option<f64>,
    /// Expansions of the function (0) and, optionally, its first derivative (1).
    pub data: [Vec<SerializableEphemerisData>; 2],
}

impl SerializableEphemerisObjectData {
    pub fn new(object_id: &str, origin_id: &str, object_name: &str) -> Self {
        SerializableEphemerisObjectData {
            object_id: object_id.to_string(),
            origin_id: origin_id.to_string(),
            object_name: object_name.to_string(),
            ..Default::default()
        }
    }
}

/// Validated, sorted view of one `(object, order)` list.
struct IndexPlan<'a> {
    order: usize,
    segments: &'a [SerializableEphemerisData],
    components: usize,
}

impl IndexPlan<'_> {
    fn coefficient_count(&self) -> usize {
        self.segments
            .iter()
            .map(|s| s.expansion.number_of_truncated_coefficients())
            .sum()
    }
}

struct ObjectPlan<'a> {
    object: &'a SerializableEphemerisObjectData,
    indexes: Vec<IndexPlan<'a>>,
}

impl EphemerisFile {
    /// Write a new XEPH file.
    ///
    /// Arguments
    /// -----------------
    /// * `path`: Destination file. Replaced atomically if it exists.
    /// * `start_time`, `end_time`: Time span covered by the file (swapped
    ///   when reversed).
    /// * `objects`: Data of every object. Within each expansion list, start
    ///   times must be strictly increasing, and the first one must equal
    ///   `start_time`.
    /// * `metadata`: Descriptive metadata. The creation time, creator OS and
    ///   creator application are filled in when left empty.
    /// * `constants`: Named constants. Names must be unique
    ///   (case-insensitively).
    ///
    /// Return
    /// ----------
    /// * [`XephError::InvalidSerializationData`] on malformed input, or an
    ///   I/O error while writing. The destination is untouched on failure.
    pub fn serialize(
        path: impl AsRef<Utf8Path>,
        start_time: TimePoint,
        end_time: TimePoint,
        objects: &[SerializableEphemerisObjectData],
        metadata: &EphemerisMetadata,
        constants: &[EphemerisConstant],
    ) -> Result<(), XephError> {
        let path = path.as_ref();
        if path.as_str().trim().is_empty() {
            return Err(invalid("empty file path"));
        }
        if objects.is_empty() {
            return Err(invalid("no ephemeris objects have been specified"));
        }
        if !start_time.is_valid() || !end_time.is_valid() {
            return Err(invalid("invalid file time span"));
        }
        let (start_time, end_time) = if end_time < start_time {
            (end_time, start_time)
        } else {
            (start_time, end_time)
        };
        if 1.0 + (end_time - start_time) == 1.0 {
            return Err(invalid("empty or insignificant file time span"));
        }

        let mut constants = constants.to_vec();
        constants.sort();
        if let Some(c) = constants.iter().find(|c| c.name.trim().is_empty()) {
            return Err(invalid(&format!("empty constant name (value {})", c.value)));
        }
        if let Some(c) = constants.iter().find(|c| c.name.contains([',', '='])) {
            return Err(invalid(&format!("invalid constant name '{}'", c.name)));
        }
        if let Some(w) = constants.windows(2).find(|w| w[0] == w[1]) {
            return Err(invalid(&format!("duplicate ephemeris constant '{}'", w[1].name)));
        }

        let plans = plan_objects(objects, start_time, end_time)?;

        let metadata = complete_metadata(metadata)?;
        let mut document = XephDocument {
            version: XEPH_VERSION.to_string(),
            metadata: Some(metadata_element(&metadata)),
            time_span: Some(TimeSpanElement {
                start: start_time.to_string(),
                end: end_time.to_string(),
            }),
            constants: (!constants.is_empty()).then(|| {
                constants
                    .iter()
                    .map(|c| format!("{}={}", c.name.trim(), format_constant_value(c.value)))
                    .join(",\n")
            }),
            objects: Vec::new(),
        };

        // Header positions depend on the header length: iterate until stable
        let mut header_length = 0usize;
        let header = loop {
            document.objects = object_elements(&plans, SIGNATURE_SIZE + header_length, end_time);
            let header = document.to_xml(XEPH_HEADER_COMMENT)?;
            match header.len().cmp(&header_length) {
                Ordering::Equal => break header,
                Ordering::Less => {
                    // Trailing whitespace after the root element keeps the length stable
                    let mut header = header;
                    header.extend(std::iter::repeat(' ').take(header_length - header.len()));
                    break header;
                }
                Ordering::Greater => header_length = header.len(),
            }
        };
        let header_length = u32::try_from(header.len())
            .map_err(|_| invalid("the XML header is too large"))?;

        let directory = match path.parent() {
            Some(dir) if !dir.as_str().is_empty() => dir,
            _ => Utf8Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(directory)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            writer.write_all(&XephSignature::new(header_length).to_bytes())?;
            writer.write_all(header.as_bytes())?;

            let mut position = (SIGNATURE_SIZE + header.len() + node_area_size(&plans)) as u64;
            for index in plans.iter().flat_map(|p| &p.indexes) {
                for segment in index.segments {
                    let node = IndexNode::new(
                        segment.start_time,
                        coefficient_counts(&segment.expansion),
                        position,
                    );
                    writer.write_all(&node.to_bytes())?;
                    position += (segment.expansion.number_of_truncated_coefficients()
                        * COEFFICIENT_SIZE) as u64;
                }
            }

            for index in plans.iter().flat_map(|p| &p.indexes) {
                for segment in index.segments {
                    let expansion = &segment.expansion;
                    for i in 0..expansion.number_of_components() {
                        for c in expansion.coefficients(i) {
                            writer.write_all(&c.to_le_bytes())?;
                        }
                    }
                }
            }
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| XephError::IoError(e.error))?;

        debug!(
            path = %path,
            objects = plans.len(),
            constants = constants.len(),
            header_length,
            "serialized XEPH file"
        );
        Ok(())
    }
}

fn invalid(message: &str) -> XephError {
    XephError::InvalidSerializationData(message.to_string())
}

/// Validate every object and sort them by `(object_id, origin_id)`.
fn plan_objects(
    objects: &[SerializableEphemerisObjectData],
    start_time: TimePoint,
    end_time: TimePoint,
) -> Result<Vec<ObjectPlan<'_>>, XephError> {
    let mut plans = Vec::with_capacity(objects.len());
    for object in objects {
        let id = object.object_id.trim();
        let origin = object.origin_id.trim();
        if id.is_empty() {
            return Err(invalid("empty object identifier"));
        }
        if origin.is_empty() {
            return Err(invalid(&format!("empty origin identifier for object '{id}'")));
        }
        if id == origin {
            return Err(invalid(&format!(
                "object and origin identifiers are equal: '{id}'"
            )));
        }
        if object.data[0].is_empty() {
            return Err(invalid(&format!(
                "no function expansions for object '{id}'"
            )));
        }

        let mut indexes = Vec::with_capacity(MAX_DERIVATIVE_ORDERS);
        for (order, segments) in object.data.iter().enumerate() {
            if segments.is_empty() {
                continue;
            }
            indexes.push(plan_index(id, order, segments, start_time, end_time)?);
        }
        plans.push(ObjectPlan { object, indexes });
    }

    plans.sort_by(|a, b| {
        (a.object.object_id.trim(), a.object.origin_id.trim())
            .cmp(&(b.object.object_id.trim(), b.object.origin_id.trim()))
    });
    if let Some(w) = plans.windows(2).find(|w| {
        w[0].object.object_id.trim() == w[1].object.object_id.trim()
            && w[0].object.origin_id.trim() == w[1].object.origin_id.trim()
    }) {
        return Err(invalid(&format!(
            "duplicate object '{}' with origin '{}'",
            w[1].object.object_id.trim(),
            w[1].object.origin_id.trim()
        )));
    }
    Ok(plans)
}

fn plan_index<'a>(
    id: &str,
    order: usize,
    segments: &'a [SerializableEphemerisData],
    start_time: TimePoint,
    end_time: TimePoint,
) -> Result<IndexPlan<'a>, XephError> {
    let components = segments[0].expansion.number_of_components();
    if components == 0 || components > MAX_COMPONENTS {
        return Err(invalid(&format!(
            "unsupported expansion dimension ({components}) for object '{id}'"
        )));
    }
    if segments[0].start_time != start_time {
        return Err(invalid(&format!(
            "first expansion of object '{id}' does not start at the file start time"
        )));
    }

    for (i, segment) in segments.iter().enumerate() {
        let expansion = &segment.expansion;
        if !segment.start_time.is_valid() || !expansion.is_valid() {
            return Err(invalid(&format!(
                "invalid expansion #{i} (order {order}) for object '{id}'"
            )));
        }
        if expansion.number_of_components() != components {
            return Err(invalid(&format!(
                "incoherent expansion dimensions for object '{id}'"
            )));
        }
        if (0..components).any(|c| expansion.truncated_length(c) > MAX_COEFFICIENTS) {
            return Err(invalid(&format!(
                "too many coefficients in expansion #{i} (order {order}) for object '{id}'"
            )));
        }

        let end = segments
            .get(i + 1)
            .map(|next| next.start_time)
            .unwrap_or(end_time);
        let span = end - segment.start_time;
        if span.is_nan() || span <= 0.0 || 1.0 + span == 1.0 {
            return Err(invalid(&format!(
                "unordered or insignificant expansion time spans for object '{id}'"
            )));
        }
        let width = expansion.upper_bound() - expansion.lower_bound();
        if (width - span).abs() > 1.0e-8 * span.max(1.0) {
            return Err(invalid(&format!(
                "expansion #{i} (order {order}) of object '{id}' spans {width} days, \
                 its segment spans {span} days"
            )));
        }
    }

    Ok(IndexPlan {
        order,
        segments,
        components,
    })
}

fn node_area_size(plans: &[ObjectPlan<'_>]) -> usize {
    plans
        .iter()
        .flat_map(|p| &p.indexes)
        .map(|index| index.segments.len() * INDEX_NODE_SIZE)
        .sum()
}

/// `<Object>` elements with index positions for a header of known size.
fn object_elements(
    plans: &[ObjectPlan<'_>],
    node_area_start: usize,
    end_time: TimePoint,
) -> Vec<ObjectElement> {
    let mut position = node_area_start as u64;
    plans
        .iter()
        .map(|plan| {
            let object = plan.object;
            let non_empty = |s: &str| {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            };
            let indexes = plan
                .indexes
                .iter()
                .map(|index| {
                    let element = index_element(index, position, end_time);
                    position += (index.segments.len() * INDEX_NODE_SIZE) as u64;
                    element
                })
                .collect();
            ObjectElement {
                id: object.object_id.trim().to_string(),
                origin: object.origin_id.trim().to_string(),
                name: non_empty(&object.object_name),
                h: object.h,
                g: object.g,
                b_v: object.b_v,
                d: object.d,
                description: non_empty(&object.object_description),
                indexes,
            }
        })
        .collect()
}

fn index_element(index: &IndexPlan<'_>, position: u64, end_time: TimePoint) -> IndexElement {
    let spans = index.segments.iter().enumerate().map(|(i, s)| {
        let end = index
            .segments
            .get(i + 1)
            .map(|next| next.start_time)
            .unwrap_or(end_time);
        end - s.start_time
    });
    let (smallest, largest) = spans
        .minmax_by(|a, b| a.total_cmp(b))
        .into_option()
        .unwrap_or((0.0, 0.0));
    let errors = (0..index.components)
        .map(|c| {
            let e = index
                .segments
                .iter()
                .map(|s| s.expansion.truncation_error(c))
                .fold(0.0, f64::max);
            format!("{e:.3e}")
        })
        .join(",");

    IndexElement {
        order: index.order as i64,
        position: Some(position),
        number_of_expansions: Some(index.segments.len() as i64),
        smallest_time_span: Some(smallest),
        largest_time_span: Some(largest),
        dimensions: Some(index.components),
        largest_truncation_errors: Some(errors),
        total_coefficients: Some(index.coefficient_count()),
    }
}

fn coefficient_counts(expansion: &ChebyshevExpansion) -> [u8; 4] {
    let mut n = [0u8; 4];
    for (i, count) in n.iter_mut().enumerate().take(expansion.number_of_components()) {
        // Bounded by MAX_COEFFICIENTS during validation
        *count = expansion.truncated_length(i) as u8;
    }
    n
}

fn complete_metadata(metadata: &EphemerisMetadata) -> Result<EphemerisMetadata, XephError> {
    let mut metadata = metadata.clone();
    if metadata.creation_time.is_none() {
        let now = Epoch::now().map_err(|e| XephError::InvalidTimePoint(e.to_string()))?;
        metadata.creation_time = Some(TimePoint::from(now));
    }
    if metadata.creator_os.trim().is_empty() {
        metadata.creator_os = creator_os().to_string();
    }
    if metadata.creator_application.trim().is_empty() {
        metadata.creator_application = default_creator_application();
    }
    Ok(metadata)
}

fn metadata_element(metadata: &EphemerisMetadata) -> MetadataElement {
    let text = |s: &str| {
        let s = s.trim();
        (!s.is_empty()).then(|| s.to_string())
    };
    MetadataElement {
        creation_time: metadata.creation_time.map(|t| t.to_string()),
        creator_os: text(&metadata.creator_os),
        creator_application: text(&metadata.creator_application),
        title: text(&metadata.title),
        brief_description: text(&metadata.brief_description),
        description: text(&metadata.description),
        organization_name: text(&metadata.organization_name),
        authors: text(&metadata.authors),
        copyright: text(&metadata.copyright),
    }
}
