//! The XEPH ephemeris store.
//!
//! An [`EphemerisFile`] owns an open XEPH file and everything decoded from
//! its header: the global time span, the name-sorted constants, the metadata
//! and the sorted collection of object indexes. Coefficients stay on disk and
//! are read on demand by [`Handle`]s.
//!
//! # File layout
//! 1. 16-byte binary signature ([`super::signature`]),
//! 2. XML header ([`super::xml_header`]),
//! 3. binary index nodes, 24 bytes each ([`IndexNode`]),
//! 4. Chebyshev coefficients as little-endian `f64`.
//!
//! # Lifetime model
//! A store is shared through an [`Arc`]. Every live [`Handle`] bumps an atomic
//! counter on its parent store; [`EphemerisFile::open`] and
//! [`EphemerisFile::close`] refuse to run while that counter is non-zero, so
//! the decoded state a handle points to can never be replaced under it.
//! After a successful open the decoded state is immutable and read
//! concurrently by all handles.
//!
//! See also
//! ------------
//! * [`Handle`] – per-object evaluation cursor.
//! * [`EphemerisFile::serialize`] – write a new store file.
use std::{
    fs::File,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
    },
};

use camino::{Utf8Path, Utf8PathBuf};
use nom::{multi::count, Parser};
use tracing::debug;

use crate::{
    constants::{
        COEFFICIENT_SIZE, INDEX_NODE_SIZE, MAX_DERIVATIVE_ORDERS, SIGNATURE_SIZE, XEPH_VERSION,
    },
    time_point::TimePoint,
    xeph_errors::XephError,
};

use super::{
    constant::{find_constant, EphemerisConstant, EphemerisConstantList},
    handle::Handle,
    index_node::IndexNode,
    metadata::EphemerisMetadata,
    object_index::{EphemerisObject, ObjectIndex},
    positioned_read::read_exact_at,
    signature::XephSignature,
    xml_header::{parse_constants, IndexElement, MetadataElement, ObjectElement, XephDocument},
};

/// Everything decoded from an open XEPH file.
#[derive(Debug)]
pub(crate) struct OpenState {
    pub(crate) file: File,
    pub(crate) file_path: Utf8PathBuf,
    pub(crate) start_time: TimePoint,
    pub(crate) end_time: TimePoint,
    pub(crate) metadata: EphemerisMetadata,
    pub(crate) constants: EphemerisConstantList,
    /// Sorted by `(object_id, origin_id)`.
    pub(crate) index: Vec<ObjectIndex>,
}

/// An indexed ephemeris store.
///
/// Typical use:
///
/// ```no_run
/// use xeph::ephemeris::EphemerisFile;
/// use xeph::time_point::TimePoint;
///
/// let store = EphemerisFile::open_file("DE440.xeph")?;
/// let mut earth = store.handle("Ea", "SSB")?;
/// let (p, v) = earth.compute_state_with_derivative(TimePoint::from_jd(2451545.0))?;
/// # Ok::<(), xeph::xeph_errors::XephError>(())
/// ```
#[derive(Debug, Default)]
pub struct EphemerisFile {
    state: RwLock<Option<Arc<OpenState>>>,
    handle_count: AtomicUsize,
}

impl EphemerisFile {
    /// A closed store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared store and open `path` in it.
    pub fn open_file(path: impl AsRef<Utf8Path>) -> Result<Arc<Self>, XephError> {
        let store = Arc::new(Self::new());
        store.open(path)?;
        Ok(store)
    }

    /// Open an XEPH file, replacing the current contents of this store.
    ///
    /// The new file is fully read and validated before the previous state is
    /// released: on failure the store is left exactly as it was.
    ///
    /// Return
    /// ----------
    /// * [`XephError::ActiveHandles`] if handles are alive on this store, or
    ///   any I/O or format error found while reading the file.
    pub fn open(&self, path: impl AsRef<Utf8Path>) -> Result<(), XephError> {
        let mut guard = self.write_state();
        let n = self.handle_count.load(Ordering::Acquire);
        if n > 0 {
            return Err(XephError::ActiveHandles(n));
        }

        let state = OpenState::read(path.as_ref())?;
        debug!(
            path = %state.file_path,
            objects = state.index.len(),
            constants = state.constants.len(),
            start = %state.start_time,
            end = %state.end_time,
            "opened XEPH file"
        );
        *guard = Some(Arc::new(state));
        Ok(())
    }

    /// Release the file and all decoded structures.
    ///
    /// Closing a closed store does nothing.
    pub fn close(&self) -> Result<(), XephError> {
        let mut guard = self.write_state();
        let n = self.handle_count.load(Ordering::Acquire);
        if n > 0 {
            return Err(XephError::ActiveHandles(n));
        }
        if let Some(state) = guard.take() {
            debug!(path = %state.file_path, "closed XEPH file");
        }
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.read_state().is_some()
    }

    /// Number of live [`Handle`]s on this store.
    pub fn number_of_handles(&self) -> usize {
        self.handle_count.load(Ordering::Acquire)
    }

    /// Create an evaluation handle for `object` relative to `origin`.
    ///
    /// See [`Handle::new`].
    pub fn handle(self: &Arc<Self>, object: &str, origin: &str) -> Result<Handle, XephError> {
        Handle::new(self, object, origin)
    }

    pub fn file_path(&self) -> Result<Utf8PathBuf, XephError> {
        Ok(self.current()?.file_path.clone())
    }

    /// Start of the time span covered by this file.
    pub fn start_time(&self) -> Result<TimePoint, XephError> {
        Ok(self.current()?.start_time)
    }

    /// End of the time span covered by this file.
    pub fn end_time(&self) -> Result<TimePoint, XephError> {
        Ok(self.current()?.end_time)
    }

    pub fn metadata(&self) -> Result<EphemerisMetadata, XephError> {
        Ok(self.current()?.metadata.clone())
    }

    /// All constants of this file, sorted by name.
    pub fn constants(&self) -> Result<EphemerisConstantList, XephError> {
        Ok(self.current()?.constants.clone())
    }

    /// Value of a named constant. Names are case-insensitive.
    pub fn constant_value(&self, name: &str) -> Result<f64, XephError> {
        let state = self.current()?;
        find_constant(&state.constants, name)
            .map(|c| c.value)
            .ok_or_else(|| XephError::UnknownConstant(name.to_string()))
    }

    pub fn is_constant_available(&self, name: &str) -> bool {
        self.read_state()
            .as_ref()
            .is_some_and(|state| find_constant(&state.constants, name).is_some())
    }

    /// Snapshot of every object available in this file, sorted by
    /// `(object_id, origin_id)`.
    pub fn objects(&self) -> Result<Vec<EphemerisObject>, XephError> {
        Ok(self
            .current()?
            .index
            .iter()
            .map(ObjectIndex::to_object)
            .collect())
    }

    /// Whether `object` (an identifier or a name) is available relative to
    /// `origin`. An empty `origin` matches any origin.
    pub fn is_object_available(&self, object: &str, origin: &str) -> bool {
        self.read_state()
            .as_ref()
            .is_some_and(|state| state.find_object(object, origin).is_ok())
    }

    /// Name of an object, empty when the file does not define one.
    pub fn object_name(&self, object: &str, origin: &str) -> Result<String, XephError> {
        let state = self.current()?;
        let i = state.find_object(object, origin)?;
        Ok(state.index[i].object_name.clone())
    }

    /// Increment the handle counter while the open state is read-locked.
    ///
    /// Holding the read lock while incrementing orders this against a
    /// concurrent `open`/`close`, which hold the write lock when they check
    /// the counter.
    pub(crate) fn attach_handle(&self) -> Result<Arc<OpenState>, XephError> {
        let guard = self.read_state();
        let state = guard.as_ref().ok_or(XephError::ClosedFile)?;
        self.handle_count.fetch_add(1, Ordering::AcqRel);
        Ok(Arc::clone(state))
    }

    /// Increment the handle counter on behalf of a cloned handle.
    pub(crate) fn retain_handle(&self) {
        self.handle_count.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn release_handle(&self) {
        self.handle_count.fetch_sub(1, Ordering::AcqRel);
    }

    fn current(&self) -> Result<Arc<OpenState>, XephError> {
        self.read_state()
            .as_ref()
            .map(Arc::clone)
            .ok_or(XephError::ClosedFile)
    }

    fn read_state(&self) -> RwLockReadGuard<'_, Option<Arc<OpenState>>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, Option<Arc<OpenState>>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl OpenState {
    /// Read and validate the signature, header and index of an XEPH file.
    fn read(path: &Utf8Path) -> Result<Self, XephError> {
        let file = File::open(path)?;
        let file_size = file.metadata()?.len();

        if file_size < SIGNATURE_SIZE as u64 {
            return Err(XephError::InvalidSignature("file too short".into()));
        }
        let mut buffer = [0u8; SIGNATURE_SIZE];
        read_exact_at(&file, &mut buffer, 0)?;
        let (_, signature) = XephSignature::parse(&buffer)
            .map_err(|e| XephError::NomParsingError(e.to_string()))?;
        signature.validate()?;

        let min_position = SIGNATURE_SIZE as u64 + signature.header_length as u64;
        if min_position > file_size {
            return Err(XephError::InvalidHeader("truncated header".into()));
        }
        let mut header = vec![0u8; signature.header_length as usize];
        read_exact_at(&file, &mut header, SIGNATURE_SIZE as u64)?;
        let text = String::from_utf8(header)
            .map_err(|_| XephError::InvalidHeader("header is not valid UTF-8".into()))?;
        let document = XephDocument::parse(text.trim_end_matches(['\0', ' ', '\n', '\r', '\t']))?;

        if document.version != XEPH_VERSION {
            return Err(XephError::UnsupportedVersion(document.version));
        }

        let span = document
            .time_span
            .as_ref()
            .ok_or_else(|| XephError::InvalidHeader("missing TimeSpan element".into()))?;
        let mut start_time: TimePoint = span.start.parse()?;
        let mut end_time: TimePoint = span.end.parse()?;
        if end_time < start_time {
            std::mem::swap(&mut start_time, &mut end_time);
        }
        if 1.0 + (end_time - start_time) == 1.0 {
            return Err(XephError::InvalidHeader(
                "empty or insignificant time span".into(),
            ));
        }

        let metadata = document
            .metadata
            .as_ref()
            .map(metadata_from_element)
            .transpose()?
            .unwrap_or_default();

        let mut constants: EphemerisConstantList = match document.constants.as_deref() {
            Some(text) => parse_constants(text)?
                .into_iter()
                .map(|(name, value)| EphemerisConstant::new(name, value))
                .collect(),
            None => Vec::new(),
        };
        constants.sort();
        if let Some(w) = constants.windows(2).find(|w| w[0] == w[1]) {
            return Err(XephError::InvalidHeader(format!(
                "duplicate ephemeris constant '{}'",
                w[1].name
            )));
        }

        let layout = Layout {
            file: &file,
            file_size,
            min_position,
            start_time,
            end_time,
        };
        let mut index = document
            .objects
            .iter()
            .map(|element| layout.object_index(element))
            .collect::<Result<Vec<_>, _>>()?;
        if index.is_empty() {
            return Err(XephError::InvalidHeader(
                "no ephemeris objects have been defined".into(),
            ));
        }
        index.sort_by(|a, b| a.cmp_key(&b.object_id, &b.origin_id));
        if let Some(w) = index
            .windows(2)
            .find(|w| w[0].cmp_key(&w[1].object_id, &w[1].origin_id).is_eq())
        {
            return Err(XephError::InvalidHeader(format!(
                "duplicate object '{}' with origin '{}'",
                w[1].object_id, w[1].origin_id
            )));
        }

        Ok(OpenState {
            file,
            file_path: path.to_path_buf(),
            start_time,
            end_time,
            metadata,
            constants,
            index,
        })
    }

    /// Locate an object by identifier, then by name.
    ///
    /// 1. With an empty `origin`, the first object whose identifier equals
    ///    `object`; otherwise the object keyed exactly by `(object, origin)`.
    ///    Both comparisons are case-sensitive.
    /// 2. Failing that, the first object whose name equals `object`
    ///    case-insensitively, restricted to `origin` when one is given.
    pub(crate) fn find_object(&self, object: &str, origin: &str) -> Result<usize, XephError> {
        let object = object.trim();
        let origin = origin.trim();

        let by_id = if origin.is_empty() {
            let i = self
                .index
                .partition_point(|o| o.object_id.as_str() < object);
            (i < self.index.len() && self.index[i].object_id == object).then_some(i)
        } else {
            self.index
                .binary_search_by(|o| o.cmp_key(object, origin))
                .ok()
        };

        by_id
            .or_else(|| {
                self.index.iter().position(|o| {
                    (origin.is_empty() || o.origin_id == origin) && o.name_matches(object)
                })
            })
            .ok_or_else(|| XephError::UnknownObject {
                object: object.to_string(),
                origin: origin.to_string(),
            })
    }
}

/// File geometry used to validate the index of every object.
struct Layout<'a> {
    file: &'a File,
    file_size: u64,
    min_position: u64,
    start_time: TimePoint,
    end_time: TimePoint,
}

impl Layout<'_> {
    fn object_index(&self, element: &ObjectElement) -> Result<ObjectIndex, XephError> {
        let mut object = ObjectIndex::new(
            &element.id,
            &element.origin,
            element.name.as_deref().unwrap_or_default(),
        );
        if object.object_id.is_empty() {
            return Err(XephError::InvalidHeader(
                "missing or empty object identifier".into(),
            ));
        }
        if object.origin_id.is_empty() {
            return Err(XephError::InvalidHeader(format!(
                "missing or empty origin identifier for object '{}'",
                object.object_id
            )));
        }
        if object.object_id == object.origin_id {
            return Err(XephError::InvalidHeader(format!(
                "object and origin identifiers are equal: '{}'",
                object.object_id
            )));
        }
        object.object_description = element
            .description
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        object.h = element.h;
        object.g = element.g;
        object.b_v = element.b_v;
        object.d = element.d;

        for index in &element.indexes {
            let order = usize::try_from(index.order)
                .ok()
                .filter(|&o| o < MAX_DERIVATIVE_ORDERS)
                .ok_or_else(|| {
                    XephError::InvalidIndex(format!(
                        "invalid derivative order {} for object '{}'",
                        index.order, object.object_id
                    ))
                })?;
            if !object.nodes[order].is_empty() {
                return Err(XephError::InvalidIndex(format!(
                    "duplicate index of order {order} for object '{}'",
                    object.object_id
                )));
            }
            object.nodes[order] = self.index_nodes(index, &object.object_id)?;
        }

        if object.nodes[0].is_empty() {
            return Err(XephError::InvalidIndex(format!(
                "missing function index for object '{}'",
                object.object_id
            )));
        }
        Ok(object)
    }

    fn index_nodes(&self, index: &IndexElement, object_id: &str) -> Result<Vec<IndexNode>, XephError> {
        let invalid = |what: &str| XephError::InvalidIndex(format!("{what} for object '{object_id}'"));

        let position = index
            .position
            .ok_or_else(|| invalid("missing index position"))?;
        let n = index
            .number_of_expansions
            .and_then(|n| usize::try_from(n).ok())
            .filter(|&n| n > 0)
            .ok_or_else(|| invalid("missing or invalid number of expansions"))?;

        let size = n
            .checked_mul(INDEX_NODE_SIZE)
            .ok_or_else(|| invalid("index position out of range"))?;
        if position < self.min_position || position.saturating_add(size as u64) > self.file_size {
            return Err(invalid("index position out of range"));
        }

        let mut buffer = vec![0u8; size];
        read_exact_at(self.file, &mut buffer, position)?;
        let (_, nodes) = count(IndexNode::parse, n)
            .parse(buffer.as_slice())
            .map_err(|e| XephError::NomParsingError(e.to_string()))?;

        if nodes.iter().any(|node| !node.start_time().is_valid()) {
            return Err(invalid("invalid expansion start time"));
        }
        if nodes[0].start_time() != self.start_time {
            return Err(invalid("first expansion does not start at the file start time"));
        }
        if nodes[n - 1].start_time() >= self.end_time {
            return Err(invalid("last expansion starts at or after the file end time"));
        }

        let components = nodes[0].number_of_components();
        for (i, node) in nodes.iter().enumerate() {
            if node.number_of_components() != components || components == 0 {
                return Err(invalid("incoherent expansion dimensions"));
            }
            let coefficients = (node.number_of_coefficients() * COEFFICIENT_SIZE) as u64;
            if node.position < self.min_position
                || node.position.saturating_add(coefficients) > self.file_size
            {
                return Err(invalid("coefficient position out of range"));
            }
            if i > 0 {
                let span = node.start_time() - nodes[i - 1].start_time();
                if span.is_nan() || span <= 0.0 || 1.0 + span == 1.0 {
                    return Err(invalid("unordered or insignificant expansion time spans"));
                }
            }
        }
        Ok(nodes)
    }
}

fn metadata_from_element(element: &MetadataElement) -> Result<EphemerisMetadata, XephError> {
    let text = |value: &Option<String>| value.as_deref().map(str::trim).unwrap_or_default().to_string();
    let creation_time = match element.creation_time.as_deref().map(str::trim) {
        Some(t) if !t.is_empty() => Some(t.parse::<TimePoint>()?),
        _ => None,
    };
    Ok(EphemerisMetadata {
        creation_time,
        creator_os: text(&element.creator_os),
        creator_application: text(&element.creator_application),
        title: text(&element.title),
        brief_description: text(&element.brief_description),
        description: text(&element.description),
        organization_name: text(&element.organization_name),
        authors: text(&element.authors),
        copyright: text(&element.copyright),
    })
}
