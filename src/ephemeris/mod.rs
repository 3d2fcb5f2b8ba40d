//! Indexed ephemeris store (XEPH files).
//!
//! * [`EphemerisFile`] – open a file, look up objects and constants.
//! * [`Handle`] – evaluate one object's state at arbitrary times.
//! * [`EphemerisFile::serialize`] – write a new file from Chebyshev expansions.
pub mod constant;
pub mod ephemeris_file;
pub mod handle;
pub mod index_node;
pub mod metadata;
pub mod object_index;
pub(crate) mod positioned_read;
pub mod serializer;
pub(crate) mod signature;
pub mod state_vector;
pub(crate) mod xml_header;

pub use constant::{EphemerisConstant, EphemerisConstantList};
pub use ephemeris_file::EphemerisFile;
pub use handle::Handle;
pub use index_node::IndexNode;
pub use metadata::EphemerisMetadata;
pub use object_index::EphemerisObject;
pub use serializer::{SerializableEphemerisData, SerializableEphemerisObjectData};
pub use state_vector::StateVector;
