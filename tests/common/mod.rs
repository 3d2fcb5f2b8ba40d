#![allow(dead_code)]

use std::f64::consts::TAU;

use camino::{Utf8Path, Utf8PathBuf};
use nalgebra::DVector;
use tempfile::TempDir;

use xeph::{
    chebyshev::ChebyshevExpansion,
    constants::{XEPH_FILE_SUFFIX, XEPH_MAGIC},
    ephemeris::{
        EphemerisConstant, EphemerisMetadata, SerializableEphemerisData,
        SerializableEphemerisObjectData,
    },
    EphemerisFile, TimePoint,
};

pub const START_JD: f64 = 2451545.0;
pub const END_JD: f64 = 2451560.0;

pub fn start_time() -> TimePoint {
    TimePoint::from_jd(START_JD)
}

pub fn end_time() -> TimePoint {
    TimePoint::from_jd(END_JD)
}

/// A smooth 3-D test trajectory, `t` in days from the file start.
pub fn orbit(t: f64) -> DVector<f64> {
    let w = TAU / 30.0;
    DVector::from_vec(vec![(w * t).cos(), (w * t).sin(), 0.01 * t])
}

/// Exact derivative of [`orbit`].
pub fn orbit_velocity(t: f64) -> DVector<f64> {
    let w = TAU / 30.0;
    DVector::from_vec(vec![-w * (w * t).sin(), w * (w * t).cos(), 0.01])
}

/// Fit `f` over `[start, start + total_days]` with `n_segments` contiguous
/// segments of `n` coefficients per component.
pub fn fit_segments<F>(
    f: F,
    start: TimePoint,
    total_days: f64,
    n_segments: usize,
    n: usize,
    n_components: usize,
) -> Vec<SerializableEphemerisData>
where
    F: Fn(f64) -> DVector<f64>,
{
    let length = total_days / n_segments as f64;
    (0..n_segments)
        .map(|k| {
            let offset = k as f64 * length;
            let expansion =
                ChebyshevExpansion::fit(|x| f(offset + x), 0.0, length, n, n_components)
                    .unwrap();
            SerializableEphemerisData::new(start + offset, expansion)
        })
        .collect()
}

pub fn object(
    id: &str,
    origin: &str,
    name: &str,
    function: Vec<SerializableEphemerisData>,
    derivative: Vec<SerializableEphemerisData>,
) -> SerializableEphemerisObjectData {
    let mut object = SerializableEphemerisObjectData::new(id, origin, name);
    object.data = [function, derivative];
    object
}

/// The reference store: object "Ea"/"SSB" with two 5-coefficient segments
/// split at 7.5 days.
pub fn earth_object() -> SerializableEphemerisObjectData {
    object(
        "Ea",
        "SSB",
        "Earth",
        fit_segments(orbit, start_time(), END_JD - START_JD, 2, 5, 3),
        Vec::new(),
    )
}

pub fn utf8(dir: &TempDir, name: &str) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().join(name)).unwrap()
}

pub fn write_store(path: &Utf8Path, objects: &[SerializableEphemerisObjectData]) {
    let metadata = EphemerisMetadata {
        title: "Synthetic test ephemerides".into(),
        authors: "XEPH test suite".into(),
        ..Default::default()
    };
    let constants = vec![
        EphemerisConstant::new("AU", 149597870.7),
        EphemerisConstant::new("EMRAT", 81.30056),
        EphemerisConstant::new("GMS", 2.959122082855911e-4),
    ];
    EphemerisFile::serialize(
        path,
        start_time(),
        end_time(),
        objects,
        &metadata,
        &constants,
    )
    .unwrap();
}

/// A temporary directory holding the reference store, and the store path.
pub fn reference_store() -> (TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = utf8(&dir, &format!("reference{XEPH_FILE_SUFFIX}"));
    write_store(&path, &[earth_object()]);
    (dir, path)
}

/// Raw XEPH bytes: signature, `header` verbatim, then `tail`.
pub fn raw_file(header: &str, tail: &[u8]) -> Vec<u8> {
    let mut bytes = XEPH_MAGIC.to_vec();
    bytes.extend_from_slice(&(header.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(header.as_bytes());
    bytes.extend_from_slice(tail);
    bytes
}
