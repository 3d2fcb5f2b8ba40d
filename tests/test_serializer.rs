mod common;

use common::*;
use nalgebra::DVector;
use xeph::{
    chebyshev::ChebyshevExpansion,
    ephemeris::{
        EphemerisConstant, EphemerisFile, EphemerisMetadata, SerializableEphemerisData,
        SerializableEphemerisObjectData,
    },
    TimePoint, XephError,
};

fn serialize(
    path: &camino::Utf8Path,
    objects: &[SerializableEphemerisObjectData],
    constants: &[EphemerisConstant],
) -> Result<(), XephError> {
    EphemerisFile::serialize(
        path,
        start_time(),
        end_time(),
        objects,
        &EphemerisMetadata::default(),
        constants,
    )
}

fn is_invalid_data(result: Result<(), XephError>) -> bool {
    matches!(result, Err(XephError::InvalidSerializationData(_)))
}

#[test]
fn test_rejects_malformed_objects() {
    let dir = tempfile::tempdir().unwrap();
    let path = utf8(&dir, "rejected.xeph");

    assert!(is_invalid_data(serialize(&path, &[], &[])));

    let mut no_id = earth_object();
    no_id.object_id = "  ".into();
    assert!(is_invalid_data(serialize(&path, &[no_id], &[])));

    let mut same_ids = earth_object();
    same_ids.origin_id = "Ea".into();
    assert!(is_invalid_data(serialize(&path, &[same_ids], &[])));

    let mut no_data = earth_object();
    no_data.data[0].clear();
    assert!(is_invalid_data(serialize(&path, &[no_data], &[])));

    assert!(is_invalid_data(serialize(
        &path,
        &[earth_object(), earth_object()],
        &[]
    )));

    // Nothing has been written
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_rejects_non_contiguous_segments() {
    let dir = tempfile::tempdir().unwrap();
    let path = utf8(&dir, "rejected.xeph");

    // First segment does not start at the file start time
    let late = object(
        "Ea",
        "SSB",
        "",
        fit_segments(orbit, start_time() + 1.0, 14.0, 2, 5, 3),
        Vec::new(),
    );
    assert!(is_invalid_data(serialize(&path, &[late], &[])));

    // Unordered segments
    let mut unordered = earth_object();
    unordered.data[0].swap(0, 1);
    assert!(is_invalid_data(serialize(&path, &[unordered], &[])));

    // Repeated start time
    let mut repeated = earth_object();
    repeated.data[0][1].start_time = start_time();
    assert!(is_invalid_data(serialize(&path, &[repeated], &[])));

    // Last segment starting at the end of the time span
    let mut trailing = earth_object();
    let extra = SerializableEphemerisData::new(end_time(), trailing.data[0][1].expansion.clone());
    trailing.data[0].push(extra);
    assert!(is_invalid_data(serialize(&path, &[trailing], &[])));

    // Expansion interval not matching its segment
    let mut stretched = earth_object();
    stretched.data[0][0].expansion =
        ChebyshevExpansion::fit(orbit, 0.0, 10.0, 5, 3).unwrap();
    assert!(is_invalid_data(serialize(&path, &[stretched], &[])));

    assert!(!path.exists());
}

#[test]
fn test_rejects_incoherent_dimensions() {
    let dir = tempfile::tempdir().unwrap();
    let path = utf8(&dir, "rejected.xeph");

    let mut mixed = earth_object();
    mixed.data[0][1].expansion = ChebyshevExpansion::fit(
        |x| DVector::from_vec(vec![x, 2.0 * x]),
        0.0,
        7.5,
        5,
        2,
    )
    .unwrap();
    assert!(is_invalid_data(serialize(&path, &[mixed], &[])));

    let too_long = ChebyshevExpansion::from_coefficients(vec![vec![0.5; 300]], 0.0, 15.0).unwrap();
    let long = object(
        "Ea",
        "SSB",
        "",
        vec![SerializableEphemerisData::new(start_time(), too_long)],
        Vec::new(),
    );
    assert!(is_invalid_data(serialize(&path, &[long], &[])));
}

#[test]
fn test_rejects_bad_constants_and_spans() {
    let dir = tempfile::tempdir().unwrap();
    let path = utf8(&dir, "rejected.xeph");

    let duplicated = [
        EphemerisConstant::new("AU", 1.0),
        EphemerisConstant::new("au", 2.0),
    ];
    assert!(is_invalid_data(serialize(&path, &[earth_object()], &duplicated)));
    assert!(is_invalid_data(serialize(
        &path,
        &[earth_object()],
        &[EphemerisConstant::new(" ", 1.0)]
    )));
    assert!(is_invalid_data(serialize(
        &path,
        &[earth_object()],
        &[EphemerisConstant::new("A=B", 1.0)]
    )));

    assert!(is_invalid_data(EphemerisFile::serialize(
        &path,
        start_time(),
        start_time(),
        &[earth_object()],
        &EphemerisMetadata::default(),
        &[],
    )));
    assert!(is_invalid_data(EphemerisFile::serialize(
        "",
        start_time(),
        end_time(),
        &[earth_object()],
        &EphemerisMetadata::default(),
        &[],
    )));
}

#[test]
fn test_reversed_span_is_swapped() {
    let dir = tempfile::tempdir().unwrap();
    let path = utf8(&dir, "reversed.xeph");

    EphemerisFile::serialize(
        &path,
        end_time(),
        start_time(),
        &[earth_object()],
        &EphemerisMetadata::default(),
        &[],
    )
    .unwrap();

    let store = EphemerisFile::open_file(&path).unwrap();
    assert_eq!(store.start_time().unwrap(), start_time());
    assert_eq!(store.end_time().unwrap(), end_time());
    assert!(store.constants().unwrap().is_empty());
}

#[test]
fn test_failed_serialization_keeps_existing_file() {
    let (dir, path) = reference_store();

    let mut broken = earth_object();
    broken.data[0].swap(0, 1);
    assert!(is_invalid_data(serialize(&path, &[broken], &[])));

    let store = EphemerisFile::open_file(&path).unwrap();
    assert!(store.is_object_available("Ea", "SSB"));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_overwrite_and_truncated_expansions() {
    let (_dir, path) = reference_store();

    // Replace the reference store with a truncated, single-component object
    let mut expansion = ChebyshevExpansion::fit(
        |x| DVector::from_vec(vec![(x / 15.0).exp()]),
        0.0,
        15.0,
        30,
        1,
    )
    .unwrap();
    assert!(expansion.truncate(1e-12));
    let kept = expansion.truncated_length(0);
    assert!(kept < 30);

    let metadata = EphemerisMetadata {
        creation_time: Some(TimePoint::from_jd(2460000.5)),
        creator_application: "custom generator".into(),
        copyright: "Public domain".into(),
        ..Default::default()
    };
    EphemerisFile::serialize(
        &path,
        start_time(),
        end_time(),
        &[object(
            "TT",
            "TDB",
            "",
            vec![SerializableEphemerisData::new(start_time(), expansion.clone())],
            Vec::new(),
        )],
        &metadata,
        &[],
    )
    .unwrap();

    let store = EphemerisFile::open_file(&path).unwrap();
    assert!(!store.is_object_available("Ea", "SSB"));
    let read_back = store.metadata().unwrap();
    assert_eq!(read_back.creation_time, Some(TimePoint::from_jd(2460000.5)));
    assert_eq!(read_back.creator_application, "custom generator");
    assert_eq!(read_back.copyright, "Public domain");

    let mut handle = store.handle("TT", "TDB").unwrap();
    for i in 0..=30 {
        let x = 0.5 * i as f64;
        let value = handle.compute_state(start_time() + x).unwrap();
        assert_eq!(value.len(), 1);
        approx::assert_relative_eq!(value[0], expansion.evaluate(x)[0], epsilon = 1e-14);
        approx::assert_relative_eq!(value[0], (x / 15.0).exp(), epsilon = 1e-10);
    }
}

#[test]
fn test_rejects_unrepresentable_segment_starts() {
    let dir = tempfile::tempdir().unwrap();
    let path = utf8(&dir, "rejected.xeph");

    for start in [
        TimePoint::from_jd(-1.0e10),
        TimePoint::from_jd(1.0e10),
        TimePoint::new(i32::MIN, 0.0),
        TimePoint::new(i32::MAX, 0.5),
        TimePoint::new(0, f64::NAN),
    ] {
        let mut extreme = earth_object();
        extreme.data[0][1].start_time = start;
        assert!(
            is_invalid_data(serialize(&path, &[extreme], &[])),
            "second segment starting at {start}"
        );
    }

    let mut late_file = earth_object();
    late_file.data[0][0].start_time = TimePoint::new(i32::MAX, 0.0);
    assert!(is_invalid_data(EphemerisFile::serialize(
        &path,
        TimePoint::new(i32::MAX, 0.0),
        TimePoint::new(i32::MIN, 0.0),
        &[late_file],
        &EphemerisMetadata::default(),
        &[],
    )));

    assert!(!path.exists());
}
