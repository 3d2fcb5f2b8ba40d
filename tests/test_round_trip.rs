mod common;

use approx::assert_relative_eq;
use common::*;
use xeph::{
    ephemeris::{EphemerisFile, SerializableEphemerisData},
    TimePoint, XephError,
};

/// The segment of `data` containing `t`, evaluated directly.
fn direct_evaluation(data: &[SerializableEphemerisData], t: TimePoint) -> nalgebra::DVector<f64> {
    let k = data
        .iter()
        .rposition(|s| s.start_time <= t)
        .expect("t before the first segment");
    data[k].expansion.evaluate(t - data[k].start_time)
}

fn direct_derivative(data: &[SerializableEphemerisData], t: TimePoint) -> nalgebra::DVector<f64> {
    let k = data
        .iter()
        .rposition(|s| s.start_time <= t)
        .expect("t before the first segment");
    data[k].expansion.derivative().evaluate(t - data[k].start_time)
}

#[test]
fn test_round_trip_function_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = utf8(&dir, "round_trip.xeph");
    let function = fit_segments(orbit, start_time(), END_JD - START_JD, 6, 12, 3);
    write_store(
        &path,
        &[object("Ma", "SSB", "Mars", function.clone(), Vec::new())],
    );

    let store = EphemerisFile::open_file(&path).unwrap();
    assert_eq!(store.start_time().unwrap(), start_time());
    assert_eq!(store.end_time().unwrap(), end_time());
    let mut handle = store.handle("Ma", "SSB").unwrap();

    // Every boundary, plus interior points of every segment
    let mut times: Vec<TimePoint> = function.iter().map(|s| s.start_time).collect();
    times.extend((0..=120).map(|i| start_time() + 0.125 * i as f64));
    times.push(end_time() - 1e-9);
    times.push(end_time());

    for t in times {
        let p = handle.compute_state(t).unwrap();
        assert_eq!(p.len(), 3);
        assert_relative_eq!(p, direct_evaluation(&function, t), epsilon = 1e-12);
        assert_relative_eq!(p, orbit(t - start_time()), epsilon = 1e-6);
    }
}

#[test]
fn test_reference_scenario_segment_selection() {
    let (_dir, path) = reference_store();
    let store = EphemerisFile::open_file(&path).unwrap();
    let mut earth = store.handle("Ea", "SSB").unwrap();

    assert_eq!(earth.start_time(0), None);

    let boundary = TimePoint::from_jd(START_JD + 7.5);
    earth.compute_state(boundary).unwrap();
    assert_eq!(earth.start_time(0), Some(boundary));
    assert_eq!(earth.end_time(0), Some(end_time()));

    earth.compute_state(boundary - 1e-6).unwrap();
    assert_eq!(earth.start_time(0), Some(start_time()));
    assert_eq!(earth.end_time(0), Some(boundary));

    // The last segment is closed on the right
    earth.compute_state(end_time()).unwrap();
    assert_eq!(earth.start_time(0), Some(boundary));

    let before = start_time() - 0.001;
    assert!(matches!(
        earth.compute_state(before),
        Err(XephError::TimeOutOfRange { .. })
    ));
    assert!(matches!(
        earth.compute_state(end_time() + 0.001),
        Err(XephError::TimeOutOfRange { .. })
    ));
    assert!(matches!(
        earth.compute_state(TimePoint::invalid()),
        Err(XephError::InvalidTimePoint(_))
    ));
}

#[test]
fn test_analytic_derivative_fallback() {
    let (_dir, path) = reference_store();
    let function = earth_object().data[0].clone();

    let store = EphemerisFile::open_file(&path).unwrap();
    let mut earth = store.handle("Ea", "SSB").unwrap();
    assert!(!earth.has_derivative());

    // Cross the segment boundary back and forth: the cached derivative must follow
    for days in [1.0, 3.25, 7.5, 11.0, 2.0, 14.999, 7.4999, 0.0, 15.0] {
        let t = start_time() + days;
        let (p, v) = earth.compute_state_with_derivative(t).unwrap();
        assert_relative_eq!(p, direct_evaluation(&function, t), epsilon = 1e-12);
        assert_relative_eq!(v, direct_derivative(&function, t), epsilon = 1e-12);
        assert_relative_eq!(v, orbit_velocity(t - start_time()), epsilon = 1e-2);
        assert_eq!(earth.start_time(1), earth.start_time(0));
        assert_eq!(earth.end_time(1), earth.end_time(0));
    }

    let state = earth.state_vectors(start_time() + 5.0).unwrap();
    assert!(state.velocity.is_some());
    let state = earth.state_vector(start_time() + 5.0).unwrap();
    assert!(state.velocity.is_none());
}

#[test]
fn test_native_derivative_segments() {
    let dir = tempfile::tempdir().unwrap();
    let path = utf8(&dir, "native_derivative.xeph");
    let function = fit_segments(orbit, start_time(), END_JD - START_JD, 2, 10, 3);
    let derivative = fit_segments(orbit_velocity, start_time(), END_JD - START_JD, 3, 10, 3);
    write_store(
        &path,
        &[object("Mo", "Ea", "Moon", function.clone(), derivative.clone())],
    );

    let store = EphemerisFile::open_file(&path).unwrap();
    let mut moon = store.handle("Mo", "Ea").unwrap();
    assert!(moon.has_derivative());

    let t = start_time() + 6.0;
    let (p, v) = moon.compute_state_with_derivative(t).unwrap();
    assert_relative_eq!(p, direct_evaluation(&function, t), epsilon = 1e-12);
    assert_relative_eq!(v, direct_evaluation(&derivative, t), epsilon = 1e-12);

    // Function and derivative are segmented independently
    assert_eq!(moon.start_time(0), Some(start_time()));
    assert_eq!(moon.start_time(1), Some(start_time() + 5.0));
    assert_eq!(moon.end_time(1), Some(start_time() + 10.0));
}

#[test]
fn test_constants_and_metadata() {
    let (_dir, path) = reference_store();
    let store = EphemerisFile::open_file(&path).unwrap();

    assert_eq!(store.constant_value("AU").unwrap(), 149597870.7);
    assert_eq!(store.constant_value("emrat").unwrap(), 81.30056);
    assert_eq!(store.constant_value("gms").unwrap(), 2.959122082855911e-4);
    assert!(store.is_constant_available("Au"));
    assert_eq!(
        store.constant_value("CLIGHT"),
        Err(XephError::UnknownConstant("CLIGHT".into()))
    );
    assert!(!store.is_constant_available("CLIGHT"));

    let names: Vec<String> = store
        .constants()
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["AU", "EMRAT", "GMS"]);

    let metadata = store.metadata().unwrap();
    assert_eq!(metadata.title, "Synthetic test ephemerides");
    assert_eq!(metadata.authors, "XEPH test suite");
    assert!(metadata.creation_time.is_some());
    assert!(metadata.creator_application.starts_with("xeph "));
    assert!(!metadata.creator_os.is_empty());
    assert!(metadata.copyright.is_empty());
    assert_eq!(store.file_path().unwrap(), path);
}

#[test]
fn test_objects_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = utf8(&dir, "objects.xeph");
    let mut ceres = object(
        "1",
        "SSB",
        "Ceres",
        fit_segments(orbit, start_time(), END_JD - START_JD, 1, 8, 3),
        Vec::new(),
    );
    ceres.h = Some(3.34);
    ceres.g = Some(0.12);
    ceres.d = Some(939.4);
    ceres.object_description = "Dwarf planet".into();
    write_store(&path, &[earth_object(), ceres]);

    let store = EphemerisFile::open_file(&path).unwrap();
    let objects = store.objects().unwrap();
    assert_eq!(objects.len(), 2);
    assert_eq!(objects[0].object_id, "1");
    assert_eq!(objects[0].object_name, "Ceres");
    assert_eq!(objects[0].object_description, "Dwarf planet");
    assert_eq!(objects[0].h, Some(3.34));
    assert_eq!(objects[0].b_v, None);
    assert_eq!(objects[1].object_id, "Ea");

    let ceres = store.handle("Ceres", "").unwrap();
    assert_eq!(ceres.object_id(), "1");
    assert_eq!(ceres.g(), Some(0.12));
    assert_eq!(ceres.d(), Some(939.4));
    assert_eq!(ceres.b_v(), None);
    assert_eq!(ceres.object_description(), "Dwarf planet");
}
