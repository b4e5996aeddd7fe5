use conezen::io::load_vector_file;
use conezen::qm_output::{extract_from_file, QmOutputError, StatePair};
use conezen::vectors::VectorTriplet;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const CASSCF_LOG: &str = "\
 Optimization cycle 1
 Cartesian gradient of state 1 (Hartree/Bohr)
 -----------------------------------------------
   1  C    9.9   9.9   9.9
   2  H    9.9   9.9   9.9

 Optimization cycle 2
 Cartesian gradient of state 1 (Hartree/Bohr)
 -----------------------------------------------
   1  C    0.0200000   0.0000000   0.0000000
   2  H    0.0000000   0.0000000   0.0050000

 Cartesian gradient of state 2 (Hartree/Bohr)
 -----------------------------------------------
   1  C   -0.0200000   0.0000000   0.0000000
   2  H    0.0000000   0.0000000   0.0050000

 Nonadiabatic coupling between states 2 and 1
 -----------------------------------------------
   1  C    0.0000000  -0.0100000   0.0000000
   2  H    0.0000000   0.0000000   0.0000000

 Energies: -154.1 -154.1
";

fn write_log(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("casscf.log");
    fs::write(&path, CASSCF_LOG).unwrap();
    path
}

#[test]
fn test_extract_last_cycle_and_fix_coupling_sign() {
    let dir = TempDir::new().unwrap();
    let log = write_log(&dir);

    let v = extract_from_file(&log, StatePair::new(1, 2).unwrap()).unwrap();
    assert_eq!(v.num_atoms(), 2);
    assert_eq!(v.labels, Some(vec!["C".to_string(), "H".to_string()]));
    assert_eq!(v.grad_a[0], [0.02, 0.0, 0.0]);
    assert_eq!(v.grad_b[0], [-0.02, 0.0, 0.0]);
    assert_eq!(v.coupling[0], [0.0, 0.01, 0.0]);
}

#[test]
fn test_requested_order_matches_header_order() {
    let dir = TempDir::new().unwrap();
    let log = write_log(&dir);

    let v = extract_from_file(&log, StatePair::new(2, 1).unwrap()).unwrap();
    assert_eq!(v.grad_a[0], [-0.02, 0.0, 0.0]);
    assert_eq!(v.coupling[0], [0.0, -0.01, 0.0]);
}

#[test]
fn test_missing_state_is_reported() {
    let dir = TempDir::new().unwrap();
    let log = write_log(&dir);

    match extract_from_file(&log, StatePair::new(1, 3).unwrap()) {
        Err(QmOutputError::MissingBlock(msg)) => assert!(msg.contains('3')),
        other => panic!("expected missing block, got {:?}", other),
    }
}

#[test]
fn test_missing_file_is_io_error() {
    let result = extract_from_file(Path::new("/nonexistent/job.log"), StatePair::new(1, 2).unwrap());
    assert!(matches!(result, Err(QmOutputError::Io(_))));
}

#[test]
fn test_written_files_reload_as_the_same_triplet() {
    let dir = TempDir::new().unwrap();
    let log = write_log(&dir);
    let pair = StatePair::new(1, 2).unwrap();

    let v = extract_from_file(&log, pair).unwrap();
    let [a, b, h] = v.write_vector_files(dir.path(), "ci1", pair).unwrap();
    assert_eq!(a, dir.path().join("ci1_gradientA.out"));
    assert_eq!(b, dir.path().join("ci1_gradientB.out"));
    assert_eq!(h, dir.path().join("ci1_NAC.out"));

    let reloaded = VectorTriplet::from_vectors(
        load_vector_file(&a).unwrap().to_dvector(),
        load_vector_file(&b).unwrap().to_dvector(),
        load_vector_file(&h).unwrap().to_dvector(),
    )
    .unwrap();
    let direct = v.to_triplet().unwrap();
    assert!((reloaded.gradient_difference() - direct.gradient_difference()).norm() < 1e-12);
    assert!((reloaded.coupling() - direct.coupling()).norm() < 1e-12);
}
