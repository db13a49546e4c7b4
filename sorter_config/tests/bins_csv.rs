use std::fs::File;
use std::io::Write;

use sorter_config::{REFUSE, load_bin_map_csv, validate_bins};
use rstest::rstest;
use tempfile::tempdir;

fn write_csv(body: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bins.csv");
    let mut f = File::create(&path).unwrap();
    f.write_all(body.as_bytes()).unwrap();
    (dir, path)
}

#[rstest]
fn loads_labels_and_positions() {
    let (_dir, path) = write_csv("label,position\nrefuse,7600\nresistor, 400\n");
    let bins = load_bin_map_csv(&path).unwrap();
    assert_eq!(bins.get(REFUSE), Some(&7600));
    assert_eq!(bins.get("resistor"), Some(&400));
    validate_bins(&bins, 8000).unwrap();
}

#[rstest]
#[case("name,position\nrefuse,1\n", "headers")]
#[case("label,position\nrefuse,abc\n", "invalid csv row 2")]
#[case("label,position\nrefuse,1\nrefuse,2\n", "twice")]
#[case("label,position\n,5\n", "empty label")]
fn rejects_malformed_csv(#[case] body: &str, #[case] needle: &str) {
    let (_dir, path) = write_csv(body);
    let err = load_bin_map_csv(&path).expect_err("should reject");
    assert!(
        format!("{err}").to_lowercase().contains(needle),
        "error {err} should mention {needle}"
    );
}

#[rstest]
fn missing_refuse_is_invalid() {
    let (_dir, path) = write_csv("label,position\nresistor,400\n");
    let bins = load_bin_map_csv(&path).unwrap();
    let err = validate_bins(&bins, 8000).expect_err("refuse required");
    assert!(format!("{err}").contains("refuse"));
}

#[rstest]
#[case(-1)]
#[case(8001)]
fn out_of_travel_positions_are_invalid(#[case] pos: i32) {
    let (_dir, path) = write_csv(&format!("label,position\nrefuse,100\nic,{pos}\n"));
    let bins = load_bin_map_csv(&path).unwrap();
    let err = validate_bins(&bins, 8000).expect_err("outside travel");
    assert!(format!("{err}").contains("bins.ic"));
}

#[rstest]
fn missing_file_is_reported_with_path() {
    let err = load_bin_map_csv(std::path::Path::new("/nonexistent/bins.csv"))
        .expect_err("no file");
    assert!(format!("{err}").contains("bins.csv"));
}
