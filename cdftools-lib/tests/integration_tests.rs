mod common;

use std::fs;

use cdftools::{
    skeleton::{
        AttributeValue, DataType, EntryUpdate, Skeleton, TabularOptions, TextOptions, Workbook,
    },
    timecode::{self, TimeScale},
};
use common::fixture_path;

fn from_text() -> Skeleton {
    Skeleton::from_text_file(fixture_path("sample.skt")).unwrap()
}

fn from_tabular() -> Skeleton {
    Skeleton::from_tabular_file(fixture_path("sample.json"), TabularOptions::default()).unwrap()
}

#[test]
fn text_and_tabular_fixtures_agree() {
    let skt = from_text();

    assert_eq!((skt.nzvar(), skt.ngattr(), skt.nvattr()), (3, 5, 5));
    assert_eq!(skt, from_tabular());
    skt.validate().unwrap();
}

#[test]
fn text_round_trip() {
    let skt = from_text();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.skt");

    skt.write_text_file(&path, TextOptions::default()).unwrap();
    let decoded = Skeleton::from_text_file(&path).unwrap();

    assert_eq!(decoded, skt);
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("Sample skeleton used by the integr"));
}

#[test]
fn tabular_round_trip_keeps_extra_sheets() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.json");
    fs::copy(fixture_path("sample.json"), &path).unwrap();

    let mut skt = Skeleton::from_tabular_file(&path, TabularOptions::default()).unwrap();
    skt.set_global_attribute_entry("Data_version", 1, EntryUpdate::value("02"))
        .unwrap();
    skt.write_tabular_file(&path).unwrap();

    let wb = Workbook::from_file(&path).unwrap();
    assert!(wb.sheet("Notes").is_some());
    let decoded = Skeleton::from_tabular_file(&path, TabularOptions::default()).unwrap();
    assert_eq!(decoded.global_attribute("Data_version").unwrap()[0].value, "02");
    assert_eq!(decoded, skt);
}

#[test]
fn auto_pad_replaces_pad_values() {
    let options = TabularOptions::builder().auto_pad(true).build();
    let skt = Skeleton::from_tabular_file(fixture_path("sample.json"), options).unwrap();

    let pad = |name: &str| skt.zvariable(name).unwrap().options.pad_value.clone();
    assert_eq!(pad("Epoch").as_deref(), Some("0000-01-01T00:00:00.000000000"));
    assert_eq!(pad("B").as_deref(), Some("0.0"));
    assert_eq!(pad("LABEL").as_deref(), Some("\" \""));
}

#[test]
fn edit_then_convert() {
    let mut skt = from_text();
    skt.rename_zvariable("B", "B_RTN").unwrap();
    skt.remove_variable_attribute("UNITS", Some(&["Epoch"])).unwrap();
    skt.add_variable_attribute(
        "VALIDMAX",
        AttributeValue::new(DataType::Float, "1.0e5"),
        Some(&["B_RTN"]),
    )
    .unwrap();

    let text = skt.to_text().unwrap();
    let tabular = Skeleton::from_tabular(&skt.to_tabular(), TabularOptions::default()).unwrap();

    assert_eq!(Skeleton::from_text(&text).unwrap(), skt);
    assert_eq!(tabular, skt);
    assert!(tabular.variable_attribute("Epoch", "UNITS").is_none());
    assert_eq!(
        tabular.variable_attribute("B_RTN", "FILLVAL").unwrap().value,
        "-1.0e31"
    );
}

#[test]
fn crate_error_wraps_modules() {
    let err: cdftools::Error = Skeleton::from_text("#GLOBALattributes\n  1: CDF_CHAR { \"x\" } .\n")
        .unwrap_err()
        .into();
    assert!(matches!(err, cdftools::Error::Skeleton(_)));
}

#[test]
fn decode_cds_timecode() {
    let t_field = hex::decode("56d703a4ec90").unwrap();
    let tc = timecode::decode(0b0000_1000, &t_field, None).unwrap();

    assert_eq!(tc.name(), "CDS");
    assert_eq!(tc.time_scale(), TimeScale::Utc);
    assert_eq!(
        tc.timestamp.unwrap().to_gregorian_utc(),
        (2018, 11, 13, 16, 59, 0, 112_000_000)
    );
}
