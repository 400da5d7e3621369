use std::fs;

use shotclock::config::{render_controls, Config, ConfigService};
use shotclock::model::NEUTRAL;
use tempfile::TempDir;

#[test]
fn missing_document_falls_back_to_default() {
    let dir = TempDir::new().unwrap();
    let service = ConfigService::new(dir.path().join("config.json"));

    assert_eq!(service.load(), Config::default());
}

#[test]
fn corrupt_document_falls_back_to_default() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, "{not json").unwrap();

    let service = ConfigService::new(path);
    assert_eq!(service.load(), Config::default());
}

#[test]
fn valid_document_loads() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(
        &path,
        r#"{"predefinedTimes":["0:30","1:00"],"names":["A"]}"#,
    )
    .unwrap();

    let config = ConfigService::new(path).load();
    assert_eq!(config.predefined_times, vec!["0:30", "1:00"]);
    assert_eq!(config.change_times, None);
    assert_eq!(config.names, vec!["A"]);
}

#[test]
fn controls_carry_parsed_tenths_and_neutral_entry() {
    let config = Config {
        predefined_times: vec!["0:30".into(), "1:00".into(), "106:00".into()],
        change_times: Some(vec!["0:05".into(), "-0:30".into()]),
        names: vec!["A".into(), "B".into()],
    };

    let controls = render_controls(&config);
    let predefined: Vec<i64> = controls.predefined.iter().map(|c| c.tenths).collect();
    assert_eq!(predefined, vec![300, 600, 63600]);
    assert_eq!(controls.predefined[1].label, "1:00");

    let changes: Vec<i64> = controls.changes.iter().map(|c| c.tenths).collect();
    assert_eq!(changes, vec![50, -300]);

    assert_eq!(controls.names, vec!["A", "B", NEUTRAL]);
}

#[test]
fn absent_change_times_render_no_delta_controls() {
    let config = Config {
        predefined_times: vec!["0:30".into()],
        change_times: None,
        names: vec![],
    };

    let controls = render_controls(&config);
    assert!(controls.changes.is_empty());
    assert_eq!(controls.names, vec![NEUTRAL]);
}

#[test]
fn bad_labels_render_as_zero_controls() {
    let config = Config {
        predefined_times: vec!["oops".into()],
        change_times: None,
        names: vec![],
    };

    let controls = render_controls(&config);
    assert_eq!(controls.predefined[0].tenths, 0);
}

#[test]
fn upload_replaces_the_document() {
    let dir = TempDir::new().unwrap();
    let document = dir.path().join("config.json");
    let service = ConfigService::new(document);

    let upload = dir.path().join("new-config.json");
    fs::write(
        &upload,
        r#"{"predefinedTimes":["4:00"],"changeTimes":["-0:05"],"names":["C"]}"#,
    )
    .unwrap();

    let receipt = service.upload(&upload).unwrap();
    assert!(receipt.message.contains("uploaded successfully"));

    let config = service.load();
    assert_eq!(config.predefined_times, vec!["4:00"]);
    assert_eq!(config.names, vec!["C"]);
}

#[test]
fn invalid_upload_is_rejected_and_document_kept() {
    let dir = TempDir::new().unwrap();
    let document = dir.path().join("config.json");
    fs::write(
        &document,
        r#"{"predefinedTimes":["0:30"],"names":["A"]}"#,
    )
    .unwrap();
    let service = ConfigService::new(document);

    let upload = dir.path().join("broken.json");
    fs::write(&upload, "]{").unwrap();

    let err = service.upload(&upload).unwrap_err();
    assert!(err.to_string().contains("invalid JSON"));

    // existing document untouched
    let config = service.load();
    assert_eq!(config.names, vec!["A"]);
}
