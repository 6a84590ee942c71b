#![allow(clippy::unwrap_used, clippy::expect_used)]

use sqldump_core::errors::{DumpError, DumpErrorKind};
use sqldump_core::logging_facility::test_capture::{init_test_capture, CapturedEvent};
use sqldump_core::source::memory::{FailPoint, MemoryObject, MemorySource};
use sqldump_core::source::ScanKind;
use sqldump_core::{log_op_end, log_op_error, log_op_start, Dumper};
use sqldump_core_types::schema::{COMPONENT, EVENT_END, EVENT_END_ERROR, EVENT_START};

fn dump_events(events: Vec<CapturedEvent>, database: &str) -> Vec<CapturedEvent> {
    events
        .into_iter()
        .filter(|e| e.op.as_deref() == Some("dump") && e.field("database") == Some(database))
        .collect()
}

#[test]
fn test_log_op_start_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_start_unique_1";

    log_op_start!(op_name);

    capture.assert_event_exists(op_name, EVENT_START);
}

#[test]
fn test_log_op_end_records_duration() {
    let capture = init_test_capture();
    let op_name = "test_log_op_end_unique_2";

    log_op_end!(op_name, duration_ms = 42);

    let events = capture.events_for_op(op_name);
    assert_eq!(events.len(), 1, "Should have exactly one end event");
    assert_eq!(events[0].event.as_deref(), Some(EVENT_END));
    assert_eq!(events[0].field("duration_ms"), Some("42"));
}

#[test]
fn test_log_op_error_includes_code() {
    let capture = init_test_capture();
    let op_name = "test_log_op_error_unique_3";

    let err = DumpError::new(DumpErrorKind::SchemaMismatch).with_object("users");
    log_op_error!(op_name, &err, duration_ms = 10);

    let events = capture.events_for_op(op_name);
    assert_eq!(events.len(), 1, "Should have exactly one error event");
    assert_eq!(events[0].event.as_deref(), Some(EVENT_END_ERROR));
    assert_eq!(events[0].field("err_code"), Some("ERR_SCHEMA_MISMATCH"));
    assert_eq!(events[0].field("err_kind"), Some("SchemaMismatch"));
    assert_eq!(events[0].field("err_object"), Some("users"));
}

#[test]
fn test_events_carry_component() {
    let capture = init_test_capture();
    let op_name = "test_component_unique_4";

    log_op_start!(op_name, database = "main");
    log_op_end!(op_name, duration_ms = 1, row_count = 3u64);

    let events = capture.events_for_op(op_name);
    assert_eq!(events.len(), 2);
    for event in &events {
        assert_eq!(event.field("component"), Some(COMPONENT));
    }
    assert_eq!(events[0].field("database"), Some("main"));
    assert_eq!(events[1].field("row_count"), Some("3"));
}

#[test]
fn test_dump_emits_start_and_end() {
    let capture = init_test_capture();
    let mut src = MemorySource::new("8.0")
        .with_database("logging_ok")
        .with_object(
            MemoryObject::table("t")
                .column("a", ScanKind::Integer, "INT")
                .row(vec![1.into()])
                .row(vec![2.into()]),
        );
    let mut out = Vec::new();
    Dumper::default()
        .dump_database(&mut src, &mut out, "logging_ok")
        .unwrap();

    let events = dump_events(capture.events(), "logging_ok");
    assert_eq!(events.len(), 2, "Expected one start and one end event");
    assert_eq!(events[0].event.as_deref(), Some(EVENT_START));
    assert_eq!(events[1].event.as_deref(), Some(EVENT_END));
    assert_eq!(events[1].field("row_count"), Some("2"));
    assert_eq!(events[1].field("statement_count"), Some("1"));
    assert!(events[1].field("duration_ms").is_some());
    assert_eq!(events[0].field("dump_id"), events[1].field("dump_id"));
}

#[test]
fn test_failed_dump_emits_end_error_with_code() {
    let capture = init_test_capture();
    let mut src = MemorySource::new("8.0")
        .with_database("logging_fail")
        .fail_on(
            FailPoint::ListObjects,
            DumpError::new(DumpErrorKind::Query).with_message("catalog unavailable"),
        );
    let mut out = Vec::new();
    Dumper::default()
        .dump_database(&mut src, &mut out, "logging_fail")
        .unwrap_err();

    let events = dump_events(capture.events(), "logging_fail");
    let error_events: Vec<_> = events
        .iter()
        .filter(|e| e.event.as_deref() == Some(EVENT_END_ERROR))
        .collect();
    assert_eq!(error_events.len(), 1);
    assert_eq!(error_events[0].field("err_code"), Some("ERR_QUERY"));
    assert!(!events
        .iter()
        .any(|e| e.event.as_deref() == Some(EVENT_END)));
}
