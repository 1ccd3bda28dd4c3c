//! Integration tests for the log pipeline
//!
//! These tests verify:
//! - Threshold and end-to-end delivery to files
//! - Buffered sinks, flush idempotence and shutdown flush
//! - Rotation with retention and compression through the logger
//! - Per-sink level routing, JSON output, global switches
//! - Sink failure isolation and stable sink handles
//! - Configuration errors surfaced at sink construction

use flate2::read::GzDecoder;
use parking_lot::Mutex;
use rust_log_pipeline::prelude::*;
use rust_log_pipeline::{DestinationKind, LogCallback, MAX_BUFFER_SIZE};
use std::fs;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn quiet() -> LoggerConfig {
    LoggerConfig::default().with_auto_sink(false)
}

fn path_str(path: &Path) -> String {
    path.to_str().expect("utf-8 temp path").to_string()
}

/// Archives of `app.log` in `dir`, sorted by name
fn archives(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("Failed to read dir")
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .filter(|name| name.starts_with("app.") && name != "app.log")
        .collect();
    names.sort();
    names
}

struct BrokenWriter;

impl SinkWriter for BrokenWriter {
    fn write_all(&mut self, _bytes: &[u8]) -> Result<()> {
        Err(LoggerError::writer("device unplugged"))
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn kind(&self) -> DestinationKind {
        DestinationKind::Custom
    }

    fn name(&self) -> &str {
        "broken"
    }
}

#[test]
fn test_threshold_and_single_line() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("app.log");

    let logger = Logger::builder()
        .config(quiet())
        .level(LogLevel::Info)
        .sink(SinkConfig::file(path_str(&log_file)))
        .build()
        .expect("Failed to build logger");

    logger.trace("x").unwrap();
    logger.flush().unwrap();
    assert_eq!(fs::read_to_string(&log_file).unwrap(), "");

    logger.info("hello").unwrap();
    logger.flush().unwrap();

    let content = fs::read_to_string(&log_file).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("hello"));
    assert!(lines[0].contains("INFO"));
}

#[test]
fn test_buffered_sink_carries_bound_context() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("app.log");

    let logger = Logger::builder()
        .config(quiet())
        .sink(SinkConfig::file(path_str(&log_file)).with_async_write(1))
        .build()
        .unwrap();
    logger.bind("request_id", "abc");

    logger.info("first").unwrap();
    logger.info("second").unwrap();

    // Buffer size 1 writes through on every record, no flush needed
    let content = fs::read_to_string(&log_file).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|line| line.contains("request_id=abc")));
}

#[test]
fn test_buffered_sink_flushed_on_drop() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("app.log");

    {
        let logger = Logger::builder()
            .config(quiet())
            .sink(SinkConfig::file(path_str(&log_file)).with_async_write(64 * 1024))
            .build()
            .unwrap();
        for i in 0..10 {
            logger.info(format!("pending {}", i)).unwrap();
        }
        assert_eq!(fs::read_to_string(&log_file).unwrap(), "");
    }

    let content = fs::read_to_string(&log_file).unwrap();
    assert_eq!(content.lines().count(), 10);
    assert!(content.contains("pending 9"));
}

#[test]
fn test_flush_twice_writes_once() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("app.log");

    let logger = Logger::builder()
        .config(quiet())
        .sink(SinkConfig::file(path_str(&log_file)).with_async_write(4096))
        .build()
        .unwrap();

    logger.warning("only once").unwrap();
    logger.flush().unwrap();
    let first = fs::read_to_string(&log_file).unwrap();
    logger.flush().unwrap();
    let second = fs::read_to_string(&log_file).unwrap();

    assert_eq!(first, second);
    assert_eq!(second.matches("only once").count(), 1);
}

#[test]
fn test_rotation_keeps_two_newest_archives() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("app.log");

    let logger = Logger::builder()
        .config(quiet().with_show_time(false))
        .sink(
            SinkConfig::file(path_str(&log_file))
                .with_size_limit(1)
                .with_retention(2),
        )
        .build()
        .unwrap();

    // Every write after the first rotates: three rotations in total
    for i in 1..=4 {
        logger.info(format!("record {}", i)).unwrap();
    }
    logger.flush().unwrap();

    let names = archives(temp_dir.path());
    assert_eq!(names.len(), 2, "archives: {:?}", names);
    assert!(names[0].ends_with(".000002.log"));
    assert!(names[1].ends_with(".000003.log"));

    let oldest = fs::read_to_string(temp_dir.path().join(&names[0])).unwrap();
    let newest = fs::read_to_string(temp_dir.path().join(&names[1])).unwrap();
    assert!(oldest.contains("record 2"));
    assert!(newest.contains("record 3"));
    assert!(fs::read_to_string(&log_file).unwrap().contains("record 4"));
}

#[test]
fn test_compressed_archives() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("app.log");

    let logger = Logger::builder()
        .config(quiet())
        .sink(
            SinkConfig::file(path_str(&log_file))
                .with_size_limit(1)
                .with_compression(true),
        )
        .build()
        .unwrap();

    logger.info("to be archived").unwrap();
    logger.info("live").unwrap();

    let names = archives(temp_dir.path());
    assert_eq!(names.len(), 1);
    assert!(names[0].ends_with(".log.gz"));

    let compressed = fs::File::open(temp_dir.path().join(&names[0])).unwrap();
    let mut text = String::new();
    GzDecoder::new(compressed).read_to_string(&mut text).unwrap();
    assert!(text.contains("to be archived"));
}

#[test]
fn test_log_injection_prevention() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("injection.log");

    let logger = Logger::builder()
        .config(quiet())
        .sink(SinkConfig::file(path_str(&log_file)))
        .build()
        .unwrap();

    logger
        .info("User login\nERROR [2024-10-17] Fake error injected\nINFO Continuation")
        .unwrap();

    let content = fs::read_to_string(&log_file).unwrap();
    assert!(content.contains("\\n"));
    assert_eq!(content.lines().count(), 1, "Log should be a single line");
}

#[test]
fn test_bound_context_cannot_forge_lines() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("injection.log");

    let logger = Logger::builder()
        .config(quiet())
        .sink(SinkConfig::file(path_str(&log_file)))
        .build()
        .unwrap();

    logger.bind("user", "bob\n[2025-01-01T00:00:00.000Z] [CRITICAL] forged");
    logger.info("login").unwrap();
    logger
        .log_with_context(
            LogLevel::Info,
            "logout",
            LogContext::new().with_field("reason", "idle\r\nINFO fake"),
        )
        .unwrap();

    let content = fs::read_to_string(&log_file).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2, "content: {:?}", content);
    assert!(lines[0].contains("user=bob\\n[2025-01-01T00:00:00.000Z] [CRITICAL] forged"));
    assert!(lines[1].contains("reason=idle\\r\\nINFO fake"));
}

#[test]
fn test_per_sink_level_routing() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let app_log = temp_dir.path().join("app.log");
    let error_log = temp_dir.path().join("errors.log");

    let logger = Logger::builder()
        .config(quiet())
        .level(LogLevel::Debug)
        .sink(SinkConfig::file(path_str(&app_log)).with_max_level(LogLevel::Warning))
        .sink(SinkConfig::file(path_str(&error_log)).with_level(LogLevel::Error))
        .build()
        .unwrap();

    logger.debug("cache miss").unwrap();
    logger.warning("slow query").unwrap();
    logger.error("connection lost").unwrap();
    logger.critical("out of disk").unwrap();

    let app = fs::read_to_string(&app_log).unwrap();
    let errors = fs::read_to_string(&error_log).unwrap();

    assert_eq!(app.lines().count(), 2);
    assert!(app.contains("cache miss") && app.contains("slow query"));
    assert_eq!(errors.lines().count(), 2);
    assert!(errors.contains("connection lost") && errors.contains("out of disk"));
}

#[test]
fn test_json_file_sink() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("app.json");

    let logger = Logger::builder()
        .config(quiet().with_timestamp_format(TimestampFormat::UnixMillis))
        .sink(SinkConfig::file(path_str(&log_file)).with_json(true))
        .bind("region", "eu-west-1")
        .build()
        .unwrap();

    let context = LogContext::new().with_field("order_id", 1234).with_field("paid", true);
    logger
        .log_with_context(LogLevel::Success, "order placed", context)
        .unwrap();

    let content = fs::read_to_string(&log_file).unwrap();
    let record: serde_json::Value = serde_json::from_str(content.trim_end()).unwrap();
    assert_eq!(record["level"], "SUCCESS");
    assert_eq!(record["priority"], 25);
    assert_eq!(record["message"], "order placed");
    assert_eq!(record["order_id"], 1234);
    assert_eq!(record["paid"], true);
    assert_eq!(record["region"], "eu-west-1");
    assert!(record["timestamp"].is_number());
}

#[test]
fn test_global_file_switch() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("app.log");

    let logger = Logger::builder()
        .config(quiet().with_file_enabled(false))
        .sink(SinkConfig::file(path_str(&log_file)))
        .build()
        .unwrap();

    logger.error("not stored").unwrap();
    assert_eq!(fs::read_to_string(&log_file).unwrap(), "");

    logger.configure(quiet());
    logger.error("stored").unwrap();
    assert!(fs::read_to_string(&log_file).unwrap().contains("stored"));
}

#[test]
fn test_failing_sink_is_isolated() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("app.log");

    let logger = Logger::builder()
        .config(quiet())
        .writer(SinkConfig::console(), Box::new(BrokenWriter))
        .sink(SinkConfig::file(path_str(&log_file)))
        .build()
        .unwrap();

    let result = logger.error("must reach the file");
    match result {
        Err(LoggerError::DeliveryFailed { failed, first }) => {
            assert_eq!(failed, 1);
            assert!(matches!(*first, LoggerError::WriterError(_)));
        }
        other => panic!("expected DeliveryFailed, got {:?}", other),
    }
    assert!(fs::read_to_string(&log_file)
        .unwrap()
        .contains("must reach the file"));
    assert_eq!(logger.metrics().sink_failure_count(), 1);
}

#[test]
fn test_sink_handles_survive_removal() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let logger = Logger::with_config(quiet());

    let ids: Vec<SinkId> = ["a.log", "b.log", "c.log"]
        .iter()
        .map(|name| {
            logger
                .add_sink(SinkConfig::file(path_str(&temp_dir.path().join(name))))
                .unwrap()
        })
        .collect();

    logger.remove_sink(ids[0]).unwrap();
    logger.disable_sink(ids[2]).unwrap();
    logger.info("routed").unwrap();

    assert!(fs::read_to_string(temp_dir.path().join("b.log"))
        .unwrap()
        .contains("routed"));
    assert_eq!(fs::read_to_string(temp_dir.path().join("c.log")).unwrap(), "");

    // A new sink never takes a removed sink's id
    let fresh = logger
        .add_sink(SinkConfig::file(path_str(&temp_dir.path().join("d.log"))))
        .unwrap();
    assert!(!ids.contains(&fresh));
    assert_eq!(logger.sink_ids(), vec![ids[1], ids[2], fresh]);
}

#[test]
fn test_config_errors_at_construction() {
    let logger = Logger::with_config(quiet());

    let bad = [
        SinkConfig::file(""),
        SinkConfig::file("app.log").with_size_limit_str("lots"),
        SinkConfig::file("app.log").with_size_limit(0),
        SinkConfig::file("app.log").with_async_write(0),
        SinkConfig::console().with_rotation(RotationInterval::Daily),
        SinkConfig::network("tcp://localhost"),
        SinkConfig::file("app.log")
            .with_level(LogLevel::Error)
            .with_max_level(LogLevel::Info),
    ];

    for config in bad {
        let result = logger.add_sink(config.clone());
        assert!(
            matches!(&result, Err(e) if e.is_config_error()),
            "{:?} gave {:?}",
            config,
            result
        );
    }
    assert_eq!(logger.sink_count(), 0);
}

#[test]
fn test_sink_config_from_json() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let json = format!(
        r#"{{"path": "{}", "rotation": "daily", "size_limit_str": "10MB", "retention": 3, "json": true}}"#,
        path_str(&temp_dir.path().join("app.log")).replace('\\', "\\\\")
    );
    let config = SinkConfig::from_json(&json).unwrap();
    assert_eq!(config.rotation, Some(RotationInterval::Daily));
    assert_eq!(config.effective_size_limit().unwrap(), Some(10 * 1024 * 1024));

    let logger = Logger::with_config(quiet());
    logger.add_sink(config).unwrap();
    logger.info("configured from json").unwrap();

    let content = fs::read_to_string(temp_dir.path().join("app.log")).unwrap();
    assert!(content.starts_with('{'));
}

#[test]
fn test_oversized_buffer_from_json_rejected() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let json = format!(
        r#"{{"path": "{}", "async_write": true, "buffer_size": 18446744073709551615}}"#,
        path_str(&temp_dir.path().join("app.log")).replace('\\', "\\\\")
    );
    let config = SinkConfig::from_json(&json).unwrap();

    let logger = Logger::with_config(quiet());
    let result = logger.add_sink(config);
    assert!(matches!(&result, Err(e) if e.is_config_error()), "{:?}", result);
    assert_eq!(logger.sink_count(), 0);

    // The logger stays usable after the rejection
    let ok = SinkConfig::file(path_str(&temp_dir.path().join("ok.log")))
        .with_async_write(MAX_BUFFER_SIZE);
    let id = logger.add_sink(ok).unwrap();
    assert!(logger.is_sink_enabled(id).unwrap());
}

#[test]
fn test_log_callback_sees_records() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let callback: LogCallback = Arc::new(move |record: &Record| {
        sink.lock().push(record.message.clone());
        Ok(())
    });

    let logger = Logger::builder()
        .config(quiet())
        .log_callback(callback)
        .build()
        .unwrap();

    logger.info("observed").unwrap();
    logger.debug("below threshold").unwrap();
    assert_eq!(*seen.lock(), vec!["observed".to_string()]);
}

#[cfg(feature = "network")]
#[test]
fn test_tcp_sink_delivers() {
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    let reader = std::thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut line = String::new();
        BufReader::new(stream).read_line(&mut line).unwrap();
        line
    });

    let logger = Logger::with_config(quiet());
    logger
        .add_sink(SinkConfig::network(format!("tcp://{}", address)).with_json(true))
        .unwrap();
    logger.warning("remote warning").unwrap();

    let line = reader.join().unwrap();
    let record: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
    assert_eq!(record["message"], "remote warning");
    assert_eq!(logger.network_stats().messages_sent(), 1);
}
