//! End-to-end tests: a configured monitor writes log files that the archive
//! reader loads back.

use std::time::Duration;

use envmon_core::{DaemonEvent, Monitor};
use envmon_service::{Config, build_sensor};
use envmon_store::{Archive, ArchiveQuery};
use envmon_types::Field;

fn simulated_config(dir: &std::path::Path) -> Config {
    let toml = format!(
        r#"
[monitor]
data_dir = "{}"
sampling_interval_secs = 0.01
samples_per_file = 1000
latest_poll_ms = 10

[sensors]
mode = "simulated"
"#,
        dir.display()
    );
    toml::from_str(&toml).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_simulated_monitor_round_trips_through_archive() {
    let dir = tempfile::tempdir().unwrap();
    let config = simulated_config(dir.path());
    config.validate().unwrap();

    let sensor = build_sensor(&config.sensors).unwrap();
    let mut monitor = Monitor::new(config.monitor_config(), sensor).unwrap();
    let mut events = monitor.subscribe_events();
    monitor.start().unwrap();

    let mut recorded = 0;
    tokio::time::timeout(Duration::from_secs(5), async {
        while recorded < 5 {
            if let Ok(DaemonEvent::SampleRecorded { .. }) = events.recv().await {
                recorded += 1;
            }
        }
    })
    .await
    .expect("samples were recorded");

    let report = monitor.stop().await.unwrap().unwrap();
    assert!(report.stats.samples_written >= 5);
    assert_eq!(report.stats.sensor_failures, 0);

    let archive = Archive::new(dir.path());
    assert_eq!(archive.list_files().unwrap().len(), 1);

    let table = archive
        .query(&ArchiveQuery::new().drop_incomplete())
        .unwrap();
    assert_eq!(table.len() as u64, report.stats.samples_written);

    let temperature = table.summary(Field::Temperature).unwrap();
    assert!(temperature.min > -40.0 && temperature.max < 85.0);

    let latest = monitor.get_latest().unwrap();
    assert!(table.timestamps().contains(&latest.timestamp));
}

#[tokio::test]
async fn test_config_overrides_reach_monitor() {
    let dir = tempfile::tempdir().unwrap();
    let config = simulated_config(dir.path());
    let monitor_config = config.monitor_config();

    assert_eq!(monitor_config.data_dir(), dir.path());
    assert_eq!(monitor_config.sampling_interval, Duration::from_millis(10));
    assert_eq!(monitor_config.samples_per_file, 1000);
    assert_eq!(monitor_config.latest_poll, Duration::from_millis(10));
}
