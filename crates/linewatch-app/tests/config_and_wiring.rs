//! 설정 및 DI 와이어링 통합 테스트.
//!
//! AppConfig → ConfigManager → CLI 오버라이드 → 어댑터 생성 검증.


use clap::Parser;
use linewatch_app::cli::{self, Args, Credentials};
use linewatch_app::lifecycle::{run_cleanup, LifecycleManager, ShutdownReason};
use linewatch_app::{report, wiring};
use linewatch_core::config::AppConfig;
use linewatch_core::config_manager::ConfigManager;
use linewatch_core::supervisor::ConnectionState;
use linewatch_monitor::MonitorOptions;
use mock_server::MockServer;
use std::time::Duration;

#[test]
fn config_defaults_are_valid() {
    let config = AppConfig::default_config();
    config.validate().unwrap();

    assert!(config.server.base_url.starts_with("http"));
    assert!(config.server.request_timeout_ms > 0);
    assert_eq!(config.poller.interval_ms, 5000);
    assert_eq!(config.poller.ticker_interval_ms, 1000);
    assert!(config.feed.enabled);
    assert_eq!(config.feed.max_attempts, 10);
    assert_eq!(config.feed.retry_delay_ms, 3000);
}

#[test]
fn config_duration_conversions() {
    let config = AppConfig::default_config();
    assert_eq!(config.poll_interval(), Duration::from_millis(5000));
    assert_eq!(config.ticker_interval(), Duration::from_secs(1));
    assert_eq!(config.retry_delay(), Duration::from_millis(3000));
    assert_eq!(
        config.request_timeout(),
        Duration::from_millis(config.server.request_timeout_ms)
    );
}

#[test]
fn config_file_then_cli_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let manager = ConfigManager::with_path(path.clone()).unwrap();
    assert!(path.exists());
    manager
        .update_with(|c| c.production.machine_name = "Prensa P90".to_string())
        .unwrap();

    // 다시 열면 저장된 값
    let reopened = ConfigManager::with_path(path).unwrap();
    let mut config = reopened.get();
    assert_eq!(config.production.machine_name, "Prensa P90");

    let args = Args::try_parse_from([
        "linewatch",
        "--feed-url",
        "wss://mes.example.com/ws/production-count/",
        "--poll-interval",
        "1500",
    ])
    .unwrap();
    args.apply_to(&mut config);
    cli::apply_feed_credentials(&mut config, |key| match key {
        cli::ENV_FEED_USER => Some("edge".to_string()),
        cli::ENV_FEED_PASSWORD => Some("pw".to_string()),
        _ => None,
    });
    config.validate().unwrap();

    let options = MonitorOptions::from_config(&config);
    assert_eq!(options.poll_interval, Duration::from_millis(1500));
    assert_eq!(options.machine_name, "Prensa P90");
    assert!(options.handshake.is_some());
}

#[tokio::test]
async fn wiring_without_feed() {
    let server = MockServer::start().await;
    let mut config = AppConfig::default_config();
    config.server.base_url = server.url().to_string();
    config.feed.enabled = false;

    let credentials = Credentials {
        email: "op@example.com".to_string(),
        password: "secret".to_string(),
    };
    let wired = wiring::build(&config, &credentials).await.unwrap();
    assert!(wired.token_manager.is_authenticated().await);

    let monitor = wired.monitor;
    let mut rx = monitor.subscribe();
    monitor.start();
    let snapshot = tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|s| s.latest_sample.is_some()),
    )
    .await
    .unwrap()
    .unwrap()
    .clone();

    assert_eq!(snapshot.connection_state, ConnectionState::Disconnected);
    assert_eq!(server.feed_connections(), 0);

    // 종료 요청 시 보고 태스크도 끝난다
    let lifecycle = LifecycleManager::new();
    let reporter = report::spawn_reporter(&monitor, Duration::from_secs(1), lifecycle.listener());
    lifecycle.request(ShutdownReason::Requested);
    let cleaned = run_cleanup(Duration::from_secs(5), async move {
        monitor.stop();
        reporter.await.unwrap();
    })
    .await;
    assert!(cleaned);
}
