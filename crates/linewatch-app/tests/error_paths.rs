//! 에러 경로 통합 테스트.
//!
//! 인증 실패, 설정 검증 실패, 폴링 실패, 액션 거부.


use linewatch_app::cli::Credentials;
use linewatch_app::wiring;
use linewatch_core::config::AppConfig;
use linewatch_core::error::CoreError;
use linewatch_core::models::production::ProductionAction;
use linewatch_core::ports::machine_api::MachineApi;
use linewatch_monitor::{MonitorEvent, Notice};
use linewatch_network::auth::TokenManager;
use linewatch_network::http_client::HttpMachineApi;
use mock_server::{stopped_history, MockServer, WRONG_PASSWORD};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

fn config_for(server: &MockServer) -> AppConfig {
    let mut config = AppConfig::default_config();
    config.server.base_url = server.url().to_string();
    config.feed.enabled = false;
    config.poller.interval_ms = 100;
    config
}

fn credentials(password: &str) -> Credentials {
    Credentials {
        email: "op@example.com".to_string(),
        password: password.to_string(),
    }
}

async fn next_notice(events: &mut broadcast::Receiver<MonitorEvent>) -> Notice {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match events.recv().await {
                Ok(MonitorEvent::Notice(notice)) => break notice,
                Ok(_) => continue,
                Err(e) => panic!("이벤트 수신 실패: {e}"),
            }
        }
    })
    .await
    .expect("알림 대기 시간 초과")
}

#[tokio::test]
async fn wrong_password_is_auth_error() {
    let server = MockServer::start().await;
    let result = wiring::build(&config_for(&server), &credentials(WRONG_PASSWORD)).await;
    assert!(matches!(result, Err(CoreError::Auth(_))));
}

#[tokio::test]
async fn invalid_config_rejected_before_network() {
    let server = MockServer::start().await;
    let mut config = config_for(&server);
    config.production.machine_name = "  ".to_string();

    let result = wiring::build(&config, &credentials("secret")).await;
    assert!(matches!(result, Err(CoreError::Validation { .. })));
    assert_eq!(
        server
            .state
            .request_count
            .load(std::sync::atomic::Ordering::Relaxed),
        0
    );
}

#[tokio::test]
async fn unreachable_server_is_network_error() {
    let server = MockServer::start().await;
    let mut config = config_for(&server);
    // 바인딩 후 해제한 포트
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    config.server.base_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let result = wiring::build(&config, &credentials("secret")).await;
    match result {
        Err(e) => assert!(e.is_transient(), "transient 아님: {e}"),
        Ok(_) => panic!("연결 불가 서버에서 성공"),
    }
}

#[tokio::test]
async fn poll_failure_then_recovery() {
    let server = MockServer::start().await;
    server.set_machine_data(500, serde_json::json!({"detail": "db down"}));

    let wired = wiring::build(&config_for(&server), &credentials("secret"))
        .await
        .unwrap();
    let monitor = wired.monitor;
    let mut events = monitor.events();
    monitor.start();

    let notice = next_notice(&mut events).await;
    assert!(matches!(notice, Notice::PollFailed(_)));
    assert!(monitor.snapshot().latest_sample.is_none());

    // 다음 주기가 곧 재시도
    server.set_machine_data(200, stopped_history("2026-03-02T08:00:00Z"));
    let mut rx = monitor.subscribe();
    tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|s| s.latest_sample.is_some()),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(monitor.snapshot().is_running(), Some(false));
    monitor.stop();
}

#[tokio::test]
async fn non_list_body_is_malformed() {
    let server = MockServer::start().await;
    server.set_machine_data(200, serde_json::json!({"results": []}));

    let tm = Arc::new(TokenManager::new(server.url()));
    tm.login("op@example.com", "secret").await.unwrap();
    let api = HttpMachineApi::new(server.url(), tm, Duration::from_secs(5)).unwrap();

    let err = api.fetch_machine_data().await.unwrap_err();
    assert!(matches!(err, CoreError::MalformedResponse(_)));
}

#[tokio::test]
async fn action_without_csrf_is_rejected_and_rolled_back() {
    let server = MockServer::start().await;
    let config = config_for(&server);

    // CSRF 토큰 없이 조립한 모니터
    let tm = Arc::new(TokenManager::new(server.url()));
    tm.login("op@example.com", "secret").await.unwrap();
    let api = Arc::new(HttpMachineApi::new(server.url(), tm, Duration::from_secs(5)).unwrap());
    let monitor = linewatch_monitor::MachineMonitor::new(
        api,
        None,
        linewatch_monitor::MonitorOptions::from_config(&config),
    );
    let mut events = monitor.events();

    let err = monitor.start_production().await.unwrap_err();
    assert!(matches!(err, CoreError::Rejected { status: 403, .. }));
    assert!(!monitor.snapshot().is_producing);

    match next_notice(&mut events).await {
        Notice::ActionFailed { action, .. } => assert_eq!(action, ProductionAction::Start),
        other => panic!("예상치 못한 알림: {other:?}"),
    }
    assert!(server.actions().is_empty());
}
