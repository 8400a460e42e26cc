//! LINEWATCH 설비 상태 모니터 진입점.
//!
//! 설정 로드 → 로그인 → 모니터 시작 → 시그널 대기 → 정리.
//! 액션 명령(`start`, `stop`, `scrap`, `orders`)은 요청 하나만 보내고 끝낸다.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use linewatch_app::cli::{self, Args, Command, Credentials};
use linewatch_app::lifecycle::{run_cleanup, LifecycleManager};
use linewatch_app::{commands, report, wiring};
use linewatch_core::config_manager::ConfigManager;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// 상태 보고 주기
const REPORT_INTERVAL: Duration = Duration::from_secs(10);
/// 종료 정리 유예 시간
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_filter())),
        )
        .init();

    info!("LINEWATCH 시작 (v{})", env!("CARGO_PKG_VERSION"));

    // 설정 로드 + 오버라이드
    let config_manager = ConfigManager::open(args.config.clone()).context("설정 로드 실패")?;
    info!("설정 파일: {}", config_manager.config_path().display());

    let mut config = config_manager.get();
    args.apply_to(&mut config);
    cli::apply_feed_credentials(&mut config, |key| std::env::var(key).ok());
    config
        .validate()
        .map_err(|e| anyhow!("설정 검증 실패: {e}"))?;

    info!(
        "서버: {} | 설비: {} | 폴링 {}ms",
        config.server.base_url, config.production.machine_name, config.poller.interval_ms
    );

    let credentials = Credentials::from_env().ok_or_else(|| {
        anyhow!(
            "{} / {} 환경 변수가 필요합니다",
            cli::ENV_EMAIL,
            cli::ENV_PASSWORD
        )
    })?;

    let wired = wiring::build(&config, &credentials)
        .await
        .map_err(|e| anyhow!("초기화 실패: {e}"))?;
    if let Some(operator) = &wired.operator {
        info!("로그인: {operator}");
    }

    let monitor = wired.monitor;
    let token_manager = wired.token_manager;

    let order_query = match args.command() {
        Command::Monitor { order } => order,
        action => {
            let result = commands::run_action(&monitor, &action).await;
            token_manager.logout().await;
            for line in result.map_err(|e| anyhow!("명령 실행 실패: {e}"))? {
                println!("{line}");
            }
            return Ok(());
        }
    };

    if let Some(query) = order_query {
        match commands::select_first_order(&monitor, &query).await {
            Ok(Some(order)) => info!("생산 오더: {}", order.label()),
            Ok(None) => {}
            Err(e) => warn!("생산 오더 선택 실패, 오더 없이 시작: {e}"),
        }
    }

    let lifecycle = LifecycleManager::new();
    monitor.start();
    let reporter = report::spawn_reporter(&monitor, REPORT_INTERVAL, lifecycle.listener());

    let reason = lifecycle.wait_for_signal().await;
    info!("종료 시작: {reason}");

    let clean = run_cleanup(SHUTDOWN_GRACE, async move {
        monitor.stop();
        token_manager.logout().await;
        if let Err(e) = reporter.await {
            warn!("상태 보고 태스크 비정상 종료: {e}");
        }
    })
    .await;
    if !clean {
        warn!("정리 작업 일부를 건너뛰고 종료");
    }

    info!("LINEWATCH 종료");
    Ok(())
}
