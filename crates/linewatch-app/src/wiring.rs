//! 어댑터 생성 및 모니터 와이어링.
//!
//! 로그인 → 프로필 → CSRF 토큰 → REST/피드 어댑터 → `MachineMonitor`.
//! 프로필과 CSRF 조회 실패는 경고만 남기고 계속 진행한다.

use linewatch_core::config::AppConfig;
use linewatch_core::error::CoreError;
use linewatch_core::ports::feed::FeedConnector;
use linewatch_monitor::{MachineMonitor, MonitorOptions};
use linewatch_network::auth::TokenManager;
use linewatch_network::http_client::HttpMachineApi;
use linewatch_network::ws_client::WsFeedConnector;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cli::Credentials;

/// 조립된 런타임 구성 요소
pub struct Wiring {
    /// 설비 모니터 (아직 시작 전)
    pub monitor: MachineMonitor,
    /// 세션 토큰 관리자
    pub token_manager: Arc<TokenManager>,
    /// 로그인한 작업자 이름
    pub operator: Option<String>,
}

/// 설정과 자격 증명으로 모니터 조립
///
/// 로그인 실패는 에러로 반환한다.
pub async fn build(config: &AppConfig, credentials: &Credentials) -> Result<Wiring, CoreError> {
    config.validate()?;

    let token_manager = Arc::new(TokenManager::new(&config.server.base_url));
    token_manager
        .login(&credentials.email, &credentials.password)
        .await?;

    let operator = match token_manager.fetch_profile().await {
        Ok(profile) => {
            info!("작업자: {}", profile.name);
            Some(profile.name)
        }
        Err(e) => {
            warn!("프로필 조회 실패: {e}");
            None
        }
    };

    let api = Arc::new(HttpMachineApi::new(
        &config.server.base_url,
        token_manager.clone(),
        config.request_timeout(),
    )?);
    if let Err(e) = api.fetch_csrf_token().await {
        warn!("CSRF 토큰 조회 실패, 토큰 없이 진행: {e}");
    }

    let connector: Option<Arc<dyn FeedConnector>> = if config.feed.enabled {
        info!("라이브 피드: {}", config.feed.url);
        Some(Arc::new(WsFeedConnector::new(&config.feed.url)))
    } else {
        info!("라이브 피드 비활성화");
        None
    };

    let monitor = MachineMonitor::new(api, connector, MonitorOptions::from_config(config));

    Ok(Wiring {
        monitor,
        token_manager,
        operator,
    })
}
