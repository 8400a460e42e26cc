//! 애플리케이션 설정 구조체.
//!
//! API 서버 URL, 폴링 주기, 라이브 피드 재연결 정책, 생산 설비 이름 등
//! 런타임 설정을 정의한다. [`crate::config_manager::ConfigManager`]를 통해
//! JSON 파일에서 로드하고, CLI 인자/환경변수로 덮어쓴다.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::CoreError;

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API 서버 연결 설정
    pub server: ServerConfig,
    /// 상태 폴링 설정
    #[serde(default)]
    pub poller: PollerConfig,
    /// 라이브 카운트 피드 설정
    #[serde(default)]
    pub feed: FeedConfig,
    /// 생산 설비 설정
    #[serde(default)]
    pub production: ProductionConfig,
}

// ============================================================
// 서버 설정
// ============================================================

/// API 서버 연결 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// API 서버 기본 URL (예: "https://api.example.com")
    pub base_url: String,
    /// 요청 타임아웃 (밀리초)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

// ============================================================
// 폴링 설정
// ============================================================

/// 상태 폴링 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    /// 최신 상태 조회 주기 (밀리초)
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
    /// 정지 시간 카운터 갱신 주기 (밀리초)
    #[serde(default = "default_ticker_interval_ms")]
    pub ticker_interval_ms: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
            ticker_interval_ms: default_ticker_interval_ms(),
        }
    }
}

// ============================================================
// 라이브 피드 설정
// ============================================================

/// 라이브 카운트 피드 설정: 재연결 정책 포함
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// 피드 활성화 여부
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// WebSocket URL (ws:// 또는 wss://)
    #[serde(default = "default_feed_url")]
    pub url: String,
    /// 연속 실패 허용 횟수 (도달 시 영구 실패)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// 재연결 대기 시간 (밀리초, 고정)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// 인증 핸드셰이크 사용자명 (None이면 핸드셰이크 생략)
    #[serde(default)]
    pub username: Option<String>,
    /// 인증 핸드셰이크 비밀번호 (환경변수 LINEWATCH_FEED_PASSWORD 권장)
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: default_feed_url(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            username: None,
            password: None,
        }
    }
}

// ============================================================
// 생산 설비 설정
// ============================================================

/// 생산 설비 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionConfig {
    /// 생산 시작/종료/불량 요청에 실리는 설비 이름
    #[serde(default = "default_machine_name")]
    pub machine_name: String,
}

impl Default for ProductionConfig {
    fn default() -> Self {
        Self {
            machine_name: default_machine_name(),
        }
    }
}

// ============================================================
// AppConfig impl
// ============================================================

impl AppConfig {
    /// 기본 설정값 반환
    pub fn default_config() -> Self {
        Self {
            server: ServerConfig {
                base_url: "http://127.0.0.1:8000".to_string(),
                request_timeout_ms: default_request_timeout_ms(),
            },
            poller: PollerConfig::default(),
            feed: FeedConfig::default(),
            production: ProductionConfig::default(),
        }
    }

    /// 서버 요청 타임아웃을 Duration으로 반환
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.server.request_timeout_ms)
    }

    /// 상태 폴링 주기를 Duration으로 반환
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poller.interval_ms)
    }

    /// 정지 시간 카운터 주기를 Duration으로 반환
    pub fn ticker_interval(&self) -> Duration {
        Duration::from_millis(self.poller.ticker_interval_ms)
    }

    /// 피드 재연결 대기 시간을 Duration으로 반환
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.feed.retry_delay_ms)
    }

    /// 설정값 검증
    pub fn validate(&self) -> Result<(), CoreError> {
        if !(self.server.base_url.starts_with("http://")
            || self.server.base_url.starts_with("https://"))
        {
            return Err(CoreError::Validation {
                field: "server.base_url".to_string(),
                message: format!("http(s) URL이 아님: {}", self.server.base_url),
            });
        }
        if self.poller.interval_ms == 0 {
            return Err(CoreError::Validation {
                field: "poller.interval_ms".to_string(),
                message: "0보다 커야 함".to_string(),
            });
        }
        if self.poller.ticker_interval_ms == 0 {
            return Err(CoreError::Validation {
                field: "poller.ticker_interval_ms".to_string(),
                message: "0보다 커야 함".to_string(),
            });
        }
        if self.feed.enabled {
            if !(self.feed.url.starts_with("ws://") || self.feed.url.starts_with("wss://")) {
                return Err(CoreError::Validation {
                    field: "feed.url".to_string(),
                    message: format!("ws(s) URL이 아님: {}", self.feed.url),
                });
            }
            if self.feed.max_attempts == 0 {
                return Err(CoreError::Validation {
                    field: "feed.max_attempts".to_string(),
                    message: "최소 1 이상".to_string(),
                });
            }
        }
        if self.production.machine_name.trim().is_empty() {
            return Err(CoreError::Validation {
                field: "production.machine_name".to_string(),
                message: "비어 있음".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================
// 기본값 함수
// ============================================================

fn default_true() -> bool {
    true
}
fn default_request_timeout_ms() -> u64 {
    30_000
}
fn default_poll_interval_ms() -> u64 {
    5_000
}
fn default_ticker_interval_ms() -> u64 {
    1_000
}
fn default_feed_url() -> String {
    "ws://127.0.0.1:8000/ws/production-count/".to_string()
}
fn default_max_attempts() -> u32 {
    10
}
fn default_retry_delay_ms() -> u64 {
    3_000
}
fn default_machine_name() -> String {
    "Furadeira F400".to_string()
}
