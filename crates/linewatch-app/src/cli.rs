//! CLI 인자 및 환경 변수.

use clap::{Parser, Subcommand};
use linewatch_core::config::AppConfig;
use std::path::PathBuf;

/// 로그인 이메일 환경 변수
pub const ENV_EMAIL: &str = "LINEWATCH_EMAIL";
/// 로그인 비밀번호 환경 변수
pub const ENV_PASSWORD: &str = "LINEWATCH_PASSWORD";
/// 피드 사용자명 환경 변수
pub const ENV_FEED_USER: &str = "LINEWATCH_FEED_USER";
/// 피드 비밀번호 환경 변수
pub const ENV_FEED_PASSWORD: &str = "LINEWATCH_FEED_PASSWORD";

/// LINEWATCH 설비 상태 모니터
///
/// 생산 라인 설비의 가동/정지 상태와 라이브 생산 카운트를 추적한다.
/// 명령 없이 실행하면 `monitor`와 같다.
#[derive(Parser, Debug)]
#[command(name = "linewatch")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// 서버 URL 지정 (기본: http://127.0.0.1:8000)
    #[arg(long, short = 's')]
    pub server: Option<String>,

    /// 라이브 피드 URL (ws:// 또는 wss://)
    #[arg(long)]
    pub feed_url: Option<String>,

    /// 라이브 피드 비활성화 (폴링만)
    #[arg(long)]
    pub no_feed: bool,

    /// 상태 폴링 간격 (밀리초)
    #[arg(long)]
    pub poll_interval: Option<u64>,

    /// 설비 이름
    #[arg(long, short = 'm')]
    pub machine: Option<String>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info")]
    pub log_level: String,

    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉토리의 linewatch.json)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// 실행 모드
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// 상태 모니터 실행 (종료 시그널까지)
    Monitor {
        /// 시작 전에 검색해 선택할 생산 오더 (첫 결과)
        #[arg(long)]
        order: Option<String>,
    },

    /// 생산 시작 보고
    Start,

    /// 생산 종료 보고
    Stop {
        /// 최종 생산 수량
        count: u64,

        /// 불량 수량
        #[arg(long, default_value_t = 0)]
        scrap: u64,
    },

    /// 불량 수량 기록
    Scrap {
        /// 불량 수량
        count: u64,
    },

    /// 생산 오더 검색 (검색어가 없으면 전체)
    Orders {
        #[arg(default_value = "")]
        query: String,
    },
}

impl Args {
    /// 실행할 명령 (없으면 모니터)
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or(Command::Monitor { order: None })
    }

    /// 크레이트별 로그 필터 (RUST_LOG가 있으면 그쪽이 우선)
    pub fn log_filter(&self) -> String {
        [
            "linewatch",
            "linewatch_app",
            "linewatch_core",
            "linewatch_network",
            "linewatch_monitor",
        ]
        .iter()
        .map(|target| format!("{target}={}", self.log_level))
        .collect::<Vec<_>>()
        .join(",")
    }

    /// CLI 인자로 설정 오버라이드
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(server) = &self.server {
            config.server.base_url = server.clone();
        }
        if let Some(url) = &self.feed_url {
            config.feed.url = url.clone();
        }
        if self.no_feed {
            config.feed.enabled = false;
        }
        if let Some(ms) = self.poll_interval {
            config.poller.interval_ms = ms;
        }
        if let Some(machine) = &self.machine {
            config.production.machine_name = machine.clone();
        }
    }
}

/// REST 로그인 자격 증명
#[derive(Clone)]
pub struct Credentials {
    /// 이메일
    pub email: String,
    /// 비밀번호
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

impl Credentials {
    /// 환경 변수에서 로드 (둘 중 하나라도 없으면 None)
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 임의 조회 함수로 로드
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let email = lookup(ENV_EMAIL).filter(|v| !v.is_empty())?;
        let password = lookup(ENV_PASSWORD).filter(|v| !v.is_empty())?;
        Some(Self { email, password })
    }
}

/// 피드 자격 증명을 설정에 반영 (환경 변수가 설정 파일보다 우선)
pub fn apply_feed_credentials(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(user) = lookup(ENV_FEED_USER) {
        config.feed.username = Some(user);
    }
    if let Some(password) = lookup(ENV_FEED_PASSWORD) {
        config.feed.password = Some(password);
    }
}
