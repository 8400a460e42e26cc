//! 설정 파일 관리.
//!
//! `AppConfig`를 JSON 파일 하나로 보관한다. 파일이 없으면 기본값으로 만들고,
//! 쓰기는 임시 파일에 먼저 기록한 뒤 교체한다.
//!
//! 피드 비밀번호는 파일에 기록되지 않으므로 환경 변수로 주입된 값은
//! 메모리에만 있다. `update`/`reload`는 이 값을 유지한다.

use crate::config::AppConfig;
use crate::error::CoreError;
use directories::ProjectDirs;
use parking_lot::RwLock;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 설정 파일 이름
const CONFIG_FILE_NAME: &str = "linewatch.json";

fn io_error(action: &str, path: &Path, e: impl Display) -> CoreError {
    CoreError::Config(format!("{action} 실패 ({}): {e}", path.display()))
}

/// 설정 관리자
#[derive(Debug, Clone)]
pub struct ConfigManager {
    current: Arc<RwLock<AppConfig>>,
    path: PathBuf,
}

impl ConfigManager {
    /// 플랫폼 설정 디렉토리의 기본 파일 사용
    pub fn new() -> Result<Self, CoreError> {
        Self::with_path(Self::default_path()?)
    }

    /// `path`가 있으면 그 파일, 없으면 기본 파일
    pub fn open(path: Option<PathBuf>) -> Result<Self, CoreError> {
        match path {
            Some(path) => Self::with_path(path),
            None => Self::new(),
        }
    }

    /// 지정 경로 사용 (상위 디렉토리 자동 생성)
    pub fn with_path(path: PathBuf) -> Result<Self, CoreError> {
        let config = if path.exists() {
            read_config(&path)?
        } else {
            let config = AppConfig::default_config();
            write_config(&path, &config)?;
            info!("기본 설정 파일 생성: {}", path.display());
            config
        };

        Ok(Self {
            current: Arc::new(RwLock::new(config)),
            path,
        })
    }

    /// 기본 설정 파일 경로
    ///
    /// Linux 기준 `~/.config/linewatch/linewatch.json`.
    pub fn default_path() -> Result<PathBuf, CoreError> {
        ProjectDirs::from("com", "linewatch", "linewatch")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
            .ok_or_else(|| CoreError::Config("홈 디렉토리를 찾을 수 없습니다".to_string()))
    }

    /// 현재 설정 (복제본)
    pub fn get(&self) -> AppConfig {
        self.current.read().clone()
    }

    /// 설정 파일 경로
    pub fn config_path(&self) -> &Path {
        &self.path
    }

    /// 검증 후 저장하고 교체
    ///
    /// 새 설정에 피드 비밀번호가 없으면 기존 값을 이어받는다.
    pub fn update(&self, mut config: AppConfig) -> Result<(), CoreError> {
        config.validate()?;
        if config.feed.password.is_none() {
            config.feed.password = self.current.read().feed.password.clone();
        }
        write_config(&self.path, &config)?;
        *self.current.write() = config;
        debug!("설정 저장: {}", self.path.display());
        Ok(())
    }

    /// 현재 설정을 수정해 저장, 저장된 설정 반환
    pub fn update_with<F>(&self, edit: F) -> Result<AppConfig, CoreError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.get();
        edit(&mut config);
        self.update(config)?;
        Ok(self.get())
    }

    /// 파일에서 다시 읽기
    ///
    /// 파일 내용이 검증을 통과하지 못하면 현재 설정을 유지하고 에러를 돌려준다.
    pub fn reload(&self) -> Result<(), CoreError> {
        let mut config = read_config(&self.path)?;
        if let Err(e) = config.validate() {
            warn!("다시 읽은 설정이 유효하지 않아 무시: {e}");
            return Err(e);
        }

        let mut current = self.current.write();
        config.feed.password = current.feed.password.take();
        *current = config;
        info!("설정 다시 로드: {}", self.path.display());
        Ok(())
    }
}

fn read_config(path: &Path) -> Result<AppConfig, CoreError> {
    let raw = fs::read_to_string(path).map_err(|e| io_error("설정 파일 읽기", path, e))?;
    serde_json::from_str(&raw).map_err(|e| io_error("설정 파일 파싱", path, e))
}

fn write_config(path: &Path, config: &AppConfig) -> Result<(), CoreError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| io_error("설정 디렉토리 생성", dir, e))?;
    }

    let json = serde_json::to_string_pretty(config)?;
    let staging = path.with_extension("json.tmp");
    fs::write(&staging, json).map_err(|e| io_error("설정 파일 쓰기", &staging, e))?;
    fs::rename(&staging, path).map_err(|e| io_error("설정 파일 교체", path, e))
}
