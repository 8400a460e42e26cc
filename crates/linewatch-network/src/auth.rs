//! 세션 토큰 관리.
//!
//! `/api/token/`으로 로그인하고 만료가 가까워지면 `/api/token/refresh/`로 갱신한다.
//! 다른 어댑터는 생성 시 `Arc<TokenManager>`를 받아 `get_token()`만 호출한다.
//!
//! 폴링 요청이 겹칠 수 있으므로 갱신은 한 번에 하나만 진행하고,
//! 기다리던 호출은 갱신된 토큰을 그대로 쓴다.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use linewatch_core::error::CoreError;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// `exp` 클레임이 없는 토큰의 가정 수명 (초)
const FALLBACK_LIFETIME_SECS: i64 = 300;

/// 만료 전 갱신 여유 (초)
const REFRESH_MARGIN_SECS: i64 = 30;

#[derive(Debug, Deserialize)]
struct TokenPair {
    access: String,
    refresh: Option<String>,
}

/// 작업자 프로필 (`GET /api/me/`)
#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    /// 표시 이름
    #[serde(rename = "nome", default)]
    pub name: String,
    /// 로그인 이메일 (서버가 생략할 수 있음)
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone)]
struct Session {
    access: String,
    refresh: Option<String>,
    expires_at: DateTime<Utc>,
}

impl Session {
    fn new(access: String, refresh: Option<String>) -> Self {
        let expires_at = jwt_expiry(&access)
            .unwrap_or_else(|| Utc::now() + Duration::seconds(FALLBACK_LIFETIME_SECS));
        Self {
            access,
            refresh,
            expires_at,
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    fn is_expiring(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(REFRESH_MARGIN_SECS) >= self.expires_at
    }
}

/// JWT 페이로드의 `exp` (서명은 확인하지 않음)
fn jwt_expiry(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    DateTime::from_timestamp(claims.get("exp")?.as_i64()?, 0)
}

fn not_authenticated() -> CoreError {
    CoreError::Auth("인증되지 않음".to_string())
}

/// 세션 토큰 관리자
pub struct TokenManager {
    base_url: String,
    client: reqwest::Client,
    session: RwLock<Option<Session>>,
    refreshing: Mutex<()>,
}

impl TokenManager {
    /// 로그인 전 상태로 생성
    ///
    /// `base_url` 끝의 `/`는 제거한다. 토큰은 `login` 또는 `set_tokens`로 채운다.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            session: RwLock::new(None),
            refreshing: Mutex::new(()),
        }
    }

    /// 토큰 발급 요청 공통 처리
    ///
    /// 전송 실패는 `Network`, 4xx는 `Auth`, 5xx는 `ServiceUnavailable`.
    async fn request_tokens(
        &self,
        path: &str,
        body: serde_json::Value,
        what: &str,
    ) -> Result<TokenPair, CoreError> {
        let url = format!("{}{path}", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("{what} 요청 실패: {e}")))?;

        let status = resp.status();
        if status.is_server_error() {
            return Err(CoreError::ServiceUnavailable(format!("{what} 실패 ({status})")));
        }
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(CoreError::Auth(format!("{what} 실패 ({status}): {detail}")));
        }

        resp.json()
            .await
            .map_err(|e| CoreError::Auth(format!("{what} 응답 파싱 실패: {e}")))
    }

    /// 이메일/비밀번호 로그인
    pub async fn login(&self, email: &str, password: &str) -> Result<(), CoreError> {
        let pair = self
            .request_tokens(
                "/api/token/",
                json!({ "email": email, "password": password }),
                "로그인",
            )
            .await?;

        let session = Session::new(pair.access, pair.refresh);
        info!("로그인 성공 (토큰 만료 {})", session.expires_at);
        *self.session.write().await = Some(session);
        Ok(())
    }

    /// 외부에서 받은 토큰으로 세션 설정
    pub async fn set_tokens(&self, access: &str, refresh: Option<&str>) {
        let session = Session::new(access.to_string(), refresh.map(str::to_string));
        *self.session.write().await = Some(session);
    }

    /// refresh 토큰으로 액세스 토큰 갱신
    pub async fn refresh(&self) -> Result<(), CoreError> {
        let refresh = {
            let session = self.session.read().await;
            let session = session.as_ref().ok_or_else(not_authenticated)?;
            session
                .refresh
                .clone()
                .ok_or_else(|| CoreError::Auth("refresh 토큰 없음".to_string()))?
        };

        let pair = self
            .request_tokens("/api/token/refresh/", json!({ "refresh": refresh }), "토큰 갱신")
            .await?;

        // 회전하지 않는 서버는 refresh를 다시 주지 않는다
        let session = Session::new(pair.access, pair.refresh.or(Some(refresh)));
        debug!("토큰 갱신 (새 만료 {})", session.expires_at);
        *self.session.write().await = Some(session);
        Ok(())
    }

    /// 유효한 액세스 토큰
    ///
    /// 만료가 가까우면 먼저 갱신한다. 갱신에 실패해도 아직 만료 전이면 기존 토큰을 준다.
    pub async fn get_token(&self) -> Result<String, CoreError> {
        if let Some(token) = self.fresh_token().await? {
            return Ok(token);
        }

        let _guard = self.refreshing.lock().await;
        // 기다리는 동안 다른 호출이 갱신했을 수 있다
        if let Some(token) = self.fresh_token().await? {
            return Ok(token);
        }

        let refreshed = self.refresh().await;
        let session = self.session.read().await;
        let session = session.as_ref().ok_or_else(not_authenticated)?;
        match refreshed {
            Ok(()) => Ok(session.access.clone()),
            Err(e) if !session.is_expired(Utc::now()) => {
                warn!("토큰 갱신 실패, 기존 토큰 사용: {e}");
                Ok(session.access.clone())
            }
            Err(e) => Err(CoreError::Auth(format!("토큰 만료, 갱신 실패: {e}"))),
        }
    }

    /// 만료가 멀었으면 `Some(token)`, 세션이 없으면 에러
    async fn fresh_token(&self) -> Result<Option<String>, CoreError> {
        let session = self.session.read().await;
        let session = session.as_ref().ok_or_else(not_authenticated)?;
        Ok((!session.is_expiring(Utc::now())).then(|| session.access.clone()))
    }

    /// 로그인한 작업자 프로필
    pub async fn fetch_profile(&self) -> Result<UserProfile, CoreError> {
        let token = self.get_token().await?;
        let resp = self
            .client
            .get(format!("{}/api/me/", self.base_url))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("프로필 요청 실패: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CoreError::Auth(format!("프로필 조회 실패 ({status})")));
        }
        resp.json()
            .await
            .map_err(|e| CoreError::MalformedResponse(format!("프로필 파싱 실패: {e}")))
    }

    /// 로컬 세션 폐기
    pub async fn logout(&self) {
        if self.session.write().await.take().is_some() {
            debug!("로그아웃");
        }
    }

    /// 만료 전 세션 보유 여부
    pub async fn is_authenticated(&self) -> bool {
        self.session
            .read()
            .await
            .as_ref()
            .is_some_and(|s| !s.is_expired(Utc::now()))
    }
}
