//! HTTP REST API 클라이언트.
//!
//! `MachineApi` 포트 구현. JWT 인증 헤더 자동 주입 + CSRF 토큰 첨부.
//! 모든 요청은 단발성이며 재시도하지 않는다.

use async_trait::async_trait;
use linewatch_core::error::CoreError;
use linewatch_core::models::machine::MachineRecord;
use linewatch_core::models::production::{
    OrderPage, ProductionOrder, ScrapRequest, StartProductionRequest, StopProductionRequest,
};
use linewatch_core::ports::machine_api::MachineApi;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::auth::TokenManager;

/// CSRF 토큰 헤더
const CSRF_HEADER: &str = "X-CSRFToken";

/// `GET /api/csrf-token/` 응답
#[derive(Debug, Deserialize)]
struct CsrfResponse {
    #[serde(rename = "csrfToken")]
    csrf_token: String,
}

/// 설비 REST API 클라이언트: `MachineApi` 포트 구현
pub struct HttpMachineApi {
    client: reqwest::Client,
    base_url: String,
    token_manager: Arc<TokenManager>,
    csrf_token: RwLock<Option<String>>,
}

impl HttpMachineApi {
    /// 새 HTTP API 클라이언트 생성
    pub fn new(
        base_url: &str,
        token_manager: Arc<TokenManager>,
        timeout: Duration,
    ) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 빌드 실패: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token_manager,
            csrf_token: RwLock::new(None),
        })
    }

    /// CSRF 토큰 조회 후 캐시
    ///
    /// 이후 쓰기 요청에 `X-CSRFToken` 헤더로 첨부된다.
    pub async fn fetch_csrf_token(&self) -> Result<String, CoreError> {
        let url = format!("{}/api/csrf-token/", self.base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("CSRF 토큰 요청 실패: {e}")))?;

        let resp = self.check_response(resp).await?;
        let body: CsrfResponse = resp
            .json()
            .await
            .map_err(|e| CoreError::MalformedResponse(format!("CSRF 응답 파싱 실패: {e}")))?;

        debug!("CSRF 토큰 수신");
        *self.csrf_token.write().await = Some(body.csrf_token.clone());
        Ok(body.csrf_token)
    }

    /// Authorization 헤더가 포함된 요청 빌더 반환
    async fn authorized_request(
        &self,
        method: reqwest::Method,
        path: &str,
    ) -> Result<reqwest::RequestBuilder, CoreError> {
        let token = self.token_manager.get_token().await?;
        let url = format!("{}{}", self.base_url, path);
        Ok(self.client.request(method, &url).bearer_auth(token))
    }

    /// 쓰기 요청 빌더: 캐시된 CSRF 토큰이 있으면 첨부
    async fn write_request(
        &self,
        method: reqwest::Method,
        path: &str,
    ) -> Result<reqwest::RequestBuilder, CoreError> {
        let req = self.authorized_request(method, path).await?;
        let csrf = self.csrf_token.read().await.clone();
        Ok(match csrf {
            Some(token) => req.header(CSRF_HEADER, token),
            None => req,
        })
    }

    /// 응답 상태 코드 확인 및 에러 매핑
    async fn check_response(
        &self,
        resp: reqwest::Response,
    ) -> Result<reqwest::Response, CoreError> {
        let status = resp.status();

        if status.is_success() {
            return Ok(resp);
        }

        let status_code = status.as_u16();
        let path = resp.url().path().to_string();
        let text = resp.text().await.unwrap_or_else(|e| {
            warn!("응답 본문 읽기 실패: {e}");
            String::new()
        });

        match status_code {
            401 => Err(CoreError::Auth(format!("인증 실패: {text}"))),
            404 => Err(CoreError::NotFound {
                resource_type: "endpoint".to_string(),
                id: path,
            }),
            503 => Err(CoreError::ServiceUnavailable(text)),
            400..=499 => Err(CoreError::Rejected {
                status: status_code,
                message: text,
            }),
            _ => Err(CoreError::Network(format!("API 에러 ({status}): {text}"))),
        }
    }
}

#[async_trait]
impl MachineApi for HttpMachineApi {
    async fn fetch_machine_data(&self) -> Result<Vec<MachineRecord>, CoreError> {
        let req = self
            .authorized_request(reqwest::Method::GET, "/api/machine-data/")
            .await?;

        let resp = req
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("설비 데이터 요청 실패: {e}")))?;
        let resp = self.check_response(resp).await?;

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| CoreError::MalformedResponse(format!("설비 데이터 파싱 실패: {e}")))?;
        if !body.is_array() {
            return Err(CoreError::MalformedResponse(
                "설비 데이터 응답이 목록이 아님".to_string(),
            ));
        }

        let records: Vec<MachineRecord> = serde_json::from_value(body)?;
        debug!("설비 데이터 {}건 수신", records.len());
        Ok(records)
    }

    async fn start_production(&self, request: &StartProductionRequest) -> Result<(), CoreError> {
        debug!("생산 시작 요청: {}", request.machine_name);

        let req = self
            .write_request(reqwest::Method::POST, "/api/production/start/")
            .await?;
        let resp = req
            .json(request)
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("생산 시작 요청 실패: {e}")))?;

        self.check_response(resp).await?;
        Ok(())
    }

    async fn stop_production(&self, request: &StopProductionRequest) -> Result<(), CoreError> {
        debug!(
            "생산 종료 요청: {} (수량 {}, 불량 {})",
            request.machine_name, request.count, request.scrap
        );

        let req = self
            .write_request(reqwest::Method::POST, "/api/production/stop/")
            .await?;
        let resp = req
            .json(request)
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("생산 종료 요청 실패: {e}")))?;

        self.check_response(resp).await?;
        Ok(())
    }

    async fn record_scrap(&self, request: &ScrapRequest) -> Result<(), CoreError> {
        debug!("불량 기록 요청: {} (수량 {})", request.machine_name, request.count);

        let req = self
            .write_request(reqwest::Method::PATCH, "/api/production/update-refugos/")
            .await?;
        let resp = req
            .json(request)
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("불량 기록 요청 실패: {e}")))?;

        self.check_response(resp).await?;
        Ok(())
    }

    async fn search_orders(&self, query: &str) -> Result<Vec<ProductionOrder>, CoreError> {
        let mut url = url::Url::parse(&format!("{}/api/production-orders/", self.base_url))
            .map_err(|e| CoreError::Config(format!("잘못된 서버 URL: {e}")))?;
        url.query_pairs_mut().append_pair("search", query);

        let token = self.token_manager.get_token().await?;
        let resp = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("생산 오더 검색 실패: {e}")))?;
        let resp = self.check_response(resp).await?;

        let page: OrderPage = resp
            .json()
            .await
            .map_err(|e| CoreError::MalformedResponse(format!("오더 목록 파싱 실패: {e}")))?;
        debug!("생산 오더 {}건 검색됨 (질의: {query:?})", page.results.len());
        Ok(page.results)
    }
}
