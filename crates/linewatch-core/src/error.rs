//! LINEWATCH 핵심 에러 타입.
//!
//! 모든 어댑터 crate는 이 에러 타입을 그대로 반환한다.

use thiserror::Error;

/// 코어 레이어 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// 필드 유효성 검증 실패
    #[error("유효성 검증 실패 ({field}): {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// 인증 실패 (토큰 만료, 자격증명 오류 등)
    #[error("인증 에러: {0}")]
    Auth(String),

    /// 리소스를 찾을 수 없음
    #[error("{resource_type} 미발견: {id}")]
    NotFound {
        /// 리소스 종류 (예: "machine-data")
        resource_type: String,
        /// 리소스 식별자
        id: String,
    },

    /// 네트워크 에러 (연결 실패, 타임아웃)
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 서비스 일시 불가 (503)
    #[error("서비스 일시 불가: {0}")]
    ServiceUnavailable(String),

    /// 서버가 거부한 요청 (4xx)
    #[error("요청 거부 ({status}): {message}")]
    Rejected {
        /// HTTP 상태 코드
        status: u16,
        /// 응답 본문
        message: String,
    },

    /// 서버 응답 형식이 예상과 다름
    #[error("잘못된 응답 형식: {0}")]
    MalformedResponse(String),

    /// 라이브 피드 연결 실패
    #[error("피드 연결 에러: {0}")]
    Feed(String),
}

impl CoreError {
    /// 다음 폴링 주기에 자연히 재시도될 일시적 에러인지 판별
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CoreError::Network(_) | CoreError::ServiceUnavailable(_) | CoreError::Feed(_)
        )
    }
}
