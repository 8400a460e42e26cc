//! 라이브 카운트 피드 메시지 모델.

use serde::Serialize;

/// 피드 연결에서 수신한 프레임
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedFrame {
    /// 텍스트 메시지 (JSON)
    Text(String),
    /// 바이너리 메시지
    Binary(Vec<u8>),
    /// 연결 종료
    Close,
    /// 수신 에러
    Error(String),
}

/// 연결 직후 한 번 보내는 인증 핸드셰이크
#[derive(Debug, Clone, Serialize)]
pub struct AuthHandshake {
    #[serde(rename = "type")]
    kind: &'static str,
    /// 사용자명
    pub username: String,
    /// 비밀번호
    pub password: String,
}

impl AuthHandshake {
    /// 새 핸드셰이크 메시지
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            kind: "auth",
            username: username.into(),
            password: password.into(),
        }
    }
}

/// 텍스트 메시지 해석 결과
#[derive(Debug, Clone, PartialEq)]
pub enum FeedPayload {
    /// 생산 카운트
    Count(u64),
    /// JSON이지만 `count` 필드가 없음 (무시)
    Unrecognized(serde_json::Value),
    /// JSON 파싱 실패 (무시)
    Malformed(String),
}

impl FeedPayload {
    /// 텍스트 메시지 해석
    ///
    /// `count`는 음이 아닌 정수(또는 소수부가 0인 실수)만 인정한다.
    pub fn parse(text: &str) -> Self {
        let value: serde_json::Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => return FeedPayload::Malformed(e.to_string()),
        };

        let count = value.get("count").and_then(|c| {
            c.as_u64().or_else(|| {
                c.as_f64()
                    .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
                    .map(|f| f as u64)
            })
        });

        match count {
            Some(n) => FeedPayload::Count(n),
            None => FeedPayload::Unrecognized(value),
        }
    }
}
