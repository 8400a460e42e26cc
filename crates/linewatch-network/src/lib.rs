//! # linewatch-network
//!
//! HTTP/WebSocket 네트워크 어댑터.
//! 설비 REST API 호출, JWT 인증, 라이브 카운트 피드 연결을 담당한다.
//!
//! ## 사용 예시
//!
//! ```rust,ignore
//! use linewatch_network::auth::TokenManager;
//! use linewatch_network::http_client::HttpMachineApi;
//! use linewatch_network::ws_client::WsFeedConnector;
//! ```

pub mod auth;
pub mod http_client;
pub mod ws_client;
