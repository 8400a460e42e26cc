//! 라이브 피드 연결 포트.
//!
//! 구현: `linewatch-network` crate (tokio-tungstenite).
//! 재연결 정책은 포트 밖(`supervisor`)에 있으며, 커넥터는 연결 한 번만 담당한다.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::CoreError;
use crate::models::feed::FeedFrame;

/// 수립된 피드 연결
pub struct FeedSession {
    /// 송신기
    pub sender: Box<dyn FeedSender>,
    /// 수신 프레임 (송신측이 닫히면 연결 종료로 간주)
    pub inbound: mpsc::Receiver<FeedFrame>,
}

/// 피드 송신기
#[async_trait]
pub trait FeedSender: Send + Sync {
    /// 텍스트 메시지 전송
    async fn send_text(&self, text: &str) -> Result<(), CoreError>;

    /// 연결 종료
    async fn close(&self) -> Result<(), CoreError>;
}

/// 피드 커넥터: 호출마다 새 연결 하나를 연다
#[async_trait]
pub trait FeedConnector: Send + Sync {
    /// 연결 수립
    async fn connect(&self) -> Result<FeedSession, CoreError>;
}
