//! WebSocket 피드 커넥터.
//!
//! `tokio-tungstenite` 기반. 호출마다 연결 하나를 열고 수신 프레임을 채널로 넘긴다.
//! 재연결은 하지 않는다 (상위 `supervisor` 담당).

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use linewatch_core::error::CoreError;
use linewatch_core::models::feed::FeedFrame;
use linewatch_core::ports::feed::{FeedConnector, FeedSender, FeedSession};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// 수신 채널 버퍼 크기
const INBOUND_BUFFER: usize = 64;

/// WebSocket 피드 커넥터: `FeedConnector` 포트 구현
pub struct WsFeedConnector {
    url: String,
}

impl WsFeedConnector {
    /// 새 커넥터 생성 (`ws://` 또는 `wss://` URL)
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
        }
    }

    /// 대상 URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// 수신 루프
    async fn read_loop(mut read: SplitStream<WsStream>, tx: mpsc::Sender<FeedFrame>) {
        while let Some(msg) = read.next().await {
            let frame = match msg {
                Ok(Message::Text(text)) => FeedFrame::Text(text.as_str().to_string()),
                Ok(Message::Binary(data)) => FeedFrame::Binary(data.to_vec()),
                Ok(Message::Close(_)) => {
                    let _ = tx.send(FeedFrame::Close).await;
                    break;
                }
                Ok(_) => continue, // Ping/Pong은 자동 처리
                Err(e) => {
                    warn!("피드 수신 에러: {e}");
                    let _ = tx.send(FeedFrame::Error(e.to_string())).await;
                    break;
                }
            };
            if tx.send(frame).await.is_err() {
                break;
            }
        }
        debug!("피드 수신 루프 종료");
    }
}

#[async_trait]
impl FeedConnector for WsFeedConnector {
    async fn connect(&self) -> Result<FeedSession, CoreError> {
        info!("피드 연결: {}", self.url);

        let (ws_stream, _) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| CoreError::Feed(format!("WebSocket 연결 실패: {e}")))?;

        let (write, read) = ws_stream.split();
        let (tx, rx) = mpsc::channel(INBOUND_BUFFER);

        tokio::spawn(Self::read_loop(read, tx));

        Ok(FeedSession {
            sender: Box::new(WsSender {
                write: Arc::new(tokio::sync::Mutex::new(write)),
            }),
            inbound: rx,
        })
    }
}

/// WebSocket 송신기
pub struct WsSender {
    write: Arc<tokio::sync::Mutex<SplitSink<WsStream, Message>>>,
}

#[async_trait]
impl FeedSender for WsSender {
    async fn send_text(&self, text: &str) -> Result<(), CoreError> {
        let mut write = self.write.lock().await;
        write
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| CoreError::Feed(format!("WebSocket 전송 실패: {e}")))
    }

    async fn close(&self) -> Result<(), CoreError> {
        let mut write = self.write.lock().await;
        write
            .send(Message::Close(None))
            .await
            .map_err(|e| CoreError::Feed(format!("WebSocket 종료 실패: {e}")))
    }
}
