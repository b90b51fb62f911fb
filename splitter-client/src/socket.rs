//! WebSocket connection seam.
//!
//! The realtime channel only needs text frames, a close signal and the
//! ability to send text back. [`TungsteniteConnector`] provides that over
//! `tokio-tungstenite`; tests plug in an in-memory connector.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("Connection failed: {0}")]
    Connect(String),
    #[error("Connection closed")]
    Closed,
}

impl From<tokio_tungstenite::tungstenite::Error> for SocketError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(err))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Close,
    /// Binary, ping and pong frames. The channel ignores them.
    Other,
}

#[async_trait]
pub trait SocketConnection: Send {
    /// Next inbound frame, or `None` once the stream has ended.
    async fn next_frame(&mut self) -> Option<Result<Frame, SocketError>>;

    async fn send_text(&mut self, text: String) -> Result<(), SocketError>;

    async fn close(&mut self) -> Result<(), SocketError>;
}

#[async_trait]
pub trait SocketConnector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn SocketConnection>, SocketError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

#[async_trait]
impl SocketConnector for TungsteniteConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn SocketConnection>, SocketError> {
        let (stream, _) = tokio_tungstenite::connect_async(url).await?;
        Ok(Box::new(TungsteniteConnection { stream }))
    }
}

pub struct TungsteniteConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl SocketConnection for TungsteniteConnection {
    async fn next_frame(&mut self) -> Option<Result<Frame, SocketError>> {
        let message = self.stream.next().await?;
        Some(message.map(frame_from_message).map_err(SocketError::from))
    }

    async fn send_text(&mut self, text: String) -> Result<(), SocketError> {
        self.stream.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SocketError> {
        self.stream.close(None).await?;
        Ok(())
    }
}

fn frame_from_message(message: Message) -> Frame {
    match message {
        Message::Text(text) => Frame::Text(text),
        Message::Close(_) => Frame::Close,
        _ => Frame::Other,
    }
}
