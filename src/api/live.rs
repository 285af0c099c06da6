//! Live chat channel: one WebSocket per open delivery chat.

use async_trait::async_trait;
use futures::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use std::sync::Arc;
use tokio::{
    net::TcpStream,
    sync::{Mutex, broadcast, watch},
    task::JoinHandle,
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use super::models::ChatMessage;
use crate::{error::RemoteError, session::SessionStore};

/// Transport state of the live channel, independent of message loading.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
    Error,
}

/// Duplex push channel carrying chat messages.
#[async_trait]
pub trait LiveChannel: Send + Sync {
    /// Open the channel for a delivery, replacing any previous connection.
    async fn connect(&self, delivery_id: i64) -> Result<(), RemoteError>;
    /// Close the channel whatever its current state.
    async fn close(&self);
    /// Inbound messages; subscribe before connecting to miss nothing.
    fn subscribe_messages(&self) -> broadcast::Receiver<ChatMessage>;
    fn connection_state(&self) -> watch::Receiver<ConnectionState>;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket implementation of [`LiveChannel`].
pub struct ChatSocket {
    /// `ws://host/api` style root.
    ws_base_url: String,
    session: Arc<SessionStore>,
    messages: broadcast::Sender<ChatMessage>,
    state: Arc<watch::Sender<ConnectionState>>,
    sink: Mutex<Option<SplitSink<WsStream, Message>>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl ChatSocket {
    pub fn new(ws_base_url: impl Into<String>, session: Arc<SessionStore>) -> Self {
        let (messages, _) = broadcast::channel(64);
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            ws_base_url: ws_base_url.into(),
            session,
            messages,
            state: Arc::new(state),
            sink: Mutex::new(None),
            reader: Mutex::new(None),
        }
    }
}

#[async_trait]
impl LiveChannel for ChatSocket {
    async fn connect(&self, delivery_id: i64) -> Result<(), RemoteError> {
        self.close().await;

        let token = self
            .session
            .token()
            .await
            .ok_or_else(|| RemoteError::new("Not logged in"))?;
        let url = chat_url(&self.ws_base_url, delivery_id, &token);

        self.state.send_replace(ConnectionState::Connecting);
        let ws = match connect_async(url.as_str()).await {
            Ok((ws, _resp)) => ws,
            Err(e) => {
                tracing::warn!("chat socket connect failed for delivery {delivery_id}: {e}");
                self.state.send_replace(ConnectionState::Error);
                return Err(e.into());
            }
        };
        tracing::info!("chat socket connected for delivery {delivery_id}");
        self.state.send_replace(ConnectionState::Connected);

        let (sink, stream) = ws.split();
        *self.sink.lock().await = Some(sink);
        let handle = tokio::spawn(read_loop(
            stream,
            self.messages.clone(),
            self.state.clone(),
        ));
        *self.reader.lock().await = Some(handle);
        Ok(())
    }

    async fn close(&self) {
        if let Some(mut sink) = self.sink.lock().await.take() {
            // Best effort close frame; the peer may already be gone.
            let _ = sink.close().await;
        }
        if let Some(handle) = self.reader.lock().await.take() {
            handle.abort();
            let _ = handle.await;
        }
        self.state.send_replace(ConnectionState::Disconnected);
    }

    fn subscribe_messages(&self) -> broadcast::Receiver<ChatMessage> {
        self.messages.subscribe()
    }

    fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }
}

/// Forward decoded frames until the peer closes or the transport fails.
async fn read_loop(
    mut stream: SplitStream<WsStream>,
    messages: broadcast::Sender<ChatMessage>,
    state: Arc<watch::Sender<ConnectionState>>,
) {
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => match decode_frame(text.as_str()) {
                Some(msg) => {
                    // No receivers just means nobody is looking at the chat.
                    let _ = messages.send(msg);
                }
                None => tracing::debug!("dropped malformed chat frame"),
            },
            Ok(Message::Close(_)) => {
                tracing::info!("chat socket closed by peer");
                state.send_replace(ConnectionState::Disconnected);
                return;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("chat socket error: {e}");
                state.send_replace(ConnectionState::Error);
                return;
            }
        }
    }
    state.send_replace(ConnectionState::Disconnected);
}

/// Chat endpoint for a delivery; the token travels as a query parameter.
fn chat_url(ws_base_url: &str, delivery_id: i64, token: &str) -> String {
    format!(
        "{}/ws/deliveries/{}/chat?token={}",
        ws_base_url.trim_end_matches('/'),
        delivery_id,
        urlencoding::encode(token)
    )
}

/// Parse an inbound frame; error objects and garbage yield `None`.
fn decode_frame(text: &str) -> Option<ChatMessage> {
    serde_json::from_str(text).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::{net::TcpListener, time::timeout};

    #[test]
    fn url_encodes_token() {
        assert_eq!(
            chat_url("ws://h:8080/api/", 5, "a b+c"),
            "ws://h:8080/api/ws/deliveries/5/chat?token=a%20b%2Bc"
        );
    }

    #[test]
    fn error_objects_are_not_messages() {
        assert!(decode_frame(r#"{"error":"forbidden"}"#).is_none());
        assert!(decode_frame("{oops").is_none());
        let ok = decode_frame(
            r#"{"id":1,"delivery_id":5,"sender_id":2,"sender_username":"sari",
                "sender_initial":"S","content":"hi","created_at":"2026-01-05T08:00:00Z"}"#,
        );
        assert_eq!(ok.map(|m| m.id), Some(1));
    }

    #[tokio::test]
    async fn connect_without_token_is_refused() {
        let socket = ChatSocket::new(
            "ws://127.0.0.1:9",
            Arc::new(SessionStore::in_memory(None, None)),
        );
        assert!(socket.connect(5).await.is_err());
        assert_eq!(
            *socket.connection_state().borrow(),
            ConnectionState::Disconnected
        );
    }

    #[tokio::test]
    async fn unreachable_server_sets_error_state() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let socket = ChatSocket::new(
            format!("ws://{addr}"),
            Arc::new(SessionStore::in_memory(Some("tok"), Some(1))),
        );
        assert!(socket.connect(5).await.is_err());
        assert_eq!(*socket.connection_state().borrow(), ConnectionState::Error);
    }

    #[tokio::test]
    async fn forwards_valid_frames_and_drops_malformed_ones() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            ws.send(Message::Text("{not json".into())).await.unwrap();
            let valid = serde_json::json!({
                "id": 42, "delivery_id": 5, "sender_id": 2,
                "sender_username": "sari", "sender_initial": "S",
                "content": "arrived", "created_at": "2026-01-05T08:00:00Z"
            });
            ws.send(Message::Text(valid.to_string().into())).await.unwrap();
            while let Some(Ok(frame)) = ws.next().await {
                if frame.is_close() {
                    break;
                }
            }
        });

        let socket = ChatSocket::new(
            format!("ws://{addr}"),
            Arc::new(SessionStore::in_memory(Some("tok"), Some(1))),
        );
        let mut rx = socket.subscribe_messages();
        socket.connect(5).await.unwrap();
        assert_eq!(
            *socket.connection_state().borrow(),
            ConnectionState::Connected
        );

        let msg = timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(msg.id, 42);

        socket.close().await;
        assert_eq!(
            *socket.connection_state().borrow(),
            ConnectionState::Disconnected
        );
        timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
    }
}
