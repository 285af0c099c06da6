//! Chat API wrappers (history, send, read receipts).

use async_trait::async_trait;

use super::{
    ApiClient,
    models::{ChatMessage, MarkReadRequest, SendMessageRequest, UnreadCount},
};
use crate::error::RemoteError;

/// Request/response side of a delivery chat.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// One page of messages, newest first. `before_id` anchors older pages.
    async fn get_messages(
        &self,
        delivery_id: i64,
        before_id: Option<i64>,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, RemoteError>;
    async fn send_message(&self, delivery_id: i64, content: &str)
    -> Result<ChatMessage, RemoteError>;
    async fn mark_read(&self, delivery_id: i64, last_read_message_id: i64)
    -> Result<(), RemoteError>;
    async fn unread_counts(&self) -> Result<Vec<UnreadCount>, RemoteError>;
}

#[async_trait]
impl ChatGateway for ApiClient {
    async fn get_messages(
        &self,
        delivery_id: i64,
        before_id: Option<i64>,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, RemoteError> {
        let mut query = vec![("limit", limit.to_string())];
        if let Some(b) = before_id {
            query.push(("before_id", b.to_string()));
        }
        let rb = self
            .http
            .get(self.url(&format!("deliveries/{delivery_id}/messages")))
            .query(&query);
        self.send_json(rb)
            .await
            .map_err(|e| e.or_generic("Failed to fetch messages"))
    }

    async fn send_message(
        &self,
        delivery_id: i64,
        content: &str,
    ) -> Result<ChatMessage, RemoteError> {
        let rb = self
            .http
            .post(self.url(&format!("deliveries/{delivery_id}/messages")))
            .json(&SendMessageRequest { content });
        self.send_json(rb)
            .await
            .map_err(|e| e.or_generic("Failed to send message"))
    }

    async fn mark_read(
        &self,
        delivery_id: i64,
        last_read_message_id: i64,
    ) -> Result<(), RemoteError> {
        let rb = self
            .http
            .post(self.url(&format!("deliveries/{delivery_id}/messages/read")))
            .json(&MarkReadRequest {
                last_read_message_id,
            });
        self.send_empty(rb)
            .await
            .map_err(|e| e.or_generic("Failed to mark messages as read"))
    }

    async fn unread_counts(&self) -> Result<Vec<UnreadCount>, RemoteError> {
        let rb = self.http.get(self.url("messages/unread"));
        self.send_json(rb)
            .await
            .map_err(|e| e.or_generic("Failed to fetch unread counts"))
    }
}
