//! Chat session: one delivery's timeline merged from history pages and the
//! live channel.
//!
//! Messages are kept ascending by id. Every insert goes through the id set in
//! [`ChatState`], so a message arriving both as a live push and as the answer
//! to our own send (or inside an overlapping page) shows up exactly once.

use std::{collections::HashSet, sync::Arc};
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
};

use crate::{
    api::{
        chat::ChatGateway,
        live::{ConnectionState, LiveChannel},
        models::ChatMessage,
    },
    error::RemoteError,
    session::SessionStore,
};

/// Snapshot of a chat screen.
#[derive(Clone, Debug, PartialEq)]
pub struct ChatState {
    /// Active conversation; `None` before `initialize` and after `close`.
    pub delivery_id: Option<i64>,
    /// Ascending by id.
    pub messages: Vec<ChatMessage>,
    /// Ids present in `messages`.
    pub message_ids: HashSet<i64>,
    pub viewer_id: Option<i64>,
    pub is_loading: bool,
    pub is_loading_more: bool,
    pub is_sending: bool,
    /// True until a page comes back shorter than the page size.
    pub can_load_more: bool,
    pub connection: ConnectionState,
    pub error: Option<String>,
}

impl Default for ChatState {
    fn default() -> Self {
        Self {
            delivery_id: None,
            messages: vec![],
            message_ids: HashSet::new(),
            viewer_id: None,
            is_loading: false,
            is_loading_more: false,
            is_sending: false,
            can_load_more: true,
            connection: ConnectionState::Disconnected,
            error: None,
        }
    }
}

impl ChatState {
    /// Insert keeping ascending order; false when the id is already known.
    fn insert(&mut self, msg: ChatMessage) -> bool {
        if !self.message_ids.insert(msg.id) {
            return false;
        }
        match self.messages.last() {
            Some(last) if last.id > msg.id => {
                let at = self.messages.partition_point(|m| m.id < msg.id);
                self.messages.insert(at, msg);
            }
            _ => self.messages.push(msg),
        }
        true
    }

    /// Merge a page (any order) keeping only unseen ids.
    fn merge_page(&mut self, mut page: Vec<ChatMessage>) {
        page.sort_by_key(|m| m.id);
        page.retain(|m| !self.message_ids.contains(&m.id));
        if page.is_empty() {
            return;
        }
        let older = self
            .messages
            .first()
            .is_none_or(|first| page.last().is_some_and(|l| l.id < first.id));
        if older {
            self.message_ids.extend(page.iter().map(|m| m.id));
            page.append(&mut self.messages);
            self.messages = page;
        } else {
            for m in page {
                self.insert(m);
            }
        }
    }

    /// Whether a message was written by the viewer.
    pub fn is_own(&self, msg: &ChatMessage) -> bool {
        self.viewer_id == Some(msg.sender_id)
    }
}

/// Drives one chat screen visit.
pub struct ChatSession {
    chat: Arc<dyn ChatGateway>,
    live: Arc<dyn LiveChannel>,
    session: Arc<SessionStore>,
    page_size: usize,
    state: Arc<watch::Sender<ChatState>>,
    /// Live message and connection-state forwarders.
    listeners: Vec<JoinHandle<()>>,
}

impl ChatSession {
    pub fn new(
        chat: Arc<dyn ChatGateway>,
        live: Arc<dyn LiveChannel>,
        session: Arc<SessionStore>,
        page_size: usize,
    ) -> Self {
        let (state, _) = watch::channel(ChatState::default());
        Self {
            chat,
            live,
            session,
            page_size,
            state: Arc::new(state),
            listeners: vec![],
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ChatState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ChatState {
        self.state.borrow().clone()
    }

    fn active_delivery(&self) -> Option<i64> {
        self.state.borrow().delivery_id
    }

    /// Open the chat of `delivery_id`; a no-op when it is already active.
    pub async fn initialize(&mut self, delivery_id: i64) {
        if self.active_delivery() == Some(delivery_id) {
            return;
        }
        if self.active_delivery().is_some() {
            self.close().await;
        }
        tracing::info!("chat session opened for delivery {delivery_id}");
        self.state.send_replace(ChatState {
            delivery_id: Some(delivery_id),
            ..Default::default()
        });

        // Listeners first so no push is missed once the channel is up.
        self.listeners.push(tokio::spawn(forward_live_messages(
            self.live.subscribe_messages(),
            self.state.clone(),
            self.chat.clone(),
        )));
        self.listeners.push(tokio::spawn(forward_connection_state(
            self.live.connection_state(),
            self.state.clone(),
        )));

        let (viewer_id, (), connected) = tokio::join!(
            self.session.user_id(),
            self.fetch_latest(),
            self.live.connect(delivery_id),
        );
        self.state.send_modify(|s| s.viewer_id = viewer_id);
        if let Err(e) = connected {
            // History still works over plain requests.
            tracing::warn!("live chat unavailable for delivery {delivery_id}: {e}");
        }
    }

    /// Load the newest page and mark the newest message read.
    pub async fn fetch_latest(&self) {
        let Some(delivery_id) = self.active_delivery() else {
            return;
        };
        self.state.send_modify(|s| {
            s.is_loading = true;
            s.error = None;
        });

        let limit = self.page_size;
        let result = self.chat.get_messages(delivery_id, None, limit).await;
        let mut newest = None;
        self.state.send_modify(|s| {
            s.is_loading = false;
            if s.delivery_id != Some(delivery_id) {
                return;
            }
            match result {
                Ok(page) => {
                    s.can_load_more = page.len() >= limit;
                    s.merge_page(page);
                    newest = s.messages.last().map(|m| m.id);
                }
                Err(e) => s.error = Some(e.message),
            }
        });
        if let Some(id) = newest {
            self.mark_read(id);
        }
    }

    /// Prepend the page before the oldest loaded message. Failures are silent.
    pub async fn load_older(&self) {
        let (delivery_id, oldest) = {
            let s = self.state.borrow();
            if s.is_loading_more || !s.can_load_more {
                return;
            }
            match (s.delivery_id, s.messages.first()) {
                (Some(d), Some(m)) => (d, m.id),
                _ => return,
            }
        };
        self.state.send_modify(|s| s.is_loading_more = true);

        let limit = self.page_size;
        let result = self
            .chat
            .get_messages(delivery_id, Some(oldest), limit)
            .await;
        self.state.send_modify(|s| {
            s.is_loading_more = false;
            if s.delivery_id != Some(delivery_id) {
                return;
            }
            match result {
                Ok(page) => {
                    s.can_load_more = page.len() >= limit;
                    s.merge_page(page);
                }
                Err(e) => tracing::debug!("older messages not loaded: {e}"),
            }
        });
    }

    /// Add a pushed message to the timeline unless it is foreign or known.
    pub fn on_live_message(&self, msg: ChatMessage) {
        accept_live(&self.state, &self.chat, msg);
    }

    /// Send a message; the timeline shows it only once the server confirms.
    /// Blank input is ignored; anything else is sent exactly as typed.
    pub async fn send(&self, content: &str) -> Result<(), RemoteError> {
        let Some(delivery_id) = self.active_delivery() else {
            return Ok(());
        };
        if content.trim().is_empty() {
            return Ok(());
        }
        self.state.send_modify(|s| {
            s.is_sending = true;
            s.error = None;
        });

        match self.chat.send_message(delivery_id, content).await {
            Ok(msg) => {
                self.state.send_modify(|s| {
                    s.is_sending = false;
                    if s.delivery_id == Some(delivery_id) {
                        s.insert(msg);
                    }
                });
                Ok(())
            }
            Err(e) => {
                let message = e.message.clone();
                self.state.send_modify(|s| {
                    s.is_sending = false;
                    s.error = Some(message);
                });
                Err(e)
            }
        }
    }

    /// Best-effort read receipt.
    pub fn mark_read(&self, message_id: i64) {
        if let Some(delivery_id) = self.active_delivery() {
            spawn_mark_read(self.chat.clone(), delivery_id, message_id);
        }
    }

    pub fn clear_error(&self) {
        self.state.send_modify(|s| s.error = None);
    }

    /// Stop listening and close the live channel whatever its state.
    pub async fn close(&mut self) {
        for handle in self.listeners.drain(..) {
            handle.abort();
        }
        self.live.close().await;
        if let Some(id) = self.active_delivery() {
            tracing::info!("chat session closed for delivery {id}");
        }
        self.state.send_modify(|s| {
            s.delivery_id = None;
            s.connection = ConnectionState::Disconnected;
        });
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        if self.listeners.is_empty() {
            return;
        }
        for handle in self.listeners.drain(..) {
            handle.abort();
        }
        if let Ok(rt) = tokio::runtime::Handle::try_current() {
            let live = self.live.clone();
            rt.spawn(async move { live.close().await });
        }
    }
}

fn accept_live(
    state: &watch::Sender<ChatState>,
    chat: &Arc<dyn ChatGateway>,
    msg: ChatMessage,
) {
    let (id, delivery_id) = (msg.id, msg.delivery_id);
    let inserted = state.send_if_modified(|s| s.delivery_id == Some(delivery_id) && s.insert(msg));
    if inserted {
        spawn_mark_read(chat.clone(), delivery_id, id);
    }
}

fn spawn_mark_read(chat: Arc<dyn ChatGateway>, delivery_id: i64, message_id: i64) {
    tokio::spawn(async move {
        if let Err(e) = chat.mark_read(delivery_id, message_id).await {
            tracing::debug!("read receipt for {message_id} dropped: {e}");
        }
    });
}

async fn forward_live_messages(
    mut rx: broadcast::Receiver<ChatMessage>,
    state: Arc<watch::Sender<ChatState>>,
    chat: Arc<dyn ChatGateway>,
) {
    loop {
        match rx.recv().await {
            Ok(msg) => accept_live(&state, &chat, msg),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!("chat listener skipped {n} live messages");
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

async fn forward_connection_state(
    mut rx: watch::Receiver<ConnectionState>,
    state: Arc<watch::Sender<ChatState>>,
) {
    loop {
        let current = *rx.borrow_and_update();
        state.send_if_modified(|s| {
            let changed = s.connection != current;
            s.connection = current;
            changed
        });
        if rx.changed().await.is_err() {
            return;
        }
    }
}
