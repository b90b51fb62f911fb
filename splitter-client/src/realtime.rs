//! Realtime sync channel.
//!
//! Keeps a WebSocket open to `<ws-base>/ws?token=<access token>` while a
//! session exists, turns server events into cache invalidations and notices,
//! answers heartbeats, and reconnects after a fixed delay whenever the socket
//! closes. The delay never grows and attempts are never capped.
//!
//! The channel runs as a background task owned by a [`SyncHandle`]; dropping
//! or shutting down the handle closes the socket and cancels any pending
//! reconnect.

use crate::cache::QueryCache;
use crate::config::{ws_url, ClientConfig};
use crate::events::SyncEvent;
use crate::notifications::Notice;
use crate::session::{Session, SessionStore};
use crate::socket::{Frame, SocketConnection, SocketConnector, SocketError};
use splitter_core::{RealtimeMessage, ServerEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Terminal. The task has exited and will not reconnect.
    Stopped,
}

/// Why a connection ended.
#[derive(Debug)]
enum Outcome {
    Closed(String),
    SignedOut,
    TokenRotated,
    Shutdown,
}

enum Step {
    Shutdown,
    SessionChanged { alive: bool },
    Frame(Option<Result<Frame, SocketError>>),
}

pub struct SyncChannel {
    connector: Arc<dyn SocketConnector>,
    session: SessionStore,
    cache: QueryCache,
    events: mpsc::Sender<SyncEvent>,
    ws_base_url: String,
    reconnect_delay: Duration,
}

impl SyncChannel {
    pub fn new(
        connector: Arc<dyn SocketConnector>,
        session: SessionStore,
        cache: QueryCache,
        events: mpsc::Sender<SyncEvent>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            connector,
            session,
            cache,
            events,
            ws_base_url: config.ws_base_url.clone(),
            reconnect_delay: config.reconnect_delay(),
        }
    }

    pub fn spawn(self) -> SyncHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let reconnect = Arc::new(Notify::new());
        let task = tokio::spawn(self.run(shutdown_rx, state_tx, reconnect.clone()));
        SyncHandle {
            shutdown: shutdown_tx,
            reconnect,
            state: state_rx,
            task: Some(task),
        }
    }

    async fn run(
        self,
        mut shutdown: watch::Receiver<bool>,
        state: watch::Sender<ConnectionState>,
        reconnect: Arc<Notify>,
    ) {
        let mut session_rx = self.session.subscribe();
        let mut attempt: u64 = 0;
        tracing::info!(
            ws_base_url = %self.ws_base_url,
            reconnect_delay_ms = self.reconnect_delay.as_millis() as u64,
            "Realtime channel started"
        );

        'outer: loop {
            let token = loop {
                if *shutdown.borrow() {
                    break 'outer;
                }
                let token = access_token(&session_rx.borrow_and_update());
                if let Some(token) = token {
                    break token;
                }
                tracing::debug!("Realtime channel waiting for a session");
                tokio::select! {
                    biased;
                    _ = shutdown.changed() => break 'outer,
                    changed = session_rx.changed() => {
                        if changed.is_err() {
                            break 'outer;
                        }
                    }
                }
            };

            attempt += 1;
            state.send_replace(ConnectionState::Connecting);
            tracing::debug!(attempt, ws_base_url = %self.ws_base_url, "Connecting realtime channel");
            let url = ws_url(&self.ws_base_url, &token);
            let connected = tokio::select! {
                biased;
                _ = shutdown.changed() => break 'outer,
                result = self.connector.connect(&url) => result,
            };

            let outcome = match connected {
                Ok(mut connection) => {
                    state.send_replace(ConnectionState::Connected);
                    tracing::info!(attempt, "Realtime channel connected");
                    self.emit(SyncEvent::Connected);
                    self.pump(connection.as_mut(), &mut shutdown, &mut session_rx, &token)
                        .await
                }
                Err(err) => {
                    tracing::warn!(attempt, error = %err, "Realtime connection failed");
                    Outcome::Closed(err.to_string())
                }
            };

            // Registered before the state change so a request made on seeing
            // Disconnected is not lost. Requests made while connected are dropped.
            let wake = reconnect.notified();
            tokio::pin!(wake);
            state.send_replace(ConnectionState::Disconnected);
            match outcome {
                Outcome::Shutdown => break 'outer,
                Outcome::SignedOut => {
                    tracing::info!("Session ended, realtime channel idle");
                    self.emit(SyncEvent::Disconnected {
                        reason: "signed out".to_string(),
                    });
                }
                Outcome::TokenRotated => {
                    tracing::debug!("Access token changed, reconnecting with the new token");
                    self.emit(SyncEvent::Disconnected {
                        reason: "access token changed".to_string(),
                    });
                }
                Outcome::Closed(reason) => {
                    tracing::info!(
                        reason = %reason,
                        delay_ms = self.reconnect_delay.as_millis() as u64,
                        "Realtime channel disconnected, scheduling reconnect"
                    );
                    self.emit(SyncEvent::Disconnected { reason });
                    tokio::select! {
                        biased;
                        _ = shutdown.changed() => break 'outer,
                        _ = &mut wake => {
                            tracing::debug!("Reconnect requested");
                        }
                        _ = tokio::time::sleep(self.reconnect_delay) => {}
                    }
                }
            }
        }

        state.send_replace(ConnectionState::Stopped);
        tracing::info!(attempts = attempt, "Realtime channel stopped");
    }

    /// Read frames until the connection ends, the session changes, or
    /// shutdown is requested.
    async fn pump(
        &self,
        connection: &mut dyn SocketConnection,
        shutdown: &mut watch::Receiver<bool>,
        session_rx: &mut watch::Receiver<Option<Session>>,
        token: &str,
    ) -> Outcome {
        loop {
            let step = tokio::select! {
                biased;
                _ = shutdown.changed() => Step::Shutdown,
                changed = session_rx.changed() => Step::SessionChanged { alive: changed.is_ok() },
                frame = connection.next_frame() => Step::Frame(frame),
            };

            match step {
                Step::Shutdown => {
                    close_quietly(connection).await;
                    return Outcome::Shutdown;
                }
                Step::SessionChanged { alive: false } => {
                    close_quietly(connection).await;
                    return Outcome::Shutdown;
                }
                Step::SessionChanged { alive: true } => {
                    let current = access_token(&session_rx.borrow_and_update());
                    match current {
                        None => {
                            close_quietly(connection).await;
                            return Outcome::SignedOut;
                        }
                        Some(current) if current != token => {
                            close_quietly(connection).await;
                            return Outcome::TokenRotated;
                        }
                        Some(_) => {}
                    }
                }
                Step::Frame(Some(Ok(Frame::Text(text)))) => {
                    self.handle_text(connection, &text).await;
                }
                Step::Frame(Some(Ok(Frame::Other))) => {}
                Step::Frame(Some(Ok(Frame::Close))) | Step::Frame(None) => {
                    return Outcome::Closed("connection closed".to_string());
                }
                Step::Frame(Some(Err(err))) => {
                    tracing::warn!(error = %err, "Realtime stream error");
                    return Outcome::Closed(err.to_string());
                }
            }
        }
    }

    async fn handle_text(&self, connection: &mut dyn SocketConnection, text: &str) {
        let message = match RealtimeMessage::parse(text) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(error = %err, "Dropping malformed realtime message");
                return;
            }
        };

        let event = ServerEvent::from_message(&message);
        if let ServerEvent::Unknown(message_type) = &event {
            tracing::info!(message_type = %message_type, "Ignoring unknown realtime message type");
            return;
        }

        let resources = event.invalidates();
        for resource in resources {
            self.cache.invalidate(*resource);
        }
        if !resources.is_empty() {
            self.emit(SyncEvent::Invalidated(resources.to_vec()));
        }

        if let Some(notice) = Notice::for_event(&event) {
            self.emit(SyncEvent::Notice(notice));
        }

        if let Some(reply) = event.reply() {
            if let Err(err) = connection.send_text(reply.to_json()).await {
                tracing::warn!(error = %err, "Failed to send realtime reply");
            }
        }
    }

    fn emit(&self, event: SyncEvent) {
        if let Err(TrySendError::Full(event)) = self.events.try_send(event) {
            tracing::warn!(event = ?event, "Sync event dropped, receiver is not keeping up");
        }
    }
}

fn access_token(session: &Option<Session>) -> Option<String> {
    session.as_ref().map(|s| s.access_token.clone())
}

async fn close_quietly(connection: &mut dyn SocketConnection) {
    if let Err(err) = connection.close().await {
        tracing::debug!(error = %err, "Error while closing realtime connection");
    }
}

/// Owner of a running [`SyncChannel`].
pub struct SyncHandle {
    shutdown: watch::Sender<bool>,
    reconnect: Arc<Notify>,
    state: watch::Receiver<ConnectionState>,
    task: Option<JoinHandle<()>>,
}

impl SyncHandle {
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Skip the remainder of a pending reconnect delay. Has no effect while
    /// connected or connecting.
    pub fn reconnect(&self) {
        self.reconnect.notify_waiters();
    }

    /// Close the socket, cancel any pending reconnect, and wait for the task to exit.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "Realtime task ended abnormally");
            }
        }
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}
