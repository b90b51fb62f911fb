//! Splitter Test Utilities
//!
//! Shared test infrastructure for the Splitter workspace:
//! - Scripted HTTP transport with request recording
//! - In-memory WebSocket connector with a server-side peer handle
//! - Fixtures for sessions and common entities
//! - Proptest generators for realtime messages

pub use splitter_client::session::{Session, SessionStore};
pub use splitter_client::socket::{Frame, SocketConnection, SocketConnector, SocketError};
pub use splitter_client::transport::{HttpRequest, HttpResponse, HttpTransport, TransportError};
pub use splitter_core::{AuthResponse, Resource};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::time::Instant;
use uuid::Uuid;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// SCRIPTED HTTP TRANSPORT
// ============================================================================

#[derive(Debug)]
enum Scripted {
    Respond(HttpResponse),
    Fail(String),
}

/// HTTP transport that answers from per-route FIFO scripts and records every
/// request it sees.
///
/// Requests with nothing scripted get a 404. Each `send` yields once after
/// taking its response, so requests issued together interleave the way they
/// would over a real network.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<Scripted>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a JSON response for `method path`.
    pub fn push(&self, method: Method, path: &str, status: u16, body: Value) -> &Self {
        self.push_raw(method, path, status, &body.to_string())
    }

    /// Queue a response with a verbatim body.
    pub fn push_raw(&self, method: Method, path: &str, status: u16, body: &str) -> &Self {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self.enqueue(method, path, Scripted::Respond(HttpResponse::new(status, body)));
        self
    }

    /// Queue a transport-level failure (no HTTP response at all).
    pub fn push_failure(&self, method: Method, path: &str, message: &str) -> &Self {
        self.enqueue(method, path, Scripted::Fail(message.to_string()));
        self
    }

    fn enqueue(&self, method: Method, path: &str, scripted: Scripted) {
        lock(&self.routes)
            .entry((method, path.to_string()))
            .or_default()
            .push_back(scripted);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<HttpRequest> {
        lock(&self.requests)
            .iter()
            .filter(|request| request.path == path)
            .cloned()
            .collect()
    }

    /// Scripted responses not yet consumed, across all routes.
    pub fn pending(&self) -> usize {
        lock(&self.routes).values().map(VecDeque::len).sum()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let key = (request.method.clone(), request.path.clone());
        lock(&self.requests).push(request);
        let scripted = lock(&self.routes)
            .get_mut(&key)
            .and_then(VecDeque::pop_front);

        tokio::task::yield_now().await;

        match scripted {
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::Fail(message)) => Err(TransportError::Connection(message)),
            None => Ok(HttpResponse::new(
                StatusCode::NOT_FOUND,
                json!({ "message": format!("No scripted response for {} {}", key.0, key.1) })
                    .to_string(),
            )),
        }
    }
}

// ============================================================================
// IN-MEMORY WEBSOCKET
// ============================================================================

/// What the fake connector does with the next connection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectPlan {
    Accept,
    Refuse(String),
}

#[derive(Debug, Clone)]
pub struct ConnectAttempt {
    pub url: String,
    pub at: Instant,
}

/// Frames the client sent to the fake server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    Text(String),
    Close,
}

/// Socket connector backed by in-memory channels.
///
/// Attempts follow the queued [`ConnectPlan`]s and fall back to accepting
/// once the queue is empty. Every accepted connection yields a [`FakePeer`]
/// on the receiver returned by [`FakeConnector::new`].
#[derive(Debug)]
pub struct FakeConnector {
    plans: Mutex<VecDeque<ConnectPlan>>,
    attempts: Mutex<Vec<ConnectAttempt>>,
    peers: mpsc::UnboundedSender<FakePeer>,
}

impl FakeConnector {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<FakePeer>) {
        let (peers, peer_rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            plans: Mutex::new(VecDeque::new()),
            attempts: Mutex::new(Vec::new()),
            peers,
        });
        (connector, peer_rx)
    }

    pub fn plan(&self, plan: ConnectPlan) -> &Self {
        lock(&self.plans).push_back(plan);
        self
    }

    pub fn attempts(&self) -> Vec<ConnectAttempt> {
        lock(&self.attempts).clone()
    }

    pub fn attempt_count(&self) -> usize {
        lock(&self.attempts).len()
    }
}

#[async_trait]
impl SocketConnector for FakeConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn SocketConnection>, SocketError> {
        lock(&self.attempts).push(ConnectAttempt {
            url: url.to_string(),
            at: Instant::now(),
        });
        let plan = lock(&self.plans).pop_front().unwrap_or(ConnectPlan::Accept);
        match plan {
            ConnectPlan::Refuse(reason) => Err(SocketError::Connect(reason)),
            ConnectPlan::Accept => {
                let (to_client, from_server) = mpsc::unbounded_channel();
                let (to_server, from_client) = mpsc::unbounded_channel();
                let peer = FakePeer {
                    url: url.to_string(),
                    to_client,
                    from_client,
                };
                if self.peers.send(peer).is_err() {
                    return Err(SocketError::Connect("test dropped the peer receiver".to_string()));
                }
                Ok(Box::new(FakeConnection {
                    from_server,
                    to_server,
                }))
            }
        }
    }
}

/// Client side of an in-memory connection.
struct FakeConnection {
    from_server: mpsc::UnboundedReceiver<Result<Frame, SocketError>>,
    to_server: mpsc::UnboundedSender<ClientFrame>,
}

#[async_trait]
impl SocketConnection for FakeConnection {
    async fn next_frame(&mut self) -> Option<Result<Frame, SocketError>> {
        self.from_server.recv().await
    }

    async fn send_text(&mut self, text: String) -> Result<(), SocketError> {
        self.to_server
            .send(ClientFrame::Text(text))
            .map_err(|_| SocketError::Closed)
    }

    async fn close(&mut self) -> Result<(), SocketError> {
        self.to_server
            .send(ClientFrame::Close)
            .map_err(|_| SocketError::Closed)
    }
}

/// Server side of an in-memory connection. Dropping it ends the client's
/// stream.
#[derive(Debug)]
pub struct FakePeer {
    pub url: String,
    to_client: mpsc::UnboundedSender<Result<Frame, SocketError>>,
    from_client: mpsc::UnboundedReceiver<ClientFrame>,
}

impl FakePeer {
    pub fn send_text(&self, text: &str) {
        let _ = self.to_client.send(Ok(Frame::Text(text.to_string())));
    }

    pub fn send_json(&self, value: Value) {
        self.send_text(&value.to_string());
    }

    /// Send `{"type": <message_type>, "payload": <payload>}`.
    pub fn send_event(&self, message_type: &str, payload: Value) {
        self.send_json(json!({ "type": message_type, "payload": payload }));
    }

    pub fn send_close(&self) {
        let _ = self.to_client.send(Ok(Frame::Close));
    }

    pub fn send_error(&self) {
        let _ = self.to_client.send(Err(SocketError::Closed));
    }

    /// Next frame from the client, or `None` once the client side is gone.
    pub async fn recv(&mut self) -> Option<ClientFrame> {
        self.from_client.recv().await
    }

    pub fn try_recv(&mut self) -> Option<ClientFrame> {
        self.from_client.try_recv().ok()
    }

    /// The `token` query parameter of the URL this peer was reached on.
    pub fn token(&self) -> Option<&str> {
        self.url.split_once("token=").map(|(_, token)| token)
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub const LOGIN_ROUTE: &str = "/auth/login";

pub fn auth_response(access: &str, refresh: &str) -> AuthResponse {
    AuthResponse::tokens(access, refresh)
}

/// JSON body the refresh endpoint returns.
pub fn token_body(access: &str, refresh: &str) -> Value {
    json!({
        "accessToken": access,
        "refreshToken": refresh,
        "expiresIn": 900,
        "tokenType": "Bearer",
    })
}

pub fn session(access: &str, refresh: &str) -> Session {
    Session {
        access_token: access.to_string(),
        refresh_token: refresh.to_string(),
        expires_at: None,
        user: None,
    }
}

pub fn signed_in_store(access: &str, refresh: &str) -> SessionStore {
    SessionStore::with_session(session(access, refresh))
}

pub fn group_json(id: Uuid, name: &str) -> Value {
    let now = Utc::now();
    json!({
        "id": id,
        "name": name,
        "groupType": "TRIP",
        "simplifyDebts": true,
        "defaultCurrency": "USD",
        "createdBy": Uuid::new_v4(),
        "memberCount": 3,
        "createdAt": now,
        "updatedAt": now,
    })
}

pub fn expense_json(id: Uuid, group_id: Uuid, description: &str, amount: f64) -> Value {
    let now = Utc::now();
    let payer = Uuid::new_v4();
    json!({
        "id": id,
        "groupId": group_id,
        "description": description,
        "amount": amount,
        "currency": "USD",
        "category": "FOOD_AND_DRINK",
        "paidBy": payer,
        "paidByName": "Ana",
        "splitType": "EQUAL",
        "shares": [],
        "expenseDate": now.date_naive(),
        "createdBy": payer,
        "createdAt": now,
        "updatedAt": now,
    })
}

pub fn page_json(content: Vec<Value>) -> Value {
    let total = content.len();
    json!({
        "content": content,
        "totalElements": total,
        "totalPages": 1,
        "page": 0,
        "size": 20,
    })
}

pub fn balance_summary_json(you_owe: f64, you_are_owed: f64) -> Value {
    json!({
        "youOwe": you_owe,
        "youAreOwed": you_are_owed,
        "netBalance": you_are_owed - you_owe,
        "currency": "USD",
        "debts": [],
    })
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    use proptest::prelude::*;
    use splitter_core::realtime::KNOWN_MESSAGE_TYPES;

    pub fn arb_known_message_type() -> impl Strategy<Value = &'static str> {
        prop::sample::select(KNOWN_MESSAGE_TYPES.to_vec())
    }
}
