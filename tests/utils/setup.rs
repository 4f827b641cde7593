use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use futures::StreamExt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use ama::{
    message::repository::InMemoryMessageRepository,
    room::repository::{InMemoryRoomRepository, RoomRepository},
    AppState, BroadcastDispatcher, SessionConfig, SubscriberRegistry,
};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// Test Server Infrastructure
// ============================================================================

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    pub rooms: Arc<InMemoryRoomRepository>,
    pub registry: Arc<SubscriberRegistry>,
    pub shutdown: CancellationToken,
    pub handle: JoinHandle<()>,
}

pub struct TestServerBuilder {
    send_timeout: Duration,
    session: SessionConfig,
}

impl TestServerBuilder {
    pub fn new() -> Self {
        Self {
            send_timeout: Duration::from_millis(100),
            session: SessionConfig::default(),
        }
    }

    pub fn with_outbound_capacity(mut self, capacity: usize) -> Self {
        self.session.outbound_capacity = capacity;
        self
    }

    pub async fn build(self) -> TestServer {
        let rooms = Arc::new(InMemoryRoomRepository::new());
        let messages = Arc::new(InMemoryMessageRepository::new());
        let registry = Arc::new(SubscriberRegistry::new());
        let shutdown = CancellationToken::new();

        let state = AppState::new(
            rooms.clone(),
            messages,
            BroadcastDispatcher::new(registry.clone(), self.send_timeout),
            self.session,
            shutdown.clone(),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = ama::create_router(state.clone());
        let token = shutdown.clone();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await
                .unwrap();
        });

        TestServer {
            addr,
            state,
            rooms,
            registry,
            shutdown,
            handle,
        }
    }
}

impl TestServer {
    pub async fn create_room(&self, theme: &str) -> String {
        self.rooms.create_room(theme).await.unwrap().id.to_string()
    }

    pub async fn connect(&self, room_id: &str) -> Client {
        let url = format!("ws://{}/subscribe/{}", self.addr, room_id);
        let (client, _) = connect_async(url).await.unwrap();
        client
    }

    /// Run an API request against the same application state
    pub async fn api(
        &self,
        method: &str,
        uri: &str,
        body: Option<&str>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        let request = builder
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_default())
            .unwrap();

        let response = ama::create_router(self.state.clone())
            .oneshot(request)
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    pub async fn wait_for_watchers(&self, room_id: &str, expected: usize) {
        for _ in 0..200 {
            if self.registry.watcher_count(room_id).await == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!(
            "room {} has {} watchers, expected {}",
            room_id,
            self.registry.watcher_count(room_id).await,
            expected
        );
    }
}

/// Next text frame from the server, failing the test after a second
pub async fn next_text(client: &mut Client) -> String {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(1), client.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("websocket error");
        match frame {
            Message::Text(text) => return text,
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {:?}", other),
        }
    }
}
