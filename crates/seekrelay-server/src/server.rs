//! `RelayServer`: the `WebSocket` listener and the admin HTTP listener.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::body::Bytes;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use metrics::counter;
use metrics_exporter_prometheus::PrometheusHandle;
use seekrelay_settings::HubSettings;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::control::{CommandReport, RelayControl, RelayStatus};
use crate::errors::ServerError;
use crate::health::{self, HealthResponse};
use crate::metrics::CONNECTIONS_TOTAL;
use crate::notify::Notifier;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::admission::resolve_identity;
use crate::websocket::dispatcher::Dispatcher;
use crate::websocket::handler::{ConnectionConfig, HubContext, run_connection};
use crate::websocket::registry::SessionRegistry;

/// Shared state of the admin routes.
#[derive(Clone)]
struct AdminState {
    control: RelayControl,
    start_time: Instant,
    control_token: Option<Arc<str>>,
    metrics: Option<PrometheusHandle>,
}

/// Body of `POST /commands/seek`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SeekRequest {
    timecode: Option<String>,
}

/// The relay hub.
pub struct RelayServer {
    settings: HubSettings,
    registry: Arc<SessionRegistry>,
    notifier: Arc<dyn Notifier>,
    control: RelayControl,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
    metrics: Option<PrometheusHandle>,
}

/// Addresses and tasks of a started hub.
pub struct RunningHub {
    /// Bound `WebSocket` listener address.
    pub ws_addr: SocketAddr,
    /// Bound admin listener address.
    pub admin_addr: SocketAddr,
    tasks: Vec<JoinHandle<()>>,
}

impl RunningHub {
    /// The listener tasks, for [`ShutdownCoordinator::graceful_shutdown`].
    pub fn into_tasks(self) -> Vec<JoinHandle<()>> {
        self.tasks
    }
}

impl RelayServer {
    /// Create a hub with an empty registry.
    pub fn new(settings: HubSettings, notifier: Arc<dyn Notifier>) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let control = RelayControl::new(Dispatcher::new(registry.clone(), notifier.clone()));
        Self {
            settings,
            registry,
            notifier,
            control,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
            metrics: None,
        }
    }

    /// Serve `GET /metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Live sessions.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Operator command surface.
    pub fn control(&self) -> &RelayControl {
        &self.control
    }

    /// Shutdown coordinator shared with every connection.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Hub settings.
    pub fn settings(&self) -> &HubSettings {
        &self.settings
    }

    fn hub_context(&self) -> HubContext {
        HubContext {
            registry: self.registry.clone(),
            notifier: self.notifier.clone(),
            config: Arc::new(ConnectionConfig::from(&self.settings)),
            shutdown: self.shutdown.token(),
        }
    }

    /// `WebSocket` routes (`/` and `/ws`).
    ///
    /// Must be served with `into_make_service_with_connect_info::<SocketAddr>()`.
    pub fn ws_router(&self) -> Router {
        Router::new()
            .route("/", get(ws_upgrade))
            .route("/ws", get(ws_upgrade))
            .with_state(self.hub_context())
    }

    /// Admin routes: health, status, commands, metrics.
    pub fn admin_router(&self) -> Router {
        let state = AdminState {
            control: self.control.clone(),
            start_time: self.start_time,
            control_token: self.settings.control_token.as_deref().map(Arc::from),
            metrics: self.metrics.clone(),
        };

        let protected = Router::new()
            .route("/status", get(status_handler))
            .route("/commands/seek", post(seek_handler))
            .route("/commands/switch", post(switch_handler))
            .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

        Router::new()
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .merge(protected)
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind both listeners and serve them until shutdown.
    pub async fn start(&self) -> Result<RunningHub, ServerError> {
        let host = self.settings.host.as_str();
        let ws_listener = bind(host, self.settings.port).await?;
        let admin_listener = bind(host, self.settings.admin_port).await?;
        let ws_addr = ws_listener.local_addr().map_err(ServerError::LocalAddr)?;
        let admin_addr = admin_listener.local_addr().map_err(ServerError::LocalAddr)?;

        let ws_app = self.ws_router();
        let ws_token = self.shutdown.token();
        let ws_task = tokio::spawn(async move {
            let served = axum::serve(
                ws_listener,
                ws_app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move { ws_token.cancelled().await })
            .await;
            if let Err(e) = served {
                error!(error = %e, "websocket listener failed");
            }
        });

        let admin_app = self.admin_router();
        let admin_token = self.shutdown.token();
        let admin_task = tokio::spawn(async move {
            let served = axum::serve(admin_listener, admin_app)
                .with_graceful_shutdown(async move { admin_token.cancelled().await })
                .await;
            if let Err(e) = served {
                error!(error = %e, "admin listener failed");
            }
        });

        info!(%ws_addr, "websocket listener started");
        info!(%admin_addr, "admin listener started");
        Ok(RunningHub {
            ws_addr,
            admin_addr,
            tasks: vec![ws_task, admin_task],
        })
    }
}

async fn bind(host: &str, port: u16) -> Result<TcpListener, ServerError> {
    TcpListener::bind((host, port))
        .await
        .map_err(|e| ServerError::bind(host, port, e))
}

/// GET / and /ws
async fn ws_upgrade(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    State(ctx): State<HubContext>,
) -> Response {
    counter!(CONNECTIONS_TOTAL).increment(1);
    let identity = resolve_identity(&headers, Some(peer));
    ws.on_upgrade(move |socket| run_connection(socket, identity, ctx))
}

/// Reject requests without the configured bearer token.
async fn require_bearer(State(state): State<AdminState>, request: Request, next: Next) -> Response {
    if let Some(expected) = state.control_token.as_deref() {
        let presented = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        if presented != Some(expected) {
            warn!(path = %request.uri().path(), "rejected unauthorized admin request");
            return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        }
    }
    next.run(request).await
}

/// GET /health
async fn health_handler(State(state): State<AdminState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        &state.control.query_status(),
    ))
}

/// GET /status
async fn status_handler(State(state): State<AdminState>) -> Json<RelayStatus> {
    Json(state.control.query_status())
}

/// POST /commands/seek
async fn seek_handler(
    State(state): State<AdminState>,
    body: Bytes,
) -> Result<Json<CommandReport>, (StatusCode, String)> {
    let request = if body.is_empty() {
        SeekRequest::default()
    } else {
        serde_json::from_slice::<SeekRequest>(&body)
            .map_err(|e| (StatusCode::BAD_REQUEST, format!("invalid seek request: {e}")))?
    };
    let report = state.control.request_seek(request.timecode.as_deref()).await;
    info!(%report, "seek command handled");
    Ok(Json(report))
}

/// POST /commands/switch
async fn switch_handler(State(state): State<AdminState>) -> Json<CommandReport> {
    let report = state.control.request_switch().await;
    info!(%report, "switch command handled");
    Json(report)
}

/// GET /metrics
async fn metrics_handler(State(state): State<AdminState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
