//! HTTP surface of the playground: the host page, a JSON API over the
//! session, and SSE streams for preview updates and notices.

use crate::notice::Notice;
use crate::sandbox::host_page;
use crate::scheduler::PublishedPreview;
use crate::snippets::{SavedSnippet, SnippetError};
use crate::workspace::Workspace;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Response,
    },
    routing::{get, post, put},
    Extension, Json, Router,
};
use futures::stream::{self, Stream};
use livepad_composer::{LibraryEntry, RegistryError};
use livepad_editor::{
    BufferKind, EditorError, EditorSettings, LayoutState, Point, PointerKind, SessionSnapshot,
    SourceBuffers,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio_stream::StreamExt;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

type AppState = Arc<Workspace>;

#[derive(Debug)]
pub enum ServerError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<EditorError> for ServerError {
    fn from(e: EditorError) -> Self {
        match e {
            EditorError::Library(RegistryError::UnknownLibrary(_)) | EditorError::UnknownBuffer(_) => {
                ServerError::NotFound(e.to_string())
            }
            other => ServerError::BadRequest(other.to_string()),
        }
    }
}

impl From<SnippetError> for ServerError {
    fn from(e: SnippetError) -> Self {
        match e {
            SnippetError::NotFound(_) => ServerError::NotFound(e.to_string()),
            SnippetError::InvalidUser(_) | SnippetError::EmptyName => {
                ServerError::BadRequest(e.to_string())
            }
            other => ServerError::Internal(other.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ServerError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ServerError::Internal(msg) => {
                tracing::error!(error = %msg, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

type ApiResult<T> = Result<T, ServerError>;

/// Resolves once the server starts shutting down. Open SSE streams end on
/// it so graceful shutdown does not wait on them.
#[derive(Clone)]
struct Closing(watch::Receiver<bool>);

impl Closing {
    async fn wait(mut self) {
        let signalled = self.0.wait_for(|closing| *closing).await.is_ok();
        if !signalled {
            // No sender: this router is never shut down
            std::future::pending::<()>().await;
        }
    }
}

pub fn router(workspace: AppState) -> Router {
    let (_, closing) = watch::channel(false);
    routes(workspace, Closing(closing))
}

fn routes(workspace: AppState, closing: Closing) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/state", get(get_state))
        .route("/api/buffers", post(replace_buffers))
        .route("/api/buffers/:kind", put(set_buffer))
        .route("/api/libraries", get(list_libraries))
        .route("/api/libraries/:name", put(set_library))
        .route("/api/settings", get(get_settings).put(put_settings))
        .route("/api/layout", get(get_layout))
        .route("/api/layout/toggle", post(toggle_layout))
        .route("/api/layout/viewport", post(set_viewport))
        .route("/api/layout/resize", post(resize))
        .route("/api/preview", get(get_preview))
        .route("/api/preview/events", get(preview_events))
        .route("/api/snippets", get(list_snippets).post(save_snippet))
        .route("/api/snippets/:id", axum::routing::delete(delete_snippet))
        .route("/api/snippets/:id/load", post(load_snippet))
        .route("/api/notices", get(notice_events))
        .layer(Extension(closing))
        .with_state(workspace)
}

/// Serve the playground until `shutdown` resolves
pub async fn serve(
    workspace: AppState,
    addr: &str,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_on(workspace, listener, shutdown).await
}

/// Serve on an already bound listener
pub async fn serve_on(
    workspace: AppState,
    listener: TcpListener,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let (closing_tx, closing_rx) = watch::channel(false);
    let app = routes(workspace, Closing(closing_rx))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    tracing::info!(addr = %listener.local_addr()?, "preview server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("shutting down, closing event streams");
            let _ = closing_tx.send(true);
        })
        .await
}

async fn index(State(ws): State<AppState>) -> Html<String> {
    Html(host_page(&ws.sandbox()))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StateResponse {
    #[serde(flatten)]
    session: SessionSnapshot,
    layout: LayoutState,
    preview_generation: u64,
}

async fn get_state(State(ws): State<AppState>) -> Json<StateResponse> {
    let (session, layout) = ws.with_session(|s| (s.snapshot(), s.layout().state()));
    Json(StateResponse {
        session,
        layout,
        preview_generation: ws.current_preview().generation,
    })
}

async fn set_buffer(
    State(ws): State<AppState>,
    Path(kind): Path<String>,
    text: String,
) -> ApiResult<StatusCode> {
    let kind: BufferKind = kind.parse()?;
    ws.with_session(|s| s.store_mut().set_buffer(kind, text));
    Ok(StatusCode::NO_CONTENT)
}

async fn replace_buffers(
    State(ws): State<AppState>,
    Json(buffers): Json<SourceBuffers>,
) -> StatusCode {
    ws.with_session(|s| {
        s.store_mut()
            .replace_all(buffers.markup, buffers.styles, buffers.script)
    });
    StatusCode::NO_CONTENT
}

async fn list_libraries(State(ws): State<AppState>) -> Json<Vec<LibraryEntry>> {
    Json(ws.registry().entries().to_vec())
}

#[derive(Deserialize)]
struct LibraryToggle {
    enabled: bool,
}

async fn set_library(
    State(ws): State<AppState>,
    Path(name): Path<String>,
    Json(toggle): Json<LibraryToggle>,
) -> ApiResult<StatusCode> {
    ws.with_session(|s| s.store_mut().set_library(&name, toggle.enabled))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_settings(State(ws): State<AppState>) -> Json<EditorSettings> {
    Json(ws.with_session(|s| s.settings().clone()))
}

async fn put_settings(
    State(ws): State<AppState>,
    Json(settings): Json<EditorSettings>,
) -> Json<EditorSettings> {
    Json(ws.update_settings(settings))
}

async fn get_layout(State(ws): State<AppState>) -> Json<LayoutState> {
    Json(ws.with_session(|s| s.layout().state()))
}

async fn toggle_layout(State(ws): State<AppState>) -> Json<LayoutState> {
    Json(ws.toggle_layout())
}

#[derive(Deserialize)]
struct Viewport {
    width: f64,
}

async fn set_viewport(
    State(ws): State<AppState>,
    Json(viewport): Json<Viewport>,
) -> ApiResult<Json<LayoutState>> {
    if !viewport.width.is_finite() || viewport.width < 0.0 {
        return Err(ServerError::BadRequest(format!(
            "invalid viewport width: {}",
            viewport.width
        )));
    }
    Ok(Json(ws.with_session(|s| {
        s.layout_mut().on_viewport_resize(viewport.width);
        s.layout().state()
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum ResizePhase {
    Begin,
    Move,
    End,
    Cancel,
}

#[derive(Deserialize)]
struct ResizeRequest {
    phase: ResizePhase,
    #[serde(default = "default_pointer")]
    kind: PointerKind,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    #[serde(default)]
    extent: f64,
}

fn default_pointer() -> PointerKind {
    PointerKind::Mouse
}

async fn resize(State(ws): State<AppState>, Json(req): Json<ResizeRequest>) -> Json<LayoutState> {
    let pointer = Point::new(req.x, req.y);
    Json(ws.with_session(|s| {
        let layout = s.layout_mut();
        match req.phase {
            ResizePhase::Begin => {
                layout.begin_resize(req.kind, pointer, req.extent);
            }
            ResizePhase::Move => {
                layout.update_resize(pointer);
            }
            ResizePhase::End => {
                layout.end_resize();
            }
            ResizePhase::Cancel => layout.cancel_resize(),
        }
        layout.state()
    }))
}

/// The latest document, served under the same sandbox as the frame
async fn get_preview(State(ws): State<AppState>, headers: HeaderMap) -> Response {
    let preview = ws.current_preview();
    let etag = format!("\"{:08x}\"", preview.hash);

    let unchanged = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == etag);
    if unchanged {
        return (StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response();
    }

    (
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8".to_string()),
            (header::CONTENT_SECURITY_POLICY, ws.sandbox().csp_header()),
            (header::ETAG, etag),
        ],
        preview.document.as_str().to_string(),
    )
        .into_response()
}

/// Current document first, then every document the renderer publishes
async fn preview_events(
    State(ws): State<AppState>,
    Extension(closing): Extension<Closing>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let rx = ws.renderer().subscribe();
    let initial = ws.current_preview();
    tracing::info!(generation = initial.generation, "preview host connected");

    let updates = stream::once(async move { initial })
        .chain(broadcast_stream(rx, "preview", closing))
        .map(|preview: Arc<PublishedPreview>| Event::default().json_data(&*preview));

    Sse::new(updates).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("ping"))
}

async fn notice_events(
    State(ws): State<AppState>,
    Extension(closing): Extension<Closing>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let notices = broadcast_stream(ws.notifier().subscribe(), "notice", closing)
        .map(|notice: Notice| Event::default().json_data(&notice));
    Sse::new(notices).keep_alive(KeepAlive::default())
}

/// Receiver as a stream that ends on shutdown; lagging subscribers skip
/// ahead to what is newest
fn broadcast_stream<T: Clone + Send + 'static>(
    rx: broadcast::Receiver<T>,
    channel: &'static str,
    closing: Closing,
) -> impl Stream<Item = T> {
    let items = stream::unfold(rx, move |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(item) => return Some((item, rx)),
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!(channel, skipped = n, "SSE subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });
    futures::StreamExt::take_until(items, closing.wait())
}

#[derive(Deserialize)]
struct UserQuery {
    user: Option<String>,
}

impl UserQuery {
    fn resolve(self, ws: &Workspace) -> String {
        self.user.unwrap_or_else(|| ws.default_user().to_string())
    }
}

async fn list_snippets(
    State(ws): State<AppState>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<Vec<SavedSnippet>>> {
    let user = query.resolve(&ws);
    Ok(Json(ws.list_snippets(&user).await?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveSnippetRequest {
    name: String,
    user_id: Option<String>,
}

async fn save_snippet(
    State(ws): State<AppState>,
    Json(req): Json<SaveSnippetRequest>,
) -> ApiResult<(StatusCode, Json<SavedSnippet>)> {
    let user = req
        .user_id
        .unwrap_or_else(|| ws.default_user().to_string());
    let saved = ws.save_snippet(&user, &req.name).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

async fn delete_snippet(
    State(ws): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<UserQuery>,
) -> ApiResult<StatusCode> {
    let user = query.resolve(&ws);
    ws.delete_snippet(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn load_snippet(
    State(ws): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<SavedSnippet>> {
    let user = query.resolve(&ws);
    Ok(Json(ws.load_snippet(&user, id).await?))
}
