//! HTTP/JSON API for the book catalogue
//!
//! axum handlers <-> application::BookService
//!
//! Every client error is reported as 422 (invalid input), 404 (unknown id)
//! or 409 (duplicate title + author) with a `{"detail", "status"}` body.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, Request, State,
    },
    http::{header, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Deserializer};
use serde_json::json;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::SharedLibrary;
use crate::application::error::{AppError, ErrorKind};
use crate::application::query::{ListQuery, SortKey, SortOrder, DEFAULT_LIMIT};
use crate::config::Config;
use crate::domain::error::DomainError;
use crate::domain::model::book::{Book, CreateBookRequest, UpdateBookRequest};
use crate::domain::model::id::BookId;

/// ページング前の一致件数を返すレスポンスヘッダ
pub const X_TOTAL_COUNT: HeaderName = HeaderName::from_static("x-total-count");

// =============================================================================
// Public entry point
// =============================================================================

/// HTTPサーバを起動し、Ctrl+C / SIGTERMで終了する。
pub async fn run(config: Config, library: SharedLibrary) -> anyhow::Result<()> {
    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid server address {}: {}", config.server_addr(), e))?;

    let app = app(library, &config);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// ルーティングのみ（ミドルウェアなし）。
pub fn router(library: SharedLibrary) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/books", get(list_books).post(create_book))
        .route(
            "/books/:id",
            get(get_book).put(update_book).delete(delete_book),
        )
        .with_state(library)
}

/// ルーティング + request id / trace / CORS ミドルウェア。
pub fn app(library: SharedLibrary, config: &Config) -> Router {
    router(library)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(cors_layer(&config.cors_origins))
}

/// ブラウザのフロントエンドが`X-Total-Count`と`Location`を読めるようにする。
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .expose_headers([X_TOTAL_COUNT, header::LOCATION])
}

/// リクエストごとにIDを振り、完了時にstatusと所要時間を1行で記録する。
async fn request_id_middleware(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let route = format!("{} {}", request.method(), request.uri().path());
    let span = info_span!("book_api", request_id = %Uuid::new_v4());

    let response = next.run(request).instrument(span.clone()).await;

    span.in_scope(|| {
        info!(
            %route,
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "handled"
        )
    });
    response
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

// =============================================================================
// Errors
// =============================================================================

/// HTTPレスポンスに変換できるエラー。
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn unprocessable(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: detail.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl From<AppError> for ApiError {
    fn from(e: AppError) -> Self {
        let status = match e.kind() {
            ErrorKind::InvalidArgument => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            detail: e.to_string(),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        AppError::from(e).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::unprocessable(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::unprocessable(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::unprocessable(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = self.status.as_u16(), detail = %self.detail, "request failed");
        }
        let body = Json(json!({
            "detail": self.detail,
            "status": self.status.as_u16(),
        }));
        (self.status, body).into_response()
    }
}

// =============================================================================
// Request types
// =============================================================================

/// GET /books のクエリ。数値も文字列で受け、範囲外と同じく422にする。
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub q: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub offset: Option<String>,
    pub limit: Option<String>,
}

impl ListParams {
    pub fn into_query(self) -> Result<ListQuery, DomainError> {
        let order: SortOrder = self
            .order
            .as_deref()
            .map(str::parse::<SortOrder>)
            .transpose()?
            .unwrap_or_default();
        let offset = parse_int("offset", self.offset.as_deref())?.unwrap_or(0);
        let limit = parse_int("limit", self.limit.as_deref())?.unwrap_or(DEFAULT_LIMIT);

        let mut query = ListQuery::new().order(order);
        if let Some(q) = self.q {
            query = query.search(q);
        }
        if let Some(sort) = self.sort.as_deref() {
            query = query.sort_by(sort.parse::<SortKey>()?, order);
        }
        query.with_page(offset, limit)
    }
}

fn parse_int(name: &str, raw: Option<&str>) -> Result<Option<i64>, DomainError> {
    raw.map(|s| {
        s.trim().parse::<i64>().map_err(|_| {
            DomainError::InvalidArgument(format!("{name} must be an integer, got '{s}'"))
        })
    })
    .transpose()
}

/// POST /books の本文
#[derive(Debug, Deserialize)]
pub struct CreateBookBody {
    pub title: String,
    pub author: String,
    pub year: i32,
    #[serde(default)]
    pub read: bool,
}

impl From<CreateBookBody> for CreateBookRequest {
    fn from(body: CreateBookBody) -> Self {
        Self {
            title: body.title,
            author: body.author,
            year: body.year,
            read: body.read,
        }
    }
}

/// PUT /books/:id の本文。
/// 外側のNoneは「未指定」、`Some(None)`は明示的な`null`。
#[derive(Debug, Default, Deserialize)]
pub struct UpdateBookBody {
    #[serde(default, deserialize_with = "present")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub author: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub year: Option<Option<i32>>,
    #[serde(default, deserialize_with = "present")]
    pub read: Option<Option<bool>>,
}

impl TryFrom<UpdateBookBody> for UpdateBookRequest {
    type Error = DomainError;

    fn try_from(body: UpdateBookBody) -> Result<Self, Self::Error> {
        Ok(Self {
            title: not_null("title", body.title)?,
            author: not_null("author", body.author)?,
            year: not_null("year", body.year)?,
            read: not_null("read", body.read)?,
        })
    }
}

/// フィールドが存在すれば（nullでも）`Some`にする。
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn not_null<T>(name: &str, field: Option<Option<T>>) -> Result<Option<T>, DomainError> {
    match field {
        None => Ok(None),
        Some(Some(v)) => Ok(Some(v)),
        Some(None) => Err(DomainError::InvalidArgument(format!(
            "{name} must not be null"
        ))),
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// パスのIDを解決する。負のIDはどのBookにも一致しないので404。
fn resolve_id(raw: i64) -> Result<BookId, ApiError> {
    u64::try_from(raw).map(BookId::new).map_err(|_| ApiError {
        status: StatusCode::NOT_FOUND,
        detail: format!("book not found: {raw}"),
    })
}

pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /books
pub async fn list_books(
    State(library): State<SharedLibrary>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = params?;
    let query = params.into_query()?;
    let page = library.read().await.list(&query)?;

    let total = HeaderValue::from(page.total);
    Ok(([(X_TOTAL_COUNT, total)], Json(page.items)).into_response())
}

/// POST /books
pub async fn create_book(
    State(library): State<SharedLibrary>,
    body: Result<Json<CreateBookBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let book = library.write().await.create(body.into())?;
    let location = format!("/books/{}", book.id());

    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(book)).into_response())
}

/// GET /books/:id
pub async fn get_book(
    State(library): State<SharedLibrary>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Book>, ApiError> {
    let id = resolve_id(id?.0)?;
    let book = library.read().await.get(id)?;
    Ok(Json(book))
}

/// PUT /books/:id
pub async fn update_book(
    State(library): State<SharedLibrary>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdateBookBody>, JsonRejection>,
) -> Result<Json<Book>, ApiError> {
    let Path(raw_id) = id?;
    let Json(body) = body?;
    let req = UpdateBookRequest::try_from(body)?.normalized()?;
    let id = resolve_id(raw_id)?;
    let book = library.write().await.update(id, req)?;
    Ok(Json(book))
}

/// DELETE /books/:id
pub async fn delete_book(
    State(library): State<SharedLibrary>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = resolve_id(id?.0)?;
    library.write().await.delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}
