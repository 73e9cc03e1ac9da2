//! SkillSync HTTP server.
//!
//! A JSON REST API over the in-memory [`Store`], shaped for the SkillSync
//! browser client (camelCase bodies, everything under `/api`).
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`, `POST` | `/api/knowledge` | List (filters + search) / create |
//! | `GET`, `PUT` | `/api/knowledge/{id}` | Get / partial update |
//! | `POST` | `/api/knowledge/{id}/like` | Add one like |
//! | `GET`, `POST` | `/api/queries` | List (filters + search) / create |
//! | `GET`, `PUT` | `/api/queries/{id}` | Get / update while pending |
//! | `POST` | `/api/queries/{id}/answer` | Human answer |
//! | `POST` | `/api/queries/{id}/ai-answer` | Generated answer |
//! | `GET`, `POST` | `/api/communities` | List / create |
//! | `GET`  | `/api/communities/{project}` | First community for a project |
//! | `PUT`  | `/api/communities/{id}` | Partial update |
//! | `POST` | `/api/communities/{id}/join` | Add a member |
//! | `GET`  | `/api/categories`, `/api/projects` | Distinct knowledge values |
//! | `GET`  | `/api/search` | Combined search |
//! | `POST` | `/api/ask-ai` | Free question to the AI provider |
//! | `POST` | `/api/upload` | Multipart file upload |
//! | `GET`  | `/api/uploads/{filename}` | Download an upload |
//! | `GET`  | `/api/analytics` | Dashboard counters |
//! | | `/api/auth/*` | See [`crate::auth`] |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "title is required" } }
//! ```
//!
//! Error codes: `bad_request` (400), `ai_disabled` (400), `unauthorized` (401),
//! `not_found` (404), `payload_too_large` (413), `ai_error` (502),
//! `internal` (500).

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        DefaultBodyLimit, FromRequest, FromRequestParts, Path, Request, State,
    },
    http::{request::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use skillsync_core::models::{
    Attachment, Community, CommunityUpdate, KnowledgeFilter, KnowledgeItem, KnowledgeType,
    KnowledgeUpdate, NewAnswer, NewCommunity, NewKnowledge, NewQuery, Query, QueryFilter,
    QueryStatus, QueryUpdate,
};
use skillsync_core::search::{self, Scored, SearchHit, SearchScope};
use skillsync_core::stats::{self, Analytics};
use skillsync_core::store::memory::InMemoryStore;
use skillsync_core::store::{Store, StoreError};

use crate::ai::{self, AiAnswer, AiError, CompletionProvider};
use crate::auth::{self, Sessions};
use crate::config::Config;
use crate::upload::{self, UPLOADS_ROUTE};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub sessions: Arc<Sessions>,
    pub ai: Arc<dyn CompletionProvider>,
}

impl AppState {
    /// Seeded in-memory store, empty session table, and the configured AI
    /// provider.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            config: Arc::new(config.clone()),
            store: Arc::new(InMemoryStore::seeded(&config.auth.admin_password)),
            sessions: Arc::new(Sessions::new()),
            ai: ai::create_provider(&config.ai)?,
        })
    }
}

/// Starts the HTTP server on `[server].bind` and runs until the process is
/// terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let state = AppState::new(config)?;
    let app = router(state)?;

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(
        bind = %config.server.bind,
        cors_origin = %config.server.cors_origin,
        ai_provider = %config.ai.provider,
        "SkillSync server listening on http://{}",
        config.server.bind
    );
    axum::serve(listener, app).await?;

    Ok(())
}

fn cors_layer(origin: &str) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origin == "*" {
        return Ok(layer.allow_origin(Any));
    }
    let value = HeaderValue::from_str(origin)
        .map_err(|_| anyhow::anyhow!("server.cors_origin is not a valid origin: '{}'", origin))?;
    Ok(layer.allow_origin(value))
}

/// Build the full route table.
pub fn router(state: AppState) -> anyhow::Result<Router> {
    let cors = cors_layer(&state.config.server.cors_origin)?;
    let uploads = ServeDir::new(&state.config.uploads.dir);
    let max_upload = state.config.uploads.max_bytes;

    let api = Router::new()
        .route(
            "/knowledge",
            get(handle_list_knowledge).post(handle_create_knowledge),
        )
        .route(
            "/knowledge/{id}",
            get(handle_get_knowledge).put(handle_update_knowledge),
        )
        .route("/knowledge/{id}/like", post(handle_like_knowledge))
        .route("/queries", get(handle_list_queries).post(handle_create_query))
        .route(
            "/queries/{id}",
            get(handle_get_query).put(handle_update_query),
        )
        .route("/queries/{id}/answer", post(handle_answer_query))
        .route("/queries/{id}/ai-answer", post(handle_ai_answer))
        .route(
            "/communities",
            get(handle_list_communities).post(handle_create_community),
        )
        // GET resolves the segment as a project name, PUT as a community id.
        .route(
            "/communities/{id}",
            get(handle_community_by_project).put(handle_update_community),
        )
        .route("/communities/{id}/join", post(handle_join_community))
        .route("/categories", get(handle_categories))
        .route("/projects", get(handle_projects))
        .route("/search", get(handle_search))
        .route("/ask-ai", post(handle_ask_ai))
        .route("/analytics", get(handle_analytics))
        .route(
            "/upload",
            post(upload::handle_upload).layer(DefaultBodyLimit::max(max_upload)),
        )
        .route("/auth/register", post(auth::handle_register))
        .route("/auth/login", post(auth::handle_login))
        .route("/auth/logout", post(auth::handle_logout))
        .route("/auth/me", get(auth::handle_me))
        .route("/auth/verify", get(auth::handle_verify));

    Ok(Router::new()
        .route("/health", get(handle_health))
        .nest("/api", api)
        .nest_service(UPLOADS_ROUTE, uploads)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state))
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`, `"not_found"`).
    code: String,
    message: String,
}

/// Error type that converts into the JSON error envelope.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn error(status: StatusCode, code: &str, message: impl Into<String>) -> AppError {
    AppError {
        status,
        code: code.to_string(),
        message: message.into(),
    }
}

pub fn bad_request(message: impl Into<String>) -> AppError {
    error(StatusCode::BAD_REQUEST, "bad_request", message)
}

pub fn not_found(message: impl Into<String>) -> AppError {
    error(StatusCode::NOT_FOUND, "not_found", message)
}

pub fn unauthorized(message: impl Into<String>) -> AppError {
    error(StatusCode::UNAUTHORIZED, "unauthorized", message)
}

fn internal() -> AppError {
    error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal",
        "internal server error",
    )
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => not_found(err.to_string()),
            StoreError::Invalid(msg) | StoreError::Conflict(msg) => bad_request(msg),
            StoreError::Internal(msg) => {
                tracing::error!(error = %msg, "store failure");
                internal()
            }
        }
    }
}

impl From<AiError> for AppError {
    fn from(err: AiError) -> Self {
        match err {
            AiError::Disabled => error(StatusCode::BAD_REQUEST, "ai_disabled", err.to_string()),
            AiError::Upstream(_) => {
                tracing::warn!(error = %err, "completion request failed");
                error(StatusCode::BAD_GATEWAY, "ai_error", err.to_string())
            }
            AiError::Store(e) => e.into(),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!(error = %format!("{:#}", err), "request failed");
        internal()
    }
}

// ============ Extractors ============

/// `Json` whose rejections use the error envelope.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> AppError {
    bad_request(rejection.body_text())
}

/// `Query` whose rejections use the error envelope.
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match axum::extract::Query::<T>::from_request_parts(parts, state).await {
            Ok(axum::extract::Query(value)) => Ok(ApiQuery(value)),
            Err(rejection) => Err(query_rejection(rejection)),
        }
    }
}

fn query_rejection(rejection: QueryRejection) -> AppError {
    bad_request(rejection.body_text())
}

/// Query-string values arrive as `""` when a form field is left empty.
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_param<T>(value: Option<String>) -> Result<Option<T>, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    non_blank(value)
        .map(|v| v.trim().parse::<T>())
        .transpose()
        .map_err(|e| bad_request(e.to_string()))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Knowledge ============

#[derive(Deserialize)]
struct KnowledgeParams {
    category: Option<String>,
    project: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    search: Option<String>,
}

async fn handle_list_knowledge(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<KnowledgeParams>,
) -> Result<Json<Vec<Scored<KnowledgeItem>>>, AppError> {
    let filter = KnowledgeFilter {
        category: non_blank(params.category),
        project: non_blank(params.project),
        kind: parse_param::<KnowledgeType>(params.kind)?,
    };
    let items =
        search::list_knowledge(state.store.as_ref(), &filter, params.search.as_deref()).await?;
    Ok(Json(items))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateKnowledgeRequest {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    author: String,
    #[serde(default)]
    project: String,
    #[serde(default, rename = "type")]
    kind: KnowledgeType,
    #[serde(default)]
    attachments: Vec<Attachment>,
}

async fn handle_create_knowledge(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateKnowledgeRequest>,
) -> Result<(StatusCode, Json<KnowledgeItem>), AppError> {
    let item = state
        .store
        .create_knowledge(NewKnowledge {
            title: req.title,
            content: req.content,
            category: req.category,
            tags: req.tags,
            author: req.author,
            project: req.project,
            kind: req.kind,
            attachments: req.attachments,
        })
        .await?;
    tracing::info!(id = %item.id, title = %item.title, "created knowledge");
    Ok((StatusCode::CREATED, Json(item)))
}

async fn handle_get_knowledge(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<KnowledgeItem>, AppError> {
    Ok(Json(state.store.get_knowledge(&id).await?))
}

/// Unknown fields, `likes` included, are ignored.
#[derive(Deserialize)]
struct UpdateKnowledgeRequest {
    title: Option<String>,
    content: Option<String>,
    category: Option<String>,
    tags: Option<Vec<String>>,
    project: Option<String>,
    #[serde(rename = "type")]
    kind: Option<KnowledgeType>,
    attachments: Option<Vec<Attachment>>,
}

async fn handle_update_knowledge(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateKnowledgeRequest>,
) -> Result<Json<KnowledgeItem>, AppError> {
    let update = KnowledgeUpdate {
        title: req.title,
        content: req.content,
        category: req.category,
        tags: req.tags,
        project: req.project,
        kind: req.kind,
        attachments: req.attachments,
    };
    Ok(Json(state.store.update_knowledge(&id, update).await?))
}

async fn handle_like_knowledge(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<KnowledgeItem>, AppError> {
    Ok(Json(state.store.like_knowledge(&id).await?))
}

// ============ Queries ============

#[derive(Deserialize)]
struct QueryParams {
    project: Option<String>,
    status: Option<String>,
    search: Option<String>,
}

async fn handle_list_queries(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<QueryParams>,
) -> Result<Json<Vec<Scored<Query>>>, AppError> {
    let filter = QueryFilter {
        project: non_blank(params.project),
        status: parse_param::<QueryStatus>(params.status)?,
    };
    let queries =
        search::list_queries(state.store.as_ref(), &filter, params.search.as_deref()).await?;
    Ok(Json(queries))
}

#[derive(Deserialize)]
struct CreateQueryRequest {
    #[serde(default)]
    question: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    project: String,
}

async fn handle_create_query(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateQueryRequest>,
) -> Result<(StatusCode, Json<Query>), AppError> {
    let query = state
        .store
        .create_query(NewQuery {
            question: req.question,
            author: req.author,
            project: req.project,
        })
        .await?;
    tracing::info!(id = %query.id, "created query");
    Ok((StatusCode::CREATED, Json(query)))
}

async fn handle_get_query(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Query>, AppError> {
    Ok(Json(state.store.get_query(&id).await?))
}

#[derive(Deserialize)]
struct UpdateQueryRequest {
    question: Option<String>,
    project: Option<String>,
}

async fn handle_update_query(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateQueryRequest>,
) -> Result<Json<Query>, AppError> {
    let update = QueryUpdate {
        question: req.question,
        project: req.project,
    };
    Ok(Json(state.store.update_query(&id, update).await?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnswerRequest {
    #[serde(default)]
    answer: String,
    #[serde(default)]
    answered_by: String,
}

async fn handle_answer_query(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<AnswerRequest>,
) -> Result<Json<Query>, AppError> {
    let query = state
        .store
        .answer_query(
            &id,
            NewAnswer {
                answer: req.answer,
                answered_by: req.answered_by,
            },
        )
        .await?;
    tracing::info!(id = %query.id, "query answered");
    Ok(Json(query))
}

async fn handle_ai_answer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Query>, AppError> {
    let query = state.store.get_query(&id).await?;
    let answer = ai::answer_question(
        state.store.as_ref(),
        state.ai.as_ref(),
        &query.question,
        state.config.ai.context_items,
    )
    .await?;
    let query = state.store.set_ai_answer(&id, answer.answer).await?;
    tracing::info!(id = %query.id, model = %answer.model, "stored AI answer");
    Ok(Json(query))
}

// ============ Communities ============

async fn handle_list_communities(
    State(state): State<AppState>,
) -> Result<Json<Vec<Community>>, AppError> {
    Ok(Json(state.store.list_communities().await?))
}

async fn handle_community_by_project(
    State(state): State<AppState>,
    Path(project): Path<String>,
) -> Result<Json<Community>, AppError> {
    Ok(Json(state.store.find_community_by_project(&project).await?))
}

fn default_active() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateCommunityRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    project: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    members: Vec<String>,
    #[serde(default = "default_active")]
    is_active: bool,
}

async fn handle_create_community(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateCommunityRequest>,
) -> Result<(StatusCode, Json<Community>), AppError> {
    let community = state
        .store
        .create_community(NewCommunity {
            name: req.name,
            project: req.project,
            description: req.description,
            members: req.members,
            is_active: req.is_active,
        })
        .await?;
    tracing::info!(id = %community.id, name = %community.name, "created community");
    Ok((StatusCode::CREATED, Json(community)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateCommunityRequest {
    name: Option<String>,
    description: Option<String>,
    is_active: Option<bool>,
}

async fn handle_update_community(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateCommunityRequest>,
) -> Result<Json<Community>, AppError> {
    let update = CommunityUpdate {
        name: req.name,
        description: req.description,
        is_active: req.is_active,
    };
    Ok(Json(state.store.update_community(&id, update).await?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JoinRequest {
    #[serde(default)]
    member_name: String,
}

async fn handle_join_community(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<JoinRequest>,
) -> Result<Json<Community>, AppError> {
    let community = state.store.join_community(&id, &req.member_name).await?;
    Ok(Json(community))
}

// ============ Categories / projects / analytics ============

async fn handle_categories(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    let items = state.store.list_knowledge(&KnowledgeFilter::default()).await?;
    Ok(Json(stats::distinct_categories(&items)))
}

async fn handle_projects(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    let items = state.store.list_knowledge(&KnowledgeFilter::default()).await?;
    Ok(Json(stats::distinct_projects(&items)))
}

async fn handle_analytics(State(state): State<AppState>) -> Result<Json<Analytics>, AppError> {
    let knowledge = state.store.list_knowledge(&KnowledgeFilter::default()).await?;
    let queries = state.store.list_queries(&QueryFilter::default()).await?;
    let communities = state.store.list_communities().await?;
    Ok(Json(Analytics::compute(&knowledge, &queries, &communities)))
}

// ============ GET /api/search ============

#[derive(Deserialize)]
struct SearchParams {
    q: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    query: String,
    #[serde(rename = "type")]
    scope: SearchScope,
    results: Vec<SearchHit>,
    total_results: usize,
}

async fn handle_search(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> Result<Json<SearchResponse>, AppError> {
    let query = non_blank(params.q)
        .ok_or_else(|| bad_request("query parameter 'q' must not be empty"))?;
    let scope = parse_param::<SearchScope>(params.kind)?.unwrap_or_default();

    let results = search::search_all(state.store.as_ref(), &query, scope).await?;
    Ok(Json(SearchResponse {
        query,
        scope,
        total_results: results.len(),
        results,
    }))
}

// ============ POST /api/ask-ai ============

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AskAiRequest {
    #[serde(default)]
    question: String,
    /// Accepted for client compatibility; online search is not performed.
    #[serde(default)]
    #[allow(dead_code)]
    include_online_search: bool,
}

async fn handle_ask_ai(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<AskAiRequest>,
) -> Result<Json<AiAnswer>, AppError> {
    if req.question.trim().is_empty() {
        return Err(bad_request("question is required"));
    }
    let answer = ai::answer_question(
        state.store.as_ref(),
        state.ai.as_ref(),
        &req.question,
        state.config.ai.context_items,
    )
    .await?;
    Ok(Json(answer))
}
