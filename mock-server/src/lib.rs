use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{
        header::{AUTHORIZATION, RETRY_AFTER},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

/// The only API key the mock accepts.
pub const MOCK_API_KEY: &str = "mock-api-key";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub short_id: String,
    #[serde(rename = "trackingURL")]
    pub tracking_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub state: u8,
}

#[derive(Deserialize)]
pub struct CreateTask {
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateTask {
    pub notes: Option<String>,
}

pub type Db = Arc<RwLock<HashMap<String, Task>>>;

#[derive(Clone)]
struct AppState {
    db: Db,
    /// Requests left before every call is answered with error 2300.
    budget: Arc<RwLock<Option<u32>>>,
}

/// An Onfleet-style error response.
#[derive(Debug)]
pub struct Failure {
    status: StatusCode,
    code: &'static str,
    error: u32,
    message: String,
}

impl Failure {
    fn new(status: StatusCode, code: &'static str, error: u32, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            error,
            message: message.into(),
        }
    }

    fn not_found(what: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "ResourceNotFound",
            1402,
            format!("The requested {what} does not exist."),
        )
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let body = json!({
            "code": self.code,
            "message": {
                "error": self.error,
                "message": self.message,
                "cause": null,
                "request": Uuid::new_v4(),
            }
        });
        let mut response = (self.status, Json(body)).into_response();
        if self.status == StatusCode::TOO_MANY_REQUESTS {
            response.headers_mut().insert(RETRY_AFTER, HeaderValue::from_static("1"));
        }
        response
    }
}

pub fn app() -> Router {
    router(None)
}

/// Like `app`, but rate limits every request after the first `budget`.
pub fn app_with_budget(budget: u32) -> Router {
    router(Some(budget))
}

fn router(budget: Option<u32>) -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(HashMap::new())),
        budget: Arc::new(RwLock::new(budget)),
    };
    Router::new()
        .route("/api/v2/auth/test", get(auth_test))
        .route("/api/v2/tasks", post(create_task))
        .route("/api/v2/tasks/all", get(list_tasks))
        .route("/api/v2/tasks/shortId/{short_id}", get(get_task_by_short_id))
        .route(
            "/api/v2/tasks/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/api/v2/teams/{id}/dispatch", post(auto_dispatch))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    serve(listener, app()).await
}

pub async fn serve(listener: TcpListener, router: Router) -> Result<(), std::io::Error> {
    axum::serve(listener, router).await
}

/// Authenticate and charge one request against the budget.
async fn admit(state: &AppState, headers: &HeaderMap) -> Result<(), Failure> {
    let expected = format!("Basic {}", STANDARD.encode(format!("{MOCK_API_KEY}:")));
    let presented = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    if presented != Some(expected.as_str()) {
        return Err(Failure::new(
            StatusCode::UNAUTHORIZED,
            "InvalidCredentials",
            1102,
            "Invalid API key.",
        ));
    }

    let mut budget = state.budget.write().await;
    match budget.as_mut() {
        Some(0) => Err(Failure::new(
            StatusCode::TOO_MANY_REQUESTS,
            "TooManyRequests",
            2300,
            "You have exceeded your request rate limit.",
        )),
        Some(left) => {
            *left -= 1;
            Ok(())
        }
        None => Ok(()),
    }
}

fn new_task(notes: Option<String>) -> Task {
    let id: String = Uuid::new_v4().simple().to_string().chars().take(24).collect();
    let short_id: String = Uuid::new_v4().simple().to_string().chars().take(8).collect();
    Task {
        tracking_url: format!("https://onf.lt/{short_id}"),
        id,
        short_id,
        notes,
        state: 0,
    }
}

async fn auth_test(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, Failure> {
    admit(&state, &headers).await?;
    Ok(Json(json!({ "message": "Hello organization mock!" })))
}

async fn create_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreateTask>,
) -> Result<Json<Task>, Failure> {
    admit(&state, &headers).await?;
    let task = new_task(input.notes);
    debug!(id = %task.id, short_id = %task.short_id, "task created");
    state.db.write().await.insert(task.id.clone(), task.clone());
    Ok(Json(task))
}

async fn list_tasks(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, Failure> {
    admit(&state, &headers).await?;
    let tasks: Vec<Task> = state.db.read().await.values().cloned().collect();
    Ok(Json(json!({ "tasks": tasks })))
}

async fn get_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Task>, Failure> {
    admit(&state, &headers).await?;
    let tasks = state.db.read().await;
    tasks.get(&id).cloned().map(Json).ok_or_else(|| Failure::not_found("task"))
}

async fn get_task_by_short_id(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(short_id): Path<String>,
) -> Result<Json<Task>, Failure> {
    admit(&state, &headers).await?;
    let tasks = state.db.read().await;
    tasks
        .values()
        .find(|t| t.short_id == short_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| Failure::not_found("task"))
}

async fn update_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<UpdateTask>,
) -> Result<Json<Task>, Failure> {
    admit(&state, &headers).await?;
    let mut tasks = state.db.write().await;
    let task = tasks.get_mut(&id).ok_or_else(|| Failure::not_found("task"))?;
    if let Some(notes) = input.notes {
        task.notes = Some(notes);
    }
    Ok(Json(task.clone()))
}

async fn delete_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, Failure> {
    admit(&state, &headers).await?;
    let mut tasks = state.db.write().await;
    tasks.remove(&id).map(|_| StatusCode::OK).ok_or_else(|| Failure::not_found("task"))
}

/// Auto-dispatch always fails its precondition here: the team has no
/// on-duty workers.
async fn auto_dispatch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(_id): Path<String>,
) -> Result<StatusCode, Failure> {
    admit(&state, &headers).await?;
    Err(Failure::new(
        StatusCode::BAD_REQUEST,
        "PreconditionFailed",
        2218,
        "No on-duty workers available to dispatch.",
    ))
}
