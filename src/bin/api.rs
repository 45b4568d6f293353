use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use dotenvy::dotenv;
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use stackit_admin::{
    access::AdminGuard,
    analytics::admin_analytics,
    auth::AuthClaims,
    config::ServerConfig,
    detailed_analytics::{detailed_analytics, TimeRange},
    export::{export_platform_data, ExportFormat, ExportSelection},
    health::system_health,
    listing::{admin_answers, admin_users, AnswerSort, ListParams, UserSort, DEFAULT_PAGE_SIZE},
    moderation::{bulk_delete_users, delete_answer, delete_user},
    notifications::{mark_all_as_read, mark_as_read, notifications_for_user},
    services::{AdminError, ContentStore, InMemoryStore, RecordId},
    user_analytics::user_analytics,
};

#[derive(Clone)]
struct AppState {
    store: InMemoryStore,
    guard: AdminGuard,
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env();
    let guard = AdminGuard::new(config.admin_emails.clone());
    let store = InMemoryStore::new_with_sample();
    let state = AppState { store, guard };

    let app = Router::new()
        .route("/health", get(health))
        .route("/admin/analytics", get(analytics_summary))
        .route("/admin/analytics/detailed", get(analytics_detailed))
        .route("/admin/users", get(users_listing).delete(users_delete))
        .route("/admin/users/bulk", delete(users_bulk_delete))
        .route("/admin/users/:user_id/analytics", get(user_detail))
        .route("/admin/answers", get(answers_listing).delete(answers_delete))
        .route("/admin/system-health", get(system_health_snapshot))
        .route("/admin/export", post(export))
        .route("/notifications", get(notification_feed))
        .route("/notifications/read", post(notification_read))
        .route("/notifications/read-all", post(notification_read_all))
        .with_state(state);

    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .expect("invalid BIND_ADDR, expected host:port");
    info!("admin API listening on http://{addr}");

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server crashed");
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

fn error_response(err: AdminError) -> Response {
    let status = match &err {
        AdminError::Unauthenticated | AdminError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        AdminError::NotFound(_) | AdminError::Validation(_) => StatusCode::BAD_REQUEST,
        AdminError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if let AdminError::Internal(detail) = &err {
        error!(error = %detail, "admin operation failed");
    }
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let store_status = match state.store.count_users(None) {
        Ok(_) => json!({ "status": "ok" }),
        Err(err) => {
            error!(error = %err, "store connectivity check failed");
            json!({ "status": "error", "message": err.to_string() })
        }
    };

    (
        StatusCode::OK,
        Json(json!({
            "service": "ok",
            "store": store_status,
            "timestamp": Utc::now()
        })),
    )
}

async fn analytics_summary(State(state): State<AppState>, claims: AuthClaims) -> Response {
    match admin_analytics(&state.store, &state.guard, &claims.sub) {
        Ok(payload) => Json(payload).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Deserialize)]
struct DetailedQuery {
    #[serde(rename = "timeRange")]
    time_range: Option<String>,
}

async fn analytics_detailed(
    State(state): State<AppState>,
    claims: AuthClaims,
    Query(query): Query<DetailedQuery>,
) -> Response {
    let range = match query.time_range.as_deref() {
        None => TimeRange::default(),
        Some(raw) => match raw.parse() {
            Ok(range) => range,
            Err(err) => return error_response(err),
        },
    };
    match detailed_analytics(&state.store, &state.guard, &claims.sub, range) {
        Ok(payload) => Json(payload).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Deserialize)]
struct ListQuery {
    page: Option<usize>,
    #[serde(rename = "pageSize")]
    page_size: Option<usize>,
    #[serde(rename = "searchQuery")]
    search_query: Option<String>,
    #[serde(rename = "sortBy")]
    sort_by: Option<String>,
}

impl ListQuery {
    fn params(&self) -> ListParams {
        ListParams {
            page: self.page.unwrap_or(1).max(1),
            page_size: self.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1),
            search_query: self.search_query.clone().filter(|query| !query.is_empty()),
        }
    }
}

async fn users_listing(
    State(state): State<AppState>,
    claims: AuthClaims,
    Query(query): Query<ListQuery>,
) -> Response {
    let sort = UserSort::parse(query.sort_by.as_deref().unwrap_or("newest"));
    match admin_users(&state.store, &state.guard, &claims.sub, &query.params(), sort) {
        Ok(page) => Json(page).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Deserialize)]
struct DeleteUserBody {
    #[serde(rename = "userId")]
    user_id: Option<RecordId>,
}

async fn users_delete(
    State(state): State<AppState>,
    claims: AuthClaims,
    Json(body): Json<DeleteUserBody>,
) -> Response {
    let Some(user_id) = body.user_id else {
        return error_response(AdminError::Validation("user id is required".into()));
    };
    match delete_user(&state.store, &state.guard, &claims.sub, user_id) {
        Ok(report) => Json(report).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Deserialize)]
struct BulkDeleteBody {
    #[serde(rename = "userIds")]
    user_ids: Option<Vec<RecordId>>,
}

async fn users_bulk_delete(
    State(state): State<AppState>,
    claims: AuthClaims,
    Json(body): Json<BulkDeleteBody>,
) -> Response {
    let Some(user_ids) = body.user_ids.filter(|ids| !ids.is_empty()) else {
        return error_response(AdminError::Validation("user ids array is required".into()));
    };
    match bulk_delete_users(&state.store, &state.guard, &claims.sub, &user_ids) {
        Ok(outcome) => Json(outcome).into_response(),
        Err(err) => error_response(err),
    }
}

async fn user_detail(
    State(state): State<AppState>,
    claims: AuthClaims,
    Path(user_id): Path<RecordId>,
) -> Response {
    match user_analytics(&state.store, &state.guard, &claims.sub, user_id) {
        Ok(payload) => Json(payload).into_response(),
        Err(err) => error_response(err),
    }
}

async fn answers_listing(
    State(state): State<AppState>,
    claims: AuthClaims,
    Query(query): Query<ListQuery>,
) -> Response {
    let sort = AnswerSort::parse(query.sort_by.as_deref().unwrap_or("newest"));
    match admin_answers(&state.store, &state.guard, &claims.sub, &query.params(), sort) {
        Ok(page) => Json(page).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Deserialize)]
struct DeleteAnswerBody {
    #[serde(rename = "answerId")]
    answer_id: Option<RecordId>,
}

async fn answers_delete(
    State(state): State<AppState>,
    claims: AuthClaims,
    Json(body): Json<DeleteAnswerBody>,
) -> Response {
    let Some(answer_id) = body.answer_id else {
        return error_response(AdminError::Validation("answer id is required".into()));
    };
    match delete_answer(&state.store, &state.guard, &claims.sub, answer_id) {
        Ok(report) => Json(report).into_response(),
        Err(err) => error_response(err),
    }
}

async fn system_health_snapshot(State(state): State<AppState>, claims: AuthClaims) -> Response {
    match system_health(&state.store, &state.guard, &claims.sub) {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Deserialize)]
struct ExportQuery {
    #[serde(rename = "type")]
    data_type: Option<String>,
    format: Option<String>,
}

async fn export(
    State(state): State<AppState>,
    claims: AuthClaims,
    Query(query): Query<ExportQuery>,
) -> Response {
    let selection = match query.data_type.as_deref() {
        None => ExportSelection::default(),
        Some(raw) => match raw.parse() {
            Ok(selection) => selection,
            Err(err) => return error_response(err),
        },
    };
    let format = match query.format.as_deref() {
        None => ExportFormat::default(),
        Some(raw) => match raw.parse::<ExportFormat>() {
            Ok(format) => format,
            Err(err) => return error_response(err),
        },
    };

    match export_platform_data(&state.store, &state.guard, &claims.sub, selection, format) {
        Ok(payload) => {
            let filename = format!(
                "platform-data-{}.{}",
                Utc::now().format("%Y-%m-%d"),
                payload.format.extension()
            );
            (
                [
                    (
                        header::CONTENT_TYPE,
                        payload.format.content_type().to_string(),
                    ),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{filename}\""),
                    ),
                ],
                payload.body,
            )
                .into_response()
        }
        Err(err) => error_response(err),
    }
}

async fn notification_feed(State(state): State<AppState>, claims: AuthClaims) -> Response {
    match notifications_for_user(&state.store, &claims.sub) {
        Ok(feed) => Json(feed).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Deserialize)]
struct NotificationReadBody {
    #[serde(rename = "notificationId")]
    notification_id: Option<RecordId>,
}

async fn notification_read(
    State(state): State<AppState>,
    claims: AuthClaims,
    Json(body): Json<NotificationReadBody>,
) -> Response {
    let Some(notification_id) = body.notification_id else {
        return error_response(AdminError::Validation("notification id is required".into()));
    };
    match mark_as_read(&state.store, &claims.sub, notification_id) {
        Ok(()) => Json(json!({ "success": true })).into_response(),
        Err(err) => error_response(err),
    }
}

async fn notification_read_all(State(state): State<AppState>, claims: AuthClaims) -> Response {
    match mark_all_as_read(&state.store, &claims.sub) {
        Ok(marked) => Json(json!({ "success": true, "marked": marked })).into_response(),
        Err(err) => error_response(err),
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut terminate =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = terminate.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    }
}
