//! Router assembly. Public token-acquisition routes stay outside the auth
//! layer; everything else goes through `require_auth`.

use axum::{
    middleware::from_fn,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{protected, public};

pub fn app() -> Router {
    let router = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_auth_routes())
        .merge(protected_routes())
        .layer(TraceLayer::new_for_http());

    if crate::config::config().security.enable_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

fn public_auth_routes() -> Router {
    Router::new()
        .route("/auth/login", post(public::auth::login))
        .route("/auth/refresh", post(public::auth::refresh))
}

fn protected_routes() -> Router {
    Router::new()
        .merge(auth_session_routes())
        .merge(client_routes())
        .merge(chat_routes())
        .merge(notification_routes())
        .merge(dashboard_routes())
        .layer(from_fn(crate::middleware::require_auth))
}

fn auth_session_routes() -> Router {
    Router::new()
        .route("/auth/profile", get(protected::auth::profile).put(protected::auth::update_profile))
        .route("/auth/change-password", post(protected::auth::change_password))
        .route("/auth/logout", post(protected::auth::logout))
        .route("/auth/logout-all", post(protected::auth::logout_all))
}

fn client_routes() -> Router {
    Router::new()
        .route("/clients", get(protected::clients::list).post(protected::clients::create))
        .route(
            "/clients/:id",
            get(protected::clients::show)
                .put(protected::clients::update)
                .delete(protected::clients::delete),
        )
        .route("/clients/:id/projects", get(protected::clients::projects))
        .route("/clients/:id/invoices", get(protected::clients::invoices))
}

fn chat_routes() -> Router {
    Router::new()
        .route("/chat/rooms", get(protected::chat::list_rooms).post(protected::chat::create_room))
        .route("/chat/rooms/:id", get(protected::chat::show_room))
        .route(
            "/chat/rooms/:id/messages",
            get(protected::chat::list_messages).post(protected::chat::send_message),
        )
        .route("/chat/rooms/:id/read", post(protected::chat::mark_read))
        .route("/chat/unread-count", get(protected::chat::unread_count))
        .route("/chat/staff", get(protected::chat::staff_directory))
}

fn notification_routes() -> Router {
    Router::new()
        .route(
            "/notifications",
            get(protected::notifications::list).delete(protected::notifications::delete_bulk),
        )
        .route("/notifications/read-all", post(protected::notifications::mark_all_read))
        .route("/notifications/unread-count", get(protected::notifications::unread_count))
        .route("/notifications/statistics", get(protected::notifications::statistics))
        .route(
            "/notifications/:id",
            get(protected::notifications::show).delete(protected::notifications::delete),
        )
        .route("/notifications/:id/read", post(protected::notifications::mark_read))
}

fn dashboard_routes() -> Router {
    Router::new()
        .route("/dashboard", get(protected::dashboard::index))
        .route("/dashboard/statistics", get(protected::dashboard::statistics))
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "BizDesk Mobile API",
            "version": version,
            "endpoints": {
                "auth": "/auth/login, /auth/refresh (public); /auth/profile, /auth/change-password, /auth/logout[-all] (protected)",
                "clients": "/clients[/:id], /clients/:id/projects, /clients/:id/invoices",
                "chat": "/chat/rooms[/:id], /chat/rooms/:id/messages, /chat/rooms/:id/read, /chat/unread-count, /chat/staff",
                "notifications": "/notifications[/:id], /notifications/:id/read, /notifications/read-all, /notifications/unread-count, /notifications/statistics",
                "dashboard": "/dashboard, /dashboard/statistics",
            }
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match crate::database::manager::DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "message": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
