//! Notifications. Every query is scoped by `(staff_id, business_id)` before
//! any other filter; a caller can never see or delete another staff
//! member's rows, even by guessing ids.

use axum::{
    extract::{Path, Query},
    response::Json,
    Extension,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::api::envelope::{self, PageMeta};
use crate::database::manager::DatabaseManager;
use crate::database::models::notification::Notification;
use crate::error::ApiError;
use crate::middleware::AuthStaff;
use crate::query::{bind_query, bind_query_as, Pagination, SqlWhere};

const NOTIFICATION_COLUMNS: &str =
    "id, business_id, staff_id, kind, title, content, read_at, created_at";

/// List filters: `status` selects read state rather than a status column
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationParams {
    pub status: Option<String>,
    pub kind: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: Option<Vec<Uuid>>,
}

/// GET /notifications - newest first
pub async fn list(
    Extension(auth): Extension<AuthStaff>,
    Query(params): Query<NotificationParams>,
) -> Result<Json<Value>, ApiError> {
    let paging = Pagination::build(params.page, params.per_page)?;
    if let (Some(start), Some(end)) = (params.start_date, params.end_date) {
        if start > end {
            return Err(ApiError::validation_field("start_date", "start_date must not be after end_date"));
        }
    }

    let mut scope = owner_scope(&auth);
    match params.status.as_deref().map(str::trim) {
        None | Some("") => {}
        Some("unread") => {
            scope.raw("read_at IS NULL");
        }
        Some("read") => {
            scope.raw("read_at IS NOT NULL");
        }
        Some(other) => {
            return Err(ApiError::validation_field(
                "status",
                format!("Unknown status '{}', expected 'read' or 'unread'", other),
            ))
        }
    }
    if let Some(kind) = params.kind.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        scope.eq_str("kind", kind);
    }
    if let Some(start) = params.start_date {
        scope.date_gte("created_at", start);
    }
    if let Some(end) = params.end_date {
        scope.date_lte("created_at", end);
    }

    let pool = DatabaseManager::pool().await?;

    let count_sql = format!("SELECT COUNT(*) AS count FROM notifications WHERE {}", scope.clause());
    let mut count_query = sqlx::query(&count_sql);
    for p in scope.params() {
        count_query = bind_query(count_query, p);
    }
    let total: i64 = count_query.fetch_one(&pool).await?.try_get("count")?;

    let rows_sql = format!(
        "SELECT {} FROM notifications WHERE {} ORDER BY created_at DESC {}",
        NOTIFICATION_COLUMNS,
        scope.clause(),
        paging.limit_clause(),
    );
    let mut rows_query = sqlx::query_as::<_, Notification>(&rows_sql);
    for p in scope.params() {
        rows_query = bind_query_as(rows_query, p);
    }
    let notifications = rows_query.fetch_all(&pool).await?;

    let items = notifications.iter().map(Notification::to_public).collect();
    Ok(envelope::paginated(items, PageMeta::new(paging.page, paging.per_page, total)))
}

/// GET /notifications/:id
pub async fn show(
    Extension(auth): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let pool = DatabaseManager::pool().await?;
    let notification = find_notification(&pool, &auth, id).await?;
    Ok(envelope::ok(notification.to_public()))
}

/// POST /notifications/:id/read - monotonic read transition.
///
/// A row that is already read keeps its original `read_at`; re-marking is a
/// successful no-op.
pub async fn mark_read(
    Extension(auth): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let pool = DatabaseManager::pool().await?;

    let updated = sqlx::query_as::<_, Notification>(&format!(
        "UPDATE notifications SET read_at = now() \
         WHERE id = $1 AND staff_id = $2 AND business_id = $3 AND read_at IS NULL \
         RETURNING {}",
        NOTIFICATION_COLUMNS
    ))
    .bind(id)
    .bind(auth.staff_id)
    .bind(auth.business_id)
    .fetch_optional(&pool)
    .await?;

    // Zero rows means absent (404 below) or already read (no-op success
    // with the original read_at)
    let notification = match updated {
        Some(n) => n,
        None => find_notification(&pool, &auth, id).await?,
    };

    Ok(envelope::ok(notification.to_public()))
}

/// POST /notifications/read-all - touches only currently-unread rows
pub async fn mark_all_read(Extension(auth): Extension<AuthStaff>) -> Result<Json<Value>, ApiError> {
    let pool = DatabaseManager::pool().await?;

    let result = sqlx::query(
        "UPDATE notifications SET read_at = now() \
         WHERE staff_id = $1 AND business_id = $2 AND read_at IS NULL",
    )
    .bind(auth.staff_id)
    .bind(auth.business_id)
    .execute(&pool)
    .await?;

    Ok(envelope::ok(json!({ "updated_count": result.rows_affected() })))
}

/// DELETE /notifications/:id
pub async fn delete(
    Extension(auth): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let pool = DatabaseManager::pool().await?;

    let result = sqlx::query(
        "DELETE FROM notifications WHERE id = $1 AND staff_id = $2 AND business_id = $3",
    )
    .bind(id)
    .bind(auth.staff_id)
    .bind(auth.business_id)
    .execute(&pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Notification not found"));
    }
    Ok(envelope::message("Notification deleted"))
}

/// DELETE /notifications - bulk delete; ids outside the caller's scope are
/// skipped and the reported count covers only the owned subset
pub async fn delete_bulk(
    Extension(auth): Extension<AuthStaff>,
    Json(payload): Json<BulkDeleteRequest>,
) -> Result<Json<Value>, ApiError> {
    let ids = match payload.ids {
        Some(ids) if !ids.is_empty() => ids,
        _ => return Err(ApiError::validation_field("ids", "The ids field must be a non-empty list")),
    };

    let pool = DatabaseManager::pool().await?;

    let result = sqlx::query(
        "DELETE FROM notifications WHERE staff_id = $1 AND business_id = $2 AND id = ANY($3)",
    )
    .bind(auth.staff_id)
    .bind(auth.business_id)
    .bind(&ids)
    .execute(&pool)
    .await?;

    Ok(envelope::ok(json!({ "deleted_count": result.rows_affected() })))
}

/// GET /notifications/unread-count
pub async fn unread_count(Extension(auth): Extension<AuthStaff>) -> Result<Json<Value>, ApiError> {
    let pool = DatabaseManager::pool().await?;

    let count: i64 = sqlx::query(
        "SELECT COUNT(*) AS count FROM notifications \
         WHERE staff_id = $1 AND business_id = $2 AND read_at IS NULL",
    )
    .bind(auth.staff_id)
    .bind(auth.business_id)
    .fetch_one(&pool)
    .await?
    .try_get("count")?;

    Ok(envelope::ok(json!({ "unread_count": count })))
}

/// GET /notifications/statistics - totals and per-kind breakdown
pub async fn statistics(Extension(auth): Extension<AuthStaff>) -> Result<Json<Value>, ApiError> {
    let pool = DatabaseManager::pool().await?;

    let totals = sqlx::query(
        "SELECT COUNT(*) AS total, \
                COUNT(*) FILTER (WHERE read_at IS NULL) AS unread \
         FROM notifications WHERE staff_id = $1 AND business_id = $2",
    )
    .bind(auth.staff_id)
    .bind(auth.business_id)
    .fetch_one(&pool)
    .await?;

    let total: i64 = totals.try_get("total")?;
    let unread: i64 = totals.try_get("unread")?;

    let kind_rows = sqlx::query(
        "SELECT kind, COUNT(*) AS count FROM notifications \
         WHERE staff_id = $1 AND business_id = $2 \
         GROUP BY kind ORDER BY count DESC",
    )
    .bind(auth.staff_id)
    .bind(auth.business_id)
    .fetch_all(&pool)
    .await?;

    let mut by_kind = Map::new();
    for row in &kind_rows {
        let kind: String = row.try_get("kind")?;
        let count: i64 = row.try_get("count")?;
        by_kind.insert(kind, json!(count));
    }

    Ok(envelope::ok(json!({
        "total": total,
        "unread": unread,
        "read": total - unread,
        "by_kind": by_kind,
    })))
}

fn owner_scope(auth: &AuthStaff) -> SqlWhere {
    let mut scope = SqlWhere::new();
    scope.eq_uuid("staff_id", auth.staff_id).eq_uuid("business_id", auth.business_id);
    scope
}

async fn find_notification(
    pool: &PgPool,
    auth: &AuthStaff,
    id: Uuid,
) -> Result<Notification, ApiError> {
    sqlx::query_as::<_, Notification>(&format!(
        "SELECT {} FROM notifications WHERE id = $1 AND staff_id = $2 AND business_id = $3",
        NOTIFICATION_COLUMNS
    ))
    .bind(id)
    .bind(auth.staff_id)
    .bind(auth.business_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Notification not found"))
}
