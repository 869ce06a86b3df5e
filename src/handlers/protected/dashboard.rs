//! Dashboard aggregation. Read-only; every call issues its fixed set of
//! count queries, no caching. The feed merges are the only non-SQL
//! computation on the whole surface.

use axum::{extract::Query, response::Json, Extension};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::envelope;
use crate::database::manager::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::AuthStaff;
use crate::query::SortDirection;

const FEED_CAP: usize = 10;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RangeParams {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// One entry of the recent-activity or upcoming feed
#[derive(Debug, Clone, Serialize)]
pub struct FeedItem {
    pub kind: &'static str,
    pub id: Uuid,
    pub title: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct FeedRow {
    id: Uuid,
    title: String,
    at: DateTime<Utc>,
}

/// GET /dashboard - every bucket in one response
pub async fn index(
    Extension(auth): Extension<AuthStaff>,
    Query(params): Query<RangeParams>,
) -> Result<Json<Value>, ApiError> {
    let range = resolve_range(&params)?;
    let pool = DatabaseManager::pool().await?;

    let overview = overview_counts(&pool, &auth).await?;
    let recent_activity = recent_activity(&pool, &auth).await?;
    let upcoming = upcoming(&pool, &auth).await?;
    let performance = performance(&pool, &auth, range).await?;

    Ok(envelope::ok(json!({
        "overview": overview,
        "recent_activity": recent_activity,
        "upcoming": upcoming,
        "performance": performance,
        "quick_actions": quick_actions(),
    })))
}

/// GET /dashboard/statistics - counts only, for an explicit range
pub async fn statistics(
    Extension(auth): Extension<AuthStaff>,
    Query(params): Query<RangeParams>,
) -> Result<Json<Value>, ApiError> {
    let range = resolve_range(&params)?;
    let pool = DatabaseManager::pool().await?;

    let overview = overview_counts(&pool, &auth).await?;
    let performance = performance(&pool, &auth, range).await?;

    Ok(envelope::ok(json!({
        "overview": overview,
        "performance": performance,
    })))
}

/// Merge feed candidates from multiple sources, order them by timestamp,
/// and keep the first `cap`
pub fn merge_feed(mut items: Vec<FeedItem>, direction: SortDirection, cap: usize) -> Vec<FeedItem> {
    items.sort_by(|a, b| match direction {
        SortDirection::Asc => a.timestamp.cmp(&b.timestamp),
        SortDirection::Desc => b.timestamp.cmp(&a.timestamp),
    });
    items.truncate(cap);
    items
}

/// Inclusive date range, defaulting to the current calendar month so far
fn resolve_range(params: &RangeParams) -> Result<(NaiveDate, NaiveDate), ApiError> {
    let today = Utc::now().date_naive();
    let month_start = today
        .with_day(1)
        .ok_or_else(|| ApiError::server("Calendar arithmetic failed"))?;

    let start = params.start_date.unwrap_or(month_start);
    let end = params.end_date.unwrap_or(today);
    if start > end {
        return Err(ApiError::validation_field("start_date", "start_date must not be after end_date"));
    }
    Ok((start, end))
}

/// The range of equal length immediately before `(start, end)`
fn previous_range(start: NaiveDate, end: NaiveDate) -> (NaiveDate, NaiveDate) {
    let days = (end - start).num_days();
    let prev_end = start - Duration::days(1);
    let prev_start = prev_end - Duration::days(days);
    (prev_start, prev_end)
}

async fn overview_counts(pool: &PgPool, auth: &AuthStaff) -> Result<Value, ApiError> {
    let total_clients: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM clients WHERE business_id = $1")
            .bind(auth.business_id)
            .fetch_one(pool)
            .await?;

    let open_leads: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM leads WHERE business_id = $1 AND status NOT IN ('won', 'lost')",
    )
    .bind(auth.business_id)
    .fetch_one(pool)
    .await?;

    let pending_tasks: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM tasks WHERE business_id = $1 AND completed_at IS NULL",
    )
    .bind(auth.business_id)
    .fetch_one(pool)
    .await?;

    let unread_notifications: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM notifications \
         WHERE staff_id = $1 AND business_id = $2 AND read_at IS NULL",
    )
    .bind(auth.staff_id)
    .bind(auth.business_id)
    .fetch_one(pool)
    .await?;

    let unread_messages: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM chat_messages m \
         JOIN chat_rooms r ON r.id = m.room_id \
         JOIN chat_participants p ON p.room_id = m.room_id \
         WHERE r.business_id = $1 AND p.staff_id = $2 \
           AND m.sender_id <> $2 AND m.seen_at IS NULL",
    )
    .bind(auth.business_id)
    .bind(auth.staff_id)
    .fetch_one(pool)
    .await?;

    Ok(json!({
        "total_clients": total_clients,
        "open_leads": open_leads,
        "pending_tasks": pending_tasks,
        "unread_notifications": unread_notifications,
        "unread_messages": unread_messages,
    }))
}

/// Newest leads and clients, merged newest-first
async fn recent_activity(pool: &PgPool, auth: &AuthStaff) -> Result<Vec<FeedItem>, ApiError> {
    let leads = sqlx::query_as::<_, FeedRow>(
        "SELECT id, name AS title, created_at AS at FROM leads \
         WHERE business_id = $1 ORDER BY created_at DESC LIMIT 10",
    )
    .bind(auth.business_id)
    .fetch_all(pool)
    .await?;

    let clients = sqlx::query_as::<_, FeedRow>(
        "SELECT id, concat_ws(' ', first_name, last_name) AS title, created_at AS at \
         FROM clients WHERE business_id = $1 ORDER BY created_at DESC LIMIT 10",
    )
    .bind(auth.business_id)
    .fetch_all(pool)
    .await?;

    let items = leads
        .into_iter()
        .map(|r| FeedItem { kind: "lead", id: r.id, title: r.title, timestamp: r.at })
        .chain(clients.into_iter().map(|r| FeedItem {
            kind: "client",
            id: r.id,
            title: r.title,
            timestamp: r.at,
        }))
        .collect();

    Ok(merge_feed(items, SortDirection::Desc, FEED_CAP))
}

/// Due tasks and lead follow-ups from now on, merged soonest-first
async fn upcoming(pool: &PgPool, auth: &AuthStaff) -> Result<Vec<FeedItem>, ApiError> {
    let tasks = sqlx::query_as::<_, FeedRow>(
        "SELECT id, title, due_at AS at FROM tasks \
         WHERE business_id = $1 AND completed_at IS NULL \
           AND due_at IS NOT NULL AND due_at >= now() \
         ORDER BY due_at ASC LIMIT 10",
    )
    .bind(auth.business_id)
    .fetch_all(pool)
    .await?;

    let follow_ups = sqlx::query_as::<_, FeedRow>(
        "SELECT id, name AS title, follow_up_at AS at FROM leads \
         WHERE business_id = $1 AND status NOT IN ('won', 'lost') \
           AND follow_up_at IS NOT NULL AND follow_up_at >= now() \
         ORDER BY follow_up_at ASC LIMIT 10",
    )
    .bind(auth.business_id)
    .fetch_all(pool)
    .await?;

    let items = tasks
        .into_iter()
        .map(|r| FeedItem { kind: "task", id: r.id, title: r.title, timestamp: r.at })
        .chain(follow_ups.into_iter().map(|r| FeedItem {
            kind: "follow_up",
            id: r.id,
            title: r.title,
            timestamp: r.at,
        }))
        .collect();

    Ok(merge_feed(items, SortDirection::Asc, FEED_CAP))
}

async fn performance(
    pool: &PgPool,
    auth: &AuthStaff,
    range: (NaiveDate, NaiveDate),
) -> Result<Value, ApiError> {
    let (start, end) = range;
    let (prev_start, prev_end) = previous_range(start, end);

    let current = period_counts(pool, auth, start, end).await?;
    let previous = period_counts(pool, auth, prev_start, prev_end).await?;

    Ok(json!({
        "range": { "start_date": start, "end_date": end },
        "previous_range": { "start_date": prev_start, "end_date": prev_end },
        "current": current,
        "previous": previous,
    }))
}

async fn period_counts(
    pool: &PgPool,
    auth: &AuthStaff,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Value, ApiError> {
    let new_clients = count_between(
        pool,
        "SELECT COUNT(*) FROM clients \
         WHERE business_id = $1 AND created_at::date >= $2 AND created_at::date <= $3",
        auth.business_id,
        start,
        end,
    )
    .await?;

    let new_leads = count_between(
        pool,
        "SELECT COUNT(*) FROM leads \
         WHERE business_id = $1 AND created_at::date >= $2 AND created_at::date <= $3",
        auth.business_id,
        start,
        end,
    )
    .await?;

    let completed_tasks = count_between(
        pool,
        "SELECT COUNT(*) FROM tasks \
         WHERE business_id = $1 AND completed_at::date >= $2 AND completed_at::date <= $3",
        auth.business_id,
        start,
        end,
    )
    .await?;

    let messages_sent = count_between(
        pool,
        "SELECT COUNT(*) FROM chat_messages m \
         JOIN chat_rooms r ON r.id = m.room_id \
         WHERE r.business_id = $1 AND m.sent_at::date >= $2 AND m.sent_at::date <= $3",
        auth.business_id,
        start,
        end,
    )
    .await?;

    Ok(json!({
        "new_clients": new_clients,
        "new_leads": new_leads,
        "completed_tasks": completed_tasks,
        "messages_sent": messages_sent,
    }))
}

async fn count_between(
    pool: &PgPool,
    sql: &str,
    business_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(sql)
        .bind(business_id)
        .bind(start)
        .bind(end)
        .fetch_one(pool)
        .await
}

fn quick_actions() -> Value {
    json!([
        { "label": "New Client", "route": "/clients/new", "icon": "user-plus" },
        { "label": "New Lead", "route": "/leads/new", "icon": "target" },
        { "label": "New Task", "route": "/tasks/new", "icon": "check-square" },
        { "label": "Start Chat", "route": "/chat/rooms/new", "icon": "message-circle" },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(kind: &'static str, secs: i64) -> FeedItem {
        FeedItem {
            kind,
            id: Uuid::new_v4(),
            title: format!("{}-{}", kind, secs),
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
        }
    }

    #[test]
    fn recent_feed_sorts_descending_across_sources() {
        let merged = merge_feed(
            vec![item("lead", 100), item("client", 300), item("lead", 200)],
            SortDirection::Desc,
            10,
        );
        let stamps: Vec<i64> = merged.iter().map(|i| i.timestamp.timestamp()).collect();
        assert_eq!(stamps, vec![300, 200, 100]);
    }

    #[test]
    fn upcoming_feed_sorts_ascending() {
        let merged = merge_feed(
            vec![item("task", 500), item("follow_up", 100)],
            SortDirection::Asc,
            10,
        );
        assert_eq!(merged[0].kind, "follow_up");
        assert_eq!(merged[1].kind, "task");
    }

    #[test]
    fn feed_truncates_to_cap() {
        let items = (0..25).map(|i| item("lead", i)).collect();
        let merged = merge_feed(items, SortDirection::Desc, FEED_CAP);
        assert_eq!(merged.len(), FEED_CAP);
        assert_eq!(merged[0].timestamp.timestamp(), 24);
    }

    #[test]
    fn previous_range_has_equal_length() {
        let start = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        let (prev_start, prev_end) = previous_range(start, end);
        assert_eq!(prev_end, NaiveDate::from_ymd_opt(2026, 7, 31).unwrap());
        assert_eq!(prev_start, NaiveDate::from_ymd_opt(2026, 7, 26).unwrap());
        assert_eq!(end - start, prev_end - prev_start);
    }

    #[test]
    fn one_day_range_rolls_back_one_day() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let (prev_start, prev_end) = previous_range(day, day);
        assert_eq!(prev_start, prev_end);
        assert_eq!(prev_end, NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());
    }
}
