//! Staff chat. Access control is the tenant + participant filter itself:
//! a room the caller does not participate in reads as absent (404).

use std::collections::HashSet;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::Json,
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::api::envelope::{self, PageMeta};
use crate::database::manager::DatabaseManager;
use crate::database::models::chat::{ChatRoom, Message, ParticipantEntry, RoomSummary};
use crate::error::ApiError;
use crate::handlers::validation::required;
use crate::middleware::AuthStaff;
use crate::query::{ListParams, Pagination};

const MESSAGE_TYPES: &[&str] = &["text", "image", "file"];
const DEFAULT_MESSAGE_TYPE: &str = "text";

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub name: Option<String>,
    #[serde(default)]
    pub participant_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub body: Option<String>,
    pub message_type: Option<String>,
}

/// Does a participant row link this staff member to this room within their
/// own business? The single authorization predicate for the chat surface.
pub async fn is_participant(
    pool: &PgPool,
    staff_id: Uuid,
    room_id: Uuid,
    business_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let (exists,): (bool,) = sqlx::query_as(
        "SELECT EXISTS( \
            SELECT 1 FROM chat_participants p \
            JOIN chat_rooms r ON r.id = p.room_id \
            WHERE p.room_id = $1 AND p.staff_id = $2 AND r.business_id = $3)",
    )
    .bind(room_id)
    .bind(staff_id)
    .bind(business_id)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// GET /chat/rooms - the caller's rooms with unread counts
pub async fn list_rooms(Extension(auth): Extension<AuthStaff>) -> Result<Json<Value>, ApiError> {
    let pool = DatabaseManager::pool().await?;

    let rooms = sqlx::query_as::<_, RoomSummary>(
        "SELECT r.id, r.name, r.is_group, r.created_by, r.created_at, \
                (SELECT COUNT(*) FROM chat_messages m \
                  WHERE m.room_id = r.id AND m.sender_id <> $2 AND m.seen_at IS NULL) AS unread_count, \
                (SELECT MAX(m.sent_at) FROM chat_messages m WHERE m.room_id = r.id) AS last_message_at \
         FROM chat_rooms r \
         JOIN chat_participants p ON p.room_id = r.id \
         WHERE r.business_id = $1 AND p.staff_id = $2 \
         ORDER BY last_message_at DESC NULLS LAST, r.created_at DESC",
    )
    .bind(auth.business_id)
    .bind(auth.staff_id)
    .fetch_all(&pool)
    .await?;

    Ok(envelope::ok(Value::Array(rooms.iter().map(RoomSummary::to_public).collect())))
}

/// GET /chat/rooms/:id - room plus roster
pub async fn show_room(
    Extension(auth): Extension<AuthStaff>,
    Path(room_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let pool = DatabaseManager::pool().await?;
    let room = find_room(&pool, &auth, room_id).await?;

    let roster = sqlx::query_as::<_, ParticipantEntry>(
        "SELECT p.staff_id, s.name, p.is_moderator, p.joined_at \
         FROM chat_participants p \
         JOIN staff s ON s.id = p.staff_id \
         WHERE p.room_id = $1 \
         ORDER BY p.joined_at",
    )
    .bind(room.id)
    .fetch_all(&pool)
    .await?;

    Ok(envelope::ok(json!({
        "room": room.to_public(),
        "participants": roster.iter().map(ParticipantEntry::to_public).collect::<Vec<_>>(),
    })))
}

/// POST /chat/rooms - create a room with the caller as moderator.
///
/// Room and creator-participant inserts commit together; a failure after
/// the room insert must not leave an orphan room.
pub async fn create_room(
    Extension(auth): Extension<AuthStaff>,
    Json(payload): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let name = required(&payload.name)
        .ok_or_else(|| ApiError::validation_field("name", "The name field is required"))?;

    let pool = DatabaseManager::pool().await?;

    // Deduplicate and drop the creator; membership outside the tenant is
    // silently ignored rather than reported
    let mut others: HashSet<Uuid> = payload.participant_ids.iter().copied().collect();
    others.remove(&auth.staff_id);
    let others: Vec<Uuid> = if others.is_empty() {
        vec![]
    } else {
        let candidate_ids: Vec<Uuid> = others.into_iter().collect();
        sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM staff WHERE id = ANY($1) AND business_id = $2 AND status = 'active'",
        )
        .bind(&candidate_ids)
        .bind(auth.business_id)
        .fetch_all(&pool)
        .await?
    };

    let mut tx = pool.begin().await?;

    let room = sqlx::query_as::<_, ChatRoom>(
        "INSERT INTO chat_rooms (id, business_id, name, is_group, created_by, created_at) \
         VALUES ($1, $2, $3, $4, $5, now()) \
         RETURNING id, business_id, name, is_group, created_by, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(auth.business_id)
    .bind(name)
    .bind(others.len() > 1)
    .bind(auth.staff_id)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO chat_participants (room_id, staff_id, is_moderator, joined_at) \
         VALUES ($1, $2, true, now())",
    )
    .bind(room.id)
    .bind(auth.staff_id)
    .execute(&mut *tx)
    .await?;

    for staff_id in &others {
        sqlx::query(
            "INSERT INTO chat_participants (room_id, staff_id, is_moderator, joined_at) \
             VALUES ($1, $2, false, now())",
        )
        .bind(room.id)
        .bind(staff_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::info!("Room {} created by staff {} with {} invitees", room.id, auth.staff_id, others.len());

    Ok(envelope::created(json!({
        "room": room.to_public(),
        "participant_ids": std::iter::once(auth.staff_id).chain(others).collect::<Vec<_>>(),
    })))
}

/// GET /chat/rooms/:id/messages - newest first, paginated
pub async fn list_messages(
    Extension(auth): Extension<AuthStaff>,
    Path(room_id): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, ApiError> {
    let paging = Pagination::build(params.page, params.per_page)?;
    let pool = DatabaseManager::pool().await?;
    let room = find_room(&pool, &auth, room_id).await?;

    let total: i64 = sqlx::query("SELECT COUNT(*) AS count FROM chat_messages WHERE room_id = $1")
        .bind(room.id)
        .fetch_one(&pool)
        .await?
        .try_get("count")?;

    let messages = sqlx::query_as::<_, Message>(&format!(
        "SELECT id, room_id, sender_id, body, message_type, sent_at, seen_at \
         FROM chat_messages WHERE room_id = $1 \
         ORDER BY sent_at DESC {}",
        paging.limit_clause()
    ))
    .bind(room.id)
    .fetch_all(&pool)
    .await?;

    let items = messages.iter().map(Message::to_public).collect();
    Ok(envelope::paginated(items, PageMeta::new(paging.page, paging.per_page, total)))
}

/// POST /chat/rooms/:id/messages - synchronous insert; no push delivery
pub async fn send_message(
    Extension(auth): Extension<AuthStaff>,
    Path(room_id): Path<Uuid>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let body = required(&payload.body)
        .ok_or_else(|| ApiError::validation_field("body", "The body field is required"))?;
    let message_type = match required(&payload.message_type) {
        None => DEFAULT_MESSAGE_TYPE,
        Some(t) if MESSAGE_TYPES.contains(&t) => t,
        Some(_) => {
            return Err(ApiError::validation_field(
                "message_type",
                "The message_type must be one of: text, image, file",
            ))
        }
    };

    let pool = DatabaseManager::pool().await?;
    let room = find_room(&pool, &auth, room_id).await?;

    let message = sqlx::query_as::<_, Message>(
        "INSERT INTO chat_messages (id, room_id, sender_id, body, message_type, sent_at) \
         VALUES ($1, $2, $3, $4, $5, now()) \
         RETURNING id, room_id, sender_id, body, message_type, sent_at, seen_at",
    )
    .bind(Uuid::new_v4())
    .bind(room.id)
    .bind(auth.staff_id)
    .bind(body)
    .bind(message_type)
    .fetch_one(&pool)
    .await?;

    Ok(envelope::created(message.to_public()))
}

/// POST /chat/rooms/:id/read - mark others' unread messages seen.
///
/// Idempotent: a second call updates zero rows and still succeeds.
pub async fn mark_read(
    Extension(auth): Extension<AuthStaff>,
    Path(room_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let pool = DatabaseManager::pool().await?;
    let room = find_room(&pool, &auth, room_id).await?;

    let result = sqlx::query(
        "UPDATE chat_messages SET seen_at = now() \
         WHERE room_id = $1 AND sender_id <> $2 AND seen_at IS NULL",
    )
    .bind(room.id)
    .bind(auth.staff_id)
    .execute(&pool)
    .await?;

    Ok(envelope::ok(json!({ "updated_count": result.rows_affected() })))
}

/// GET /chat/unread-count - total across the caller's rooms
pub async fn unread_count(Extension(auth): Extension<AuthStaff>) -> Result<Json<Value>, ApiError> {
    let pool = DatabaseManager::pool().await?;

    let count: i64 = sqlx::query(
        "SELECT COUNT(*) AS count \
         FROM chat_messages m \
         JOIN chat_rooms r ON r.id = m.room_id \
         JOIN chat_participants p ON p.room_id = m.room_id \
         WHERE r.business_id = $1 AND p.staff_id = $2 \
           AND m.sender_id <> $2 AND m.seen_at IS NULL",
    )
    .bind(auth.business_id)
    .bind(auth.staff_id)
    .fetch_one(&pool)
    .await?
    .try_get("count")?;

    Ok(envelope::ok(json!({ "unread_count": count })))
}

/// GET /chat/staff - colleagues available to chat with
pub async fn staff_directory(Extension(auth): Extension<AuthStaff>) -> Result<Json<Value>, ApiError> {
    let pool = DatabaseManager::pool().await?;

    let rows = sqlx::query(
        "SELECT id, name, email, position FROM staff \
         WHERE business_id = $1 AND status = 'active' AND id <> $2 \
         ORDER BY name",
    )
    .bind(auth.business_id)
    .bind(auth.staff_id)
    .fetch_all(&pool)
    .await?;

    let items: Vec<Value> = rows
        .iter()
        .map(|row| {
            Ok(json!({
                "id": row.try_get::<Uuid, _>("id")?,
                "name": row.try_get::<String, _>("name")?,
                "email": row.try_get::<String, _>("email")?,
                "position": row.try_get::<Option<String>, _>("position")?,
            }))
        })
        .collect::<Result<_, sqlx::Error>>()?;

    Ok(envelope::ok(Value::Array(items)))
}

/// Fetch a room through the tenant + participant filter. Absent and
/// not-a-participant both read as 404.
async fn find_room(pool: &PgPool, auth: &AuthStaff, room_id: Uuid) -> Result<ChatRoom, ApiError> {
    if !is_participant(pool, auth.staff_id, room_id, auth.business_id).await? {
        return Err(ApiError::not_found("Chat room not found"));
    }

    sqlx::query_as::<_, ChatRoom>(
        "SELECT id, business_id, name, is_group, created_by, created_at \
         FROM chat_rooms WHERE id = $1 AND business_id = $2",
    )
    .bind(room_id)
    .bind(auth.business_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Chat room not found"))
}
