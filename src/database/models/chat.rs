use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChatRoom {
    pub id: Uuid,
    pub business_id: Uuid,
    pub name: String,
    pub is_group: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl ChatRoom {
    pub fn to_public(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "is_group": self.is_group,
            "created_by": self.created_by,
            "created_at": self.created_at,
        })
    }
}

/// Room row as returned by the caller's room listing, with per-room unread
/// count and last activity computed in the same query.
#[derive(Debug, Clone, FromRow)]
pub struct RoomSummary {
    pub id: Uuid,
    pub name: String,
    pub is_group: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub unread_count: i64,
    pub last_message_at: Option<DateTime<Utc>>,
}

impl RoomSummary {
    pub fn to_public(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "is_group": self.is_group,
            "created_by": self.created_by,
            "created_at": self.created_at,
            "unread_count": self.unread_count,
            "last_message_at": self.last_message_at,
        })
    }
}

/// Roster entry for a room, joined against staff for the display name
#[derive(Debug, Clone, FromRow)]
pub struct ParticipantEntry {
    pub staff_id: Uuid,
    pub name: String,
    pub is_moderator: bool,
    pub joined_at: DateTime<Utc>,
}

impl ParticipantEntry {
    pub fn to_public(&self) -> Value {
        json!({
            "staff_id": self.staff_id,
            "name": self.name,
            "is_moderator": self.is_moderator,
            "joined_at": self.joined_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: Uuid,
    pub room_id: Uuid,
    pub sender_id: Uuid,
    pub body: String,
    pub message_type: String,
    pub sent_at: DateTime<Utc>,
    pub seen_at: Option<DateTime<Utc>>,
}

impl Message {
    pub fn to_public(&self) -> Value {
        json!({
            "id": self.id,
            "room_id": self.room_id,
            "sender_id": self.sender_id,
            "body": self.body,
            "message_type": self.message_type,
            "sent_at": self.sent_at,
            "seen_at": self.seen_at,
        })
    }
}
