use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::FromRow;
use uuid::Uuid;

/// Targeted at one staff member of one business; the `(staff_id,
/// business_id)` pair scopes every query before any other filter. `read_at`
/// is monotonic: set once, never cleared by this layer.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub business_id: Uuid,
    pub staff_id: Uuid,
    pub kind: String,
    pub title: String,
    pub content: Option<String>,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn to_public(&self) -> Value {
        json!({
            "id": self.id,
            "kind": self.kind,
            "title": self.title,
            "content": self.content,
            "read": self.read_at.is_some(),
            "read_at": self.read_at,
            "created_at": self.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_shape_derives_read_flag() {
        let n = Notification {
            id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            staff_id: Uuid::new_v4(),
            kind: "task_assigned".into(),
            title: "New task".into(),
            content: None,
            read_at: None,
            created_at: Utc::now(),
        };
        assert_eq!(n.to_public()["read"], false);
        assert!(n.to_public().get("staff_id").is_none());
    }
}
