use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::FromRow;
use uuid::Uuid;

pub const STATUS_ACTIVE: &str = "active";

/// A tenant user. Provisioned externally; this layer only mutates profile
/// fields and the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Staff {
    pub id: Uuid,
    pub business_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub position: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Staff {
    /// The stable profile subset exposed over the wire. The password hash
    /// and status never leave this layer.
    pub fn to_profile(&self) -> Value {
        json!({
            "id": self.id,
            "business_id": self.business_id,
            "name": self.name,
            "email": self.email,
            "phone": self.phone,
            "bio": self.bio,
            "position": self.position,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_excludes_password_hash_and_status() {
        let staff = Staff {
            id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            name: "Ann Example".into(),
            email: "ann@example.com".into(),
            phone: None,
            bio: None,
            position: Some("Manager".into()),
            password_hash: "$2b$10$abcdefghijklmnopqrstuv".into(),
            status: "active".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let profile = staff.to_profile();
        assert!(profile.get("password_hash").is_none());
        assert!(profile.get("status").is_none());
        assert_eq!(profile["email"], "ann@example.com");
    }
}
