use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub id: Uuid,
    pub business_id: Uuid,
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    /// Stable wire representation of a client row
    pub fn to_public(&self) -> Value {
        json!({
            "id": self.id,
            "business_id": self.business_id,
            "first_name": self.first_name,
            "last_name": self.last_name,
            "email": self.email,
            "phone": self.phone,
            "company": self.company,
            "status": self.status,
            "notes": self.notes,
            "created_at": self.created_at,
            "updated_at": self.updated_at,
        })
    }
}

/// Read-only here; managed by the project planning surface
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub id: Uuid,
    pub client_id: Uuid,
    pub name: String,
    pub status: String,
    pub starts_on: Option<NaiveDate>,
    pub ends_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Project {
    pub fn to_public(&self) -> Value {
        json!({
            "id": self.id,
            "client_id": self.client_id,
            "name": self.name,
            "status": self.status,
            "starts_on": self.starts_on,
            "ends_on": self.ends_on,
            "created_at": self.created_at,
        })
    }
}

/// Read-only here; managed by the billing surface
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub id: Uuid,
    pub client_id: Uuid,
    pub number: String,
    pub status: String,
    pub total_cents: i64,
    pub currency: String,
    pub issued_on: Option<NaiveDate>,
    pub due_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    pub fn to_public(&self) -> Value {
        json!({
            "id": self.id,
            "client_id": self.client_id,
            "number": self.number,
            "status": self.status,
            "total_cents": self.total_cents,
            "currency": self.currency,
            "issued_on": self.issued_on,
            "due_on": self.due_on,
            "created_at": self.created_at,
        })
    }
}
