//! The uniform `{success, message?, data?, errors?}` response envelope.
//!
//! Handlers build success bodies through these helpers; failure bodies come
//! from `ApiError::to_json` so both halves stay in the same shape.

use axum::{http::StatusCode, response::Json};
use serde::Serialize;
use serde_json::{json, Value};

/// 200 with a data payload
pub fn ok(data: Value) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}

/// 200 with a message and a data payload
pub fn ok_message(message: impl Into<String>, data: Value) -> Json<Value> {
    Json(json!({ "success": true, "message": message.into(), "data": data }))
}

/// 200 with a message only
pub fn message(message: impl Into<String>) -> Json<Value> {
    Json(json!({ "success": true, "message": message.into() }))
}

/// 201 with the created resource
pub fn created(data: Value) -> (StatusCode, Json<Value>) {
    (StatusCode::CREATED, ok(data))
}

/// Pagination block attached to every list response
#[derive(Debug, Clone, Serialize)]
pub struct PageMeta {
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub total_pages: i64,
}

impl PageMeta {
    pub fn new(page: u32, per_page: u32, total: i64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + per_page as i64 - 1) / per_page as i64
        };
        Self { page, per_page, total, total_pages }
    }
}

/// 200 with `{items, pagination}` under `data`
pub fn paginated(items: Vec<Value>, meta: PageMeta) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "items": items,
            "pagination": meta,
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_envelope_shape() {
        let Json(body) = ok(json!({"id": 1}));
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["id"], 1);
        assert!(body.get("message").is_none());
    }

    #[test]
    fn page_meta_rounds_up() {
        let meta = PageMeta::new(1, 15, 31);
        assert_eq!(meta.total_pages, 3);

        let empty = PageMeta::new(1, 15, 0);
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn paginated_envelope_nests_items_and_meta() {
        let Json(body) = paginated(vec![json!({"id": "a"})], PageMeta::new(2, 10, 11));
        assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"]["pagination"]["page"], 2);
        assert_eq!(body["data"]["pagination"]["total_pages"], 2);
    }
}
