// Client records: tenant-scoped CRUD plus per-client projects and invoices
use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::Json,
    Extension,
};
use serde::Deserialize;
use serde_json::Value;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::api::envelope::{self, PageMeta};
use crate::database::manager::DatabaseManager;
use crate::database::models::client::{Client, Invoice, Project};
use crate::error::ApiError;
use crate::handlers::validation::{is_valid_email, required, FieldErrors};
use crate::middleware::AuthStaff;
use crate::query::{bind_query, bind_query_as, ListParams, ListQuery, ListSpec, SortDirection, SqlWhere};

pub const STATUS_VALUES: &[&str] = &["active", "prospect", "archived"];
const DEFAULT_STATUS: &str = "active";

static CLIENT_LIST: ListSpec = ListSpec {
    search_columns: &["first_name", "last_name", "email", "phone", "company"],
    status_values: STATUS_VALUES,
    date_column: "created_at",
    sortable_columns: &["created_at", "updated_at", "first_name", "last_name", "company", "status"],
    default_sort: ("created_at", SortDirection::Desc),
};

const CLIENT_COLUMNS: &str =
    "id, business_id, first_name, last_name, email, phone, company, status, notes, \
     created_at, updated_at";

#[derive(Debug, Deserialize)]
pub struct CreateClientRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateClientRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

/// GET /clients - searchable, filterable, paginated listing
pub async fn list(
    Extension(auth): Extension<AuthStaff>,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, ApiError> {
    let list = ListQuery::build(params, &CLIENT_LIST)?;
    let pool = DatabaseManager::pool().await?;

    let mut scope = SqlWhere::new();
    scope.eq_uuid("business_id", auth.business_id);
    list.apply_filters(&mut scope);

    let count_sql = format!("SELECT COUNT(*) AS count FROM clients WHERE {}", scope.clause());
    let mut count_query = sqlx::query(&count_sql);
    for p in scope.params() {
        count_query = bind_query(count_query, p);
    }
    let total: i64 = count_query.fetch_one(&pool).await?.try_get("count")?;

    let rows_sql = format!(
        "SELECT {} FROM clients WHERE {} {} {}",
        CLIENT_COLUMNS,
        scope.clause(),
        list.order_clause(),
        list.limit_clause(),
    );
    let mut rows_query = sqlx::query_as::<_, Client>(&rows_sql);
    for p in scope.params() {
        rows_query = bind_query_as(rows_query, p);
    }
    let clients = rows_query.fetch_all(&pool).await?;

    let items = clients.iter().map(Client::to_public).collect();
    Ok(envelope::paginated(items, PageMeta::new(list.page, list.per_page, total)))
}

/// GET /clients/:id
pub async fn show(
    Extension(auth): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let pool = DatabaseManager::pool().await?;
    let client = find_client(&pool, &auth, id).await?;
    Ok(envelope::ok(client.to_public()))
}

/// POST /clients
pub async fn create(
    Extension(auth): Extension<AuthStaff>,
    Json(payload): Json<CreateClientRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut errors = FieldErrors::new();
    if required(&payload.first_name).is_none() {
        errors.add("first_name", "The first_name field is required");
    }
    if let Some(email) = required(&payload.email) {
        if !is_valid_email(email) {
            errors.add("email", "The email must be a valid email address");
        }
    }
    let status = match required(&payload.status) {
        None => DEFAULT_STATUS,
        Some(s) if STATUS_VALUES.contains(&s) => s,
        Some(_) => {
            errors.add("status", "The status must be one of: active, prospect, archived");
            DEFAULT_STATUS
        }
    };
    errors.into_result()?;

    let pool = DatabaseManager::pool().await?;
    let client = sqlx::query_as::<_, Client>(&format!(
        "INSERT INTO clients (id, business_id, first_name, last_name, email, phone, company, status, notes, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now(), now()) \
         RETURNING {}",
        CLIENT_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(auth.business_id)
    .bind(payload.first_name.as_deref().map(str::trim))
    .bind(payload.last_name.as_deref().map(str::trim))
    .bind(payload.email.as_deref().map(str::trim))
    .bind(payload.phone.as_deref())
    .bind(payload.company.as_deref())
    .bind(status)
    .bind(payload.notes.as_deref())
    .fetch_one(&pool)
    .await?;

    Ok(envelope::created(client.to_public()))
}

/// PUT /clients/:id - partial update; absent fields are left untouched
pub async fn update(
    Extension(auth): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateClientRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut errors = FieldErrors::new();
    if let Some(first_name) = &payload.first_name {
        if first_name.trim().is_empty() {
            errors.add("first_name", "The first_name field must not be empty");
        }
    }
    if let Some(email) = required(&payload.email) {
        if !is_valid_email(email) {
            errors.add("email", "The email must be a valid email address");
        }
    }
    if let Some(status) = required(&payload.status) {
        if !STATUS_VALUES.contains(&status) {
            errors.add("status", "The status must be one of: active, prospect, archived");
        }
    }
    errors.into_result()?;

    let pool = DatabaseManager::pool().await?;
    let client = sqlx::query_as::<_, Client>(&format!(
        "UPDATE clients SET \
            first_name = COALESCE($1, first_name), \
            last_name = COALESCE($2, last_name), \
            email = COALESCE($3, email), \
            phone = COALESCE($4, phone), \
            company = COALESCE($5, company), \
            status = COALESCE($6, status), \
            notes = COALESCE($7, notes), \
            updated_at = now() \
         WHERE id = $8 AND business_id = $9 \
         RETURNING {}",
        CLIENT_COLUMNS
    ))
    .bind(payload.first_name.as_deref().map(str::trim))
    .bind(payload.last_name.as_deref().map(str::trim))
    .bind(payload.email.as_deref().map(str::trim))
    .bind(payload.phone.as_deref())
    .bind(payload.company.as_deref())
    .bind(payload.status.as_deref())
    .bind(payload.notes.as_deref())
    .bind(id)
    .bind(auth.business_id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Client not found"))?;

    Ok(envelope::ok_message("Client updated", client.to_public()))
}

/// DELETE /clients/:id
pub async fn delete(
    Extension(auth): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let pool = DatabaseManager::pool().await?;
    let result = sqlx::query("DELETE FROM clients WHERE id = $1 AND business_id = $2")
        .bind(id)
        .bind(auth.business_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Client not found"));
    }
    Ok(envelope::message("Client deleted"))
}

/// GET /clients/:id/projects
pub async fn projects(
    Extension(auth): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let pool = DatabaseManager::pool().await?;
    let client = find_client(&pool, &auth, id).await?;

    let rows = sqlx::query_as::<_, Project>(
        "SELECT id, client_id, name, status, starts_on, ends_on, created_at \
         FROM projects WHERE client_id = $1 AND business_id = $2 \
         ORDER BY created_at DESC",
    )
    .bind(client.id)
    .bind(auth.business_id)
    .fetch_all(&pool)
    .await?;

    Ok(envelope::ok(Value::Array(rows.iter().map(Project::to_public).collect())))
}

/// GET /clients/:id/invoices
pub async fn invoices(
    Extension(auth): Extension<AuthStaff>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let pool = DatabaseManager::pool().await?;
    let client = find_client(&pool, &auth, id).await?;

    let rows = sqlx::query_as::<_, Invoice>(
        "SELECT id, client_id, number, status, total_cents, currency, issued_on, due_on, created_at \
         FROM invoices WHERE client_id = $1 AND business_id = $2 \
         ORDER BY created_at DESC",
    )
    .bind(client.id)
    .bind(auth.business_id)
    .fetch_all(&pool)
    .await?;

    Ok(envelope::ok(Value::Array(rows.iter().map(Invoice::to_public).collect())))
}

/// Tenant-scoped fetch; an id outside the caller's business reads as absent
async fn find_client(pool: &PgPool, auth: &AuthStaff, id: Uuid) -> Result<Client, ApiError> {
    sqlx::query_as::<_, Client>(&format!(
        "SELECT {} FROM clients WHERE id = $1 AND business_id = $2",
        CLIENT_COLUMNS
    ))
    .bind(id)
    .bind(auth.business_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Client not found"))
}
