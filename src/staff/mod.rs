use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::admin::AdminSession;
use crate::shared::schema::staff;
use crate::shared::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = staff)]
pub struct Staff {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub is_available: bool,
    pub max_concurrent_chats: i32,
    pub current_chats: i32,
    pub created_at: DateTime<Utc>,
}

impl Staff {
    pub fn has_capacity(&self) -> bool {
        self.is_available && self.current_chats < self.max_concurrent_chats
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateStaffRequest {
    pub name: String,
    pub email: String,
    pub role: Option<String>,
    pub max_concurrent_chats: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct SetAvailabilityRequest {
    pub is_available: bool,
}

pub async fn list_staff(
    State(state): State<Arc<AppState>>,
    _session: AdminSession,
) -> Result<Json<Vec<Staff>>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let rows: Vec<Staff> = staff::table
        .order(staff::name.asc())
        .load(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    Ok(Json(rows))
}

pub async fn create_staff(
    State(state): State<Arc<AppState>>,
    _session: AdminSession,
    Json(req): Json<CreateStaffRequest>,
) -> Result<Json<Staff>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let member = Staff {
        id: Uuid::new_v4(),
        name: req.name,
        email: req.email,
        role: req.role.unwrap_or_else(|| "customer_support".to_string()),
        is_available: true,
        max_concurrent_chats: req.max_concurrent_chats.unwrap_or(5),
        current_chats: 0,
        created_at: Utc::now(),
    };

    diesel::insert_into(staff::table)
        .values(&member)
        .execute(&mut conn)
        .map_err(|e| match e {
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            ) => (
                StatusCode::CONFLICT,
                "A staff member with that email already exists".to_string(),
            ),
            other => (StatusCode::INTERNAL_SERVER_ERROR, format!("Insert error: {other}")),
        })?;

    Ok(Json(member))
}

pub async fn set_availability(
    State(state): State<Arc<AppState>>,
    _session: AdminSession,
    Path(id): Path<Uuid>,
    Json(req): Json<SetAvailabilityRequest>,
) -> Result<Json<Staff>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let updated = diesel::update(staff::table.filter(staff::id.eq(id)))
        .set(staff::is_available.eq(req.is_available))
        .execute(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}")))?;

    if updated == 0 {
        return Err((StatusCode::NOT_FOUND, "Staff member not found".to_string()));
    }

    let member: Staff = staff::table
        .filter(staff::id.eq(id))
        .first(&mut conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Staff member not found".to_string()))?;

    Ok(Json(member))
}

pub fn configure_staff_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/staff", get(list_staff).post(create_staff))
        .route("/api/staff/:id/availability", put(set_availability))
}
