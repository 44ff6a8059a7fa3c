use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::admin::AdminSession;
use crate::shared::schema::{conversations, messages};
use crate::shared::state::AppState;

pub const STATUS_OPEN: &str = "open";
pub const STATUS_CLOSED: &str = "closed";

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = conversations)]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub unmatched_count: i32,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = messages)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub direction: String,
    pub sender: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub user_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Get the user's open conversation or start a new one. The partial unique
/// index allows only one open row per user, so a concurrent creator loses the
/// insert and re-reads the winner.
pub fn open_for(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> Result<Conversation, diesel::result::Error> {
    if let Some(existing) = active_for(conn, user_id)? {
        return Ok(existing);
    }

    let conversation = Conversation {
        id: Uuid::new_v4(),
        user_id,
        status: STATUS_OPEN.to_string(),
        unmatched_count: 0,
        started_at: Utc::now(),
        ended_at: None,
    };

    match diesel::insert_into(conversations::table)
        .values(&conversation)
        .execute(conn)
    {
        Ok(_) => Ok(conversation),
        Err(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        )) => active_for(conn, user_id)?.ok_or(diesel::result::Error::NotFound),
        Err(e) => Err(e),
    }
}

pub fn active_for(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> Result<Option<Conversation>, diesel::result::Error> {
    conversations::table
        .filter(conversations::user_id.eq(user_id))
        .filter(conversations::status.eq(STATUS_OPEN))
        .first(conn)
        .optional()
}

pub fn close(
    conn: &mut PgConnection,
    conversation_id: Uuid,
) -> Result<usize, diesel::result::Error> {
    diesel::update(
        conversations::table
            .filter(conversations::id.eq(conversation_id))
            .filter(conversations::status.eq(STATUS_OPEN)),
    )
    .set((
        conversations::status.eq(STATUS_CLOSED),
        conversations::ended_at.eq(Some(Utc::now())),
    ))
    .execute(conn)
}

pub fn increment_unmatched(
    conn: &mut PgConnection,
    conversation_id: Uuid,
) -> Result<usize, diesel::result::Error> {
    diesel::update(conversations::table.filter(conversations::id.eq(conversation_id)))
        .set(conversations::unmatched_count.eq(conversations::unmatched_count + 1))
        .execute(conn)
}

pub fn reset_unmatched(
    conn: &mut PgConnection,
    conversation_id: Uuid,
) -> Result<usize, diesel::result::Error> {
    diesel::update(conversations::table.filter(conversations::id.eq(conversation_id)))
        .set(conversations::unmatched_count.eq(0))
        .execute(conn)
}

/// The message log is append-only; nothing in the crate updates or deletes
/// rows in this table.
pub fn append_message(
    conn: &mut PgConnection,
    conversation_id: Uuid,
    direction: &str,
    sender: &str,
    payload: serde_json::Value,
) -> Result<Message, diesel::result::Error> {
    let message = Message {
        id: Uuid::new_v4(),
        conversation_id,
        direction: direction.to_string(),
        sender: sender.to_string(),
        payload,
        created_at: Utc::now(),
    };

    diesel::insert_into(messages::table)
        .values(&message)
        .execute(conn)?;

    Ok(message)
}

pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    _session: AdminSession,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Conversation>>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let limit = query.limit.unwrap_or(50);
    let offset = query.offset.unwrap_or(0);

    let mut q = conversations::table.into_boxed();
    if let Some(status) = query.status {
        if status != "all" {
            q = q.filter(conversations::status.eq(status));
        }
    }
    if let Some(user_id) = query.user_id {
        q = q.filter(conversations::user_id.eq(user_id));
    }

    let rows: Vec<Conversation> = q
        .order(conversations::started_at.desc())
        .limit(limit)
        .offset(offset)
        .load(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    Ok(Json(rows))
}

pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    _session: AdminSession,
    Path(conversation_id): Path<Uuid>,
) -> Result<Json<Vec<Message>>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let rows: Vec<Message> = messages::table
        .filter(messages::conversation_id.eq(conversation_id))
        .order(messages::created_at.asc())
        .limit(200)
        .load(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    Ok(Json(rows))
}

pub fn configure_conversations_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/conversations", get(list_conversations))
        .route("/api/conversations/:id/messages", get(list_messages))
}
