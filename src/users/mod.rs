use axum::{
    extract::{Query, State},
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
use crate::shared::schema::bot_users;
use crate::shared::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = bot_users)]
pub struct BotUser {
    pub id: Uuid,
    pub viber_id: String,
    pub display_name: Option<String>,
    pub language: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub active: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct UserStats {
    pub total_users: i64,
    pub active_users: i64,
}

/// Create the user on first contact, refresh activity (and profile fields,
/// when the platform sent them) on every later event. Soft-deactivated users
/// that come back are reactivated.
pub fn upsert_on_contact(
    conn: &mut PgConnection,
    viber_id: &str,
    display_name: Option<&str>,
    language: Option<&str>,
    default_language: &str,
) -> Result<BotUser, diesel::result::Error> {
    let now = Utc::now();

    let existing: Option<BotUser> = bot_users::table
        .filter(bot_users::viber_id.eq(viber_id))
        .first(conn)
        .optional()?;

    if let Some(user) = existing {
        diesel::update(bot_users::table.filter(bot_users::id.eq(user.id)))
            .set((
                bot_users::last_active_at.eq(now),
                bot_users::is_active.eq(true),
            ))
            .execute(conn)?;
        if let Some(name) = display_name {
            diesel::update(bot_users::table.filter(bot_users::id.eq(user.id)))
                .set(bot_users::display_name.eq(Some(name.to_string())))
                .execute(conn)?;
        }
        return bot_users::table
            .filter(bot_users::id.eq(user.id))
            .first(conn);
    }

    let user = BotUser {
        id: Uuid::new_v4(),
        viber_id: viber_id.to_string(),
        display_name: display_name.map(|s| s.to_string()),
        language: language.unwrap_or(default_language).to_string(),
        is_active: true,
        created_at: now,
        last_active_at: now,
    };

    diesel::insert_into(bot_users::table)
        .values(&user)
        .execute(conn)?;

    Ok(user)
}

pub fn find_by_viber_id(
    conn: &mut PgConnection,
    viber_id: &str,
) -> Result<Option<BotUser>, diesel::result::Error> {
    bot_users::table
        .filter(bot_users::viber_id.eq(viber_id))
        .first(conn)
        .optional()
}

pub fn find_by_id(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> Result<Option<BotUser>, diesel::result::Error> {
    bot_users::table
        .filter(bot_users::id.eq(user_id))
        .first(conn)
        .optional()
}

/// Users are never deleted; an unsubscribe flips the active flag.
pub fn deactivate(
    conn: &mut PgConnection,
    viber_id: &str,
) -> Result<usize, diesel::result::Error> {
    diesel::update(bot_users::table.filter(bot_users::viber_id.eq(viber_id)))
        .set(bot_users::is_active.eq(false))
        .execute(conn)
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    _session: AdminSession,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<BotUser>>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let limit = query.limit.unwrap_or(50);
    let offset = query.offset.unwrap_or(0);

    let mut q = bot_users::table.into_boxed();
    if let Some(active) = query.active {
        q = q.filter(bot_users::is_active.eq(active));
    }

    let users: Vec<BotUser> = q
        .order(bot_users::last_active_at.desc())
        .limit(limit)
        .offset(offset)
        .load(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    Ok(Json(users))
}

pub async fn get_user_stats(
    State(state): State<Arc<AppState>>,
    _session: AdminSession,
) -> Result<Json<UserStats>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let total_users: i64 = bot_users::table
        .count()
        .get_result(&mut conn)
        .unwrap_or(0);

    let active_users: i64 = bot_users::table
        .filter(bot_users::is_active.eq(true))
        .count()
        .get_result(&mut conn)
        .unwrap_or(0);

    Ok(Json(UserStats {
        total_users,
        active_users,
    }))
}

pub fn configure_users_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/users", get(list_users))
        .route("/api/users/stats", get(get_user_stats))
}
