pub mod ui;

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
use crate::shared::schema::bot_menus;
use crate::shared::state::AppState;

/// A single button of the reply menu. Pressing the button sends `label` back
/// as the message text; `action_value` is the automated reply (or the URL for
/// `action_type == "url"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub label: String,
    pub action_type: String,
    pub action_value: String,
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = bot_menus)]
pub struct BotMenu {
    pub id: Uuid,
    pub version: i32,
    pub items: serde_json::Value,
    pub is_active: bool,
    pub updated_by: String,
    pub created_at: DateTime<Utc>,
}

impl BotMenu {
    pub fn parsed_items(&self) -> Result<Vec<MenuItem>, serde_json::Error> {
        serde_json::from_value(self.items.clone())
    }
}

#[derive(Debug, Deserialize)]
pub struct PublishMenuRequest {
    pub items: Vec<MenuItem>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, thiserror::Error)]
pub enum MenuError {
    #[error("menu must have at least one item")]
    Empty,
    #[error("menu item {0} has an empty label")]
    EmptyLabel(usize),
    #[error("duplicate menu position {0}")]
    DuplicatePosition(i32),
}

pub fn validate_items(items: &[MenuItem]) -> Result<(), MenuError> {
    if items.is_empty() {
        return Err(MenuError::Empty);
    }
    let mut seen = std::collections::HashSet::new();
    for (idx, item) in items.iter().enumerate() {
        if item.label.trim().is_empty() {
            return Err(MenuError::EmptyLabel(idx));
        }
        if !seen.insert(item.position) {
            return Err(MenuError::DuplicatePosition(item.position));
        }
    }
    Ok(())
}

pub fn active_menu(
    conn: &mut PgConnection,
) -> Result<Option<BotMenu>, diesel::result::Error> {
    bot_menus::table
        .filter(bot_menus::is_active.eq(true))
        .order(bot_menus::created_at.desc())
        .first(conn)
        .optional()
}

/// Publish a new menu version. Edits never mutate an existing row: the
/// current active version is deactivated and a fresh row inserted in one
/// transaction, so concurrent publishes leave exactly one active version
/// (backed by the partial unique index on `is_active`).
pub fn publish(
    conn: &mut PgConnection,
    items: &[MenuItem],
    updated_by: &str,
) -> Result<BotMenu, diesel::result::Error> {
    let mut sorted: Vec<MenuItem> = items.to_vec();
    sorted.sort_by_key(|i| i.position);

    conn.transaction::<BotMenu, diesel::result::Error, _>(|conn| {
        diesel::update(bot_menus::table.filter(bot_menus::is_active.eq(true)))
            .set(bot_menus::is_active.eq(false))
            .execute(conn)?;

        let max_version: Option<i32> = bot_menus::table
            .select(diesel::dsl::max(bot_menus::version))
            .first(conn)?;

        let menu = BotMenu {
            id: Uuid::new_v4(),
            version: max_version.unwrap_or(0) + 1,
            items: serde_json::to_value(&sorted)
                .map_err(|e| diesel::result::Error::SerializationError(Box::new(e)))?,
            is_active: true,
            updated_by: updated_by.to_string(),
            created_at: Utc::now(),
        };

        diesel::insert_into(bot_menus::table)
            .values(&menu)
            .execute(conn)?;

        Ok(menu)
    })
}

pub fn history(
    conn: &mut PgConnection,
    limit: i64,
) -> Result<Vec<BotMenu>, diesel::result::Error> {
    bot_menus::table
        .order(bot_menus::created_at.desc())
        .limit(limit)
        .load(conn)
}

pub async fn get_active_menu(
    State(state): State<Arc<AppState>>,
    _session: AdminSession,
) -> Result<Json<BotMenu>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let menu = active_menu(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?
        .ok_or((StatusCode::NOT_FOUND, "No active menu".to_string()))?;

    Ok(Json(menu))
}

pub async fn list_menu_history(
    State(state): State<Arc<AppState>>,
    _session: AdminSession,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<BotMenu>>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let menus = history(&mut conn, query.limit.unwrap_or(10))
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    Ok(Json(menus))
}

pub async fn publish_menu(
    State(state): State<Arc<AppState>>,
    session: AdminSession,
    Json(req): Json<PublishMenuRequest>,
) -> Result<Json<BotMenu>, (StatusCode, String)> {
    validate_items(&req.items)
        .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;

    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let menu = publish(&mut conn, &req.items, &session.username)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Publish error: {e}")))?;

    log::info!(
        "menu version {} published by {} ({} items)",
        menu.version,
        session.username,
        req.items.len()
    );

    Ok(Json(menu))
}

pub fn configure_menus_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/menus", get(list_menu_history).post(publish_menu))
        .route("/api/menus/active", get(get_active_menu))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(label: &str, position: i32) -> MenuItem {
        MenuItem {
            label: label.to_string(),
            action_type: "reply".to_string(),
            action_value: format!("{label} details"),
            position,
        }
    }

    #[test]
    fn validate_rejects_empty_menu() {
        assert!(matches!(validate_items(&[]), Err(MenuError::Empty)));
    }

    #[test]
    fn validate_rejects_blank_label() {
        let items = vec![item("Balance", 0), item("  ", 1)];
        assert!(matches!(
            validate_items(&items),
            Err(MenuError::EmptyLabel(1))
        ));
    }

    #[test]
    fn validate_rejects_duplicate_positions() {
        let items = vec![item("Balance", 0), item("Support", 0)];
        assert!(matches!(
            validate_items(&items),
            Err(MenuError::DuplicatePosition(0))
        ));
    }

    #[test]
    fn menu_items_round_trip_through_jsonb() {
        let items = vec![item("Balance", 0), item("Support", 1)];
        let menu = BotMenu {
            id: Uuid::new_v4(),
            version: 1,
            items: serde_json::to_value(&items).unwrap(),
            is_active: true,
            updated_by: "admin".to_string(),
            created_at: Utc::now(),
        };
        assert_eq!(menu.parsed_items().unwrap(), items);
    }
}
