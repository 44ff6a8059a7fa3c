//! Menu editor page: shows the active version, the version history, and a
//! publish form. Publishing always creates a new version.

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::admin::ui::page_shell;
use crate::admin::AdminSession;
use crate::menus::{self, BotMenu, MenuItem};
use crate::shared::state::AppState;
use crate::shared::utils::html_escape;

#[derive(Debug, Deserialize)]
pub struct MenuEditorForm {
    pub items: String,
}

fn render_items_table(menu: &BotMenu) -> String {
    let items = match menu.parsed_items() {
        Ok(items) => items,
        Err(_) => return "<div class=\"error\">Stored menu items are unreadable</div>".to_string(),
    };

    let mut rows = String::new();
    for item in &items {
        rows.push_str(&format!(
            "<tr><td>{pos}</td><td>{label}</td><td>{kind}</td><td>{value}</td></tr>",
            pos = item.position,
            label = html_escape(&item.label),
            kind = html_escape(&item.action_type),
            value = html_escape(&item.action_value),
        ));
    }

    format!(
        "<table><thead><tr><th>#</th><th>Label</th><th>Action</th><th>Reply / URL</th></tr></thead>\
         <tbody>{rows}</tbody></table>"
    )
}

fn editor_seed(menu: Option<&BotMenu>) -> String {
    let items = menu
        .and_then(|m| m.parsed_items().ok())
        .unwrap_or_else(|| {
            vec![MenuItem {
                label: "Services".to_string(),
                action_type: "reply".to_string(),
                action_value: "Tell me which service you are interested in.".to_string(),
                position: 0,
            }]
        });
    serde_json::to_string_pretty(&items).unwrap_or_else(|_| "[]".to_string())
}

fn render_page(
    active: Option<&BotMenu>,
    history: &[BotMenu],
    error: Option<&str>,
) -> String {
    let error_html = error
        .map(|e| format!("<div class=\"error\">{}</div>", html_escape(e)))
        .unwrap_or_default();

    let active_html = match active {
        Some(menu) => format!(
            "<p>Version {version}, published by {by} at {at}</p>{table}",
            version = menu.version,
            by = html_escape(&menu.updated_by),
            at = menu.created_at.format("%Y-%m-%d %H:%M"),
            table = render_items_table(menu),
        ),
        None => "<div class=\"empty-state\">No active menu - the bot is replying with the \
                 static default</div>"
            .to_string(),
    };

    let mut history_rows = String::new();
    for menu in history {
        let flag = if menu.is_active { " (active)" } else { "" };
        history_rows.push_str(&format!(
            "<tr><td>v{version}{flag}</td><td>{by}</td><td>{at}</td></tr>",
            version = menu.version,
            by = html_escape(&menu.updated_by),
            at = menu.created_at.format("%Y-%m-%d %H:%M"),
        ));
    }

    format!(
        "<h2>Reply menu</h2>\
        {error_html}\
        <h3>Active version</h3>{active_html}\
        <h3>Publish new version</h3>\
        <form method=\"post\" action=\"/admin/menus/publish\">\
            <textarea name=\"items\" rows=\"12\" style=\"width:100%\">{seed}</textarea>\
            <p><button type=\"submit\">Publish</button></p>\
        </form>\
        <h3>History</h3>\
        <table><thead><tr><th>Version</th><th>Published by</th><th>At</th></tr></thead>\
        <tbody>{history_rows}</tbody></table>",
        seed = html_escape(&editor_seed(active)),
    )
}

async fn menus_page(
    State(state): State<Arc<AppState>>,
    session: Result<AdminSession, (StatusCode, String)>,
) -> Response {
    if session.is_err() {
        return Redirect::to("/admin/login").into_response();
    }

    let Ok(mut conn) = state.conn.get() else {
        return Html(page_shell(
            "Menus",
            "menus",
            "<div class=\"empty-state\">Unable to reach the database</div>",
        ))
        .into_response();
    };

    let active = menus::active_menu(&mut conn).ok().flatten();
    let history = menus::history(&mut conn, 10).unwrap_or_default();

    Html(page_shell(
        "Menus",
        "menus",
        &render_page(active.as_ref(), &history, None),
    ))
    .into_response()
}

async fn publish_form(
    State(state): State<Arc<AppState>>,
    session: AdminSession,
    Form(form): Form<MenuEditorForm>,
) -> Response {
    let Ok(mut conn) = state.conn.get() else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "database unavailable".to_string(),
        )
            .into_response();
    };

    let error = match serde_json::from_str::<Vec<MenuItem>>(&form.items) {
        Err(e) => Some(format!("Menu items are not valid JSON: {e}")),
        Ok(items) => match menus::validate_items(&items) {
            Err(e) => Some(e.to_string()),
            Ok(()) => match menus::publish(&mut conn, &items, &session.username) {
                Err(e) => Some(format!("Publish failed: {e}")),
                Ok(menu) => {
                    log::info!(
                        "menu version {} published by {} from the editor",
                        menu.version,
                        session.username
                    );
                    None
                }
            },
        },
    };

    match error {
        None => Redirect::to("/admin/menus").into_response(),
        Some(message) => {
            let active = menus::active_menu(&mut conn).ok().flatten();
            let history = menus::history(&mut conn, 10).unwrap_or_default();
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Html(page_shell(
                    "Menus",
                    "menus",
                    &render_page(active.as_ref(), &history, Some(&message)),
                )),
            )
                .into_response()
        }
    }
}

pub fn configure_menus_ui_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/menus", get(menus_page))
        .route("/admin/menus/publish", post(publish_form))
}
