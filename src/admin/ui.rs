//! Server-rendered admin pages: shared page shell, login form, dashboard,
//! and the user listing.

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use std::sync::Arc;

use crate::admin::AdminSession;
use crate::handoff::{SupportTicket, TicketStatus};
use crate::shared::schema::{bot_users, conversations, staff, support_tickets};
use crate::shared::state::AppState;
use crate::shared::utils::html_escape;
use crate::users::BotUser;

const PAGE_STYLE: &str = "\
    body{font-family:system-ui,sans-serif;margin:0;background:#f4f5f7;color:#1f2430}\
    header{background:#5b3e90;color:#fff;padding:0.8rem 1.5rem;display:flex;align-items:center;gap:1.5rem}\
    header h1{font-size:1.1rem;margin:0}\
    header nav a{color:#d9cfee;text-decoration:none;margin-right:1rem}\
    header nav a.active{color:#fff;font-weight:600}\
    main{padding:1.5rem;max-width:1100px;margin:0 auto}\
    .stats-grid{display:grid;grid-template-columns:repeat(auto-fit,minmax(150px,1fr));gap:1rem;margin-bottom:1.5rem}\
    .stat-card{background:#fff;border-radius:8px;padding:1rem;box-shadow:0 1px 2px rgba(0,0,0,0.08)}\
    .stat-value{font-size:1.6rem;font-weight:700}\
    .stat-label{color:#6b7280;font-size:0.85rem}\
    table{width:100%;border-collapse:collapse;background:#fff;border-radius:8px;overflow:hidden}\
    th,td{text-align:left;padding:0.6rem 0.8rem;border-bottom:1px solid #eceef2;font-size:0.9rem}\
    th{background:#fafbfc;color:#6b7280;font-weight:600}\
    .badge{display:inline-block;padding:0.15rem 0.5rem;border-radius:999px;font-size:0.75rem;font-weight:600}\
    .badge-warning{background:#fef3c7;color:#92400e}\
    .badge-info{background:#dbeafe;color:#1e40af}\
    .badge-success{background:#d1fae5;color:#065f46}\
    .badge-secondary{background:#e5e7eb;color:#374151}\
    .columns{display:grid;grid-template-columns:repeat(auto-fit,minmax(280px,1fr));gap:1rem}\
    .card{background:#fff;border-radius:8px;padding:1rem;box-shadow:0 1px 2px rgba(0,0,0,0.08);margin-bottom:0.8rem}\
    .empty-state{text-align:center;color:#6b7280;padding:2rem}\
    form.inline{display:inline}\
    button,select,input,textarea{font:inherit;padding:0.35rem 0.6rem;border:1px solid #d1d5db;border-radius:6px}\
    button{background:#5b3e90;color:#fff;border:none;cursor:pointer}\
    button.secondary{background:#e5e7eb;color:#1f2430}\
    .error{background:#fee2e2;color:#991b1b;padding:0.6rem 0.8rem;border-radius:6px;margin-bottom:1rem}\
    .login-box{max-width:340px;margin:6rem auto;background:#fff;border-radius:8px;padding:2rem;box-shadow:0 1px 3px rgba(0,0,0,0.1)}\
    .login-box label{display:block;margin-bottom:0.8rem}\
    .login-box input{width:100%;box-sizing:border-box;margin-top:0.2rem}\
";

pub fn page_shell(title: &str, active: &str, body: &str) -> String {
    let nav_link = |href: &str, key: &str, label: &str| {
        let class = if key == active { " class=\"active\"" } else { "" };
        format!("<a href=\"{href}\"{class}>{label}</a>")
    };

    format!(
        "<!DOCTYPE html>\
        <html lang=\"en\">\
        <head>\
            <meta charset=\"utf-8\">\
            <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
            <title>{title} - Viberdesk Admin</title>\
            <style>{PAGE_STYLE}</style>\
        </head>\
        <body>\
            <header>\
                <h1>Viberdesk</h1>\
                <nav>{dashboard}{tickets}{menus}{users}</nav>\
                <nav style=\"margin-left:auto\"><a href=\"/admin/logout\">Logout</a></nav>\
            </header>\
            <main>{body}</main>\
        </body>\
        </html>",
        title = html_escape(title),
        dashboard = nav_link("/admin", "dashboard", "Dashboard"),
        tickets = nav_link("/admin/tickets", "tickets", "Tickets"),
        menus = nav_link("/admin/menus", "menus", "Menus"),
        users = nav_link("/admin/users", "users", "Users"),
        body = body,
    )
}

pub fn render_login_page(error: Option<&str>) -> String {
    let error_html = error
        .map(|e| format!("<div class=\"error\">{}</div>", html_escape(e)))
        .unwrap_or_default();

    format!(
        "<!DOCTYPE html>\
        <html lang=\"en\">\
        <head>\
            <meta charset=\"utf-8\">\
            <title>Login - Viberdesk Admin</title>\
            <style>{PAGE_STYLE}</style>\
        </head>\
        <body>\
            <div class=\"login-box\">\
                <h2>Viberdesk Admin</h2>\
                {error_html}\
                <form method=\"post\" action=\"/admin/login\">\
                    <label>Username<input type=\"text\" name=\"username\" required></label>\
                    <label>Password<input type=\"password\" name=\"password\" required></label>\
                    <button type=\"submit\">Sign in</button>\
                </form>\
            </div>\
        </body>\
        </html>"
    )
}

pub fn status_badge(status: &str) -> &'static str {
    match TicketStatus::parse(status) {
        Some(TicketStatus::Pending) => "<span class=\"badge badge-warning\">Pending</span>",
        Some(TicketStatus::Claimed) => "<span class=\"badge badge-info\">Claimed</span>",
        Some(TicketStatus::Resolved) => "<span class=\"badge badge-success\">Resolved</span>",
        None => "<span class=\"badge badge-secondary\">Unknown</span>",
    }
}

fn stat_card(value: i64, label: &str) -> String {
    format!(
        "<div class=\"stat-card\"><div class=\"stat-value\">{value}</div>\
         <div class=\"stat-label\">{label}</div></div>"
    )
}

fn format_time(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}

async fn dashboard_page(
    State(state): State<Arc<AppState>>,
    session: Result<AdminSession, (StatusCode, String)>,
) -> Response {
    if session.is_err() {
        return Redirect::to("/admin/login").into_response();
    }

    let Ok(mut conn) = state.conn.get() else {
        return Html(page_shell(
            "Dashboard",
            "dashboard",
            "<div class=\"empty-state\">Unable to reach the database</div>",
        ))
        .into_response();
    };

    let total_users: i64 = bot_users::table.count().get_result(&mut conn).unwrap_or(0);
    let active_users: i64 = bot_users::table
        .filter(bot_users::is_active.eq(true))
        .count()
        .get_result(&mut conn)
        .unwrap_or(0);
    let pending_tickets: i64 = support_tickets::table
        .filter(support_tickets::status.eq(TicketStatus::Pending.as_str()))
        .count()
        .get_result(&mut conn)
        .unwrap_or(0);
    let open_conversations: i64 = conversations::table
        .filter(conversations::status.eq(crate::conversations::STATUS_OPEN))
        .count()
        .get_result(&mut conn)
        .unwrap_or(0);
    let available_staff: i64 = staff::table
        .filter(staff::is_available.eq(true))
        .count()
        .get_result(&mut conn)
        .unwrap_or(0);

    let midnight = Utc::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|t| DateTime::<Utc>::from_naive_utc_and_offset(t, Utc))
        .unwrap_or_else(Utc::now);
    let resolved_today: i64 = support_tickets::table
        .filter(support_tickets::status.eq(TicketStatus::Resolved.as_str()))
        .filter(support_tickets::resolved_at.ge(midnight))
        .count()
        .get_result(&mut conn)
        .unwrap_or(0);

    let recent: Vec<SupportTicket> = support_tickets::table
        .order(support_tickets::escalated_at.desc())
        .limit(5)
        .load(&mut conn)
        .unwrap_or_default();

    let mut recent_html = String::new();
    if recent.is_empty() {
        recent_html.push_str("<div class=\"empty-state\">No tickets yet</div>");
    } else {
        recent_html.push_str(
            "<table><thead><tr><th>Ticket</th><th>Status</th><th>Subject</th>\
             <th>Escalated</th></tr></thead><tbody>",
        );
        for ticket in &recent {
            recent_html.push_str(&format!(
                "<tr><td>{id}</td><td>{status}</td><td>{subject}</td><td>{at}</td></tr>",
                id = ticket.id,
                status = status_badge(&ticket.status),
                subject = html_escape(ticket.subject.as_deref().unwrap_or("-")),
                at = format_time(ticket.escalated_at),
            ));
        }
        recent_html.push_str("</tbody></table>");
    }

    let body = format!(
        "<h2>Dashboard</h2>\
        <div class=\"stats-grid\">{u}{au}{pt}{rt}{oc}{st}</div>\
        <h3>Recent tickets</h3>{recent_html}",
        u = stat_card(total_users, "Users"),
        au = stat_card(active_users, "Active users"),
        pt = stat_card(pending_tickets, "Pending tickets"),
        rt = stat_card(resolved_today, "Resolved today"),
        oc = stat_card(open_conversations, "Open conversations"),
        st = stat_card(available_staff, "Available staff"),
    );

    Html(page_shell("Dashboard", "dashboard", &body)).into_response()
}

async fn users_page(
    State(state): State<Arc<AppState>>,
    session: Result<AdminSession, (StatusCode, String)>,
) -> Response {
    if session.is_err() {
        return Redirect::to("/admin/login").into_response();
    }

    let Ok(mut conn) = state.conn.get() else {
        return Html(page_shell(
            "Users",
            "users",
            "<div class=\"empty-state\">Unable to reach the database</div>",
        ))
        .into_response();
    };

    let users: Vec<BotUser> = bot_users::table
        .order(bot_users::last_active_at.desc())
        .limit(100)
        .load(&mut conn)
        .unwrap_or_default();

    let mut rows = String::new();
    for user in &users {
        let flag = if user.is_active {
            "<span class=\"badge badge-success\">Active</span>"
        } else {
            "<span class=\"badge badge-secondary\">Inactive</span>"
        };
        rows.push_str(&format!(
            "<tr><td>{name}</td><td>{viber}</td><td>{lang}</td><td>{flag}</td>\
             <td>{first}</td><td>{last}</td></tr>",
            name = html_escape(user.display_name.as_deref().unwrap_or("-")),
            viber = html_escape(&user.viber_id),
            lang = html_escape(&user.language),
            flag = flag,
            first = format_time(user.created_at),
            last = format_time(user.last_active_at),
        ));
    }

    let body = if users.is_empty() {
        "<h2>Users</h2><div class=\"empty-state\">No users yet</div>".to_string()
    } else {
        format!(
            "<h2>Users</h2>\
            <table><thead><tr><th>Name</th><th>Viber ID</th><th>Language</th>\
            <th>Status</th><th>First contact</th><th>Last active</th></tr></thead>\
            <tbody>{rows}</tbody></table>"
        )
    };

    Html(page_shell("Users", "users", &body)).into_response()
}

pub fn configure_admin_ui_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin", get(dashboard_page))
        .route("/admin/users", get(users_page))
}
