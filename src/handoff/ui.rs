//! Ticket management pages for the admin dashboard.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::admin::ui::{page_shell, status_badge};
use crate::admin::AdminSession;
use crate::handoff::{HandoffError, SupportTicket, TicketStatus};
use crate::shared::schema::{bot_users, staff, support_tickets};
use crate::shared::state::AppState;
use crate::shared::utils::html_escape;
use crate::staff::Staff;

#[derive(Debug, Deserialize)]
pub struct ClaimForm {
    pub staff_id: Uuid,
}

fn load_tickets(
    conn: &mut PgConnection,
    status: TicketStatus,
    limit: i64,
) -> Vec<SupportTicket> {
    support_tickets::table
        .filter(support_tickets::status.eq(status.as_str()))
        .order(support_tickets::escalated_at.asc())
        .limit(limit)
        .load(conn)
        .unwrap_or_default()
}

fn user_names(conn: &mut PgConnection, tickets: &[&SupportTicket]) -> HashMap<Uuid, String> {
    let ids: Vec<Uuid> = tickets.iter().map(|t| t.user_id).collect();
    let users: Vec<(Uuid, Option<String>, String)> = bot_users::table
        .filter(bot_users::id.eq_any(ids))
        .select((bot_users::id, bot_users::display_name, bot_users::viber_id))
        .load(conn)
        .unwrap_or_default();
    users
        .into_iter()
        .map(|(id, name, viber_id)| (id, name.unwrap_or(viber_id)))
        .collect()
}

fn staff_options(members: &[Staff]) -> String {
    let mut options = String::new();
    for member in members {
        let capacity = format!("{}/{}", member.current_chats, member.max_concurrent_chats);
        let disabled = if member.has_capacity() { "" } else { " disabled" };
        options.push_str(&format!(
            "<option value=\"{id}\"{disabled}>{name} ({capacity})</option>",
            id = member.id,
            name = html_escape(&member.name),
        ));
    }
    options
}

fn render_ticket_card(
    ticket: &SupportTicket,
    requester: &str,
    members: &[Staff],
) -> String {
    let subject = html_escape(ticket.subject.as_deref().unwrap_or("Support request"));
    let escalated = ticket.escalated_at.format("%Y-%m-%d %H:%M").to_string();

    let actions = match TicketStatus::parse(&ticket.status) {
        Some(TicketStatus::Pending) => format!(
            "<form class=\"inline\" method=\"post\" action=\"/admin/tickets/{id}/claim\">\
                <select name=\"staff_id\" required>{options}</select>\
                <button type=\"submit\">Claim</button>\
            </form>",
            id = ticket.id,
            options = staff_options(members),
        ),
        Some(TicketStatus::Claimed) => format!(
            "<form class=\"inline\" method=\"post\" action=\"/admin/tickets/{id}/resolve\">\
                <button type=\"submit\">Resolve</button>\
            </form>",
            id = ticket.id,
        ),
        _ => String::new(),
    };

    format!(
        "<div class=\"card\">\
            <div>{status} <strong>{subject}</strong></div>\
            <div>From: {requester}</div>\
            <div>Escalated: {escalated}</div>\
            {actions}\
        </div>",
        status = status_badge(&ticket.status),
        requester = html_escape(requester),
    )
}

async fn tickets_page(
    State(state): State<Arc<AppState>>,
    session: Result<AdminSession, (StatusCode, String)>,
) -> Response {
    if session.is_err() {
        return Redirect::to("/admin/login").into_response();
    }

    let Ok(mut conn) = state.conn.get() else {
        return Html(page_shell(
            "Tickets",
            "tickets",
            "<div class=\"empty-state\">Unable to reach the database</div>",
        ))
        .into_response();
    };

    let pending = load_tickets(&mut conn, TicketStatus::Pending, 50);
    let claimed = load_tickets(&mut conn, TicketStatus::Claimed, 50);
    let resolved: Vec<SupportTicket> = support_tickets::table
        .filter(support_tickets::status.eq(TicketStatus::Resolved.as_str()))
        .order(support_tickets::resolved_at.desc())
        .limit(20)
        .load(&mut conn)
        .unwrap_or_default();

    let members: Vec<Staff> = staff::table
        .filter(staff::is_available.eq(true))
        .order(staff::name.asc())
        .load(&mut conn)
        .unwrap_or_default();

    let all: Vec<&SupportTicket> = pending
        .iter()
        .chain(claimed.iter())
        .chain(resolved.iter())
        .collect();
    let names = user_names(&mut conn, &all);

    let render_column = |title: &str, tickets: &[SupportTicket]| {
        let mut column = format!("<div><h3>{title} ({})</h3>", tickets.len());
        if tickets.is_empty() {
            column.push_str("<div class=\"empty-state\">None</div>");
        } else {
            for ticket in tickets {
                let requester = names
                    .get(&ticket.user_id)
                    .map(String::as_str)
                    .unwrap_or("Unknown");
                column.push_str(&render_ticket_card(ticket, requester, &members));
            }
        }
        column.push_str("</div>");
        column
    };

    let body = format!(
        "<h2>Support tickets</h2>\
        <div class=\"columns\">{pending}{claimed}{resolved}</div>",
        pending = render_column("Pending", &pending),
        claimed = render_column("Claimed", &claimed),
        resolved = render_column("Resolved", &resolved),
    );

    Html(page_shell("Tickets", "tickets", &body)).into_response()
}

fn error_page(e: &HandoffError) -> Response {
    let body = format!(
        "<h2>Support tickets</h2>\
        <div class=\"error\">{}</div>\
        <a href=\"/admin/tickets\">Back to tickets</a>",
        html_escape(&e.to_string()),
    );
    (
        e.status_code(),
        Html(page_shell("Tickets", "tickets", &body)),
    )
        .into_response()
}

async fn claim_form(
    State(state): State<Arc<AppState>>,
    _session: AdminSession,
    Path(id): Path<Uuid>,
    Form(form): Form<ClaimForm>,
) -> Response {
    match state.handoff.claim(id, form.staff_id, Utc::now()) {
        Ok(ticket) => {
            log::info!("ticket {} claimed by staff {}", ticket.id, form.staff_id);
            Redirect::to("/admin/tickets").into_response()
        }
        Err(e) => error_page(&e),
    }
}

async fn resolve_form(
    State(state): State<Arc<AppState>>,
    _session: AdminSession,
    Path(id): Path<Uuid>,
) -> Response {
    match state.handoff.resolve(id, Utc::now()) {
        Ok(ticket) => {
            log::info!("ticket {} resolved", ticket.id);
            crate::handoff::notify_resolution(&state, &ticket).await;
            Redirect::to("/admin/tickets").into_response()
        }
        Err(e) => error_page(&e),
    }
}

pub fn configure_tickets_ui_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/tickets", get(tickets_page))
        .route("/admin/tickets/:id/claim", post(claim_form))
        .route("/admin/tickets/:id/resolve", post(resolve_form))
}
