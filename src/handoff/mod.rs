//! Human-handoff coordination.
//!
//! Decides, per inbound message, whether the bot can answer from the active
//! menu or a human must be engaged, and tracks the resulting support ticket
//! through its lifecycle: `pending` → `claimed` → `resolved`. A ticket never
//! reaches `resolved` without passing through `claimed`, so every resolved
//! ticket records who handled it.

pub mod store;
pub mod ui;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::admin::AdminSession;
use crate::i18n;
use crate::menus::MenuItem;
use crate::shared::schema::support_tickets;
use crate::shared::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Pending,
    Claimed,
    Resolved,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Pending => "pending",
            TicketStatus::Claimed => "claimed",
            TicketStatus::Resolved => "resolved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TicketStatus::Pending),
            "claimed" => Some(TicketStatus::Claimed),
            "resolved" => Some(TicketStatus::Resolved),
            _ => None,
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statuses that count as "open" for the one-open-ticket-per-user invariant.
pub const OPEN_STATUSES: &[&str] = &["pending", "claimed"];

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = support_tickets)]
pub struct SupportTicket {
    pub id: Uuid,
    pub user_id: Uuid,
    pub conversation_id: Option<Uuid>,
    pub staff_id: Option<Uuid>,
    pub status: String,
    pub subject: Option<String>,
    pub escalated_at: DateTime<Utc>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub last_activity_at: DateTime<Utc>,
}

impl SupportTicket {
    pub fn is_open(&self) -> bool {
        OPEN_STATUSES.contains(&self.status.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HandoffError {
    #[error("no active menu is configured")]
    NoActiveMenu,
    #[error("ticket not found")]
    TicketNotFound,
    #[error("ticket is {actual}, expected {expected}")]
    InvalidTransition {
        expected: TicketStatus,
        actual: String,
    },
    #[error("staff member not found")]
    StaffNotFound,
    #[error("staff member is unavailable or at capacity")]
    StaffUnavailable,
    #[error("storage error: {0}")]
    Storage(String),
}

impl HandoffError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            HandoffError::NoActiveMenu => StatusCode::CONFLICT,
            HandoffError::TicketNotFound | HandoffError::StaffNotFound => StatusCode::NOT_FOUND,
            HandoffError::InvalidTransition { .. } => StatusCode::CONFLICT,
            HandoffError::StaffUnavailable => StatusCode::UNPROCESSABLE_ENTITY,
            HandoffError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<diesel::result::Error> for HandoffError {
    fn from(e: diesel::result::Error) -> Self {
        HandoffError::Storage(e.to_string())
    }
}

impl From<diesel::r2d2::PoolError> for HandoffError {
    fn from(e: diesel::r2d2::PoolError) -> Self {
        HandoffError::Storage(e.to_string())
    }
}

fn error_response(e: HandoffError) -> (StatusCode, String) {
    (e.status_code(), e.to_string())
}

/// What `evaluate` sees of the conversation: the consecutive-unmatched
/// counter and whether the user already has an open ticket.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConversationSnapshot {
    pub unmatched_count: i32,
    pub has_open_ticket: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Bot answers from the menu or the canned reply catalog.
    Reply(String),
    /// A human must be engaged.
    Escalate(EscalationReason),
    /// Unmatched, below the retry threshold; the gateway prompts and counts.
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationReason {
    UserRequested,
    RetryExceeded,
    TicketAlreadyOpen,
}

const HANDOFF_KEYWORDS: &[&str] = &["agent", "human", "representative", "ဝန်ထမ်းနဲ့ပြော"];

/// Routing decision for one inbound message. Pure: callers pass a snapshot of
/// the conversation and the active menu items (`None` when no menu version is
/// active, which is a configuration error, not a crash).
pub fn evaluate(
    text: &str,
    lang: &str,
    menu_items: Option<&[MenuItem]>,
    snapshot: &ConversationSnapshot,
    retry_threshold: i32,
) -> Result<Decision, HandoffError> {
    if snapshot.has_open_ticket {
        return Ok(Decision::Escalate(EscalationReason::TicketAlreadyOpen));
    }

    let normalized = text.trim().to_lowercase();
    if HANDOFF_KEYWORDS.contains(&normalized.as_str()) {
        return Ok(Decision::Escalate(EscalationReason::UserRequested));
    }

    let items = menu_items.ok_or(HandoffError::NoActiveMenu)?;
    for item in items {
        if normalized == item.label.trim().to_lowercase() {
            return Ok(Decision::Reply(item.action_value.clone()));
        }
    }

    if let Some(reply) = i18n::canned_reply(&normalized, lang) {
        return Ok(Decision::Reply(reply.to_string()));
    }

    if snapshot.unmatched_count + 1 >= retry_threshold {
        return Ok(Decision::Escalate(EscalationReason::RetryExceeded));
    }

    Ok(Decision::Fallback)
}

#[derive(Debug, Deserialize)]
pub struct ClaimTicketRequest {
    pub staff_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TicketStats {
    pub total_tickets: i64,
    pub pending_tickets: i64,
    pub claimed_tickets: i64,
    pub resolved_tickets: i64,
    pub resolved_today: i64,
}

#[derive(Debug, Serialize)]
pub struct SweepResult {
    pub released: usize,
}

pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
    _session: AdminSession,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<SupportTicket>>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let limit = query.limit.unwrap_or(50);
    let offset = query.offset.unwrap_or(0);

    let mut q = support_tickets::table.into_boxed();
    if let Some(status) = query.status {
        if status != "all" {
            q = q.filter(support_tickets::status.eq(status));
        }
    }

    let tickets: Vec<SupportTicket> = q
        .order(support_tickets::escalated_at.desc())
        .limit(limit)
        .offset(offset)
        .load(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    Ok(Json(tickets))
}

pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    _session: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<Json<SupportTicket>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let ticket: SupportTicket = support_tickets::table
        .filter(support_tickets::id.eq(id))
        .first(&mut conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Ticket not found".to_string()))?;

    Ok(Json(ticket))
}

pub async fn claim_ticket(
    State(state): State<Arc<AppState>>,
    session: AdminSession,
    Path(id): Path<Uuid>,
    Json(req): Json<ClaimTicketRequest>,
) -> Result<Json<SupportTicket>, (StatusCode, String)> {
    let ticket = state
        .handoff
        .claim(id, req.staff_id, Utc::now())
        .map_err(error_response)?;

    log::info!(
        "ticket {} claimed by staff {} (via {})",
        ticket.id,
        req.staff_id,
        session.username
    );

    Ok(Json(ticket))
}

pub async fn resolve_ticket(
    State(state): State<Arc<AppState>>,
    session: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<Json<SupportTicket>, (StatusCode, String)> {
    let ticket = state
        .handoff
        .resolve(id, Utc::now())
        .map_err(error_response)?;

    log::info!("ticket {} resolved (via {})", ticket.id, session.username);

    notify_resolution(&state, &ticket).await;

    Ok(Json(ticket))
}

pub(crate) async fn notify_resolution(state: &Arc<AppState>, ticket: &SupportTicket) {
    let Ok(mut conn) = state.conn.get() else {
        return;
    };
    let user = match crate::users::find_by_id(&mut conn, ticket.user_id) {
        Ok(Some(user)) => user,
        _ => return,
    };
    let text = i18n::phrase(i18n::Phrase::TicketResolved, &user.language);
    if let Err(e) = state.viber.send_text(&user.viber_id, text).await {
        log::warn!("failed to send resolution notice to {}: {}", user.viber_id, e);
    }
}

pub async fn get_ticket_stats(
    State(state): State<Arc<AppState>>,
    _session: AdminSession,
) -> Result<Json<TicketStats>, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let count_by = |conn: &mut diesel::PgConnection, status: &str| -> i64 {
        support_tickets::table
            .filter(support_tickets::status.eq(status))
            .count()
            .get_result(conn)
            .unwrap_or(0)
    };

    let total_tickets: i64 = support_tickets::table
        .count()
        .get_result(&mut conn)
        .unwrap_or(0);
    let pending_tickets = count_by(&mut conn, TicketStatus::Pending.as_str());
    let claimed_tickets = count_by(&mut conn, TicketStatus::Claimed.as_str());
    let resolved_tickets = count_by(&mut conn, TicketStatus::Resolved.as_str());

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

    Ok(Json(TicketStats {
        total_tickets,
        pending_tickets,
        claimed_tickets,
        resolved_tickets,
        resolved_today,
    }))
}

/// Manual trigger for the periodic sweep; the background task runs the same
/// release path on an interval.
pub async fn run_sweep(
    State(state): State<Arc<AppState>>,
    _session: AdminSession,
) -> Result<Json<SweepResult>, (StatusCode, String)> {
    let cutoff =
        Utc::now() - Duration::seconds(state.config.handoff.claim_inactivity_secs as i64);
    let released = state
        .handoff
        .timeout_sweep(cutoff, Utc::now())
        .map_err(error_response)?;

    Ok(Json(SweepResult {
        released: released.len(),
    }))
}

pub fn configure_handoff_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/tickets", get(list_tickets))
        .route("/api/tickets/stats", get(get_ticket_stats))
        .route("/api/tickets/sweep", post(run_sweep))
        .route("/api/tickets/:id", get(get_ticket))
        .route("/api/tickets/:id/claim", put(claim_ticket))
        .route("/api/tickets/:id/resolve", put(resolve_ticket))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn menu() -> Vec<MenuItem> {
        vec![
            MenuItem {
                label: "Balance".to_string(),
                action_type: "reply".to_string(),
                action_value: "Your balance is available by dialing *124#.".to_string(),
                position: 0,
            },
            MenuItem {
                label: "Support".to_string(),
                action_type: "reply".to_string(),
                action_value: "Our support hours are 09:00-17:00.".to_string(),
                position: 1,
            },
        ]
    }

    #[test]
    fn menu_selection_returns_configured_reply() {
        let items = menu();
        let decision = evaluate(
            "Balance",
            "en",
            Some(&items),
            &ConversationSnapshot::default(),
            3,
        )
        .unwrap();
        assert_eq!(
            decision,
            Decision::Reply("Your balance is available by dialing *124#.".to_string())
        );
    }

    #[test]
    fn menu_match_is_case_and_whitespace_insensitive() {
        let items = menu();
        let decision = evaluate(
            "  sUpPoRt ",
            "en",
            Some(&items),
            &ConversationSnapshot::default(),
            3,
        )
        .unwrap();
        assert!(matches!(decision, Decision::Reply(_)));
    }

    #[test]
    fn human_keyword_escalates() {
        let items = menu();
        for keyword in ["human", "agent", "representative", "ဝန်ထမ်းနဲ့ပြော"] {
            let decision = evaluate(
                keyword,
                "en",
                Some(&items),
                &ConversationSnapshot::default(),
                3,
            )
            .unwrap();
            assert_eq!(
                decision,
                Decision::Escalate(EscalationReason::UserRequested),
                "keyword {keyword:?} should escalate"
            );
        }
    }

    #[test]
    fn open_ticket_escalates_before_anything_else() {
        let items = menu();
        let snapshot = ConversationSnapshot {
            unmatched_count: 0,
            has_open_ticket: true,
        };
        let decision = evaluate("Balance", "en", Some(&items), &snapshot, 3).unwrap();
        assert_eq!(
            decision,
            Decision::Escalate(EscalationReason::TicketAlreadyOpen)
        );
    }

    #[test]
    fn missing_menu_is_a_configuration_error() {
        let err = evaluate("Balance", "en", None, &ConversationSnapshot::default(), 3)
            .unwrap_err();
        assert!(matches!(err, HandoffError::NoActiveMenu));
    }

    #[test]
    fn handoff_keyword_wins_even_without_a_menu() {
        let decision =
            evaluate("human", "en", None, &ConversationSnapshot::default(), 3).unwrap();
        assert_eq!(decision, Decision::Escalate(EscalationReason::UserRequested));
    }

    #[test]
    fn unmatched_input_falls_back_until_threshold() {
        let items = menu();
        // First two misses prompt again; the third consecutive miss escalates.
        for prior in 0..2 {
            let snapshot = ConversationSnapshot {
                unmatched_count: prior,
                has_open_ticket: false,
            };
            let decision =
                evaluate("qwerty", "en", Some(&items), &snapshot, 3).unwrap();
            assert_eq!(decision, Decision::Fallback, "miss #{}", prior + 1);
        }
        let snapshot = ConversationSnapshot {
            unmatched_count: 2,
            has_open_ticket: false,
        };
        let decision = evaluate("qwerty", "en", Some(&items), &snapshot, 3).unwrap();
        assert_eq!(decision, Decision::Escalate(EscalationReason::RetryExceeded));
    }

    #[test]
    fn canned_keywords_reply_without_escalating() {
        let items = menu();
        let decision = evaluate(
            "help",
            "en",
            Some(&items),
            &ConversationSnapshot::default(),
            3,
        )
        .unwrap();
        assert!(matches!(decision, Decision::Reply(_)));
    }

    #[test]
    fn ticket_status_round_trips() {
        for status in [
            TicketStatus::Pending,
            TicketStatus::Claimed,
            TicketStatus::Resolved,
        ] {
            assert_eq!(TicketStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TicketStatus::parse("closed"), None);
    }
}
