//! HTTP server initialization and routing.

use axum::{routing::get, Json, Router};
use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_cookies::CookieManagerLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handoff::SupportTicket;
use crate::i18n::{self, Phrase};
use crate::shared::state::AppState;

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn notify_released(state: &Arc<AppState>, released: &[SupportTicket]) {
    let Ok(mut conn) = state.conn.get() else {
        return;
    };
    for ticket in released {
        let user = match crate::users::find_by_id(&mut conn, ticket.user_id) {
            Ok(Some(user)) => user,
            _ => continue,
        };
        let text = i18n::phrase(Phrase::TimeoutNotice, &user.language);
        if let Err(e) = state.viber.send_text(&user.viber_id, text).await {
            warn!("failed to send timeout notice to {}: {}", user.viber_id, e);
        }
    }
}

/// Periodic release of claimed tickets that went idle. The sweep itself is a
/// single conditional update, so overlapping runs (or a second instance) are
/// harmless.
fn spawn_timeout_sweep(state: Arc<AppState>) {
    tokio::spawn(async move {
        let interval =
            std::time::Duration::from_secs(state.config.handoff.sweep_interval_secs.max(1));
        let inactivity =
            chrono::Duration::seconds(state.config.handoff.claim_inactivity_secs as i64);
        loop {
            tokio::time::sleep(interval).await;
            let now = chrono::Utc::now();
            match state.handoff.timeout_sweep(now - inactivity, now) {
                Ok(released) if released.is_empty() => {}
                Ok(released) => {
                    info!(
                        "released {} stale claimed tickets back to the queue",
                        released.len()
                    );
                    notify_released(&state, &released).await;
                }
                Err(e) => error!("ticket timeout sweep failed: {e}"),
            }
        }
    });
}

pub async fn run(state: Arc<AppState>) -> std::io::Result<()> {
    spawn_timeout_sweep(state.clone());

    let app = Router::new()
        .route("/health", get(health_check))
        .merge(crate::channels::viber::configure_viber_routes())
        .merge(crate::admin::configure_admin_routes())
        .merge(crate::admin::ui::configure_admin_ui_routes())
        .merge(crate::menus::configure_menus_routes())
        .merge(crate::menus::ui::configure_menus_ui_routes())
        .merge(crate::handoff::configure_handoff_routes())
        .merge(crate::handoff::ui::configure_tickets_ui_routes())
        .merge(crate::conversations::configure_conversations_routes())
        .merge(crate::staff::configure_staff_routes())
        .merge(crate::users::configure_users_routes())
        .with_state(state.clone())
        .layer(CookieManagerLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!(
        "{}:{}",
        state.config.server.host, state.config.server.port
    )
    .parse()
    .map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("invalid bind address: {e}"),
        )
    })?;

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(
                "Failed to bind to {}: {} - is another instance running?",
                addr, e
            );
            return Err(e);
        }
    };
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
}
