//! Viber channel integration.
//!
//! Webhook handling and outbound message delivery for the Viber REST API.
//! The webhook acknowledges quickly: after payload validation and a pool
//! liveness check the event is processed on a spawned task, so Viber never
//! waits on database work. A dead pool yields 503 and Viber redelivers.

use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use log::{debug, error, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::bot::BotOrchestrator;
use crate::channels::InboundEvent;
use crate::config::ViberConfig;
use crate::menus::MenuItem;
use crate::shared::state::AppState;

#[derive(Debug, Deserialize, Serialize)]
pub struct ViberCallback {
    pub event: String,
    pub timestamp: Option<i64>,
    pub message_token: Option<i64>,
    pub user: Option<ViberUser>,
    pub sender: Option<ViberUser>,
    pub user_id: Option<String>,
    pub message: Option<ViberMessage>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ViberUser {
    pub id: String,
    pub name: Option<String>,
    pub language: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ViberMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub text: Option<String>,
    pub media: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("missing {0} in {1} event")]
    MissingField(&'static str, String),
}

/// Translate a platform callback into the internal event shape.
pub fn normalize(callback: ViberCallback) -> Result<InboundEvent, EventError> {
    match callback.event.as_str() {
        "webhook" | "delivered" | "seen" | "failed" => Ok(InboundEvent::Ignored),
        "subscribed" => {
            let user = callback
                .user
                .ok_or(EventError::MissingField("user", callback.event.clone()))?;
            Ok(InboundEvent::Subscribed {
                user_id: user.id,
                name: user.name,
                language: user.language,
            })
        }
        "conversation_started" => {
            let user = callback
                .user
                .ok_or(EventError::MissingField("user", callback.event.clone()))?;
            Ok(InboundEvent::ConversationStarted {
                user_id: user.id,
                name: user.name,
                language: user.language,
            })
        }
        "unsubscribed" => {
            let user_id = callback
                .user_id
                .ok_or(EventError::MissingField("user_id", callback.event.clone()))?;
            Ok(InboundEvent::Unsubscribed { user_id })
        }
        "message" => {
            let sender = callback
                .sender
                .ok_or(EventError::MissingField("sender", callback.event.clone()))?;
            let message = callback
                .message
                .ok_or(EventError::MissingField("message", callback.event.clone()))?;
            if message.msg_type != "text" {
                debug!(
                    "ignoring {} message from {} (only text is routed)",
                    message.msg_type, sender.id
                );
                return Ok(InboundEvent::Ignored);
            }
            let text = message
                .text
                .ok_or(EventError::MissingField("text", callback.event.clone()))?;
            Ok(InboundEvent::Message {
                user_id: sender.id,
                name: sender.name,
                text,
            })
        }
        other => {
            debug!("ignoring unknown viber event {other:?}");
            Ok(InboundEvent::Ignored)
        }
    }
}

#[derive(Debug, Deserialize)]
struct ViberApiResponse {
    status: i64,
    status_message: Option<String>,
}

pub struct ViberClient {
    http: Client,
    auth_token: String,
    api_url: String,
    bot_name: String,
    bot_avatar: String,
}

impl ViberClient {
    pub fn new(config: &ViberConfig) -> Self {
        Self {
            http: Client::new(),
            auth_token: config.auth_token.clone(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            bot_name: config.bot_name.clone(),
            bot_avatar: config.bot_avatar.clone(),
        }
    }

    async fn post(
        &self,
        path: &str,
        payload: serde_json::Value,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let url = format!("{}/{}", self.api_url, path);
        let response = self
            .http
            .post(&url)
            .header("X-Viber-Auth-Token", &self.auth_token)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Viber API error on {path}: {body}");
            return Err(format!("Viber API error: {body}").into());
        }

        let api: ViberApiResponse = response.json().await?;
        if api.status != 0 {
            let message = api.status_message.unwrap_or_default();
            error!("Viber API rejected {path}: {} {message}", api.status);
            return Err(format!("Viber API rejected request: {message}").into());
        }

        Ok(())
    }

    pub async fn send_message(
        &self,
        receiver: &str,
        message: serde_json::Value,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut payload = json!({
            "receiver": receiver,
            "min_api_version": 1,
            "sender": {
                "name": self.bot_name,
                "avatar": self.bot_avatar,
            },
        });
        if let (Some(base), Some(extra)) = (payload.as_object_mut(), message.as_object()) {
            for (key, value) in extra {
                base.insert(key.clone(), value.clone());
            }
        }
        self.post("send_message", payload).await
    }

    pub async fn send_text(
        &self,
        receiver: &str,
        text: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.send_message(receiver, json!({ "type": "text", "text": text }))
            .await
    }

    pub async fn send_keyboard(
        &self,
        receiver: &str,
        text: &str,
        items: &[MenuItem],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.send_message(
            receiver,
            json!({
                "type": "text",
                "text": text,
                "keyboard": keyboard_json(items),
            }),
        )
        .await
    }

    pub async fn set_webhook(
        &self,
        webhook_url: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!("registering viber webhook at {webhook_url}");
        self.post(
            "set_webhook",
            json!({
                "url": webhook_url,
                "event_types": [
                    "subscribed",
                    "unsubscribed",
                    "conversation_started",
                    "message",
                ],
            }),
        )
        .await
    }
}

/// Viber keyboard payload for the active menu's buttons.
pub fn keyboard_json(items: &[MenuItem]) -> serde_json::Value {
    let buttons: Vec<serde_json::Value> = items
        .iter()
        .map(|item| {
            let (action_type, action_body) = match item.action_type.as_str() {
                "url" => ("open-url", item.action_value.as_str()),
                _ => ("reply", item.label.as_str()),
            };
            json!({
                "Columns": 6,
                "Rows": 1,
                "ActionType": action_type,
                "ActionBody": action_body,
                "Text": item.label,
                "TextSize": "medium",
                "TextHAlign": "center",
                "TextVAlign": "middle",
            })
        })
        .collect();

    json!({
        "Type": "keyboard",
        "DefaultHeight": true,
        "Buttons": buttons,
    })
}

pub async fn viber_webhook(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let callback: ViberCallback = serde_json::from_value(body).map_err(|e| {
        warn!("rejecting malformed viber payload: {e}");
        (StatusCode::BAD_REQUEST, format!("malformed event: {e}"))
    })?;

    let event = normalize(callback).map_err(|e| {
        warn!("rejecting viber event: {e}");
        (StatusCode::BAD_REQUEST, e.to_string())
    })?;

    if matches!(event, InboundEvent::Ignored) {
        return Ok(Json(json!({ "status": "ok" })));
    }

    // Retryable failure while storage is down, so the platform redelivers
    // instead of the event being lost.
    if let Err(e) = state.conn.get() {
        error!("storage unavailable, asking viber to redeliver: {e}");
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "storage unavailable".to_string(),
        ));
    }

    let orchestrator = BotOrchestrator::new(state.clone());
    tokio::spawn(async move {
        if let Err(e) = orchestrator.handle_event(event).await {
            error!("viber event processing failed: {e}");
        }
    });

    Ok(Json(json!({ "status": "ok" })))
}

pub fn configure_viber_routes() -> Router<Arc<AppState>> {
    Router::new().route("/viber/webhook", post(viber_webhook))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_url: &str) -> ViberConfig {
        ViberConfig {
            auth_token: "token-123".to_string(),
            api_url: api_url.to_string(),
            webhook_url: String::new(),
            bot_name: "Myanmar Link".to_string(),
            bot_avatar: String::new(),
        }
    }

    #[test]
    fn normalizes_message_event() {
        let callback: ViberCallback = serde_json::from_value(json!({
            "event": "message",
            "timestamp": 1457764197627i64,
            "message_token": 4912661846655238145i64,
            "sender": { "id": "01234567890A=", "name": "Mya", "language": "my" },
            "message": { "type": "text", "text": "Balance" }
        }))
        .unwrap();

        let event = normalize(callback).unwrap();
        assert_eq!(
            event,
            InboundEvent::Message {
                user_id: "01234567890A=".to_string(),
                name: Some("Mya".to_string()),
                text: "Balance".to_string(),
            }
        );
    }

    #[test]
    fn normalizes_subscribed_and_unsubscribed() {
        let subscribed: ViberCallback = serde_json::from_value(json!({
            "event": "subscribed",
            "user": { "id": "u-1", "name": "Mya", "language": "my" }
        }))
        .unwrap();
        assert!(matches!(
            normalize(subscribed).unwrap(),
            InboundEvent::Subscribed { .. }
        ));

        let unsubscribed: ViberCallback = serde_json::from_value(json!({
            "event": "unsubscribed",
            "user_id": "u-1"
        }))
        .unwrap();
        assert_eq!(
            normalize(unsubscribed).unwrap(),
            InboundEvent::Unsubscribed {
                user_id: "u-1".to_string()
            }
        );
    }

    #[test]
    fn validation_ping_and_receipts_are_ignored() {
        for event in ["webhook", "delivered", "seen", "failed"] {
            let callback: ViberCallback =
                serde_json::from_value(json!({ "event": event })).unwrap();
            assert_eq!(normalize(callback).unwrap(), InboundEvent::Ignored);
        }
    }

    #[test]
    fn non_text_messages_are_ignored() {
        let callback: ViberCallback = serde_json::from_value(json!({
            "event": "message",
            "sender": { "id": "u-1" },
            "message": { "type": "picture", "media": "https://example.com/a.jpg" }
        }))
        .unwrap();
        assert_eq!(normalize(callback).unwrap(), InboundEvent::Ignored);
    }

    #[test]
    fn message_without_sender_is_malformed() {
        let callback: ViberCallback = serde_json::from_value(json!({
            "event": "message",
            "message": { "type": "text", "text": "hi" }
        }))
        .unwrap();
        assert!(normalize(callback).is_err());
    }

    #[test]
    fn keyboard_buttons_carry_labels_and_actions() {
        let items = vec![
            MenuItem {
                label: "Balance".to_string(),
                action_type: "reply".to_string(),
                action_value: "Balance info".to_string(),
                position: 0,
            },
            MenuItem {
                label: "Website".to_string(),
                action_type: "url".to_string(),
                action_value: "https://myanmarlink.example".to_string(),
                position: 1,
            },
        ];

        let keyboard = keyboard_json(&items);
        assert_eq!(keyboard["Type"], "keyboard");
        let buttons = keyboard["Buttons"].as_array().unwrap();
        assert_eq!(buttons.len(), 2);
        assert_eq!(buttons[0]["ActionType"], "reply");
        assert_eq!(buttons[0]["ActionBody"], "Balance");
        assert_eq!(buttons[1]["ActionType"], "open-url");
        assert_eq!(buttons[1]["ActionBody"], "https://myanmarlink.example");
    }

    #[tokio::test]
    async fn send_text_posts_to_viber_api() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/send_message")
            .match_header("x-viber-auth-token", "token-123")
            .with_status(200)
            .with_body(r#"{"status":0,"status_message":"ok"}"#)
            .create_async()
            .await;

        let client = ViberClient::new(&config(&server.url()));
        client.send_text("receiver-1", "hello").await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_zero_api_status_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/send_message")
            .with_status(200)
            .with_body(r#"{"status":2,"status_message":"invalidAuthToken"}"#)
            .create_async()
            .await;

        let client = ViberClient::new(&config(&server.url()));
        let err = client.send_text("receiver-1", "hello").await.unwrap_err();
        assert!(err.to_string().contains("invalidAuthToken"));
    }
}
