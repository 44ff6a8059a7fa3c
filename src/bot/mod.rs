//! Event orchestration: the control flow between the gateway, the menu
//! store, the handoff coordinator, and the conversation log.

use chrono::Utc;
use diesel::PgConnection;
use log::{info, warn};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::channels::InboundEvent;
use crate::conversations::{self, Conversation};
use crate::handoff::{
    self, ConversationSnapshot, Decision, EscalationReason, HandoffError, TicketStatus,
};
use crate::i18n::{self, Phrase};
use crate::menus;
use crate::shared::state::AppState;
use crate::users::{self, BotUser};

type BotResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub struct BotOrchestrator {
    state: Arc<AppState>,
}

impl BotOrchestrator {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn handle_event(&self, event: InboundEvent) -> BotResult<()> {
        match event {
            InboundEvent::Subscribed {
                user_id,
                name,
                language,
            }
            | InboundEvent::ConversationStarted {
                user_id,
                name,
                language,
            } => {
                self.handle_contact(&user_id, name.as_deref(), language.as_deref())
                    .await
            }
            InboundEvent::Unsubscribed { user_id } => self.handle_unsubscribed(&user_id).await,
            InboundEvent::Message {
                user_id,
                name,
                text,
            } => self.handle_message(&user_id, name.as_deref(), &text).await,
            InboundEvent::Ignored => Ok(()),
        }
    }

    async fn handle_contact(
        &self,
        viber_id: &str,
        name: Option<&str>,
        language: Option<&str>,
    ) -> BotResult<()> {
        let mut conn = self.state.conn.get()?;
        let user = users::upsert_on_contact(
            &mut conn,
            viber_id,
            name,
            language,
            &self.state.config.default_language,
        )?;
        let conversation = conversations::open_for(&mut conn, user.id)?;

        let welcome = i18n::phrase(Phrase::Welcome, &user.language);
        match menus::active_menu(&mut conn)? {
            Some(menu) => {
                let items = menu.parsed_items()?;
                self.state
                    .viber
                    .send_keyboard(&user.viber_id, welcome, &items)
                    .await?;
            }
            None => {
                warn!("no active menu configured; greeting {viber_id} without a keyboard");
                self.state.viber.send_text(&user.viber_id, welcome).await?;
            }
        }

        conversations::append_message(
            &mut conn,
            conversation.id,
            "outbound",
            "bot",
            json!({ "type": "text", "text": welcome }),
        )?;

        Ok(())
    }

    async fn handle_unsubscribed(&self, viber_id: &str) -> BotResult<()> {
        let mut conn = self.state.conn.get()?;
        let Some(user) = users::find_by_viber_id(&mut conn, viber_id)? else {
            return Ok(());
        };

        users::deactivate(&mut conn, viber_id)?;
        if let Some(conversation) = conversations::active_for(&mut conn, user.id)? {
            conversations::close(&mut conn, conversation.id)?;
        }
        info!("user {viber_id} unsubscribed and was deactivated");
        Ok(())
    }

    async fn handle_message(
        &self,
        viber_id: &str,
        name: Option<&str>,
        text: &str,
    ) -> BotResult<()> {
        let mut conn = self.state.conn.get()?;
        let user = users::upsert_on_contact(
            &mut conn,
            viber_id,
            name,
            None,
            &self.state.config.default_language,
        )?;
        let conversation = conversations::open_for(&mut conn, user.id)?;

        conversations::append_message(
            &mut conn,
            conversation.id,
            "inbound",
            "user",
            json!({ "type": "text", "text": text }),
        )?;

        let snapshot = ConversationSnapshot {
            unmatched_count: conversation.unmatched_count,
            has_open_ticket: self
                .state
                .handoff
                .open_ticket_for_user(user.id)?
                .is_some(),
        };

        let menu = menus::active_menu(&mut conn)?;
        let items = match &menu {
            Some(menu) => Some(menu.parsed_items()?),
            None => None,
        };

        match handoff::evaluate(
            text,
            &user.language,
            items.as_deref(),
            &snapshot,
            self.state.config.handoff.retry_threshold,
        ) {
            Ok(Decision::Reply(reply)) => {
                conversations::reset_unmatched(&mut conn, conversation.id)?;
                self.send_and_log(&mut conn, &user, conversation.id, &reply)
                    .await
            }
            Ok(Decision::Fallback) => {
                conversations::increment_unmatched(&mut conn, conversation.id)?;
                let prompt = i18n::phrase(Phrase::Fallback, &user.language);
                self.send_and_log(&mut conn, &user, conversation.id, prompt)
                    .await
            }
            Ok(Decision::Escalate(reason)) => {
                self.escalate(&mut conn, &user, &conversation, reason).await
            }
            Err(HandoffError::NoActiveMenu) => {
                // Configuration error, not a webhook failure: fall back to the
                // static default reply.
                warn!("evaluate failed: no active menu configured");
                let fallback = i18n::phrase(Phrase::NoMenuDefault, &user.language);
                self.send_and_log(&mut conn, &user, conversation.id, fallback)
                    .await
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn escalate(
        &self,
        conn: &mut PgConnection,
        user: &BotUser,
        conversation: &Conversation,
        reason: EscalationReason,
    ) -> BotResult<()> {
        let now = Utc::now();

        if reason == EscalationReason::TicketAlreadyOpen {
            let Some(ticket) = self.state.handoff.open_ticket_for_user(user.id)? else {
                return Ok(());
            };
            self.state.handoff.touch(ticket.id, now)?;
            if ticket.status == TicketStatus::Pending.as_str() {
                if let Some(position) = self.state.handoff.queue_position(ticket.id)? {
                    let text = i18n::queue_position_reply(&user.language, position);
                    self.send_and_log(conn, user, conversation.id, &text).await?;
                }
            }
            // Claimed ticket: an agent owns the conversation, the bot stays quiet.
            return Ok(());
        }

        let subject = match reason {
            EscalationReason::UserRequested => "Customer requested an agent",
            EscalationReason::RetryExceeded => "Bot could not answer after repeated attempts",
            EscalationReason::TicketAlreadyOpen => unreachable!("handled above"),
        };

        let ticket = self.state.handoff.escalate(
            user.id,
            Some(conversation.id),
            Some(subject.to_string()),
            now,
        )?;
        conversations::reset_unmatched(conn, conversation.id)?;
        info!(
            "user {} escalated to ticket {} ({:?})",
            user.viber_id, ticket.id, reason
        );

        let text = if self.state.handoff.has_capacity()? {
            i18n::phrase(Phrase::ConnectingToAgent, &user.language)
        } else {
            i18n::phrase(Phrase::AgentsBusy, &user.language)
        };
        self.send_and_log(conn, user, conversation.id, text).await
    }

    async fn send_and_log(
        &self,
        conn: &mut PgConnection,
        user: &BotUser,
        conversation_id: Uuid,
        text: &str,
    ) -> BotResult<()> {
        self.state.viber.send_text(&user.viber_id, text).await?;
        conversations::append_message(
            conn,
            conversation_id,
            "outbound",
            "bot",
            json!({ "type": "text", "text": text }),
        )?;
        Ok(())
    }
}
