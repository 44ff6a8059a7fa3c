//! Narrow storage interface for the handoff coordinator.
//!
//! The ticket invariants (one open ticket per user, claim/resolve transition
//! guards) are enforced here rather than in process memory, so they hold
//! across concurrent requests and multiple service instances. `PgHandoffStore`
//! backs production with conditional updates and the partial unique index;
//! `MemoryHandoffStore` is the in-process double the state-machine tests run
//! against.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::handoff::{HandoffError, SupportTicket, TicketStatus, OPEN_STATUSES};
use crate::shared::schema::{staff, support_tickets};
use crate::shared::utils::DbPool;
use crate::staff::Staff;

pub trait HandoffStore: Send + Sync {
    fn open_ticket_for_user(&self, user_id: Uuid) -> Result<Option<SupportTicket>, HandoffError>;

    /// Idempotent escalation: returns the user's existing open ticket instead
    /// of creating a duplicate.
    fn escalate(
        &self,
        user_id: Uuid,
        conversation_id: Option<Uuid>,
        subject: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<SupportTicket, HandoffError>;

    /// `pending` → `claimed`. Rejects unavailable/at-capacity staff and
    /// non-pending tickets without mutating anything.
    fn claim(
        &self,
        ticket_id: Uuid,
        staff_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<SupportTicket, HandoffError>;

    /// `claimed` → `resolved`. Rejects non-claimed tickets without mutating
    /// anything.
    fn resolve(&self, ticket_id: Uuid, now: DateTime<Utc>)
        -> Result<SupportTicket, HandoffError>;

    /// Record activity on an open ticket so the sweep leaves it alone.
    fn touch(&self, ticket_id: Uuid, now: DateTime<Utc>) -> Result<(), HandoffError>;

    /// Release claimed tickets idle since before `cutoff` back to `pending`.
    /// Returns the released tickets so callers can notify their owners.
    fn timeout_sweep(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<SupportTicket>, HandoffError>;

    /// 1-based position among pending tickets, oldest first.
    fn queue_position(&self, ticket_id: Uuid) -> Result<Option<usize>, HandoffError>;

    fn has_capacity(&self) -> Result<bool, HandoffError>;
}

pub struct PgHandoffStore {
    conn: DbPool,
}

impl PgHandoffStore {
    pub fn new(conn: DbPool) -> Self {
        Self { conn }
    }

    fn conn(
        &self,
    ) -> Result<
        diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<PgConnection>>,
        HandoffError,
    > {
        self.conn.get().map_err(HandoffError::from)
    }
}

fn open_ticket_query(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> Result<Option<SupportTicket>, diesel::result::Error> {
    support_tickets::table
        .filter(support_tickets::user_id.eq(user_id))
        .filter(support_tickets::status.eq_any(OPEN_STATUSES.iter().copied()))
        .first(conn)
        .optional()
}

impl HandoffStore for PgHandoffStore {
    fn open_ticket_for_user(&self, user_id: Uuid) -> Result<Option<SupportTicket>, HandoffError> {
        let mut conn = self.conn()?;
        open_ticket_query(&mut conn, user_id).map_err(HandoffError::from)
    }

    fn escalate(
        &self,
        user_id: Uuid,
        conversation_id: Option<Uuid>,
        subject: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<SupportTicket, HandoffError> {
        let mut conn = self.conn()?;

        if let Some(existing) = open_ticket_query(&mut conn, user_id)? {
            return Ok(existing);
        }

        let ticket = SupportTicket {
            id: Uuid::new_v4(),
            user_id,
            conversation_id,
            staff_id: None,
            status: TicketStatus::Pending.as_str().to_string(),
            subject,
            escalated_at: now,
            claimed_at: None,
            resolved_at: None,
            last_activity_at: now,
        };

        match diesel::insert_into(support_tickets::table)
            .values(&ticket)
            .execute(&mut conn)
        {
            Ok(_) => Ok(ticket),
            // Lost the race on the one-open-ticket index; the winner's row is
            // the escalation result.
            Err(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            )) => open_ticket_query(&mut conn, user_id)?.ok_or(HandoffError::TicketNotFound),
            Err(e) => Err(e.into()),
        }
    }

    fn claim(
        &self,
        ticket_id: Uuid,
        claimer_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<SupportTicket, HandoffError> {
        let mut conn = self.conn()?;
        conn.transaction::<SupportTicket, HandoffError, _>(|conn| {
            let member: Option<Staff> = staff::table
                .filter(staff::id.eq(claimer_id))
                .for_update()
                .first(conn)
                .optional()?;
            let member = member.ok_or(HandoffError::StaffNotFound)?;
            if !member.has_capacity() {
                return Err(HandoffError::StaffUnavailable);
            }

            // Conditional update: of two concurrent claimers exactly one sees
            // an affected row.
            let updated = diesel::update(
                support_tickets::table
                    .filter(support_tickets::id.eq(ticket_id))
                    .filter(support_tickets::status.eq(TicketStatus::Pending.as_str())),
            )
            .set((
                support_tickets::status.eq(TicketStatus::Claimed.as_str()),
                support_tickets::staff_id.eq(Some(claimer_id)),
                support_tickets::claimed_at.eq(Some(now)),
                support_tickets::last_activity_at.eq(now),
            ))
            .execute(conn)?;

            if updated == 0 {
                let existing: Option<SupportTicket> = support_tickets::table
                    .filter(support_tickets::id.eq(ticket_id))
                    .first(conn)
                    .optional()?;
                return Err(match existing {
                    None => HandoffError::TicketNotFound,
                    Some(t) => HandoffError::InvalidTransition {
                        expected: TicketStatus::Pending,
                        actual: t.status,
                    },
                });
            }

            diesel::update(staff::table.filter(staff::id.eq(claimer_id)))
                .set(staff::current_chats.eq(staff::current_chats + 1))
                .execute(conn)?;

            support_tickets::table
                .filter(support_tickets::id.eq(ticket_id))
                .first(conn)
                .map_err(HandoffError::from)
        })
    }

    fn resolve(
        &self,
        ticket_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<SupportTicket, HandoffError> {
        let mut conn = self.conn()?;
        conn.transaction::<SupportTicket, HandoffError, _>(|conn| {
            let updated = diesel::update(
                support_tickets::table
                    .filter(support_tickets::id.eq(ticket_id))
                    .filter(support_tickets::status.eq(TicketStatus::Claimed.as_str())),
            )
            .set((
                support_tickets::status.eq(TicketStatus::Resolved.as_str()),
                support_tickets::resolved_at.eq(Some(now)),
                support_tickets::last_activity_at.eq(now),
            ))
            .execute(conn)?;

            if updated == 0 {
                let existing: Option<SupportTicket> = support_tickets::table
                    .filter(support_tickets::id.eq(ticket_id))
                    .first(conn)
                    .optional()?;
                return Err(match existing {
                    None => HandoffError::TicketNotFound,
                    Some(t) => HandoffError::InvalidTransition {
                        expected: TicketStatus::Claimed,
                        actual: t.status,
                    },
                });
            }

            let ticket: SupportTicket = support_tickets::table
                .filter(support_tickets::id.eq(ticket_id))
                .first(conn)?;

            if let Some(assignee) = ticket.staff_id {
                diesel::update(staff::table.filter(staff::id.eq(assignee)))
                    .set(staff::current_chats.eq(diesel::dsl::sql::<diesel::sql_types::Integer>(
                        "GREATEST(current_chats - 1, 0)",
                    )))
                    .execute(conn)?;
            }

            if let Some(conversation_id) = ticket.conversation_id {
                crate::conversations::close(conn, conversation_id)?;
            }

            Ok(ticket)
        })
    }

    fn touch(&self, ticket_id: Uuid, now: DateTime<Utc>) -> Result<(), HandoffError> {
        let mut conn = self.conn()?;
        diesel::update(
            support_tickets::table
                .filter(support_tickets::id.eq(ticket_id))
                .filter(support_tickets::status.eq_any(OPEN_STATUSES.iter().copied())),
        )
        .set(support_tickets::last_activity_at.eq(now))
        .execute(&mut conn)?;
        Ok(())
    }

    fn timeout_sweep(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<SupportTicket>, HandoffError> {
        let mut conn = self.conn()?;
        conn.transaction::<Vec<SupportTicket>, HandoffError, _>(|conn| {
            // Row locks with SKIP LOCKED let concurrent sweeps partition the
            // stale set instead of blocking or double-releasing.
            let stale: Vec<SupportTicket> = support_tickets::table
                .filter(support_tickets::status.eq(TicketStatus::Claimed.as_str()))
                .filter(support_tickets::last_activity_at.lt(cutoff))
                .for_update()
                .skip_locked()
                .load(conn)?;

            let mut released = Vec::with_capacity(stale.len());
            for ticket in stale {
                diesel::update(support_tickets::table.filter(support_tickets::id.eq(ticket.id)))
                    .set((
                        support_tickets::status.eq(TicketStatus::Pending.as_str()),
                        support_tickets::staff_id.eq(None::<Uuid>),
                        support_tickets::claimed_at.eq(None::<DateTime<Utc>>),
                        support_tickets::last_activity_at.eq(now),
                    ))
                    .execute(conn)?;

                if let Some(assignee) = ticket.staff_id {
                    diesel::update(staff::table.filter(staff::id.eq(assignee)))
                        .set(staff::current_chats.eq(diesel::dsl::sql::<
                            diesel::sql_types::Integer,
                        >(
                            "GREATEST(current_chats - 1, 0)"
                        )))
                        .execute(conn)?;
                }

                let refreshed: SupportTicket = support_tickets::table
                    .filter(support_tickets::id.eq(ticket.id))
                    .first(conn)?;
                released.push(refreshed);
            }

            Ok(released)
        })
    }

    fn queue_position(&self, ticket_id: Uuid) -> Result<Option<usize>, HandoffError> {
        let mut conn = self.conn()?;
        let pending: Vec<Uuid> = support_tickets::table
            .filter(support_tickets::status.eq(TicketStatus::Pending.as_str()))
            .order(support_tickets::escalated_at.asc())
            .select(support_tickets::id)
            .load(&mut conn)?;
        Ok(pending.iter().position(|id| *id == ticket_id).map(|p| p + 1))
    }

    fn has_capacity(&self) -> Result<bool, HandoffError> {
        let mut conn = self.conn()?;
        let available: i64 = staff::table
            .filter(staff::is_available.eq(true))
            .filter(staff::current_chats.lt(staff::max_concurrent_chats))
            .count()
            .get_result(&mut conn)?;
        Ok(available > 0)
    }
}

/// In-process store with the same invariants, used by the state-machine
/// tests. One mutex over the whole map stands in for the database's
/// check-and-create atomicity; it does not track conversations.
#[derive(Default)]
pub struct MemoryHandoffStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    tickets: HashMap<Uuid, SupportTicket>,
    staff: HashMap<Uuid, Staff>,
}

impl MemoryHandoffStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_staff(&self, member: Staff) {
        self.inner.lock().unwrap().staff.insert(member.id, member);
    }

    pub fn staff_member(&self, id: Uuid) -> Option<Staff> {
        self.inner.lock().unwrap().staff.get(&id).cloned()
    }

    pub fn all_tickets(&self) -> Vec<SupportTicket> {
        self.inner.lock().unwrap().tickets.values().cloned().collect()
    }
}

fn open_for(inner: &MemoryInner, user_id: Uuid) -> Option<SupportTicket> {
    inner
        .tickets
        .values()
        .find(|t| t.user_id == user_id && t.is_open())
        .cloned()
}

impl HandoffStore for MemoryHandoffStore {
    fn open_ticket_for_user(&self, user_id: Uuid) -> Result<Option<SupportTicket>, HandoffError> {
        Ok(open_for(&self.inner.lock().unwrap(), user_id))
    }

    fn escalate(
        &self,
        user_id: Uuid,
        conversation_id: Option<Uuid>,
        subject: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<SupportTicket, HandoffError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = open_for(&inner, user_id) {
            return Ok(existing);
        }
        let ticket = SupportTicket {
            id: Uuid::new_v4(),
            user_id,
            conversation_id,
            staff_id: None,
            status: TicketStatus::Pending.as_str().to_string(),
            subject,
            escalated_at: now,
            claimed_at: None,
            resolved_at: None,
            last_activity_at: now,
        };
        inner.tickets.insert(ticket.id, ticket.clone());
        Ok(ticket)
    }

    fn claim(
        &self,
        ticket_id: Uuid,
        claimer_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<SupportTicket, HandoffError> {
        let mut inner = self.inner.lock().unwrap();

        let member = inner
            .staff
            .get(&claimer_id)
            .cloned()
            .ok_or(HandoffError::StaffNotFound)?;
        if !member.has_capacity() {
            return Err(HandoffError::StaffUnavailable);
        }

        let ticket = inner
            .tickets
            .get(&ticket_id)
            .cloned()
            .ok_or(HandoffError::TicketNotFound)?;
        if ticket.status != TicketStatus::Pending.as_str() {
            return Err(HandoffError::InvalidTransition {
                expected: TicketStatus::Pending,
                actual: ticket.status,
            });
        }

        let entry = inner.tickets.get_mut(&ticket_id).expect("checked above");
        entry.status = TicketStatus::Claimed.as_str().to_string();
        entry.staff_id = Some(claimer_id);
        entry.claimed_at = Some(now);
        entry.last_activity_at = now;
        let claimed = entry.clone();

        inner
            .staff
            .get_mut(&claimer_id)
            .expect("checked above")
            .current_chats += 1;

        Ok(claimed)
    }

    fn resolve(
        &self,
        ticket_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<SupportTicket, HandoffError> {
        let mut inner = self.inner.lock().unwrap();

        let ticket = inner
            .tickets
            .get(&ticket_id)
            .cloned()
            .ok_or(HandoffError::TicketNotFound)?;
        if ticket.status != TicketStatus::Claimed.as_str() {
            return Err(HandoffError::InvalidTransition {
                expected: TicketStatus::Claimed,
                actual: ticket.status,
            });
        }

        let entry = inner.tickets.get_mut(&ticket_id).expect("checked above");
        entry.status = TicketStatus::Resolved.as_str().to_string();
        entry.resolved_at = Some(now);
        entry.last_activity_at = now;
        let resolved = entry.clone();

        if let Some(assignee) = resolved.staff_id {
            if let Some(member) = inner.staff.get_mut(&assignee) {
                member.current_chats = (member.current_chats - 1).max(0);
            }
        }

        Ok(resolved)
    }

    fn touch(&self, ticket_id: Uuid, now: DateTime<Utc>) -> Result<(), HandoffError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(ticket) = inner.tickets.get_mut(&ticket_id) {
            if ticket.is_open() {
                ticket.last_activity_at = now;
            }
        }
        Ok(())
    }

    fn timeout_sweep(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<SupportTicket>, HandoffError> {
        let mut inner = self.inner.lock().unwrap();
        let stale: Vec<Uuid> = inner
            .tickets
            .values()
            .filter(|t| {
                t.status == TicketStatus::Claimed.as_str() && t.last_activity_at < cutoff
            })
            .map(|t| t.id)
            .collect();

        let mut released = Vec::with_capacity(stale.len());
        for id in stale {
            let assignee = {
                let ticket = inner.tickets.get_mut(&id).expect("collected above");
                let assignee = ticket.staff_id.take();
                ticket.status = TicketStatus::Pending.as_str().to_string();
                ticket.claimed_at = None;
                ticket.last_activity_at = now;
                released.push(ticket.clone());
                assignee
            };
            if let Some(assignee) = assignee {
                if let Some(member) = inner.staff.get_mut(&assignee) {
                    member.current_chats = (member.current_chats - 1).max(0);
                }
            }
        }
        Ok(released)
    }

    fn queue_position(&self, ticket_id: Uuid) -> Result<Option<usize>, HandoffError> {
        let inner = self.inner.lock().unwrap();
        let mut pending: Vec<&SupportTicket> = inner
            .tickets
            .values()
            .filter(|t| t.status == TicketStatus::Pending.as_str())
            .collect();
        pending.sort_by_key(|t| t.escalated_at);
        Ok(pending
            .iter()
            .position(|t| t.id == ticket_id)
            .map(|p| p + 1))
    }

    fn has_capacity(&self) -> Result<bool, HandoffError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.staff.values().any(|s| s.has_capacity()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn agent(max: i32) -> Staff {
        Staff {
            id: Uuid::new_v4(),
            name: "Aye Chan".to_string(),
            email: format!("{}@myanmarlink.example", Uuid::new_v4()),
            role: "customer_support".to_string(),
            is_available: true,
            max_concurrent_chats: max,
            current_chats: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn escalate_is_idempotent() {
        let store = MemoryHandoffStore::new();
        let user = Uuid::new_v4();
        let now = Utc::now();

        let first = store.escalate(user, None, None, now).unwrap();
        let second = store.escalate(user, None, None, now).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.all_tickets().len(), 1);
    }

    #[test]
    fn concurrent_escalations_create_one_ticket() {
        let store = MemoryHandoffStore::new();
        let user = Uuid::new_v4();

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    store.escalate(user, None, None, Utc::now()).unwrap();
                });
            }
        });

        let open: Vec<_> = store
            .all_tickets()
            .into_iter()
            .filter(|t| t.is_open())
            .collect();
        assert_eq!(open.len(), 1);
    }

    #[test]
    fn claim_requires_pending_and_mutates_nothing_on_rejection() {
        let store = MemoryHandoffStore::new();
        let member = agent(5);
        let other = agent(5);
        store.add_staff(member.clone());
        store.add_staff(other.clone());

        let now = Utc::now();
        let ticket = store.escalate(Uuid::new_v4(), None, None, now).unwrap();
        store.claim(ticket.id, member.id, now).unwrap();

        // A second claim loses and leaves the ticket with the first claimer.
        let err = store.claim(ticket.id, other.id, now).unwrap_err();
        assert!(matches!(err, HandoffError::InvalidTransition { .. }));

        let current = store.open_ticket_for_user(ticket.user_id).unwrap().unwrap();
        assert_eq!(current.status, "claimed");
        assert_eq!(current.staff_id, Some(member.id));
        assert_eq!(store.staff_member(other.id).unwrap().current_chats, 0);
    }

    #[test]
    fn claim_rejects_unavailable_staff() {
        let store = MemoryHandoffStore::new();
        let mut member = agent(5);
        member.is_available = false;
        store.add_staff(member.clone());

        let now = Utc::now();
        let ticket = store.escalate(Uuid::new_v4(), None, None, now).unwrap();
        let err = store.claim(ticket.id, member.id, now).unwrap_err();
        assert!(matches!(err, HandoffError::StaffUnavailable));

        let current = store.open_ticket_for_user(ticket.user_id).unwrap().unwrap();
        assert_eq!(current.status, "pending");
    }

    #[test]
    fn claim_rejects_staff_at_capacity() {
        let store = MemoryHandoffStore::new();
        let member = agent(1);
        store.add_staff(member.clone());
        let now = Utc::now();

        let first = store.escalate(Uuid::new_v4(), None, None, now).unwrap();
        store.claim(first.id, member.id, now).unwrap();

        let second = store.escalate(Uuid::new_v4(), None, None, now).unwrap();
        let err = store.claim(second.id, member.id, now).unwrap_err();
        assert!(matches!(err, HandoffError::StaffUnavailable));
    }

    #[test]
    fn resolve_requires_claimed() {
        let store = MemoryHandoffStore::new();
        let now = Utc::now();
        let ticket = store.escalate(Uuid::new_v4(), None, None, now).unwrap();

        let err = store.resolve(ticket.id, now).unwrap_err();
        assert!(matches!(err, HandoffError::InvalidTransition { .. }));
        let current = store.open_ticket_for_user(ticket.user_id).unwrap().unwrap();
        assert_eq!(current.status, "pending");
    }

    #[test]
    fn resolved_is_terminal() {
        let store = MemoryHandoffStore::new();
        let member = agent(5);
        store.add_staff(member.clone());
        let now = Utc::now();

        let ticket = store.escalate(Uuid::new_v4(), None, None, now).unwrap();
        store.claim(ticket.id, member.id, now).unwrap();
        store.resolve(ticket.id, now).unwrap();

        assert!(matches!(
            store.claim(ticket.id, member.id, now).unwrap_err(),
            HandoffError::InvalidTransition { .. }
        ));
        assert!(matches!(
            store.resolve(ticket.id, now).unwrap_err(),
            HandoffError::InvalidTransition { .. }
        ));
    }

    #[test]
    fn resolving_frees_the_assignee_for_new_escalations() {
        let store = MemoryHandoffStore::new();
        let member = agent(1);
        store.add_staff(member.clone());
        let now = Utc::now();
        let user = Uuid::new_v4();

        let ticket = store.escalate(user, None, None, now).unwrap();
        store.claim(ticket.id, member.id, now).unwrap();
        assert_eq!(store.staff_member(member.id).unwrap().current_chats, 1);

        store.resolve(ticket.id, now).unwrap();
        assert_eq!(store.staff_member(member.id).unwrap().current_chats, 0);

        // Same user may escalate again once the previous ticket is resolved.
        let next = store.escalate(user, None, None, now).unwrap();
        assert_ne!(next.id, ticket.id);
        assert_eq!(next.status, "pending");
    }

    #[test]
    fn sweep_releases_only_stale_claimed_tickets() {
        let store = MemoryHandoffStore::new();
        let member = agent(5);
        store.add_staff(member.clone());

        let start = Utc::now() - Duration::minutes(30);
        let stale = store.escalate(Uuid::new_v4(), None, None, start).unwrap();
        store.claim(stale.id, member.id, start).unwrap();

        let now = Utc::now();
        let fresh = store.escalate(Uuid::new_v4(), None, None, now).unwrap();
        store.claim(fresh.id, member.id, now).unwrap();

        let cutoff = now - Duration::minutes(5);
        let released = store.timeout_sweep(cutoff, now).unwrap();
        assert_eq!(released.len(), 1);
        assert_eq!(released[0].id, stale.id);
        assert_eq!(released[0].status, "pending");
        assert_eq!(released[0].staff_id, None);
        assert_eq!(store.staff_member(member.id).unwrap().current_chats, 1);

        // Idempotent: a second pass finds nothing to release.
        let again = store.timeout_sweep(cutoff, now).unwrap();
        assert!(again.is_empty());

        let untouched = store.open_ticket_for_user(fresh.user_id).unwrap().unwrap();
        assert_eq!(untouched.status, "claimed");
    }

    #[test]
    fn queue_position_is_oldest_first() {
        let store = MemoryHandoffStore::new();
        let base = Utc::now();

        let first = store
            .escalate(Uuid::new_v4(), None, None, base - Duration::minutes(2))
            .unwrap();
        let second = store
            .escalate(Uuid::new_v4(), None, None, base - Duration::minutes(1))
            .unwrap();

        assert_eq!(store.queue_position(first.id).unwrap(), Some(1));
        assert_eq!(store.queue_position(second.id).unwrap(), Some(2));
        assert_eq!(store.queue_position(Uuid::new_v4()).unwrap(), None);
    }

    #[test]
    fn capacity_reflects_staff_availability() {
        let store = MemoryHandoffStore::new();
        assert!(!store.has_capacity().unwrap());

        let member = agent(1);
        store.add_staff(member.clone());
        assert!(store.has_capacity().unwrap());

        let now = Utc::now();
        let ticket = store.escalate(Uuid::new_v4(), None, None, now).unwrap();
        store.claim(ticket.id, member.id, now).unwrap();
        assert!(!store.has_capacity().unwrap());
    }
}
