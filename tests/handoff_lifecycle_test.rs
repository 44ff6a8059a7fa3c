//! End-to-end ticket lifecycle against the in-process store: the same
//! decision and transition paths the webhook and admin surfaces drive in
//! production, minus HTTP and Postgres.

use chrono::{Duration, Utc};
use uuid::Uuid;

use viberdesk::handoff::store::{HandoffStore, MemoryHandoffStore};
use viberdesk::handoff::{
    evaluate, ConversationSnapshot, Decision, EscalationReason, HandoffError, TicketStatus,
};
use viberdesk::menus::MenuItem;
use viberdesk::staff::Staff;

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

fn agent(name: &str) -> Staff {
    Staff {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email: format!("{name}@myanmarlink.example"),
        role: "customer_support".to_string(),
        is_available: true,
        max_concurrent_chats: 5,
        current_chats: 0,
        created_at: Utc::now(),
    }
}

#[test]
fn menu_selection_never_creates_a_ticket() {
    let store = MemoryHandoffStore::new();
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
    assert!(store.all_tickets().is_empty());
}

#[test]
fn human_request_runs_the_full_lifecycle() {
    let store = MemoryHandoffStore::new();
    let staff_a = agent("aye");
    let staff_b = agent("kyaw");
    store.add_staff(staff_a.clone());
    store.add_staff(staff_b.clone());

    let user = Uuid::new_v4();
    let conversation = Uuid::new_v4();
    let items = menu();
    let now = Utc::now();

    // "human" -> escalate decision
    let decision = evaluate(
        "human",
        "en",
        Some(&items),
        &ConversationSnapshot::default(),
        3,
    )
    .unwrap();
    assert_eq!(decision, Decision::Escalate(EscalationReason::UserRequested));

    // escalation creates a pending ticket
    let ticket = store
        .escalate(user, Some(conversation), Some("Customer requested an agent".into()), now)
        .unwrap();
    assert_eq!(ticket.status, TicketStatus::Pending.as_str());
    assert_eq!(ticket.staff_id, None);

    // immediate re-escalation returns the same ticket
    let again = store.escalate(user, Some(conversation), None, now).unwrap();
    assert_eq!(again.id, ticket.id);

    // staff A claims it
    let claimed = store.claim(ticket.id, staff_a.id, now).unwrap();
    assert_eq!(claimed.status, TicketStatus::Claimed.as_str());
    assert_eq!(claimed.staff_id, Some(staff_a.id));
    assert!(claimed.claimed_at.is_some());

    // staff B's claim fails and changes nothing
    let err = store.claim(ticket.id, staff_b.id, now).unwrap_err();
    assert!(matches!(err, HandoffError::InvalidTransition { .. }));
    let unchanged = store.open_ticket_for_user(user).unwrap().unwrap();
    assert_eq!(unchanged.staff_id, Some(staff_a.id));

    // staff A resolves it
    let resolved = store.resolve(ticket.id, now).unwrap();
    assert_eq!(resolved.status, TicketStatus::Resolved.as_str());
    assert!(resolved.resolved_at.is_some());

    // terminal: no further transitions accepted
    assert!(store.claim(ticket.id, staff_b.id, now).is_err());
    assert!(store.resolve(ticket.id, now).is_err());

    // and the user no longer has an open ticket
    assert!(store.open_ticket_for_user(user).unwrap().is_none());
}

#[test]
fn at_most_one_open_ticket_per_user_under_concurrency() {
    let store = MemoryHandoffStore::new();
    let user = Uuid::new_v4();

    std::thread::scope(|scope| {
        for _ in 0..16 {
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
    assert_eq!(open.len(), 1, "concurrent escalations must collapse to one ticket");
}

#[test]
fn open_ticket_short_circuits_evaluation() {
    let store = MemoryHandoffStore::new();
    let user = Uuid::new_v4();
    let items = menu();
    let now = Utc::now();

    store.escalate(user, None, None, now).unwrap();

    let snapshot = ConversationSnapshot {
        unmatched_count: 0,
        has_open_ticket: store.open_ticket_for_user(user).unwrap().is_some(),
    };
    let decision = evaluate("Balance", "en", Some(&items), &snapshot, 3).unwrap();
    assert_eq!(
        decision,
        Decision::Escalate(EscalationReason::TicketAlreadyOpen)
    );
}

#[test]
fn released_tickets_can_be_claimed_by_another_agent() {
    let store = MemoryHandoffStore::new();
    let staff_a = agent("aye");
    let staff_b = agent("kyaw");
    store.add_staff(staff_a.clone());
    store.add_staff(staff_b.clone());

    let start = Utc::now() - Duration::minutes(20);
    let ticket = store.escalate(Uuid::new_v4(), None, None, start).unwrap();
    store.claim(ticket.id, staff_a.id, start).unwrap();

    let now = Utc::now();
    let released = store
        .timeout_sweep(now - Duration::minutes(5), now)
        .unwrap();
    assert_eq!(released.len(), 1);
    assert_eq!(released[0].status, TicketStatus::Pending.as_str());

    // The first claimer's slot is free again and another agent can pick it up.
    assert_eq!(store.staff_member(staff_a.id).unwrap().current_chats, 0);
    let reclaimed = store.claim(ticket.id, staff_b.id, now).unwrap();
    assert_eq!(reclaimed.staff_id, Some(staff_b.id));
}
