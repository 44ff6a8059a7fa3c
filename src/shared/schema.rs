diesel::table! {
    bot_users (id) {
        id -> Uuid,
        viber_id -> Varchar,
        display_name -> Nullable<Varchar>,
        language -> Varchar,
        is_active -> Bool,
        created_at -> Timestamptz,
        last_active_at -> Timestamptz,
    }
}

diesel::table! {
    conversations (id) {
        id -> Uuid,
        user_id -> Uuid,
        status -> Varchar,
        unmatched_count -> Int4,
        started_at -> Timestamptz,
        ended_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    messages (id) {
        id -> Uuid,
        conversation_id -> Uuid,
        direction -> Varchar,
        sender -> Varchar,
        payload -> Jsonb,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    bot_menus (id) {
        id -> Uuid,
        version -> Int4,
        items -> Jsonb,
        is_active -> Bool,
        updated_by -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    support_tickets (id) {
        id -> Uuid,
        user_id -> Uuid,
        conversation_id -> Nullable<Uuid>,
        staff_id -> Nullable<Uuid>,
        status -> Varchar,
        subject -> Nullable<Varchar>,
        escalated_at -> Timestamptz,
        claimed_at -> Nullable<Timestamptz>,
        resolved_at -> Nullable<Timestamptz>,
        last_activity_at -> Timestamptz,
    }
}

diesel::table! {
    staff (id) {
        id -> Uuid,
        name -> Varchar,
        email -> Varchar,
        role -> Varchar,
        is_available -> Bool,
        max_concurrent_chats -> Int4,
        current_chats -> Int4,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(conversations -> bot_users (user_id));
diesel::joinable!(messages -> conversations (conversation_id));
diesel::joinable!(support_tickets -> bot_users (user_id));

diesel::allow_tables_to_appear_in_same_query!(
    bot_users,
    conversations,
    messages,
    bot_menus,
    support_tickets,
    staff,
);
