diesel::table! {
    users (id) {
        id -> Uuid,
        email -> Text,
        name -> Text,
        password_hash -> Text,
        role -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    tickets (id) {
        id -> Uuid,
        title -> Varchar,
        description -> Text,
        status -> Text,
        creator_id -> Uuid,
        assignee_id -> Nullable<Uuid>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    comments (id) {
        id -> Uuid,
        ticket_id -> Uuid,
        user_id -> Uuid,
        content -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    attachments (id) {
        id -> Uuid,
        ticket_id -> Uuid,
        filename -> Text,
        path -> Text,
        uploaded_at -> Timestamptz,
    }
}

diesel::joinable!(comments -> users (user_id));
diesel::joinable!(comments -> tickets (ticket_id));
diesel::joinable!(attachments -> tickets (ticket_id));

diesel::allow_tables_to_appear_in_same_query!(users, tickets, comments, attachments);
