diesel::table! {
    roles (id) {
        id -> Int4,
        name -> Text,
    }
}

diesel::table! {
    tasks (id) {
        id -> Int4,
        title -> Text,
        week_num -> Int4,
        category -> Text,
        format -> Text,
        assigned_to -> Text,
        resource_url -> Nullable<Text>,
    }
}

diesel::table! {
    role_tasks (task_id, role_id) {
        task_id -> Int4,
        role_id -> Int4,
    }
}

diesel::table! {
    users (id) {
        id -> Int4,
        name -> Text,
        email -> Text,
        role_id -> Nullable<Int4>,
        is_admin -> Bool,
        password_hash -> Nullable<Text>,
    }
}

diesel::table! {
    task_progress (user_id, task_id) {
        user_id -> Int4,
        task_id -> Int4,
        completed -> Bool,
        completed_at -> Nullable<Timestamptz>,
    }
}

diesel::joinable!(role_tasks -> roles (role_id));
diesel::joinable!(role_tasks -> tasks (task_id));
diesel::joinable!(users -> roles (role_id));
diesel::joinable!(task_progress -> tasks (task_id));
diesel::joinable!(task_progress -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(roles, tasks, role_tasks, users, task_progress);
